//! Error types for cache operations.

use thiserror::Error;

/// Boxed error returned by user-supplied compute and write-through functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a cache layer or the [`FnCache`](crate::FnCache) orchestrator can report.
///
/// `Miss`, `Expired` and `Reclaimed` are backend-local and never fatal: the
/// orchestrator treats all three as a reason to compute. They stay separate
/// variants so diagnostics can tell them apart; use [`Error::is_miss`] when
/// the reason does not matter.
#[derive(Debug, Error)]
pub enum Error {
    /// No entry stored for the key.
    #[error("cache miss")]
    Miss,

    /// An entry existed but its TTL had elapsed.
    #[error("cache entry expired")]
    Expired,

    /// An entry existed but its weakly owned value was already dropped.
    #[error("cached value reclaimed")]
    Reclaimed,

    /// The compute or write-through function failed.
    #[error("compute failed: {0}")]
    Compute(#[source] BoxError),

    /// A value was computed, but writing it into the cache layer failed.
    #[error("value computed but not cached: {0}")]
    StoreFailed(#[source] Box<Error>),

    /// The operation's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation's context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Invalid configuration, e.g. a zero TTL or a missing compute function.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The backend was stopped; using it afterwards is a caller error.
    #[error("cache backend stopped")]
    Stopped,

    /// Remote backend unavailable or returned an error.
    #[error("backend error: {0}")]
    BackendError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Stored bytes are not a valid cache envelope.
    #[error("invalid cache entry: {0}")]
    InvalidCacheEntry(String),

    /// Stored bytes were written with a different envelope version.
    #[error("cache schema version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

impl Error {
    /// Wrap any error as a compute failure.
    ///
    /// ```
    /// use fncache::Error;
    ///
    /// let err = Error::compute(std::io::Error::other("database down"));
    /// assert!(matches!(err, Error::Compute(_)));
    /// ```
    pub fn compute<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Compute(err.into())
    }

    /// True for `Miss`, `Expired` and `Reclaimed`.
    pub fn is_miss(&self) -> bool {
        matches!(self, Error::Miss | Error::Expired | Error::Reclaimed)
    }

    /// True when the error came from the caller's context rather than the cache.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}

/// Failure of [`FnCache::get`](crate::FnCache::get).
///
/// `StoreFailed` is the one case where a value exists: it was computed, but
/// writing it into the cache layer failed. The value rides along in the error
/// so a caller that can live with an uncached result gets it back with
/// [`GetError::into_value`]. Converting into [`Error`] (which `?` does in a
/// function returning [`Result`]) keeps the failure as `Error::StoreFailed`.
#[derive(Debug, Error)]
pub enum GetError<V> {
    /// Nothing was produced.
    #[error(transparent)]
    Failed(#[from] Error),

    /// A value was computed but could not be cached.
    #[error("value computed but not cached: {source}")]
    StoreFailed {
        value: V,
        #[source]
        source: Error,
    },
}

impl<V> GetError<V> {
    /// The underlying error; for `StoreFailed` that is the layer's write error.
    pub fn error(&self) -> &Error {
        match self {
            GetError::Failed(e) => e,
            GetError::StoreFailed { source, .. } => source,
        }
    }

    pub fn is_store_failure(&self) -> bool {
        matches!(self, GetError::StoreFailed { .. })
    }

    /// Recover the computed value, if there is one.
    pub fn into_value(self) -> Option<V> {
        match self {
            GetError::Failed(_) => None,
            GetError::StoreFailed { value, .. } => Some(value),
        }
    }
}

impl<V> From<GetError<V>> for Error {
    fn from(err: GetError<V>) -> Self {
        match err {
            GetError::Failed(e) => e,
            GetError::StoreFailed { source, .. } => Error::StoreFailed(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_family() {
        assert!(Error::Miss.is_miss());
        assert!(Error::Expired.is_miss());
        assert!(Error::Reclaimed.is_miss());
        assert!(!Error::Stopped.is_miss());
        assert!(!Error::compute("boom").is_miss());
    }

    #[test]
    fn test_cancellation_family() {
        assert!(Error::Cancelled.is_cancellation());
        assert!(Error::DeadlineExceeded.is_cancellation());
        assert!(!Error::Miss.is_cancellation());
    }

    #[test]
    fn test_store_failed_keeps_source() {
        use std::error::Error as _;

        let err = Error::StoreFailed(Box::new(Error::BackendError("down".to_string())));
        assert_eq!(
            err.to_string(),
            "value computed but not cached: backend error: down"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_get_error_store_failure_keeps_value() {
        let err = GetError::StoreFailed {
            value: 7u32,
            source: Error::BackendError("down".to_string()),
        };
        assert!(err.is_store_failure());
        assert!(matches!(err.error(), Error::BackendError(_)));
        assert_eq!(err.to_string(), "value computed but not cached: backend error: down");

        let converted: Error = GetError::StoreFailed {
            value: 7u32,
            source: Error::BackendError("down".to_string()),
        }
        .into();
        assert!(matches!(converted, Error::StoreFailed(inner) if matches!(*inner, Error::BackendError(_))));
        assert_eq!(err.into_value(), Some(7));
    }

    #[test]
    fn test_get_error_failed_is_transparent() {
        let err: GetError<u32> = Error::Cancelled.into();
        assert_eq!(err.to_string(), "operation cancelled");
        assert!(!err.is_store_failure());
        assert!(err.into_value().is_none());
    }

    #[test]
    fn test_version_mismatch_display() {
        let err = Error::VersionMismatch {
            expected: 1,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "cache schema version mismatch: expected 1, found 2"
        );
    }
}
