use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by match stores regardless of where the document lives.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Network or transport failure, or an unsuccessful response.
    #[error("storage unreachable: {message}")]
    Unreachable {
        /// Human-readable context for logs.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// No record was ever written (local fallback only).
    #[error("no match record stored yet")]
    NotFound,
    /// The device ran out of space while persisting the record.
    #[error("storage full: {message}")]
    StorageFull {
        /// Human-readable context for logs.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The stored payload does not have the expected shape.
    #[error("malformed record: {message}")]
    MalformedResponse {
        /// Human-readable context for logs.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unreachable error from any backend failure.
    pub fn unreachable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unreachable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a storage-full error from the failed write.
    pub fn storage_full(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::StorageFull {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a malformed-record error from the decoding failure.
    pub fn malformed(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::MalformedResponse {
            message,
            source: Box::new(source),
        }
    }
}
