//! Error types of the on-device fallback store.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`FileStoreError`] failures.
pub type FileResult<T> = Result<T, FileStoreError>;

/// Failures that can occur while reading or writing the fallback document.
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// The fallback document has never been written.
    #[error("no fallback record at `{}`", path.display())]
    Missing { path: PathBuf },
    /// Reading the fallback document failed.
    #[error("failed to read fallback record `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Writing or renaming the fallback document failed.
    #[error("failed to write fallback record `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The fallback document is not a match record.
    #[error("failed to decode fallback record `{}`", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The record could not be serialized.
    #[error("failed to encode fallback record")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

impl From<FileStoreError> for StorageError {
    fn from(err: FileStoreError) -> Self {
        let out_of_space = matches!(
            &err,
            FileStoreError::Write { source, .. } if source.kind() == io::ErrorKind::StorageFull
        );

        match err {
            FileStoreError::Missing { .. } => StorageError::NotFound,
            FileStoreError::Write { .. } if out_of_space => {
                StorageError::storage_full(err.to_string(), err)
            }
            FileStoreError::Decode { .. } | FileStoreError::Encode { .. } => {
                StorageError::malformed(err.to_string(), err)
            }
            FileStoreError::Read { .. } | FileStoreError::Write { .. } => {
                StorageError::unreachable(err.to_string(), err)
            }
        }
    }
}
