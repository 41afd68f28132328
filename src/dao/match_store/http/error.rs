//! Error types of the HTTP record store client.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`HttpStoreError`] failures.
pub type HttpResult<T> = Result<T, HttpStoreError>;

/// Failures that can occur while talking to the remote record store.
#[derive(Debug, Error)]
pub enum HttpStoreError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build record store client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or its body could not be read.
    #[error("failed to send record store request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The record store answered with an unsuccessful status code.
    #[error("unexpected record store response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// The response body is not a match record.
    #[error("failed to decode record store response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<HttpStoreError> for StorageError {
    fn from(err: HttpStoreError) -> Self {
        match err {
            HttpStoreError::DecodeResponse { .. } => StorageError::malformed(err.to_string(), err),
            _ => StorageError::unreachable(err.to_string(), err),
        }
    }
}
