//! Error types for the acquisition engine.
//!
//! Each type is scoped to the level it fails at: a `FetchError` costs one page,
//! an `ExtractionError` one element, a `PersistError` one listing.

use thiserror::Error;

/// Renderer-level failure while loading or querying a page. Retryable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Failure to turn one listing element into a [`Listing`](crate::Listing).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no title selector matched")]
    MissingTitle,
}

/// Failure of the key-value store backing deduplication.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store command failed: {0}")]
    Command(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

/// Failure of the dedup/persist step.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("invalid listing: {0}")]
    InvalidListing(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to serialize listing: {0}")]
    Serialize(#[from] serde_json::Error),
}
