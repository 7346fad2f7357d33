//! Error types for session operations

/// Errors from session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Api(#[from] api_client::Error),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
