//! Data supplier error types.

use thiserror::Error;

/// Errors surfaced by a [`DataSupplier`](super::DataSupplier).
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport failure (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The height, block or address has no data upstream.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The body or an identifier could not be decoded.
    #[error("Invalid data: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

/// Result type for supplier calls.
pub type FetchResult<T> = Result<T, FetchError>;
