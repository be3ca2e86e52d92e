//! Price oracle error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("price request failed: {0}")]
    Request(String),

    #[error("symbol not found: {0}")]
    UnknownSymbol(String),

    #[error("malformed price response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, OracleError>;
