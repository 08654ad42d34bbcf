//! Application-wide error types.

use bounty_board::BoardError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Algod error: {0}")]
    Algod(String),

    /// 404 from algod, with the node's message.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Node failures surface to the core as ledger errors.
impl From<GatewayError> for BoardError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Board(inner) => inner,
            other => BoardError::Ledger(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
