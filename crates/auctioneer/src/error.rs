//! Auctioneer error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuctioneerError {
    #[error("no auctioneer hosts configured")]
    NoHosts,

    #[error("failed to reach auctioneer: {0}")]
    Connect(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(String),

    #[error("auctioneer answered with status {0}")]
    Status(u16),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("remote auction timed out")]
    Timeout,
}

pub type AuctioneerResult<T> = Result<T, AuctioneerError>;
