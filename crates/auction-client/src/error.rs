//! Transport error types.

use auction_rep::LedgerError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unknown representative: {0}")]
    UnknownRep(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ClientError {
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, ClientError::Ledger(e) if e.is_protocol_violation())
    }
}
