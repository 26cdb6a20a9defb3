//! Ledger error types.

use auction_store::StoreError;
use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient resources for instance")]
    InsufficientResources,

    /// Release or claim named an instance this representative does not hold.
    #[error("no reservation held for instance {0}")]
    NoReservation(String),

    /// Release named an instance that is already claimed.
    #[error("instance {0} is not tentatively reserved")]
    NotTentative(String),

    /// Another representative won the claim race.
    #[error("failed to claim instance {0}")]
    ClaimConflict(String),

    /// The instance is already held here, tentatively or claimed.
    #[error("instance {0} is already held")]
    AlreadyHeld(String),

    #[error("no coordination store configured")]
    NoClaimStore,

    #[error("coordination store error: {0}")]
    Store(StoreError),
}

impl LedgerError {
    /// True for errors that mean the caller broke the reserve/claim/release
    /// protocol rather than hitting a normal runtime condition.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            LedgerError::NoReservation(_) | LedgerError::NotTentative(_)
        )
    }
}
