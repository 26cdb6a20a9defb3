//! auction-rep: a representative's resource ledger.
//!
//! Each [`Representative`] owns the set of instances it holds, tentative or
//! claimed, behind a single mutex. Every ledger operation runs as one
//! critical section, so a score and the reservation it justifies can never
//! be split by another caller.

pub mod error;
pub mod representative;

pub use error::{LedgerError, LedgerResult};
pub use representative::{CLAIM_OPEN, CLAIM_TAKEN, MAX_HESITATION, Representative};
