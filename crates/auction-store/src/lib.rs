//! auction-store: the shared coordination store used by claim-with-proof
//! auctions.
//!
//! Only two mutating operations are offered: `create`, which fails when the
//! key exists, and `compare_and_swap`, which fails unless the stored value
//! still equals the caller's expectation. Both run inside a single redb
//! write transaction, and redb serializes writers, so at most one of any
//! set of racing swaps from the same old value succeeds.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::{ClaimStore, CoordinationStore};
pub use types::{StoreNode, claim_key};
