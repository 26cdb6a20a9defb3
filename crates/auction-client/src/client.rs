//! The bid transport contract.

use std::future::Future;
use std::pin::Pin;

use auction_core::{Instance, VoteResults};

use crate::error::ClientResult;

/// Boxed future returned by transport calls.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Calls an auctioneer can make against a pool of representatives.
///
/// The multi-representative calls must return exactly one result per
/// requested guid and must never wait past the transport's own timeout.
pub trait RepPoolClient: Send + Sync {
    /// Ask each representative to score `instance` without reserving.
    fn vote<'a>(&'a self, guids: &'a [String], instance: &'a Instance)
    -> ClientFuture<'a, VoteResults>;

    /// Ask each representative to score and tentatively reserve `instance`
    /// in one step.
    fn reserve_and_recast_vote<'a>(
        &'a self,
        guids: &'a [String],
        instance: &'a Instance,
    ) -> ClientFuture<'a, VoteResults>;

    /// Drop tentative holds. Best effort: failures are logged, not returned.
    fn release<'a>(&'a self, guids: &'a [String], instance: &'a Instance) -> ClientFuture<'a, ()>;

    /// Finalize the placement on one representative.
    fn claim<'a>(&'a self, guid: &'a str, instance: &'a Instance) -> ClientFuture<'a, ClientResult<()>>;

    /// Let each representative race for the instance's claim key. The winner
    /// answers with a score of exactly `1.0`.
    fn hesitate_and_claim<'a>(
        &'a self,
        guids: &'a [String],
        instance: &'a Instance,
    ) -> ClientFuture<'a, VoteResults>;
}

/// Inspection and setup calls used by simulations and tests.
pub trait TestRepPoolClient: RepPoolClient {
    fn total_resources<'a>(&'a self, guid: &'a str) -> ClientFuture<'a, ClientResult<u32>>;

    fn instances<'a>(&'a self, guid: &'a str) -> ClientFuture<'a, ClientResult<Vec<Instance>>>;

    fn set_instances<'a>(
        &'a self,
        guid: &'a str,
        instances: Vec<Instance>,
    ) -> ClientFuture<'a, ClientResult<()>>;

    fn reset<'a>(&'a self, guid: &'a str) -> ClientFuture<'a, ClientResult<()>>;
}
