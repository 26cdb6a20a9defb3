//! The bidding protocols.
//!
//! Every protocol runs the same outer loop: up to `max_rounds` rounds, each
//! drawing a fresh bidding pool and either producing a winner or moving on.
//! They differ in which transport calls a round makes and how much they
//! trust a score once it has been given.

mod all_reserve;
mod all_revote;
mod hesitate;
mod pick_among_best;
mod pick_best;
mod random;
mod reserve_n_best;

use auction_client::RepPoolClient;
use auction_core::{Algorithm, AuctionRequest, Instance, RepGuids, SharedRng};
use auction_store::CoordinationStore;
use tracing::error;

/// What one auction produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionOutcome {
    pub winner: Option<String>,
    /// The round the winner was found in, or every round tried.
    pub rounds: u32,
    /// Representatives addressed across every transport call.
    pub communications: u32,
}

/// Collaborators a protocol runs against.
#[derive(Clone, Copy)]
pub struct AuctionContext<'a> {
    pub client: &'a dyn RepPoolClient,
    pub rng: &'a SharedRng,
    /// Only `hesitate` uses the store, to open each instance's claim key.
    pub claim_store: Option<&'a dyn CoordinationStore>,
}

impl<'a> AuctionContext<'a> {
    pub fn new(client: &'a dyn RepPoolClient, rng: &'a SharedRng) -> Self {
        Self {
            client,
            rng,
            claim_store: None,
        }
    }

    pub fn with_claim_store(mut self, store: &'a dyn CoordinationStore) -> Self {
        self.claim_store = Some(store);
        self
    }

    /// This round's bidders, drawn without replacement from the population.
    fn bidding_pool(&self, request: &AuctionRequest) -> RepGuids {
        let population = &request.rep_guids;
        let size = request.rules.max_bidding_pool.size(population.len());
        population.random_subset(size, self.rng)
    }

    /// Finalize on `guid`. A failed claim is logged and the caller retries.
    async fn claim(&self, guid: &str, instance: &Instance, tally: &mut Tally) -> bool {
        tally.add(1);
        match self.client.claim(guid, instance).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    rep = %guid,
                    instance = %instance.instance_guid,
                    error = %e,
                    "claim failed"
                );
                false
            }
        }
    }
}

/// Message count for an auction in progress.
#[derive(Debug, Default)]
struct Tally {
    communications: u32,
}

impl Tally {
    fn add(&mut self, addressed: usize) {
        self.communications = self
            .communications
            .saturating_add(u32::try_from(addressed).unwrap_or(u32::MAX));
    }

    fn won(self, winner: String, round: u32) -> AuctionOutcome {
        AuctionOutcome {
            winner: Some(winner),
            rounds: round,
            communications: self.communications,
        }
    }

    fn exhausted(self, max_rounds: u32) -> AuctionOutcome {
        AuctionOutcome {
            winner: None,
            rounds: max_rounds,
            communications: self.communications,
        }
    }
}

/// Shortlist length for protocols that keep only the best few voters.
fn shortlist_len(request: &AuctionRequest) -> usize {
    request.rules.shortlist_size.max(1)
}

/// Run the protocol named by `request.rules.algorithm`.
pub async fn run(ctx: &AuctionContext<'_>, request: &AuctionRequest) -> AuctionOutcome {
    match request.rules.algorithm {
        Algorithm::Random => random::auction(ctx, request).await,
        Algorithm::PickBest => pick_best::auction(ctx, request).await,
        Algorithm::PickAmongBest => pick_among_best::auction(ctx, request).await,
        Algorithm::ReserveNBest => reserve_n_best::auction(ctx, request).await,
        Algorithm::AllReserve => all_reserve::auction(ctx, request).await,
        Algorithm::AllRevote => all_revote::auction(ctx, request).await,
        Algorithm::Hesitate => hesitate::auction(ctx, request).await,
    }
}
