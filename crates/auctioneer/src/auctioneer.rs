//! Single-auction dispatch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use auction_client::{ClientFuture, RepPoolClient};
use auction_core::{AuctionRequest, AuctionResult, SharedRng};
use auction_store::CoordinationStore;
use tracing::debug;

use crate::algorithms::{self, AuctionContext};

/// Turns one [`AuctionRequest`] into one [`AuctionResult`], wherever the
/// auction actually runs.
pub trait AuctionCommunicator: Send + Sync {
    fn communicate(&self, request: AuctionRequest) -> ClientFuture<'_, AuctionResult>;
}

/// Runs auctions in this process against a [`RepPoolClient`].
pub struct Auctioneer {
    client: Arc<dyn RepPoolClient>,
    rng: SharedRng,
    claim_store: Option<Arc<dyn CoordinationStore>>,
}

impl Auctioneer {
    pub fn new(client: Arc<dyn RepPoolClient>, rng: SharedRng) -> Self {
        Self {
            client,
            rng,
            claim_store: None,
        }
    }

    /// Store used to open claim keys for `hesitate` auctions.
    pub fn with_claim_store(mut self, store: Arc<dyn CoordinationStore>) -> Self {
        self.claim_store = Some(store);
        self
    }

    pub async fn auction(&self, request: AuctionRequest) -> AuctionResult {
        let started = Instant::now();
        let mut ctx = AuctionContext::new(self.client.as_ref(), &self.rng);
        if let Some(store) = self.claim_store.as_deref() {
            ctx = ctx.with_claim_store(store);
        }

        let outcome = algorithms::run(&ctx, &request).await;
        let bidding_duration = started.elapsed();

        debug!(
            algorithm = %request.rules.algorithm,
            instance = %request.instance.instance_guid,
            winner = outcome.winner.as_deref().unwrap_or(""),
            rounds = outcome.rounds,
            communications = outcome.communications,
            ?bidding_duration,
            "auction finished"
        );

        AuctionResult {
            instance: request.instance,
            winner: outcome.winner,
            num_rounds: outcome.rounds,
            num_communications: outcome.communications,
            bidding_duration,
            duration: Duration::ZERO,
        }
    }
}

impl AuctionCommunicator for Auctioneer {
    fn communicate(&self, request: AuctionRequest) -> ClientFuture<'_, AuctionResult> {
        Box::pin(self.auction(request))
    }
}
