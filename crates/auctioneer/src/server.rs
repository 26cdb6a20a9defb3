//! `/auction` HTTP endpoint.
//!
//! Accepts a JSON [`AuctionRequest`], runs it on a local [`Auctioneer`] and
//! answers with the JSON [`AuctionResult`]. Malformed bodies are rejected by
//! the extractor with a 4xx before any auction starts.

use std::net::SocketAddr;
use std::sync::Arc;

use auction_core::AuctionRequest;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::auctioneer::Auctioneer;

/// Shared state for the auction handler.
#[derive(Clone)]
pub struct AuctionState {
    pub auctioneer: Arc<Auctioneer>,
    permits: Arc<Semaphore>,
}

/// Build the auctioneer router. At most `max_concurrent` auctions run at
/// once; further requests wait for a slot.
pub fn build_router(auctioneer: Arc<Auctioneer>, max_concurrent: usize) -> Router {
    let state = AuctionState {
        auctioneer,
        permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
    };
    Router::new()
        .route("/auction", post(handle_auction))
        .with_state(state)
}

/// POST /auction
pub async fn handle_auction(
    State(state): State<AuctionState>,
    Json(request): Json<AuctionRequest>,
) -> impl IntoResponse {
    let Ok(_permit) = state.permits.acquire().await else {
        return (StatusCode::SERVICE_UNAVAILABLE, "auctioneer is shutting down").into_response();
    };
    Json(state.auctioneer.auction(request).await).into_response()
}

/// Bind `addr` and serve the auctioneer router in the background.
pub async fn spawn_server(
    addr: SocketAddr,
    auctioneer: Arc<Auctioneer>,
    max_concurrent: usize,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    let router = build_router(auctioneer, max_concurrent);

    info!(addr = %local, "auctioneer listening");
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "auctioneer server stopped");
        }
    });
    Ok((local, handle))
}
