//! Remote auction router: ships each auction to one of several auctioneer
//! hosts over HTTP.

use std::time::Duration;

use auction_client::ClientFuture;
use auction_core::{AuctionRequest, AuctionResult, SharedRng};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tracing::{debug, warn};

use crate::auctioneer::AuctionCommunicator;
use crate::error::{AuctioneerError, AuctioneerResult};

/// Default bound on one remote auction, connect to decoded response.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// POSTs JSON [`AuctionRequest`]s to `/auction` on a host picked uniformly
/// at random per request.
#[derive(Debug, Clone)]
pub struct HttpRemoteAuctions {
    hosts: Vec<String>,
    rng: SharedRng,
    timeout: Duration,
}

impl HttpRemoteAuctions {
    /// `hosts` are `host:port` pairs.
    pub fn new(hosts: Vec<String>, rng: SharedRng) -> Self {
        Self {
            hosts,
            rng,
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn pick_host(&self) -> AuctioneerResult<&str> {
        self.rng
            .index(self.hosts.len())
            .map(|i| self.hosts[i].as_str())
            .ok_or(AuctioneerError::NoHosts)
    }

    /// Run one auction remotely, surfacing every failure.
    pub async fn try_auction(&self, request: &AuctionRequest) -> AuctioneerResult<AuctionResult> {
        let host = self.pick_host()?;
        let payload = serde_json::to_vec(request)?;

        let exchange = async {
            let stream = tokio::net::TcpStream::connect(host).await?;
            let io = TokioIo::new(stream);
            let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
                .await
                .map_err(|e| AuctioneerError::Http(e.to_string()))?;

            // Drive the connection in the background.
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    debug!(error = %e, "auction connection closed");
                }
            });

            let req = http::Request::builder()
                .method("POST")
                .uri("/auction")
                .header("host", host)
                .header("content-type", "application/json")
                .header("user-agent", "auctioneer/0.1")
                .body(Full::new(Bytes::from(payload)))
                .map_err(|e| AuctioneerError::Http(e.to_string()))?;

            let resp = sender
                .send_request(req)
                .await
                .map_err(|e| AuctioneerError::Http(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(AuctioneerError::Status(resp.status().as_u16()));
            }

            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| AuctioneerError::Http(e.to_string()))?
                .to_bytes();
            Ok::<_, AuctioneerError>(serde_json::from_slice::<AuctionResult>(&body)?)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| AuctioneerError::Timeout)?
    }
}

impl AuctionCommunicator for HttpRemoteAuctions {
    /// Failures come back as an unplaced result for the same instance.
    fn communicate(&self, request: AuctionRequest) -> ClientFuture<'_, AuctionResult> {
        Box::pin(async move {
            match self.try_auction(&request).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        instance = %request.instance.instance_guid,
                        error = %e,
                        "remote auction failed"
                    );
                    AuctionResult::unresolved(request.instance)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_core::{AuctionRules, Instance, RepGuids};

    fn request() -> AuctionRequest {
        AuctionRequest::new(
            Instance::with_guid("app", "INS-remote", 1),
            RepGuids::from(&["a"][..]),
            AuctionRules::default(),
        )
    }

    #[tokio::test]
    async fn no_hosts_is_an_error() {
        let remote = HttpRemoteAuctions::new(Vec::new(), SharedRng::seeded(1));
        let err = remote.try_auction(&request()).await.unwrap_err();
        assert!(matches!(err, AuctioneerError::NoHosts));
    }

    #[tokio::test]
    async fn unreachable_host_yields_unplaced_result() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = HttpRemoteAuctions::new(vec![addr.to_string()], SharedRng::seeded(1))
            .with_timeout(Duration::from_secs(2));
        let result = remote.communicate(request()).await;

        assert!(!result.is_placed());
        assert_eq!(result.instance.instance_guid, "INS-remote");
    }
}
