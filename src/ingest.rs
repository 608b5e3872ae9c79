use crate::config::IngestSettings;
use crate::detection::parse_batch;
use crate::store::LatestBatchStore;
use crate::telemetry::Metrics;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

/// Receive failures in a row after which the socket is considered dead.
/// A dead socket cannot self-heal, so the loop gives up instead of spinning.
const MAX_CONSECUTIVE_RECV_FAILURES: u32 = 8;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to bind udp socket on {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("udp socket unusable after {failures} consecutive receive failures: {source}")]
    SocketUnusable { failures: u32, source: io::Error },
}

/// Long-running UDP receive loop feeding the latest-batch store.
///
/// Datagrams from any source address are accepted; whoever can reach the
/// port overwrites the state seen by all viewers (single-producer LAN
/// deployment, stated trust boundary).
pub struct UdpIngestor {
    socket: UdpSocket,
    store: Arc<LatestBatchStore>,
    metrics: Arc<Metrics>,
    max_datagram_bytes: usize,
}

impl UdpIngestor {
    pub async fn bind(
        config: &IngestSettings,
        store: Arc<LatestBatchStore>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, IngestError> {
        let addr = config.get_address();
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|source| IngestError::Bind {
                addr: addr.clone(),
                source,
            })?;

        tracing::info!("UDP listener bound on {}", addr);

        Ok(Self {
            socket,
            store,
            metrics,
            max_datagram_bytes: config.max_datagram_bytes,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives datagrams until shutdown. A bad datagram never stops the
    /// loop; only a socket that keeps failing does.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<(), IngestError> {
        // Datagrams longer than the buffer are silently truncated by the
        // socket read and then fail to parse, like any other bad payload.
        let mut buf = vec![0u8; self.max_datagram_bytes];
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Ingestion loop stopping");
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, peer)) => {
                            consecutive_failures = 0;
                            self.handle_datagram(&buf[..len], peer);
                        }
                        Err(e) => {
                            consecutive_failures += 1;
                            tracing::warn!(
                                error = %e,
                                consecutive_failures,
                                "UDP receive failed"
                            );
                            if consecutive_failures >= MAX_CONSECUTIVE_RECV_FAILURES {
                                return Err(IngestError::SocketUnusable {
                                    failures: consecutive_failures,
                                    source: e,
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    fn handle_datagram(&self, payload: &[u8], peer: SocketAddr) {
        match parse_batch(payload) {
            Ok(batch) => {
                tracing::debug!(peer = %peer, detections = batch.len(), "accepted detection batch");
                self.metrics.record_accepted_datagram(payload.len());
                self.store.write(batch);
                self.metrics.record_store_write();
            }
            Err(e) => {
                self.metrics.record_rejected_datagram(payload.len());
                tracing::warn!(
                    peer = %peer,
                    error = %e,
                    bytes = payload.len(),
                    "dropping malformed datagram"
                );
            }
        }
    }
}
