//! TCP stream server
//!
//! Accepts consumer connections and forwards every published chunk as
//! `[SyncHeader][chunk bytes]`, one synchronizer target per connection. A
//! failing connection tears down only itself: its target estimate is
//! discarded and its forward loop stops, other consumers keep streaming.

use bytes::{BufMut, BytesMut};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{NetworkError, Result};
use crate::network::stream::SyncedChunkStream;
use crate::sync::header::SYNC_HEADER_LEN;
use crate::sync::synchronizer::{TargetToken, TimeSynchronizer};

/// Fan-out server for one audio stream
pub struct StreamServer {
    local_addr: SocketAddr,
    synchronizer: Arc<TimeSynchronizer>,
    shutdown: CancellationToken,
    accept_task: JoinHandle<()>,
}

impl StreamServer {
    /// Bind and start accepting consumers of `chunks`
    pub async fn bind(addr: SocketAddr, chunks: SyncedChunkStream) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

        let synchronizer = Arc::new(TimeSynchronizer::new());
        let shutdown = CancellationToken::new();

        let accept_synchronizer = synchronizer.clone();
        let accept_shutdown = shutdown.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = accept_shutdown.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((socket, peer)) => {
                            let token = accept_synchronizer.add_target();
                            info!(%peer, "consumer connected");
                            tokio::spawn(forward_connection(
                                socket,
                                peer,
                                token,
                                accept_synchronizer.clone(),
                                chunks.subscribe(),
                                accept_shutdown.child_token(),
                            ));
                        }
                        Err(e) => {
                            warn!("accept failed: {e}");
                        }
                    },
                }
            }
        });

        info!(%local_addr, "stream server listening");
        Ok(Self {
            local_addr,
            synchronizer,
            shutdown,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections currently registered with the synchronizer
    pub fn active_targets(&self) -> usize {
        self.synchronizer.len()
    }

    /// Stop accepting and cancel every connection's forward loop
    pub async fn close(self) {
        self.shutdown.cancel();
        let _ = self.accept_task.await;
    }
}

/// Forward published chunks to one consumer until it fails or the server
/// shuts down
async fn forward_connection(
    mut socket: TcpStream,
    peer: SocketAddr,
    token: TargetToken,
    synchronizer: Arc<TimeSynchronizer>,
    mut chunks: broadcast::Receiver<crate::network::stream::SyncedChunk>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = chunks.recv() => match received {
                Ok(chunk) => {
                    let header = match synchronizer.sync_target(token, chunk.capture_time) {
                        Ok(header) => header,
                        Err(e) => {
                            warn!(%peer, "synchronization lost: {e}");
                            break;
                        }
                    };

                    // Header and payload go out in a single write
                    let mut frame = BytesMut::with_capacity(SYNC_HEADER_LEN + chunk.bytes.len());
                    frame.put_slice(&header.encode());
                    frame.put_slice(&chunk.bytes);

                    if let Err(e) = socket.write_all(&frame).await {
                        warn!(%peer, "write failed: {e}");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%peer, skipped, "consumer fell behind, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    synchronizer.remove_target(token);
    info!(%peer, "consumer disconnected");
}
