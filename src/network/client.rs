//! TCP stream consumer
//!
//! Connects to a stream server, reads arbitrarily chunked bytes, runs the
//! streaming decoder over them, and emits reassembled packets on a channel.

use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::decoder::{AdtsDecoder, DecoderStats};
use crate::codec::packet::EncodedPacket;
use crate::config::CodecConfig;
use crate::constants::READ_CHUNK_SIZE;
use crate::error::{NetworkError, Result};

/// Channel capacity between the read loop and the consumer
const PACKET_CHANNEL_CAPACITY: usize = 64;

/// Consumer side of one audio stream connection
pub struct StreamClient {
    packets: mpsc::Receiver<EncodedPacket>,
    shutdown: CancellationToken,
    read_task: JoinHandle<std::result::Result<DecoderStats, NetworkError>>,
}

impl StreamClient {
    /// Connect and start the read loop
    pub async fn connect(addr: SocketAddr, config: CodecConfig) -> Result<Self> {
        let socket = TcpStream::connect(addr)
            .await
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        let (tx, rx) = mpsc::channel(PACKET_CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();

        let read_shutdown = shutdown.clone();
        let read_task = tokio::spawn(read_loop(socket, config, tx, read_shutdown));

        Ok(Self {
            packets: rx,
            shutdown,
            read_task,
        })
    }

    /// Next reassembled packet; `None` once the connection has ended
    pub async fn next_packet(&mut self) -> Option<EncodedPacket> {
        self.packets.recv().await
    }

    /// Stop reading and return the decoder's diagnostics
    pub async fn close(self) -> Result<DecoderStats> {
        self.shutdown.cancel();
        match self.read_task.await {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(NetworkError::Closed.into()),
        }
    }
}

async fn read_loop(
    mut socket: TcpStream,
    config: CodecConfig,
    packets: mpsc::Sender<EncodedPacket>,
    shutdown: CancellationToken,
) -> std::result::Result<DecoderStats, NetworkError> {
    let mut decoder = AdtsDecoder::new(config);
    let mut buf = vec![0u8; READ_CHUNK_SIZE];

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            read = socket.read(&mut buf) => match read {
                Ok(0) => {
                    debug!("stream ended");
                    break;
                }
                Ok(n) => {
                    if let Some(packet) = decoder.decode(&buf[..n]) {
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            sent = packets.send(packet) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("read failed: {e}");
                    return Err(NetworkError::ReceiveFailed(e.to_string()));
                }
            },
        }
    }

    Ok(decoder.stats())
}
