//! TCP server speaking the MPD line protocol.
//!
//! Each connection gets its own task. All connections share one
//! [`AlbumArtService`], and therefore one chunk cache.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cover::ChunkCache;

use super::{Ack, AlbumArtService, Command, ProtocolError};

/// Longest request line accepted, newline included.
pub const MAX_LINE_LEN: usize = 8192;

/// Whether to keep a connection open after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// A bound MPD server.
pub struct Server {
    listener: TcpListener,
    service: Arc<AlbumArtService>,
    greeting: Arc<str>,
}

impl Server {
    /// Bind to `addr`. Port 0 picks a free port.
    pub async fn bind(
        addr: &str,
        service: Arc<AlbumArtService>,
        protocol_version: &str,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            service,
            greeting: format!("OK MPD {}\n", protocol_version).into(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` completes.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> std::io::Result<()> {
        info!("Listening on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("Accept failed: {}", e);
                            continue;
                        }
                    };
                    debug!("Client connected: {}", peer);

                    let service = self.service.clone();
                    let greeting = self.greeting.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &service, &greeting).await {
                            debug!("Connection {} ended with error: {}", peer, e);
                        }
                        debug!("Client disconnected: {}", peer);
                    });
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    service: &AlbumArtService,
    greeting: &str,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    writer.write_all(greeting.as_bytes()).await?;

    let mut line = Vec::new();
    loop {
        line.clear();
        let limit = MAX_LINE_LEN as u64;
        if (&mut reader).take(limit).read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        if line.last() != Some(&b'\n') && line.len() >= MAX_LINE_LEN {
            let ack = Ack {
                command: String::new(),
                error: ProtocolError::LineTooLong,
            };
            warn!("Dropping client after {}-byte line without newline", line.len());
            writer.write_all(format!("{}\n", ack).as_bytes()).await?;
            return Ok(());
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\r', '\n']);

        let mut out = Vec::new();
        let flow = dispatch(text, service, &mut out).await;
        writer.write_all(&out).await?;
        if flow == Flow::Close {
            return Ok(());
        }
    }
}

/// Execute one request line, appending the full reply to `out`.
pub async fn dispatch(line: &str, service: &AlbumArtService, out: &mut Vec<u8>) -> Flow {
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(ack) => {
            debug!("Rejected {:?}: {}", line, ack);
            out.extend_from_slice(format!("{}\n", ack).as_bytes());
            return Flow::Continue;
        }
    };

    match command {
        Command::AlbumArt { uri, offset } => {
            service.albumart(&uri, offset).await.write_to(out);
        }
        Command::Ping => {}
        Command::Close => return Flow::Close,
    }
    out.extend_from_slice(b"OK\n");
    Flow::Continue
}

/// Periodically drop art transfers that clients abandoned.
pub fn spawn_idle_sweep(
    cache: Arc<ChunkCache>,
    max_idle: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = cache.sweep_idle(max_idle);
            if removed > 0 {
                info!(
                    "Dropped {} abandoned art transfer(s), {} bytes still cached",
                    removed,
                    cache.size_bytes()
                );
            }
        }
    })
}
