//! HTTP fallback server.
//!
//! Some firmware can fetch its boot image over HTTP instead of TFTP, so
//! the appliance optionally answers every GET with one preloaded file.
//! The file is read once at startup (a missing file is a startup failure,
//! not a per-request one) and the protocol handling is the minimum an
//! HTTP/1.0 boot client needs: swallow the request head, send the bytes.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// Upper bound on how much request head is consumed before replying.
const MAX_REQUEST_HEAD: usize = 16 * 1024;

/// Single-file HTTP server.
pub struct HttpServer {
    listener: TcpListener,
    body: Arc<Vec<u8>>,
}

impl HttpServer {
    /// Preloads `file` and binds `addr` (typically `0.0.0.0:80`).
    pub async fn bind(addr: &str, file: &Path) -> anyhow::Result<Self> {
        let body = tokio::fs::read(file)
            .await
            .with_context(|| format!("cannot preload http file {file:?}"))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind http on {addr}"))?;
        info!(
            target: "http",
            "listening on {} serving {:?} ({} bytes)",
            listener.local_addr()?,
            file,
            body.len()
        );
        Ok(Self {
            listener,
            body: Arc::new(body),
        })
    }

    /// Accepts connections until the listener fails.
    pub async fn handle_forever(&self) -> io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(target: "http", "request from {}", peer);
            let body = self.body.clone();
            tokio::spawn(async move {
                if let Err(err) = serve_connection(stream, &body).await {
                    error!(target: "http", "serving {} failed: {}", peer, err);
                }
            });
        }
    }
}

/// Reads the request head, then writes the canned response. Body delivery
/// is best effort; a client that hangs up mid-transfer just ends the task.
async fn serve_connection(mut stream: TcpStream, body: &[u8]) -> io::Result<()> {
    let mut head = Vec::with_capacity(512);
    let mut buf = [0_u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 || head.len() + n > MAX_REQUEST_HEAD {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let header = format!(
        "HTTP/1.0 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.shutdown().await
}
