//! TFTP server (RFC 1350), read-only.
//!
//! The transport is deliberately dumb: every read request is served the
//! same configured file regardless of the requested name, because legacy
//! boot PROMs ask for their image under names they invent themselves,
//! most commonly their own IPv4 address spelled as eight hex digits.
//! What to serve is decided by the pluggable [`ReadHandler`] seam; the
//! transport only moves 512-byte blocks and waits for ACKs.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, error, info};

const OP_RRQ: u16 = 1;
const OP_WRQ: u16 = 2;
const OP_DATA: u16 = 3;
const OP_ACK: u16 = 4;
const OP_ERROR: u16 = 5;

const ERR_FILE_NOT_FOUND: u16 = 1;
const ERR_ACCESS_VIOLATION: u16 = 2;

/// Payload bytes per DATA packet; a shorter block ends the transfer.
const BLOCK_SIZE: usize = 512;

/// How long a transfer waits for each client ACK before giving up.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Decides what content a read request receives.
#[async_trait]
pub trait ReadHandler: Send + Sync {
    /// Returns the full content to serve for `filename`.
    async fn read(&self, filename: &str) -> io::Result<Vec<u8>>;
}

/// Serves one configured file to every request.
pub struct SingleFileHandler {
    path: PathBuf,
}

impl SingleFileHandler {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ReadHandler for SingleFileHandler {
    async fn read(&self, filename: &str) -> io::Result<Vec<u8>> {
        let base = filename
            .trim()
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        if is_hex_ipv4_name(base) {
            info!(target: "tftp", "hex IPv4 form {:?} detected", base);
        }
        tokio::fs::read(&self.path).await
    }
}

/// True when `name` looks like an IPv4 address encoded as exactly eight
/// hex digits, the filename convention of old boot PROMs.
pub fn is_hex_ipv4_name(name: &str) -> bool {
    name.len() == 8 && name.bytes().all(|c| c.is_ascii_hexdigit())
}

/// UDP/69 listener spawning one task per transfer.
pub struct TftpServer {
    socket: UdpSocket,
    handler: Arc<dyn ReadHandler>,
}

impl TftpServer {
    pub async fn bind(addr: &str, handler: Arc<dyn ReadHandler>) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!(target: "tftp", "listening on {}", socket.local_addr()?);
        Ok(Self { socket, handler })
    }

    /// Accepts requests until the socket fails. Each transfer runs on its
    /// own task and its own ephemeral port, per RFC 1350.
    pub async fn handle_forever(&self) -> io::Result<()> {
        let mut buf = [0_u8; 1500];
        loop {
            let (n, peer) = self.socket.recv_from(&mut buf).await?;
            let pkt = &buf[..n];
            if pkt.len() < 2 {
                continue;
            }
            match u16::from_be_bytes([pkt[0], pkt[1]]) {
                OP_RRQ => {
                    let Some(filename) = parse_request_filename(&pkt[2..]) else {
                        continue;
                    };
                    debug!(target: "tftp", "RRQ {:?} from {}", filename, peer);
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        if let Err(err) = run_transfer(peer, &filename, handler).await {
                            error!(target: "tftp", "transfer {:?} to {} failed: {}", filename, peer, err);
                        }
                    });
                }
                OP_WRQ => {
                    debug!(target: "tftp", "rejecting WRQ from {}", peer);
                    let reply = error_packet(ERR_ACCESS_VIOLATION, "server is read-only");
                    let _ = self.socket.send_to(&reply, peer).await;
                }
                _ => {}
            }
        }
    }
}

/// Extracts the NUL-terminated filename of an RRQ/WRQ body.
fn parse_request_filename(body: &[u8]) -> Option<String> {
    let end = body.iter().position(|b| *b == 0)?;
    String::from_utf8(body[..end].to_vec()).ok()
}

/// Sends the file in 512-byte DATA blocks, waiting for each ACK.
///
/// An ACK that does not arrive within [`ACK_TIMEOUT`] aborts the transfer;
/// boot PROMs restart from scratch rather than resume.
async fn run_transfer(
    peer: SocketAddr,
    filename: &str,
    handler: Arc<dyn ReadHandler>,
) -> io::Result<()> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(peer).await?;

    let data = match handler.read(filename).await {
        Ok(data) => data,
        Err(err) => {
            socket
                .send(&error_packet(ERR_FILE_NOT_FOUND, "file not found"))
                .await?;
            return Err(err);
        }
    };

    let mut block: u16 = 1;
    let mut offset = 0_usize;
    loop {
        let chunk_end = (offset + BLOCK_SIZE).min(data.len());
        let mut pkt = Vec::with_capacity(4 + (chunk_end - offset));
        pkt.extend_from_slice(&OP_DATA.to_be_bytes());
        pkt.extend_from_slice(&block.to_be_bytes());
        pkt.extend_from_slice(&data[offset..chunk_end]);
        socket.send(&pkt).await?;

        await_ack(&socket, block).await?;

        let sent = chunk_end - offset;
        offset = chunk_end;
        // A short (or empty) final block terminates the transfer.
        if sent < BLOCK_SIZE {
            break;
        }
        block = block.wrapping_add(1);
    }
    debug!(target: "tftp", "served {} bytes to {}", data.len(), peer);
    Ok(())
}

async fn await_ack(socket: &UdpSocket, block: u16) -> io::Result<()> {
    let mut buf = [0_u8; 128];
    loop {
        let n = timeout(ACK_TIMEOUT, socket.recv(&mut buf))
            .await
            .map_err(|_| {
                io::Error::new(io::ErrorKind::TimedOut, format!("no ACK for block {block}"))
            })??;
        let pkt = &buf[..n];
        if pkt.len() >= 4
            && u16::from_be_bytes([pkt[0], pkt[1]]) == OP_ACK
            && u16::from_be_bytes([pkt[2], pkt[3]]) == block
        {
            return Ok(());
        }
        // Stale or duplicate packet; keep waiting within the deadline.
    }
}

fn error_packet(code: u16, message: &str) -> Vec<u8> {
    let mut pkt = Vec::with_capacity(4 + message.len() + 1);
    pkt.extend_from_slice(&OP_ERROR.to_be_bytes());
    pkt.extend_from_slice(&code.to_be_bytes());
    pkt.extend_from_slice(message.as_bytes());
    pkt.push(0);
    pkt
}
