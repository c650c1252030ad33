//! The UDP module provides the shared transport for the RPC services.
//!
//! One listener fronts one service (portmap, mountd or nfsd). Datagrams
//! are processed strictly one at a time in arrival order, so replies from
//! a single service are never reordered; across services there is no
//! ordering at all. A datagram that fails to parse is dropped and the loop
//! continues; only a socket-level receive error ends the loop, and then
//! only for that service.

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::{io, net::IpAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::handle::HandleTable;
use crate::protocol::rpc::{self, LookupPolicy, ServicePorts};

/// Largest datagram any of the served protocols can need; NFSv2 READ
/// replies are bounded by MAXDATA plus headers.
const MAX_DATAGRAM: usize = 9000;

/// Interface for the UDP RPC servers.
///
/// This trait provides methods for:
/// - Getting information about the bound socket
/// - Starting the server to process client datagrams
#[async_trait]
pub trait RpcUdp: Send + Sync {
    /// Returns the actual port number on which the server is listening.
    ///
    /// This is especially useful when binding to port 0, which allows the
    /// OS to assign any available port.
    fn get_listen_port(&self) -> u16;

    /// Returns the IP address on which the server is listening.
    fn get_listen_ip(&self) -> IpAddr;

    /// Receives and answers datagrams until the socket fails.
    async fn handle_forever(&self) -> io::Result<()>;
}

/// Shared server state injected into every listener.
///
/// The handle table is the cross-service state; everything else is
/// read-only configuration.
#[derive(Clone)]
pub struct SharedState {
    /// Handle table shared between mountd and nfsd
    pub handles: Arc<HandleTable>,
    /// Static table served by portmap GETPORT
    pub ports: ServicePorts,
    /// Export base directory
    pub export_root: Arc<PathBuf>,
    /// Default file served by NFS LOOKUP and READ
    pub export_file: Arc<PathBuf>,
    /// LOOKUP name resolution policy
    pub lookup: LookupPolicy,
}

/// UDP listener that parses RPC calls and dispatches them to one service.
pub struct UdpRpcListener {
    socket: UdpSocket,
    port: u16,
    service: rpc::RpcService,
    state: SharedState,
}

impl UdpRpcListener {
    /// Binds a listener for `service` on `addr` (e.g. `0.0.0.0:111`).
    pub async fn bind(
        addr: &str,
        service: rpc::RpcService,
        state: SharedState,
    ) -> io::Result<UdpRpcListener> {
        let socket = UdpSocket::bind(addr).await?;
        let port = socket.local_addr()?.port();
        info!(target: "rpc", "{:?} listening on {}", service, socket.local_addr()?);
        Ok(UdpRpcListener {
            socket,
            port,
            service,
            state,
        })
    }

    fn context_for(&self, peer: SocketAddr) -> rpc::Context {
        rpc::Context {
            local_port: self.port,
            client_addr: peer.to_string(),
            handles: self.state.handles.clone(),
            ports: self.state.ports,
            export_root: self.state.export_root.clone(),
            export_file: self.state.export_file.clone(),
            lookup: self.state.lookup,
        }
    }
}

#[async_trait]
impl RpcUdp for UdpRpcListener {
    fn get_listen_port(&self) -> u16 {
        self.port
    }

    fn get_listen_ip(&self) -> IpAddr {
        self.socket
            .local_addr()
            .map(|a| a.ip())
            .unwrap_or(IpAddr::from([0, 0, 0, 0]))
    }

    async fn handle_forever(&self) -> io::Result<()> {
        let mut buf = [0_u8; MAX_DATAGRAM];
        loop {
            let (n, peer) = self.socket.recv_from(&mut buf).await?;
            let context = self.context_for(peer);

            let mut input = Cursor::new(&buf[..n]);
            let mut output = Vec::with_capacity(256);
            match rpc::handle_rpc(self.service, &mut input, &mut output, &context) {
                Ok(()) => {
                    if !output.is_empty() {
                        if let Err(err) = self.socket.send_to(&output, peer).await {
                            error!(target: "rpc", "{:?} send to {} failed: {}", self.service, peer, err);
                        }
                    }
                }
                Err(err) => {
                    debug!(target: "rpc", "{:?} dropping datagram from {}: {}", self.service, peer, err);
                }
            }
        }
    }
}
