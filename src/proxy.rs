//! RPC UDP relay.
//!
//! Forwards ONC/RPC datagrams between local boot clients and an upstream
//! server, so the appliance can front a real NFS server instead of its own
//! minimal one. Correlation is by XID alone: the relay records which
//! client sent each transaction id and routes the upstream reply back to
//! it. No reordering, no fragmentation, no retransmission.
//!
//! When the upstream port is unknown, it is resolved by asking the
//! upstream rpcbind for the program's UDP port first.

use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context as _};
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::protocol::xdr::{self, deserialize, portmap, Serialize};

/// Entries older than this are purged by the collector.
const ENTRY_TTL: Duration = Duration::from_secs(300);
/// How often the collector runs.
const GC_INTERVAL: Duration = Duration::from_secs(60);
/// Deadline on the upstream rpcbind query.
const RPCBIND_TIMEOUT: Duration = Duration::from_secs(2);

struct ClientEntry {
    addr: SocketAddr,
    last_seen: Instant,
}

/// XID-correlated UDP relay between local clients and one upstream service.
pub struct RpcUdpProxy {
    local: Arc<UdpSocket>,
    upstream: Arc<UdpSocket>,
    clients: Arc<Mutex<HashMap<u32, ClientEntry>>>,
}

impl RpcUdpProxy {
    /// Binds `local_addr` and starts relaying to `upstream_host`.
    ///
    /// A zero `upstream_port` is resolved through the upstream rpcbind for
    /// `(program, version)` over UDP. The forwarders and the entry
    /// collector run as background tasks for the life of the process.
    pub async fn start(
        local_addr: &str,
        upstream_host: &str,
        upstream_port: u16,
        program: u32,
        version: u32,
    ) -> anyhow::Result<Arc<Self>> {
        let upstream_port = if upstream_port == 0 {
            rpcbind_getport_udp(upstream_host, program, version)
                .await
                .context("rpcbind getport")?
        } else {
            upstream_port
        };
        if upstream_port == 0 {
            bail!("program {program} v{version} is not registered on {upstream_host}");
        }

        let local = Arc::new(
            UdpSocket::bind(local_addr)
                .await
                .with_context(|| format!("cannot bind proxy on {local_addr}"))?,
        );
        let upstream = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        upstream
            .connect((upstream_host, upstream_port))
            .await
            .with_context(|| format!("cannot dial {upstream_host}:{upstream_port}"))?;

        let proxy = Arc::new(Self {
            local,
            upstream,
            clients: Arc::new(Mutex::new(HashMap::new())),
        });
        info!(
            target: "rpc",
            "proxy {} -> {}:{} (program {} v{})",
            proxy.local.local_addr()?,
            upstream_host,
            upstream_port,
            program,
            version
        );

        tokio::spawn(pump_local_to_upstream(proxy.clone()));
        tokio::spawn(pump_upstream_to_local(proxy.clone()));
        tokio::spawn(collect_stale_entries(proxy.clients.clone()));
        Ok(proxy)
    }

    /// Port the relay listens on locally.
    pub fn local_port(&self) -> std::io::Result<u16> {
        Ok(self.local.local_addr()?.port())
    }
}

/// The leading four bytes of every RPC message are its transaction id.
pub fn extract_xid(pkt: &[u8]) -> Option<u32> {
    Some(u32::from_be_bytes(pkt.get(..4)?.try_into().ok()?))
}

async fn pump_local_to_upstream(proxy: Arc<RpcUdpProxy>) {
    let mut buf = vec![0_u8; 65535];
    loop {
        let (n, addr) = match proxy.local.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(err) => {
                error!(target: "rpc", "proxy local read error: {}", err);
                return;
            }
        };
        if let Some(xid) = extract_xid(&buf[..n]) {
            proxy
                .clients
                .lock()
                .expect("proxy client map lock poisoned")
                .insert(
                    xid,
                    ClientEntry {
                        addr,
                        last_seen: Instant::now(),
                    },
                );
        }
        if let Err(err) = proxy.upstream.send(&buf[..n]).await {
            error!(target: "rpc", "proxy write upstream error: {}", err);
        }
    }
}

async fn pump_upstream_to_local(proxy: Arc<RpcUdpProxy>) {
    let mut buf = vec![0_u8; 65535];
    loop {
        let n = match proxy.upstream.recv(&mut buf).await {
            Ok(v) => v,
            Err(err) => {
                error!(target: "rpc", "proxy upstream read error: {}", err);
                return;
            }
        };
        let Some(xid) = extract_xid(&buf[..n]) else {
            continue;
        };
        let addr = {
            let clients = proxy
                .clients
                .lock()
                .expect("proxy client map lock poisoned");
            clients.get(&xid).map(|entry| entry.addr)
        };
        let Some(addr) = addr else {
            debug!(target: "rpc", "proxy dropping reply for unknown xid {:#x}", xid);
            continue;
        };
        if let Err(err) = proxy.local.send_to(&buf[..n], addr).await {
            error!(target: "rpc", "proxy write back error: {}", err);
        }
    }
}

async fn collect_stale_entries(clients: Arc<Mutex<HashMap<u32, ClientEntry>>>) {
    let mut ticker = tokio::time::interval(GC_INTERVAL);
    loop {
        ticker.tick().await;
        let cutoff = Instant::now() - ENTRY_TTL;
        clients
            .lock()
            .expect("proxy client map lock poisoned")
            .retain(|_, entry| entry.last_seen >= cutoff);
    }
}

/// Serializes a portmap GETPORT call for `(program, version)` over UDP.
pub fn build_getport_call(xid: u32, program: u32, version: u32) -> std::io::Result<Vec<u8>> {
    let msg = xdr::rpc::rpc_msg {
        xid,
        body: xdr::rpc::rpc_body::CALL(xdr::rpc::call_body {
            rpcvers: xdr::rpc::RPC_VERSION,
            prog: portmap::PROGRAM,
            vers: portmap::VERSION,
            proc: portmap::PortmapProcedure::PMAPPROC_GETPORT as u32,
            cred: xdr::rpc::opaque_auth::default(),
            verf: xdr::rpc::opaque_auth::default(),
        }),
    };
    let args = portmap::mapping {
        prog: program,
        vers: version,
        prot: portmap::IPPROTO_UDP,
        port: 0,
    };
    let mut pkt = Vec::with_capacity(56);
    msg.serialize(&mut pkt)?;
    args.serialize(&mut pkt)?;
    Ok(pkt)
}

/// Asks rpcbind on `host` for the UDP port of `(program, version)`.
async fn rpcbind_getport_udp(host: &str, program: u32, version: u32) -> anyhow::Result<u16> {
    let xid = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
        .unwrap_or(0x6f77666e);
    let request = build_getport_call(xid, program, version)?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect((host, portmap::RPCBIND_PORT)).await?;
    socket.send(&request).await?;

    let mut buf = [0_u8; 1024];
    let n = tokio::time::timeout(RPCBIND_TIMEOUT, socket.recv(&mut buf))
        .await
        .context("rpcbind query timed out")??;

    let mut cursor = Cursor::new(&buf[..n]);
    let reply = deserialize::<xdr::rpc::rpc_msg>(&mut cursor)?;
    match reply.body {
        xdr::rpc::rpc_body::REPLY(xdr::rpc::reply_body::MSG_ACCEPTED(accepted)) => {
            if !matches!(accepted.reply_data, xdr::rpc::accept_body::SUCCESS) {
                bail!("rpcbind rejected the query: {:?}", accepted.reply_data);
            }
        }
        other => bail!("unexpected rpcbind reply: {:?}", other),
    }
    let port = deserialize::<u32>(&mut cursor)?;
    Ok(port as u16)
}
