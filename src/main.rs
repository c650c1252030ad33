//! Startup orchestrator for the boot appliance.
//!
//! Parses the CLI, brings up the enabled servers, and blocks until
//! SIGINT/SIGTERM. Any failure before the servers are up (bad interface,
//! missing file, bind error) terminates the process with a non-zero
//! status; once running, each server loop is on its own and a dead loop
//! never takes the others down.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tracing::{error, info};

use bootplane::allocator::Ipv4Allocator;
use bootplane::bootp::{BootpServer, DhcpResponder};
use bootplane::handle::HandleTable;
use bootplane::http::HttpServer;
use bootplane::iface;
use bootplane::protocol::rpc::{LookupPolicy, RpcService, ServicePorts};
use bootplane::proxy::RpcUdpProxy;
use bootplane::rarp::{PacketSocket, RarpServer};
use bootplane::tftp::{SingleFileHandler, TftpServer};
use bootplane::udp::{RpcUdp, SharedState, UdpRpcListener};
use bootplane::xdr::{mount, nfs2};

#[derive(Parser, Debug)]
#[command(name = "bootplane", version, about = "Network-boot appliance: RARP, BOOTP, TFTP, portmap, MOUNT and NFSv2")]
struct Cli {
    /// Interface to bind RARP and BOOTP on
    #[arg(long)]
    iface: Option<String>,

    /// Enable the built-in RARP responder
    #[arg(long)]
    rarp: bool,

    /// Enable the built-in BOOTP/DHCP responder
    #[arg(long)]
    bootp: bool,

    /// Root-path option 17 (optional)
    #[arg(long = "bootp-rootpath")]
    bootp_rootpath: Option<String>,

    /// Boot file name, option 67 and the `file` fixed field (optional)
    #[arg(long = "bootp-filename")]
    bootp_filename: Option<String>,

    /// Enable the built-in TFTP server
    #[arg(long)]
    tftp: bool,

    /// File served to every TFTP read request
    #[arg(long = "tftp-file")]
    tftp_file: Option<PathBuf>,

    /// Enable portmap, mountd and the minimal NFSv2 server
    #[arg(long)]
    nfs: bool,

    /// File served to every NFS LOOKUP/READ
    #[arg(long = "nfs-file")]
    nfs_file: Option<PathBuf>,

    /// Resolve LOOKUP names under the export root instead of always
    /// answering with the default file
    #[arg(long = "nfs-resolve-names")]
    nfs_resolve_names: bool,

    /// Relay MOUNT and NFS to this upstream host instead of serving
    /// locally (ports resolved through its rpcbind)
    #[arg(long = "nfs-upstream")]
    nfs_upstream: Option<String>,

    /// Enable the built-in HTTP server
    #[arg(long)]
    http: bool,

    /// File served for all HTTP requests
    #[arg(long = "http-file")]
    http_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .init();
    let cli = Cli::parse();

    if cli.tftp {
        start_tftp(&cli).await.context("start tftp failure")?;
    }
    if cli.http {
        start_http(&cli).await.context("start http failure")?;
    }

    // RARP and BOOTP share one allocator derived from the interface, and
    // the interface also supplies the server address BOOTP advertises.
    let mut shared_net: Option<(iface::IfaceInfo, Arc<Ipv4Allocator>, Ipv4Addr)> = None;
    if cli.rarp || cli.bootp {
        let name = cli
            .iface
            .as_deref()
            .context("--iface is required when RARP or BOOTP is enabled")?;
        let info = iface::lookup(name)
            .with_context(|| format!("interface {name} is unusable"))?;
        let allocator = Arc::new(
            Ipv4Allocator::from_cidr(&info.cidr())
                .with_context(|| format!("cannot build pool from {}", info.cidr()))?,
        );
        allocator.reserve_ip(info.addr);
        info!(
            "allocator pool {}-{} on {} (server {})",
            allocator.range_start(),
            allocator.range_end(),
            info.name,
            info.addr
        );
        shared_net = Some((info.clone(), allocator, info.addr));
    }

    if cli.nfs {
        start_nfs(&cli).await.context("start nfs failure")?;
    }

    if cli.bootp {
        let (info, allocator, server_ip) = shared_net.clone().expect("bootp requires interface");
        let responder = Arc::new(DhcpResponder::new(
            allocator.clone(),
            server_ip,
            cli.bootp_rootpath.clone(),
            cli.bootp_filename.clone(),
        ));
        let server =
            BootpServer::bind(&info.name, responder).context("start bootp failure")?;
        info!(
            target: "bootp",
            "BOOTP server enabled on {} with pool {}-{}",
            info.name,
            allocator.range_start(),
            allocator.range_end()
        );
        tokio::spawn(async move {
            if let Err(err) = server.handle_forever().await {
                error!(target: "bootp", "server loop ended: {}", err);
            }
        });
    }

    if cli.rarp {
        let (info, allocator, server_ip) = shared_net.clone().expect("rarp requires interface");
        let link = PacketSocket::open(info.index).context("start rarp failure")?;
        let mut server = RarpServer::new(Box::new(link), info.mac, server_ip, allocator);
        info!(target: "rarp", "RARP server enabled on {}", info.name);
        tokio::task::spawn_blocking(move || {
            if let Err(err) = server.handle_forever() {
                error!(target: "rarp", "server loop ended: {}", err);
            }
        });
    }

    wait_for_shutdown().await;
    Ok(())
}

async fn start_tftp(cli: &Cli) -> anyhow::Result<()> {
    let file = cli
        .tftp_file
        .clone()
        .context("tftp enabled but no --tftp-file provided")?;
    std::fs::metadata(&file).with_context(|| format!("tftp file {file:?} is unreadable"))?;
    let server = TftpServer::bind("0.0.0.0:69", Arc::new(SingleFileHandler::new(file))).await?;
    tokio::spawn(async move {
        if let Err(err) = server.handle_forever().await {
            error!(target: "tftp", "server loop ended: {}", err);
        }
    });
    Ok(())
}

async fn start_http(cli: &Cli) -> anyhow::Result<()> {
    let file = cli
        .http_file
        .clone()
        .context("http enabled but no --http-file provided")?;
    let server = HttpServer::bind("0.0.0.0:80", &file).await?;
    tokio::spawn(async move {
        if let Err(err) = server.handle_forever().await {
            error!(target: "http", "server loop ended: {}", err);
        }
    });
    Ok(())
}

/// Starts portmap plus either the local mountd/nfsd pair or relays to an
/// upstream server.
async fn start_nfs(cli: &Cli) -> anyhow::Result<()> {
    let ports = ServicePorts {
        mountd: 20048,
        nfs: 2049,
        nlockmgr: 0,
    };

    if let Some(upstream) = &cli.nfs_upstream {
        RpcUdpProxy::start("0.0.0.0:20048", upstream, 0, mount::PROGRAM, mount::VERSION)
            .await
            .context("start mount relay failure")?;
        RpcUdpProxy::start("0.0.0.0:2049", upstream, 0, nfs2::PROGRAM, nfs2::VERSION)
            .await
            .context("start nfs relay failure")?;
    }

    let export_file = if cli.nfs_upstream.is_none() {
        let file = cli
            .nfs_file
            .clone()
            .context("nfs enabled but no --nfs-file provided")?;
        std::fs::metadata(&file).with_context(|| format!("nfs file {file:?} is unreadable"))?;
        file
    } else {
        PathBuf::new()
    };

    let state = SharedState {
        handles: Arc::new(HandleTable::new()),
        ports,
        export_root: Arc::new(PathBuf::from("/")),
        export_file: Arc::new(export_file),
        lookup: if cli.nfs_resolve_names {
            LookupPolicy::ResolveUnderRoot
        } else {
            LookupPolicy::DefaultFile
        },
    };

    if cli.nfs_upstream.is_none() {
        let mountd =
            UdpRpcListener::bind("0.0.0.0:20048", RpcService::Mount, state.clone()).await?;
        let nfsd = UdpRpcListener::bind("0.0.0.0:2049", RpcService::Nfs, state.clone()).await?;
        spawn_rpc(mountd);
        spawn_rpc(nfsd);
    }
    let portmap =
        UdpRpcListener::bind("0.0.0.0:111", RpcService::Portmap, state.clone()).await?;
    spawn_rpc(portmap);

    info!(target: "rpc", "MOUNT/NFS/portmap enabled");
    Ok(())
}

fn spawn_rpc(listener: UdpRpcListener) {
    tokio::spawn(async move {
        if let Err(err) = listener.handle_forever().await {
            error!(target: "rpc", "server loop ended: {}", err);
        }
    });
}

/// Blocks until SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(sig) => sig,
        Err(err) => {
            error!("cannot install SIGTERM handler: {}", err);
            let _ = tokio::signal::ctrl_c().await;
            info!("received interrupt, exiting");
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, exiting"),
        _ = term.recv() => info!("received SIGTERM, exiting"),
    }
}
