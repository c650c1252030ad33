//! bootplane - a self-contained network-boot appliance in Rust
//!
//! This library lets a diskless client, typically a legacy workstation
//! emitting RARP and expecting BOOTP/TFTP/NFSv2, discover its IP address,
//! download a bootloader and mount a boot image, all from one host
//! interface.
//!
//! ## Servers
//!
//! - RARP responder (RFC 903) on a raw packet socket
//! - BOOTP/DHCP responder (RFC 951/2131) on UDP/67
//! - TFTP read-only server (RFC 1350) on UDP/69
//! - Portmap v2 (RFC 1057 Appendix A) on UDP/111
//! - MOUNT v1 and NFSv2 (RFC 1094) on UDP/20048 and UDP/2049
//! - Optional single-file HTTP fallback and an XID-correlated RPC UDP
//!   relay for fronting an upstream NFS server
//!
//! ## Shared state
//!
//! Two pieces of state tie the servers together and are injected into
//! each of them, never reached through globals:
//!
//! - `allocator`: the MAC to IPv4 table shared by RARP and BOOTP, so the
//!   same client gets the same address whichever protocol it speaks first.
//!
//! - `handle`: the file-handle table shared by MOUNT and NFS, mapping the
//!   32-byte opaque handles on the wire to canonical paths.
//!
//! ## Protocol layering
//!
//! The RPC-side protocols live under `protocol`: `protocol::xdr` holds the
//! wire codec (RFC 4506) and per-protocol types, `protocol::rpc` the call
//! framing and per-datagram context, and `protocol::nfs` the procedure
//! handlers, dispatched from the shared UDP transport in `udp`.
//!
//! ## Standards Compliance
//!
//! This implementation follows these RFCs:
//! - RFC 903: Reverse Address Resolution Protocol
//! - RFC 951 / RFC 2131: Bootstrap Protocol / DHCP
//! - RFC 1350: The TFTP Protocol (revision 2)
//! - RFC 1057: RPC: Remote Procedure Call Protocol Specification Version 2
//! - RFC 1094: NFS: Network File System Protocol Specification (v2 + MOUNT)
//! - RFC 4506: XDR: External Data Representation Standard

pub mod allocator;
pub mod bootp;
pub mod fs_util;
pub mod handle;
pub mod http;
pub mod iface;
pub mod protocol;
pub mod proxy;
pub mod rarp;
pub mod tftp;
pub mod udp;

pub use protocol::xdr;
