//! RPC (Remote Procedure Call) protocol implementation as specified in RFC 1057.
//!
//! The RPC layer carries the portmap, MOUNT and NFS services of the boot
//! appliance. This module implements RPC version 2 over UDP:
//!
//! 1. CALL header parsing (with credential and verifier skipping)
//! 2. Accepted and denied reply construction
//! 3. Program/procedure number dispatching per service socket
//! 4. Per-datagram call context carrying the shared server state
//!
//! The deliberate omissions match the transport: no TCP record marking,
//! no retransmission tracking (boot clients simply retry), and no
//! authentication beyond skipping the fields on the wire.

mod context;
mod wire;

pub use context::{Context, LookupPolicy, ServicePorts};
pub use wire::{handle_rpc, RpcService};
