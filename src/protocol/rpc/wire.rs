//! RPC datagram processing as specified in RFC 1057.
//!
//! Every RPC service in this crate is UDP-only and handles exactly one
//! message per datagram, so there is no record marking, no fragment
//! reassembly and no retransmission cache: the wire layer parses the CALL
//! header and routes to the procedure handlers of whichever service owns
//! the receiving socket.
//!
//! A datagram that does not frame as an RPC v2 CALL produces no reply at
//! all; denied-auth replies are reserved for well-formed calls that name
//! the wrong program, version or procedure.

use std::io::{Read, Write};

use crate::protocol::nfs;
use crate::protocol::rpc::Context;
use crate::protocol::xdr;

/// Which RPC program a listener fronts.
///
/// Each service owns its own socket, so a MOUNT call arriving on the
/// portmap port is a program mismatch, not a routing opportunity.
#[derive(Copy, Clone, Debug)]
pub enum RpcService {
    /// Portmap v2 on UDP/111
    Portmap,
    /// MOUNT v1 on UDP/20048
    Mount,
    /// NFSv2 on UDP/2049
    Nfs,
}

/// Processes a single RPC datagram for `service`.
///
/// Parses the CALL header, leaving `input` at the procedure arguments, and
/// hands off to the service's dispatcher, which writes the complete reply
/// to `output`. Errors mean the datagram was malformed somewhere along the
/// way; the caller drops it and the receive loop continues.
pub fn handle_rpc(
    service: RpcService,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &Context,
) -> Result<(), anyhow::Error> {
    let (xid, call) = xdr::rpc::parse_call(input)?;
    match service {
        RpcService::Portmap => nfs::portmap::handle_portmap(xid, &call, input, output, context)?,
        RpcService::Mount => nfs::mount::handle_mount(xid, &call, input, output, context)?,
        RpcService::Nfs => nfs::v2::handle_nfs(xid, &call, input, output, context)?,
    }
    Ok(())
}
