//! NFSv2 (Network File System version 2) protocol implementation as
//! specified in RFC 1094.
//!
//! Only the subset a diskless client exercises while booting is served:
//!
//! 1. NULL - Do nothing (ping the server)
//! 2. GETATTR - Get file attributes
//! 3. LOOKUP - Look up file name
//! 4. READ - Read from file
//!
//! Each procedure is implemented in its own module and registered with the
//! dispatcher function (`handle_nfs`), which validates the program and
//! version numbers and routes by procedure number. Every other procedure,
//! including the whole mutating half of the protocol, is denied; the
//! export is read-only by construction.

use std::io::{Read, Write};

use num_traits::cast::FromPrimitive;
use tracing::warn;

use crate::protocol::rpc::Context;
use crate::protocol::xdr::{self, nfs2, Serialize};

mod getattr;
mod lookup;
mod null;
mod read;

use getattr::nfsproc_getattr;
use lookup::nfsproc_lookup;
use null::nfsproc_null;
use read::nfsproc_read;

/// Main handler for NFS procedures of the version 2 protocol.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID from the client
/// * `call` - The RPC call body containing program, version, and procedure numbers
/// * `input` - Input stream for reading procedure arguments
/// * `output` - Output stream for writing procedure results
/// * `context` - Server context containing export paths and the handle table
///
/// # Returns
///
/// * `Result<(), anyhow::Error>` - Ok(()) on success or an error
pub fn handle_nfs(
    xid: u32,
    call: &xdr::rpc::call_body,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &Context,
) -> Result<(), anyhow::Error> {
    if call.prog != nfs2::PROGRAM || call.vers != nfs2::VERSION {
        warn!(
            target: "rpc",
            "nfsd call for prog={} vers={} (serving {}/{})",
            call.prog, call.vers, nfs2::PROGRAM, nfs2::VERSION
        );
        xdr::rpc::denied_auth_reply_message(xid).serialize(output)?;
        return Ok(());
    }
    let proc = nfs2::NfsProcedure::from_u32(call.proc).unwrap_or(nfs2::NfsProcedure::INVALID);

    match proc {
        nfs2::NfsProcedure::NFSPROC_NULL => nfsproc_null(xid, input, output)?,
        nfs2::NfsProcedure::NFSPROC_GETATTR => nfsproc_getattr(xid, input, output, context)?,
        nfs2::NfsProcedure::NFSPROC_LOOKUP => nfsproc_lookup(xid, input, output, context)?,
        nfs2::NfsProcedure::NFSPROC_READ => nfsproc_read(xid, input, output, context)?,
        other => {
            warn!(target: "rpc", "nfsd procedure not supported: {:?}", other);
            xdr::rpc::denied_auth_reply_message(xid).serialize(output)?;
        }
    }
    Ok(())
}
