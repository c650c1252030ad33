//! MOUNT protocol version 1 implementation as specified in RFC 1094 Appendix A.
//! <https://datatracker.ietf.org/doc/html/rfc1094>
//!
//! The export policy is permissive by design: MNT hands out a handle for
//! any path under the export base without requiring it to exist. A path
//! that turns out not to exist fails later, at NFS LOOKUP or READ time,
//! which is where booting firmware actually notices.

use std::io::{Read, Write};

use num_traits::cast::FromPrimitive;
use tracing::warn;

use crate::protocol::rpc::Context;
use crate::protocol::xdr::{self, mount, Serialize};

mod mnt;
mod null;
mod umnt;

use mnt::mountproc_mnt;
use null::mountproc_null;
use umnt::mountproc_umnt;

/// Main handler for MOUNT procedures of the version 1 protocol.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID from the client
/// * `call` - The RPC call body containing program, version, and procedure numbers
/// * `input` - Input stream for reading procedure arguments
/// * `output` - Output stream for writing procedure results
/// * `context` - Server context containing the export base and handle table
///
/// # Returns
///
/// * `Result<(), anyhow::Error>` - Ok(()) on success or an error
pub fn handle_mount(
    xid: u32,
    call: &xdr::rpc::call_body,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &Context,
) -> Result<(), anyhow::Error> {
    if call.prog != mount::PROGRAM || call.vers != mount::VERSION {
        warn!(
            target: "rpc",
            "mountd call for prog={} vers={} (serving {}/{})",
            call.prog, call.vers, mount::PROGRAM, mount::VERSION
        );
        xdr::rpc::denied_auth_reply_message(xid).serialize(output)?;
        return Ok(());
    }
    let proc = mount::MountProcedure::from_u32(call.proc).unwrap_or(mount::MountProcedure::INVALID);

    match proc {
        mount::MountProcedure::MOUNTPROC_NULL => mountproc_null(xid, input, output)?,
        mount::MountProcedure::MOUNTPROC_MNT => mountproc_mnt(xid, input, output, context)?,
        mount::MountProcedure::MOUNTPROC_UMNT => mountproc_umnt(xid, input, output)?,
        _ => {
            xdr::rpc::denied_auth_reply_message(xid).serialize(output)?;
        }
    }
    Ok(())
}
