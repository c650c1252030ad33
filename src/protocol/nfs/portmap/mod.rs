//! `PORTMAP` protocol implementation as specified in RFC 1057 A.1 and A.2 sections.
//! <https://datatracker.ietf.org/doc/rfc1057/>.
//!
//! This portmap answers for exactly three fixed programs (NFS, MOUNT and
//! the lock manager) out of a static table, which is all a booting client
//! ever asks about. The registration procedures (SET, UNSET, DUMP, CALLIT)
//! are denied.

use std::io::{Read, Write};

use num_traits::cast::FromPrimitive;
use tracing::warn;

use crate::protocol::rpc::Context;
use crate::protocol::xdr::{self, portmap, Serialize};

mod get_port;
mod null;

use get_port::pmapproc_getport;
use null::pmapproc_null;

/// Main handler for the PORTMAP protocol.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID from the client
/// * `call` - The RPC call body containing program, version, and procedure numbers
/// * `input` - Input stream for reading procedure arguments
/// * `output` - Output stream for writing procedure results
/// * `context` - Server context containing the static port table
///
/// # Returns
///
/// * `Result<(), anyhow::Error>` - Ok(()) on success or an error
pub fn handle_portmap(
    xid: u32,
    call: &xdr::rpc::call_body,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &Context,
) -> Result<(), anyhow::Error> {
    if call.prog != portmap::PROGRAM || call.vers != portmap::VERSION {
        warn!(
            target: "rpc",
            "portmap call for prog={} vers={} (serving {}/{})",
            call.prog, call.vers, portmap::PROGRAM, portmap::VERSION
        );
        xdr::rpc::denied_auth_reply_message(xid).serialize(output)?;
        return Ok(());
    }
    let proc = portmap::PortmapProcedure::from_u32(call.proc)
        .unwrap_or(portmap::PortmapProcedure::INVALID);

    match proc {
        portmap::PortmapProcedure::PMAPPROC_NULL => pmapproc_null(xid, input, output)?,
        portmap::PortmapProcedure::PMAPPROC_GETPORT => {
            pmapproc_getport(xid, input, output, context)?
        }
        _ => {
            xdr::rpc::denied_auth_reply_message(xid).serialize(output)?;
        }
    }
    Ok(())
}
