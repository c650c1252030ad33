//! Implementation of the GETPORT procedure (procedure 3) for port mapper protocol
//! as defined in RFC 1057 A.2 section.
//! <https://datatracker.ietf.org/doc/rfc1057/>

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::Context;
use crate::protocol::xdr::{self, deserialize, nfs2, portmap::mapping, Serialize};

/// Program number of the network lock manager, which some clients probe
/// for even though this server never offers locking.
const NLOCKMGR_PROGRAM: u32 = 100021;

/// Handles the Portmap GETPORT procedure against the static port table.
///
/// # Behavior
/// 1. Deserializes the mapping request from the input stream
/// 2. Matches the requested program against the three served programs,
///    ignoring the requested version and transport
/// 3. Sends an RPC success reply carrying the port, 0 when the program
///    is not one of ours
pub fn pmapproc_getport(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &Context,
) -> Result<(), anyhow::Error> {
    let mapping = deserialize::<mapping>(input)?;
    let port = match mapping.prog {
        nfs2::PROGRAM => context.ports.nfs as u32,
        xdr::mount::PROGRAM => context.ports.mountd as u32,
        NLOCKMGR_PROGRAM => context.ports.nlockmgr as u32,
        _ => 0,
    };
    debug!(
        target: "rpc",
        "pmapproc_getport({:?}) prog={} vers={} prot={} -> {}",
        xid, mapping.prog, mapping.vers, mapping.prot, port
    );
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    port.serialize(output)?;
    Ok(())
}
