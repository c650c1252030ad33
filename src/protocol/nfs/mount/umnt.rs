//! Implementation of the UMNT procedure (procedure 3) for the MOUNT version 1
//! protocol as defined in RFC 1094 Appendix A.

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::xdr::{self, mount, Serialize};

/// Handles the `MOUNTPROC_UMNT` procedure.
///
/// Nothing is tracked per mount, so unmounting is always a zero-status
/// acknowledgement.
pub fn mountproc_umnt(
    xid: u32,
    _: &mut impl Read,
    output: &mut impl Write,
) -> Result<(), anyhow::Error> {
    debug!(target: "rpc", "mountproc_umnt({:?})", xid);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    mount::mountstat::MNT_OK.serialize(output)?;
    Ok(())
}
