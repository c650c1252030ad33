//! Implementation of the NULL procedure (procedure 0) for the MOUNT version 1
//! protocol as defined in RFC 1094 Appendix A.

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::xdr::{self, Serialize};

/// Handles the MOUNT NULL procedure: no arguments, empty successful reply.
pub fn mountproc_null(
    xid: u32,
    _: &mut impl Read,
    output: &mut impl Write,
) -> Result<(), anyhow::Error> {
    debug!(target: "rpc", "mountproc_null({:?})", xid);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    Ok(())
}
