//! Implementation of the NULL procedure (procedure 0) for the NFS version 2
//! protocol as defined in RFC 1094 section 2.2.1.

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::xdr::{self, Serialize};

/// Handles the NFSv2 NULL procedure: no arguments, empty successful reply.
pub fn nfsproc_null(
    xid: u32,
    _: &mut impl Read,
    output: &mut impl Write,
) -> Result<(), anyhow::Error> {
    debug!(target: "rpc", "nfsproc_null({:?})", xid);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    Ok(())
}
