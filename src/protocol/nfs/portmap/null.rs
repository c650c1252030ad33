//! Implementation of the NULL procedure (procedure 0) for PORTMAP protocol
//! as defined in RFC 1057 Appendix A.
//!
//! The NULL procedure does no work. It is available to allow server response
//! testing and timing. It has no arguments and returns nothing.

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::xdr::{self, Serialize};

/// Handles PORTMAP protocol NULL procedure (procedure 0)
///
/// NULL is a no-operation RPC call used to check if the portmapper is
/// responding. Takes no arguments and returns an empty reply with
/// successful status.
pub fn pmapproc_null(
    xid: u32,
    _: &mut impl Read,
    output: &mut impl Write,
) -> Result<(), anyhow::Error> {
    debug!(target: "rpc", "pmapproc_null({:?})", xid);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    Ok(())
}
