//! Implementation of the MNT procedure (procedure 1) for the `MOUNT` version 1
//! protocol as defined in RFC 1094 Appendix A.

use std::io::{Read, Write};

use tracing::debug;

use crate::handle;
use crate::protocol::rpc::Context;
use crate::protocol::xdr::{self, deserialize, mount, Serialize};

/// Handles the `MOUNTPROC_MNT` procedure.
///
/// Reads the directory path, resolves it against the export base, installs
/// a handle for the result and returns it as a fixed 32-byte opaque after
/// a zero status. The path is not required to exist.
pub fn mountproc_mnt(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &Context,
) -> Result<(), anyhow::Error> {
    let path = deserialize::<Vec<u8>>(input)?;
    let utf8path = std::str::from_utf8(&path).unwrap_or_default();
    let base = context.export_root.to_string_lossy();
    let full = handle::resolve_under(&base, utf8path);
    debug!(target: "rpc", "mountproc_mnt({:?}, {:?}) -> {:?}", xid, utf8path, full);

    let fh = context.handles.handle_for_path(&full);
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    mount::mountstat::MNT_OK.serialize(output)?;
    fh.serialize(output)?;
    Ok(())
}
