//! Implementation of the `GETATTR` procedure (procedure 1) for the NFS
//! version 2 protocol as defined in RFC 1094 section 2.2.2.

use std::io::{Read, Write};

use tracing::debug;

use crate::fs_util;
use crate::protocol::rpc::Context;
use crate::protocol::xdr::{self, deserialize, nfs2, Serialize};

/// Handles the `NFSv2` `GETATTR` procedure (procedure 1).
///
/// The handle argument is consumed but not resolved: whatever object the
/// client asks about, the answer describes the export root directory.
/// Boot clients call this once against the mount handle to sanity-check
/// the mount, and the root is the only directory this server exports.
pub fn nfsproc_getattr(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &Context,
) -> Result<(), anyhow::Error> {
    let handle = deserialize::<nfs2::fhandle>(input)?;
    debug!(target: "rpc", "nfsproc_getattr({:?}, {:02x?})", xid, &handle[..4]);

    xdr::rpc::make_success_reply(xid).serialize(output)?;
    nfs2::nfsstat::NFS_OK.serialize(output)?;
    fs_util::fattr_for_path(&context.export_root).serialize(output)?;
    Ok(())
}
