//! Implementation of the `LOOKUP` procedure (procedure 4) for the NFS
//! version 2 protocol as defined in RFC 1094 section 2.2.5.
//!
//! The reply on success is `status · fhandle · fattr` (RFC 1094 diropres);
//! there is no attributes-follow discriminant in version 2.

use std::io::{Read, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::fs_util;
use crate::handle;
use crate::protocol::rpc::{Context, LookupPolicy};
use crate::protocol::xdr::{self, deserialize, nfs2, Serialize};

/// Handles the `NFSv2` `LOOKUP` procedure (procedure 4).
///
/// Resolves the requested name according to the configured policy, then
/// replies with the handle and attributes of the target, or NFSERR_NOENT
/// when the target does not stat.
pub fn nfsproc_lookup(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &Context,
) -> Result<(), anyhow::Error> {
    let args = deserialize::<nfs2::diropargs>(input)?;
    let name = String::from_utf8_lossy(&args.name).into_owned();
    debug!(target: "rpc", "nfsproc_lookup({:?}, {:?})", xid, name);

    let target = match context.lookup {
        LookupPolicy::DefaultFile => context.export_file.as_ref().clone(),
        LookupPolicy::ResolveUnderRoot => {
            let root = context.export_root.to_string_lossy();
            let resolved = handle::resolve_under(&root, &name);
            if !handle::within_root(&root, &resolved) {
                debug!(target: "rpc", "nfsproc_lookup {:?} escapes export root", name);
                return reply_noent(xid, output);
            }
            PathBuf::from(resolved)
        }
    };

    match std::fs::metadata(&target) {
        Ok(meta) => {
            let fh = context.handles.handle_for_path(&target.to_string_lossy());
            debug!(target: "rpc", "nfsproc_lookup ok: {:?}", target);
            xdr::rpc::make_success_reply(xid).serialize(output)?;
            nfs2::nfsstat::NFS_OK.serialize(output)?;
            fh.serialize(output)?;
            fs_util::fattr_for_metadata(&meta).serialize(output)?;
            Ok(())
        }
        Err(_) => {
            debug!(target: "rpc", "nfsproc_lookup noent: {:?}", target);
            reply_noent(xid, output)
        }
    }
}

fn reply_noent(xid: u32, output: &mut impl Write) -> Result<(), anyhow::Error> {
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    nfs2::nfsstat::NFSERR_NOENT.serialize(output)?;
    Ok(())
}
