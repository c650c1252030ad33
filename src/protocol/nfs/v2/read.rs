//! Implementation of the READ procedure (procedure 6) for the NFS version 2
//! protocol as defined in RFC 1094 section 2.2.7.
//!
//! The client supplies a file handle, a byte offset and a count; the reply
//! carries refreshed attributes and the data as a counted opaque. A read
//! past the end of the file is not an error, it returns however many bytes
//! remain, possibly zero.

use std::io::{Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::fs_util;
use crate::protocol::rpc::Context;
use crate::protocol::xdr::{self, deserialize, nfs2, Serialize};

/// Handles the `NFSv2` `READ` procedure (procedure 6).
///
/// The handle is resolved through the shared handle table; a handle this
/// process never issued is stale and answered with NFSERR_NOENT, as is a
/// path that no longer opens.
pub fn nfsproc_read(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &Context,
) -> Result<(), anyhow::Error> {
    let args = deserialize::<nfs2::readargs>(input)?;

    let Some(path) = context.handles.path_for_handle(&args.file) else {
        debug!(target: "rpc", "nfsproc_read({:?}) stale handle {:02x?}", xid, &args.file[..4]);
        return reply_noent(xid, output);
    };

    let mut file = match std::fs::File::open(&path) {
        Ok(file) => file,
        Err(err) => {
            debug!(target: "rpc", "nfsproc_read({:?}) open {:?}: {}", xid, path, err);
            return reply_noent(xid, output);
        }
    };

    // Count is capped at the protocol maximum transfer size.
    let count = args.count.min(nfs2::MAXDATA) as usize;
    let mut data = vec![0_u8; count];
    let filled = match file.seek(SeekFrom::Start(args.offset as u64)) {
        Ok(_) => read_until_eof(&mut file, &mut data),
        Err(_) => 0,
    };
    data.truncate(filled);
    debug!(
        target: "rpc",
        "nfsproc_read({:?}) {:?} off={} count={} -> {} bytes",
        xid, path, args.offset, args.count, filled
    );

    let attr = fs_util::fattr_for_path(std::path::Path::new(&path));

    xdr::rpc::make_success_reply(xid).serialize(output)?;
    nfs2::nfsstat::NFS_OK.serialize(output)?;
    attr.serialize(output)?;
    data.as_slice().serialize(output)?;
    Ok(())
}

/// Fills as much of `buf` as the file has left, tolerating short reads.
fn read_until_eof(file: &mut std::fs::File, buf: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    filled
}

fn reply_noent(xid: u32, output: &mut impl Write) -> Result<(), anyhow::Error> {
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    nfs2::nfsstat::NFSERR_NOENT.serialize(output)?;
    Ok(())
}
