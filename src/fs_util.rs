//! File System Utilities module provides helper functions for working with the local
//! file system in an NFS-compatible way.
//!
//! The single job here is turning a local path into the fixed 68-byte NFSv2
//! attribute record. The values are deliberately boring: a single-client
//! boot workload never looks at ownership or link counts, so everything
//! that is not the type, mode and size collapses to constants.

use std::fs::Metadata;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::protocol::xdr::nfs2::{fattr, ftype, timeval};

/// Mode bits reported for directories (octal `040755`).
const DIR_MODE: u32 = 0o40755;
/// Mode bits reported for regular files (octal `0100644`).
const FILE_MODE: u32 = 0o100644;
/// Block size advertised to clients.
const BLOCK_SIZE: u32 = 4096;

/// Builds the NFSv2 attribute record for `path`.
///
/// A stat failure degrades to the attributes of an empty directory rather
/// than an error; absence surfaces to clients through LOOKUP and READ
/// status codes, never through GETATTR.
pub fn fattr_for_path(path: &Path) -> fattr {
    match std::fs::metadata(path) {
        Ok(meta) => fattr_for_metadata(&meta),
        Err(_) => fattr_template(ftype::NFDIR, DIR_MODE, 0),
    }
}

/// Builds the NFSv2 attribute record from already-fetched metadata.
pub fn fattr_for_metadata(meta: &Metadata) -> fattr {
    if meta.is_dir() {
        fattr_template(ftype::NFDIR, DIR_MODE, 0)
    } else {
        fattr_template(ftype::NFREG, FILE_MODE, clamp_size(meta.len()))
    }
}

/// Truncates a 64-bit length to the 32-bit size field of NFSv2.
pub fn clamp_size(len: u64) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn fattr_template(ftype: ftype, mode: u32, size: u32) -> fattr {
    let now = now_timeval();
    fattr {
        ftype,
        mode,
        nlink: 1,
        uid: 0,
        gid: 0,
        size,
        blocksize: BLOCK_SIZE,
        rdev: 0,
        blocks: 0,
        fsid: 1,
        fileid: 1,
        atime: now,
        mtime: now,
        ctime: now,
    }
}

fn now_timeval() -> timeval {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);
    timeval {
        seconds,
        useconds: 0,
    }
}
