//! The module defines XDR data types and constants for Network File System (NFS)
//! version 2, as defined in RFC 1094.
//!
//! NFS version 2 is the stateless, UDP-era revision of the protocol that
//! legacy diskless workstations speak while booting. Everything on the wire
//! is 32 bits wide: offsets, sizes and timestamps all truncate to `u32`,
//! and the file handle is a fixed 32-byte opaque.

// Allow unused code since the constant tables cover the full RFC 1094 sets
#![allow(dead_code)]
// Keep original RFC naming conventions for consistency with the specification
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::{
    Deserialize, DeserializeEnum, DeserializeStruct, Serialize, SerializeEnum, SerializeStruct,
};

/// The RPC program number for NFS version 2 service.
pub const PROGRAM: u32 = 100003;
/// The version number for NFS version 2 protocol.
pub const VERSION: u32 = 2;

/// The size in bytes of the opaque file handle.
pub const FHSIZE: usize = 32;
/// The maximum number of bytes of data in a READ or WRITE request.
pub const MAXDATA: u32 = 8192;
/// The maximum number of bytes in a pathname argument.
pub const MAXPATHLEN: u32 = 1024;
/// The maximum number of bytes in a file name argument.
pub const MAXNAMLEN: u32 = 255;

/// File handle as carried by MOUNT v1 and NFSv2: exactly 32 opaque bytes.
pub type fhandle = [u8; FHSIZE];

/// Status codes returned by NFSv2 procedures (RFC 1094 section 2.3.1).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum nfsstat {
    /// The call completed successfully
    #[default]
    NFS_OK = 0,
    /// Not owner
    NFSERR_PERM = 1,
    /// No such file or directory
    NFSERR_NOENT = 2,
    /// Some sort of hard error occurred when the operation was in progress
    NFSERR_IO = 5,
    /// Permission denied
    NFSERR_ACCES = 13,
    /// Not a directory
    NFSERR_NOTDIR = 20,
    /// File name too long
    NFSERR_NAMETOOLONG = 63,
    /// The file handle given in the arguments was invalid
    NFSERR_STALE = 70,
}
impl SerializeEnum for nfsstat {}
impl DeserializeEnum for nfsstat {}

/// File types as reported in the `ftype` field of `fattr`
/// (RFC 1094 section 2.3.2).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum ftype {
    /// Non-file
    #[default]
    NFNON = 0,
    /// Regular file
    NFREG = 1,
    /// Directory
    NFDIR = 2,
    /// Block-special device
    NFBLK = 3,
    /// Character-special device
    NFCHR = 4,
    /// Symbolic link
    NFLNK = 5,
}
impl SerializeEnum for ftype {}
impl DeserializeEnum for ftype {}

/// Second/microsecond timestamp pair (RFC 1094 section 2.3.4).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct timeval {
    /// Seconds since the UNIX epoch
    pub seconds: u32,
    /// Microseconds within the second
    pub useconds: u32,
}
DeserializeStruct!(timeval, seconds, useconds);
SerializeStruct!(timeval, seconds, useconds);

/// File attributes (RFC 1094 section 2.3.5).
///
/// Encodes to exactly 68 bytes: fourteen 32-bit words followed by three
/// timestamp pairs, all big endian.
#[derive(Copy, Clone, Debug, Default)]
pub struct fattr {
    /// Type of the file
    pub ftype: ftype,
    /// Protection mode bits
    pub mode: u32,
    /// Number of hard links
    pub nlink: u32,
    /// User identification number of the owner
    pub uid: u32,
    /// Group identification number of the owner
    pub gid: u32,
    /// Size in bytes, truncated to 32 bits
    pub size: u32,
    /// Size in bytes of a block of the file
    pub blocksize: u32,
    /// Device number of the file if it is type NFCHR or NFBLK
    pub rdev: u32,
    /// Number of blocks the file takes up on disk
    pub blocks: u32,
    /// File system identifier for the filesystem containing the file
    pub fsid: u32,
    /// A number that uniquely identifies the file within its filesystem
    pub fileid: u32,
    /// Time when the file was last accessed
    pub atime: timeval,
    /// Time when the file was last modified
    pub mtime: timeval,
    /// Time when the status of the file was last changed
    pub ctime: timeval,
}
DeserializeStruct!(
    fattr, ftype, mode, nlink, uid, gid, size, blocksize, rdev, blocks, fsid, fileid, atime,
    mtime, ctime
);
SerializeStruct!(
    fattr, ftype, mode, nlink, uid, gid, size, blocksize, rdev, blocks, fsid, fileid, atime,
    mtime, ctime
);

/// Arguments of the LOOKUP procedure: directory handle plus name
/// (RFC 1094 section 2.3.7 diropargs).
#[derive(Clone, Debug, Default)]
pub struct diropargs {
    /// Handle of the directory to search in
    pub dir: fhandle,
    /// Name of the entry to look up
    pub name: Vec<u8>,
}
DeserializeStruct!(diropargs, dir, name);
SerializeStruct!(diropargs, dir, name);

/// Arguments of the READ procedure (RFC 1094 section 2.2.7).
#[derive(Clone, Debug, Default)]
pub struct readargs {
    /// Handle of the file to read from
    pub file: fhandle,
    /// Byte offset within the file to start reading at
    pub offset: u32,
    /// Number of bytes to read
    pub count: u32,
    /// Unused; retained on the wire for historical reasons
    pub totalcount: u32,
}
DeserializeStruct!(readargs, file, offset, count, totalcount);
SerializeStruct!(readargs, file, offset, count, totalcount);

/// Procedure numbers of the NFS version 2 program (RFC 1094 section 2.2).
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum NfsProcedure {
    /// Do nothing (ping the server)
    NFSPROC_NULL = 0,
    /// Get file attributes
    NFSPROC_GETATTR = 1,
    /// Set file attributes
    NFSPROC_SETATTR = 2,
    /// Obsolete root-handle procedure
    NFSPROC_ROOT = 3,
    /// Look up file name
    NFSPROC_LOOKUP = 4,
    /// Read from symbolic link
    NFSPROC_READLINK = 5,
    /// Read from file
    NFSPROC_READ = 6,
    /// Obsolete write-to-cache procedure
    NFSPROC_WRITECACHE = 7,
    /// Write to file
    NFSPROC_WRITE = 8,
    /// Create file
    NFSPROC_CREATE = 9,
    /// Remove file
    NFSPROC_REMOVE = 10,
    /// Rename file
    NFSPROC_RENAME = 11,
    /// Create link to file
    NFSPROC_LINK = 12,
    /// Create symbolic link
    NFSPROC_SYMLINK = 13,
    /// Create directory
    NFSPROC_MKDIR = 14,
    /// Remove directory
    NFSPROC_RMDIR = 15,
    /// Read from directory
    NFSPROC_READDIR = 16,
    /// Get filesystem attributes
    NFSPROC_STATFS = 17,
    /// Invalid procedure number
    INVALID,
}
impl SerializeEnum for NfsProcedure {}
impl DeserializeEnum for NfsProcedure {}
