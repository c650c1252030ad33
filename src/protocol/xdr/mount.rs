//! This module implements the `MOUNT` version 1 protocol (RFC 1094 Appendix A)
//! data structures for XDR serialization and deserialization.
//!
//! The `MOUNT` protocol converts a pathname into the opaque file handle that
//! seeds all subsequent NFSv2 operations. Version 1 handles are a fixed
//! 32-byte opaque, not the counted opaque of the version 3 protocol.

// Keep original RFC naming conventions for consistency with the specification
#![allow(non_camel_case_types)]

use num_derive::{FromPrimitive, ToPrimitive};

use super::{DeserializeEnum, SerializeEnum};

/// MOUNT program number for RPC
pub const PROGRAM: u32 = 100005;
/// MOUNT protocol version 1 (the version NFSv2 clients speak)
pub const VERSION: u32 = 1;

/// Maximum bytes in a path name
pub const MNTPATHLEN: u32 = 1024;
/// Bytes in a V1 file handle (fixed-length opaque)
pub const FHSIZE: usize = 32;

/// File handle as carried by MOUNT v1 and NFSv2: exactly 32 opaque bytes.
pub type fhandle = [u8; FHSIZE];

/// Status codes returned by `MOUNT` protocol operations.
///
/// These are the UNIX error numbers of RFC 1094; only the ones this server
/// can produce are listed.
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum mountstat {
    /// No error
    MNT_OK = 0,
    /// Not owner
    MNTERR_PERM = 1,
    /// No such file or directory
    MNTERR_NOENT = 2,
    /// Permission denied
    MNTERR_ACCES = 13,
}
impl SerializeEnum for mountstat {}
impl DeserializeEnum for mountstat {}

/// Procedure numbers for the `MOUNT` version 1 protocol
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum MountProcedure {
    /// Null procedure for service availability testing
    MOUNTPROC_NULL = 0,
    /// Mount a file system
    MOUNTPROC_MNT = 1,
    /// Get list of mounted file systems
    MOUNTPROC_DUMP = 2,
    /// Unmount a file system
    MOUNTPROC_UMNT = 3,
    /// Unmount all file systems
    MOUNTPROC_UMNTALL = 4,
    /// Get list of exported file systems
    MOUNTPROC_EXPORT = 5,
    /// Invalid procedure number
    INVALID,
}
impl SerializeEnum for MountProcedure {}
impl DeserializeEnum for MountProcedure {}
