//! NFS protocol implementation module.
//!
//! This module provides the three RPC services a booting NFS client walks
//! through, in the order it walks through them:
//!
//! - `portmap`: The PORTMAP protocol (RFC 1057 Appendix A), which tells
//!   the client where the MOUNT and NFS services listen. Served from a
//!   static table.
//!
//! - `mount`: The MOUNT version 1 protocol (RFC 1094 Appendix A), which
//!   converts the export path into the opaque file handle that seeds all
//!   NFS operations.
//!
//! - `v2`: The NFS version 2 protocol (RFC 1094), restricted to the
//!   read-only procedures a boot loader uses: NULL, GETATTR, LOOKUP and
//!   READ.
//!
//! All three are UDP services dispatched through `protocol::rpc` and share
//! state through the call context: the handle table links mount to v2, and
//! the static port table links portmap to both.

pub mod mount;
pub mod portmap;
pub mod v2;
