//! Protocol module implements the RPC-side protocol suite of the boot
//! appliance: portmap, MOUNT version 1 and NFS version 2.
//!
//! This module contains three main components:
//!
//! - `xdr`: External Data Representation (XDR) for serialization and
//!   deserialization of data structures according to RFC 4506, plus the
//!   per-protocol wire types.
//!
//! - `nfs`: The procedure handlers for the NFSv2 protocol (RFC 1094), the
//!   MOUNT v1 protocol, and the PORTMAP protocol.
//!
//! - `rpc`: Remote Procedure Call (RPC) message handling for parsing
//!   client calls, constructing replies, and carrying per-datagram context
//!   as defined in RFC 1057.
//!
//! The non-RPC protocols of the appliance (RARP, BOOTP, TFTP, HTTP) live
//! at the crate root next to their transports; their wire formats share
//! nothing with XDR.

pub mod nfs;
pub mod rpc;
pub mod xdr;
