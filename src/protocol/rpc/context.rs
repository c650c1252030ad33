//! RPC context implementation for maintaining server and client state.
//!
//! The Context structure encapsulates the state a procedure handler needs
//! beyond its wire arguments: the shared file-handle table, the static
//! service port table, the export paths, and the name-resolution policy.
//! One Context is materialized per datagram with the sender's address
//! filled in; everything else is cloned from the listener's template.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::handle::HandleTable;

/// Ports answered by the GETPORT procedure.
///
/// The table is static for the process lifetime; a port of zero means the
/// service is not offered (clients treat 0 as "not registered").
#[derive(Copy, Clone, Debug, Default)]
pub struct ServicePorts {
    /// UDP port of the MOUNT v1 service (program 100005)
    pub mountd: u16,
    /// UDP port of the NFSv2 service (program 100003)
    pub nfs: u16,
    /// UDP port of the lock manager (program 100021), usually 0
    pub nlockmgr: u16,
}

/// How NFSv2 LOOKUP turns a name into a target path.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LookupPolicy {
    /// Every name resolves to the configured default file. This is what
    /// the boot workflow uses: the client asks for its kernel by whatever
    /// name its firmware invents, and gets the one image we serve.
    #[default]
    DefaultFile,
    /// Resolve the name under the export root and refuse escapes.
    ResolveUnderRoot,
}

/// Represents the execution context for RPC operations.
///
/// Passed to all protocol handlers (NFS, MOUNT, PORTMAP), providing the
/// shared state they operate on. Cheap to clone; the heavyweight members
/// are behind `Arc`.
#[derive(Clone)]
pub struct Context {
    /// Port number on which the receiving server is listening
    pub local_port: u16,

    /// Client's network address (IP:port) used for logging
    pub client_addr: String,

    /// Shared handle table giving MOUNT and NFS their object identity
    pub handles: Arc<HandleTable>,

    /// Static program-to-port table served by GETPORT
    pub ports: ServicePorts,

    /// Directory MOUNT paths are resolved against; also the object
    /// GETATTR describes
    pub export_root: Arc<PathBuf>,

    /// The default file LOOKUP and READ serve
    pub export_file: Arc<PathBuf>,

    /// Name resolution policy for LOOKUP
    pub lookup: LookupPolicy,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("rpc::Context")
            .field("local_port", &self.local_port)
            .field("client_addr", &self.client_addr)
            .field("export_root", &self.export_root)
            .field("export_file", &self.export_file)
            .field("lookup", &self.lookup)
            .finish()
    }
}
