//! Persistent file-handle table.
//!
//! NFS identifies objects by an opaque server-chosen handle, not by path.
//! This table gives the MOUNT and NFS services their shared object
//! identity: a handle is the SHA-256 digest of the lexically normalized
//! path, so the same path always produces the same 32 bytes, and the
//! reverse mapping is recorded the first time a path is seen. Entries live
//! for the process lifetime.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

/// Size in bytes of a file handle.
pub const HANDLE_SIZE: usize = 32;

/// An opaque file handle.
pub type Handle = [u8; HANDLE_SIZE];

/// Handle to canonical-path table shared by mountd and nfsd.
#[derive(Default)]
pub struct HandleTable {
    by_handle: Mutex<HashMap<Handle, String>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `path`, recording the reverse mapping.
    ///
    /// Idempotent: equivalent paths (after normalization) yield the same
    /// handle and the same table entry.
    pub fn handle_for_path(&self, path: &str) -> Handle {
        let norm = normalize_path(path);
        let fh = digest_path(&norm);
        self.by_handle
            .lock()
            .expect("handle table lock poisoned")
            .insert(fh, norm);
        fh
    }

    /// Looks a handle up by its full 32-byte value.
    ///
    /// `None` is the ordinary stale-handle signal: the handle was never
    /// installed by this process.
    pub fn path_for_handle(&self, fh: &Handle) -> Option<String> {
        self.by_handle
            .lock()
            .expect("handle table lock poisoned")
            .get(fh)
            .cloned()
    }
}

/// Digest of an already-normalized path.
pub fn digest_path(norm: &str) -> Handle {
    let mut fh = [0_u8; HANDLE_SIZE];
    fh.copy_from_slice(&Sha256::digest(norm.as_bytes()));
    fh
}

/// Lexically normalizes a path: collapses repeated separators and
/// resolves `.` and `..` components without touching the filesystem.
///
/// Purely textual on purpose; MOUNT hands out handles for paths that may
/// not exist yet, so nothing here may require the path to resolve.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for comp in path.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|c| *c != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            comp => parts.push(comp),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Resolves a client-supplied path against an export base directory,
/// normalizing the result.
pub fn resolve_under(base: &str, path: &str) -> String {
    normalize_path(&format!("{base}/{path}"))
}

/// True when `path` equals `root` or lies beneath it.
pub fn within_root(root: &str, path: &str) -> bool {
    let root = normalize_path(root);
    let path = normalize_path(path);
    if root == "/" {
        return path.starts_with('/');
    }
    path == root || path.starts_with(&format!("{root}/"))
}
