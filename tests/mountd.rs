use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use bootplane::handle::HandleTable;
use bootplane::protocol::nfs::mount::handle_mount;
use bootplane::protocol::rpc::{Context, LookupPolicy, ServicePorts};
use bootplane::xdr::rpc::call_body;
use bootplane::xdr::{self, deserialize, Serialize};

const RPC_MSG_SIZE: usize = 24;

fn test_context(export_root: &str) -> Context {
    Context {
        local_port: 20048,
        client_addr: "127.0.0.1:1234".to_string(),
        handles: Arc::new(HandleTable::new()),
        ports: ServicePorts::default(),
        export_root: Arc::new(PathBuf::from(export_root)),
        export_file: Arc::new(PathBuf::from("/dev/null")),
        lookup: LookupPolicy::DefaultFile,
    }
}

fn mount_call(proc: u32) -> call_body {
    call_body {
        rpcvers: 2,
        prog: xdr::mount::PROGRAM,
        vers: xdr::mount::VERSION,
        proc,
        cred: Default::default(),
        verf: Default::default(),
    }
}

fn send_mnt(context: &Context, xid: u32, dirpath: &str) -> Vec<u8> {
    let mut input = Cursor::new(Vec::new());
    dirpath
        .as_bytes()
        .serialize(&mut input)
        .expect("serialize dirpath");
    input.set_position(0);

    let mut output = Vec::new();
    handle_mount(xid, &mount_call(1), &mut input, &mut output, context).expect("handle_mount");
    output
}

#[test]
fn mnt_returns_path_digest_handle() {
    let context = test_context("/");
    let output = send_mnt(&context, 0xabcd, "/boot");

    // Accepted header, status word, then the fixed 32-byte handle.
    assert_eq!(output.len(), RPC_MSG_SIZE + 4 + 32);
    assert_eq!(&output[RPC_MSG_SIZE..RPC_MSG_SIZE + 4], &[0, 0, 0, 0]);
    let expected: [u8; 32] = Sha256::digest(b"/boot").into();
    assert_eq!(&output[RPC_MSG_SIZE + 4..], expected.as_slice());
}

#[test]
fn mnt_installs_the_reverse_mapping() {
    let context = test_context("/");
    let output = send_mnt(&context, 1, "/boot");
    let mut fh = [0_u8; 32];
    fh.copy_from_slice(&output[RPC_MSG_SIZE + 4..]);
    assert_eq!(context.handles.path_for_handle(&fh).as_deref(), Some("/boot"));
}

#[test]
fn mnt_normalizes_and_resolves_under_the_base() {
    let context = test_context("/");
    let canonical = send_mnt(&context, 1, "/boot");
    let dotted = send_mnt(&context, 2, "/boot/./");
    assert_eq!(&canonical[RPC_MSG_SIZE..], &dotted[RPC_MSG_SIZE..]);

    let based = test_context("/export");
    let output = send_mnt(&based, 3, "/boot");
    let expected: [u8; 32] = Sha256::digest(b"/export/boot").into();
    assert_eq!(&output[RPC_MSG_SIZE + 4..], expected.as_slice());
}

/// The export policy is permissive: a handle comes back whether or not
/// the path exists. Absence surfaces later, at NFS time.
#[test]
fn mnt_does_not_require_the_path_to_exist() {
    let context = test_context("/");
    let output = send_mnt(&context, 4, "/no/such/path/anywhere");
    assert_eq!(&output[RPC_MSG_SIZE..RPC_MSG_SIZE + 4], &[0, 0, 0, 0]);
}

#[test]
fn umnt_acknowledges_with_zero_status() {
    let context = test_context("/");
    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();
    handle_mount(9, &mount_call(3), &mut input, &mut output, &context).expect("handle_mount");
    assert_eq!(output.len(), RPC_MSG_SIZE + 4);
    assert_eq!(&output[RPC_MSG_SIZE..], &[0, 0, 0, 0]);
}

#[test]
fn wrong_program_version_or_procedure_is_denied() {
    let context = test_context("/");
    let bad = [
        call_body {
            prog: 100003,
            ..mount_call(0)
        },
        call_body {
            vers: 3, // v3 is not spoken here
            ..mount_call(0)
        },
        mount_call(2), // DUMP
        mount_call(5), // EXPORT
    ];
    for call in bad {
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();
        handle_mount(5, &call, &mut input, &mut output, &context).expect("handle_mount");
        assert_eq!(output.len(), 20);
        assert_eq!(&output[8..12], &[0, 0, 0, 1]); // MSG_DENIED
    }
}

#[test]
fn null_returns_bare_accepted_header() {
    let context = test_context("/");
    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();
    handle_mount(11, &mount_call(0), &mut input, &mut output, &context).expect("handle_mount");
    assert_eq!(output.len(), RPC_MSG_SIZE);
}

/// Self-check that the serialized reply also parses as XDR: status then
/// fixed opaque.
#[test]
fn mnt_reply_parses_as_xdr() {
    let context = test_context("/");
    let output = send_mnt(&context, 12, "/boot");
    let mut cursor = Cursor::new(&output[RPC_MSG_SIZE..]);
    let status = deserialize::<u32>(&mut cursor).expect("status");
    let fh = deserialize::<[u8; 32]>(&mut cursor).expect("fhandle");
    assert_eq!(status, 0);
    assert_eq!(fh.as_slice(), &output[RPC_MSG_SIZE + 4..]);
}
