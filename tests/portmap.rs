use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use bootplane::handle::HandleTable;
use bootplane::protocol::nfs::portmap::handle_portmap;
use bootplane::protocol::rpc::{Context, LookupPolicy, ServicePorts};
use bootplane::xdr::portmap::{mapping, IPPROTO_UDP};
use bootplane::xdr::rpc::call_body;
use bootplane::xdr::{self, deserialize, Serialize};

const RPC_MSG_SIZE: u64 = 24;

fn test_context(ports: ServicePorts) -> Context {
    Context {
        local_port: 111,
        client_addr: "127.0.0.1:1234".to_string(),
        handles: Arc::new(HandleTable::new()),
        ports,
        export_root: Arc::new(PathBuf::from("/")),
        export_file: Arc::new(PathBuf::from("/dev/null")),
        lookup: LookupPolicy::DefaultFile,
    }
}

fn getport_call(proc: u32) -> call_body {
    call_body {
        rpcvers: 2,
        prog: xdr::portmap::PROGRAM,
        vers: xdr::portmap::VERSION,
        proc,
        cred: Default::default(),
        verf: Default::default(),
    }
}

fn send_get_port(context: &Context, xid: u32, args: mapping) -> Vec<u8> {
    let mut input = Cursor::new(Vec::new());
    args.serialize(&mut input).expect("serialize args");
    input.set_position(0);

    let mut output = Vec::new();
    handle_portmap(xid, &getport_call(3), &mut input, &mut output, context)
        .expect("handle_portmap");
    output
}

#[test]
fn getport_returns_configured_nfs_port() {
    let context = test_context(ServicePorts {
        mountd: 20048,
        nfs: 2049,
        nlockmgr: 0,
    });
    let args = mapping {
        prog: 100003,
        vers: 2,
        prot: IPPROTO_UDP,
        port: 0,
    };
    let output = send_get_port(&context, 0x12345678, args);

    assert_eq!(&output[..4], &[0x12, 0x34, 0x56, 0x78]);
    // Accepted header then the port; 2049 = 0x0801.
    assert_eq!(output.len() as u64, RPC_MSG_SIZE + 4);
    assert_eq!(&output[output.len() - 4..], &[0x00, 0x00, 0x08, 0x01]);
}

#[test]
fn getport_covers_the_static_table() {
    let context = test_context(ServicePorts {
        mountd: 20048,
        nfs: 2049,
        nlockmgr: 4045,
    });
    let cases = [
        (100003_u32, 2049_u32),
        (100005, 20048),
        (100021, 4045),
        // The portmapper itself is not in the table.
        (100000, 0),
        (300019, 0),
    ];
    for (prog, want) in cases {
        let args = mapping {
            prog,
            vers: 2,
            prot: IPPROTO_UDP,
            port: 0,
        };
        let mut output = Cursor::new(send_get_port(&context, 7, args));
        output.set_position(RPC_MSG_SIZE);
        let port = deserialize::<u32>(&mut output).expect("port word");
        assert_eq!(port, want, "program {prog}");
    }
}

#[test]
fn null_returns_bare_accepted_header() {
    let context = test_context(ServicePorts::default());
    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();
    handle_portmap(42, &getport_call(0), &mut input, &mut output, &context)
        .expect("handle_portmap");
    assert_eq!(output.len() as u64, RPC_MSG_SIZE);
    assert_eq!(&output[..4], &[0, 0, 0, 42]);
}

#[test]
fn wrong_program_or_version_is_denied() {
    let context = test_context(ServicePorts::default());
    for call in [
        call_body {
            prog: 100003, // not the portmapper
            ..getport_call(0)
        },
        call_body {
            vers: 3,
            ..getport_call(0)
        },
    ] {
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();
        handle_portmap(5, &call, &mut input, &mut output, &context).expect("handle_portmap");
        // 20-byte denied-auth reply ends AUTH_ERROR, AUTH_BADCRED.
        assert_eq!(output.len(), 20);
        assert_eq!(&output[8..], &[0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1]);
    }
}

#[test]
fn unsupported_procedures_are_denied() {
    let context = test_context(ServicePorts::default());
    for proc in [1_u32, 2, 4, 5, 99] {
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();
        handle_portmap(5, &getport_call(proc), &mut input, &mut output, &context)
            .expect("handle_portmap");
        assert_eq!(output.len(), 20, "proc {proc} must be denied");
    }
}
