use std::io::Cursor;

use bootplane::proxy;
use bootplane::xdr::rpc::{
    call_body, denied_auth_reply_message, make_success_reply, parse_call, CallError,
};
use bootplane::xdr::{self, Serialize};

fn build_call(xid: u32, prog: u32, vers: u32, proc: u32) -> Vec<u8> {
    let msg = xdr::rpc::rpc_msg {
        xid,
        body: xdr::rpc::rpc_body::CALL(call_body {
            rpcvers: 2,
            prog,
            vers,
            proc,
            cred: Default::default(),
            verf: Default::default(),
        }),
    };
    let mut buf = Vec::new();
    msg.serialize(&mut buf).expect("serialize rpc_msg");
    buf
}

#[test]
fn call_round_trip() {
    let pkt = build_call(0xdeadbeef, 100000, 2, 3);
    let mut cursor = Cursor::new(pkt.as_slice());
    let (xid, call) = parse_call(&mut cursor).expect("parse_call");
    assert_eq!(xid, 0xdeadbeef);
    assert_eq!(call.prog, 100000);
    assert_eq!(call.vers, 2);
    assert_eq!(call.proc, 3);
    // Cursor sits at the procedure arguments, which here is end of input.
    assert_eq!(cursor.position() as usize, pkt.len());
}

#[test]
fn call_cursor_stops_at_arguments() {
    let mut pkt = build_call(7, 100003, 2, 6);
    pkt.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);
    let mut cursor = Cursor::new(pkt.as_slice());
    let (_, _) = parse_call(&mut cursor).expect("parse_call");
    assert_eq!(&pkt[cursor.position() as usize..], &[0xaa, 0xbb, 0xcc, 0xdd]);
}

#[test]
fn accepted_header_layout() {
    let mut buf = Vec::new();
    make_success_reply(0x12345678)
        .serialize(&mut buf)
        .expect("serialize reply");
    assert_eq!(
        buf,
        vec![
            0x12, 0x34, 0x56, 0x78, // xid
            0, 0, 0, 1, // REPLY
            0, 0, 0, 0, // MSG_ACCEPTED
            0, 0, 0, 0, // verf flavor AUTH_NULL
            0, 0, 0, 0, // verf length 0
            0, 0, 0, 0, // accept_stat SUCCESS
        ]
    );
}

#[test]
fn denied_auth_layout() {
    let mut buf = Vec::new();
    denied_auth_reply_message(0xcafef00d)
        .serialize(&mut buf)
        .expect("serialize reply");
    assert_eq!(
        buf,
        vec![
            0xca, 0xfe, 0xf0, 0x0d, // xid
            0, 0, 0, 1, // REPLY
            0, 0, 0, 1, // MSG_DENIED
            0, 0, 0, 1, // AUTH_ERROR
            0, 0, 0, 1, // AUTH_BADCRED
        ]
    );
}

#[test]
fn rejects_reply_messages() {
    let mut buf = Vec::new();
    make_success_reply(9).serialize(&mut buf).expect("serialize");
    let err = parse_call(&mut Cursor::new(buf.as_slice())).expect_err("reply is not a call");
    assert!(matches!(err, CallError::NotACall));
}

#[test]
fn rejects_wrong_rpc_version() {
    let msg = xdr::rpc::rpc_msg {
        xid: 1,
        body: xdr::rpc::rpc_body::CALL(call_body {
            rpcvers: 3,
            prog: 100000,
            vers: 2,
            proc: 0,
            cred: Default::default(),
            verf: Default::default(),
        }),
    };
    let mut buf = Vec::new();
    msg.serialize(&mut buf).expect("serialize");
    let err = parse_call(&mut Cursor::new(buf.as_slice())).expect_err("version 3 must fail");
    assert!(matches!(err, CallError::WrongRpcVersion(3)));
}

#[test]
fn rejects_short_input() {
    let err = parse_call(&mut Cursor::new(&[0_u8, 0, 0][..])).expect_err("3 bytes is short");
    assert!(matches!(err, CallError::ShortInput(_)));

    // Header intact, credential opaque truncated.
    let pkt = build_call(2, 100005, 1, 1);
    let err =
        parse_call(&mut Cursor::new(&pkt[..28])).expect_err("truncated credential must fail");
    assert!(matches!(err, CallError::ShortInput(_)));
}

/// The relay's rpcbind probe is a plain portmap GETPORT call.
#[test]
fn getport_probe_layout() {
    let pkt = proxy::build_getport_call(0x01020304, 100003, 2).expect("build call");
    // 24-byte header, two empty auth opaques, four argument words.
    assert_eq!(pkt.len(), 24 + 8 + 8 + 16);
    assert_eq!(&pkt[..4], &[1, 2, 3, 4]);
    assert_eq!(&pkt[4..8], &[0, 0, 0, 0]); // CALL
    assert_eq!(&pkt[8..12], &[0, 0, 0, 2]); // rpcvers
    assert_eq!(&pkt[12..16], &[0, 1, 0x86, 0xa0]); // program 100000
    assert_eq!(&pkt[20..24], &[0, 0, 0, 3]); // GETPORT
    assert_eq!(&pkt[40..44], &[0, 1, 0x86, 0xa3]); // argument program 100003
    assert_eq!(&pkt[48..52], &[0, 0, 0, 17]); // protocol UDP
    assert_eq!(&pkt[52..56], &[0, 0, 0, 0]); // port placeholder
    assert_eq!(proxy::extract_xid(&pkt), Some(0x01020304));
}
