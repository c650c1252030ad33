//! BOOTP/DHCP responder (RFC 951 / RFC 2131).
//!
//! A minimal state machine over the four message types a netbooting client
//! emits: DISCOVER is answered with an OFFER, REQUEST with an ACK (or a
//! NAK when the pool is exhausted), and RELEASE/DECLINE drop the
//! responder's own confirmation record. Addresses come from the allocator
//! shared with RARP, so whichever protocol sees a MAC first fixes its
//! assignment and the responder never contradicts an earlier RARP answer.
//!
//! Replies carry the boot parameters a diskless client needs to proceed:
//! subnet mask, router, server identifier, the TFTP server name as a
//! dotted quad, and optionally a root path and boot file name, plus the
//! `siaddr`/`sname`/`file` fixed fields.

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::allocator::{Ipv4Allocator, MacAddr};

/// Server port of the protocol.
pub const SERVER_PORT: u16 = 67;
/// Client port replies are broadcast to.
pub const CLIENT_PORT: u16 = 68;

/// Lease duration advertised in option 51.
pub const DEFAULT_LEASE_SECS: u32 = 3600;

/// Host name placed in the `sname` fixed field of every reply.
const SERVER_NAME: &[u8] = b"bootplane-install-server";

const BOOTREQUEST: u8 = 1;
const BOOTREPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;

/// Offset of the options area; everything before it is fixed fields.
const OPTIONS_OFFSET: usize = 240;
const MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

// Option numbers used by the responder.
const OPT_PAD: u8 = 0;
const OPT_SUBNET_MASK: u8 = 1;
const OPT_ROUTER: u8 = 3;
const OPT_ROOT_PATH: u8 = 17;
const OPT_REQUESTED_IP: u8 = 50;
const OPT_LEASE_TIME: u8 = 51;
const OPT_MESSAGE_TYPE: u8 = 53;
const OPT_SERVER_ID: u8 = 54;
const OPT_PARAM_REQUEST_LIST: u8 = 55;
const OPT_TFTP_SERVER_NAME: u8 = 66;
const OPT_BOOTFILE_NAME: u8 = 67;
const OPT_END: u8 = 255;

/// DHCP message types (option 53).
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

/// Parsed view of one RFC 2131 message.
#[derive(Clone, Debug)]
pub struct DhcpMessage {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub xid: u32,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: [u8; 16],
    options: Vec<(u8, Vec<u8>)>,
}

impl DhcpMessage {
    /// Parses a datagram, requiring the fixed header and the magic cookie.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < OPTIONS_OFFSET || buf[236..240] != MAGIC_COOKIE {
            return None;
        }
        let mut chaddr = [0_u8; 16];
        chaddr.copy_from_slice(&buf[28..44]);
        let mut msg = DhcpMessage {
            op: buf[0],
            htype: buf[1],
            hlen: buf[2],
            xid: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            flags: u16::from_be_bytes([buf[10], buf[11]]),
            ciaddr: ipv4_at(buf, 12),
            yiaddr: ipv4_at(buf, 16),
            siaddr: ipv4_at(buf, 20),
            giaddr: ipv4_at(buf, 24),
            chaddr,
            options: Vec::new(),
        };

        let mut cursor = OPTIONS_OFFSET;
        while cursor < buf.len() {
            match buf[cursor] {
                OPT_END => break,
                OPT_PAD => cursor += 1,
                code => {
                    let len = *buf.get(cursor + 1)? as usize;
                    let body = buf.get(cursor + 2..cursor + 2 + len)?;
                    msg.options.push((code, body.to_vec()));
                    cursor += 2 + len;
                }
            }
        }
        Some(msg)
    }

    /// Returns the body of the first instance of option `code`.
    pub fn option(&self, code: u8) -> Option<&[u8]> {
        self.options
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, body)| body.as_slice())
    }

    /// The message type carried in option 53.
    pub fn message_type(&self) -> Option<MessageType> {
        let body = self.option(OPT_MESSAGE_TYPE)?;
        MessageType::from_u8(*body.first()?)
    }

    /// The client MAC for Ethernet-class messages.
    pub fn client_mac(&self) -> Option<MacAddr> {
        if self.htype != HTYPE_ETHERNET || self.hlen != 6 {
            return None;
        }
        let mut mac = [0_u8; 6];
        mac.copy_from_slice(&self.chaddr[..6]);
        Some(mac)
    }
}

fn ipv4_at(buf: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3])
}

/// A reply packet plus where to send it.
#[derive(Clone, Debug)]
pub struct DhcpReply {
    pub packet: Vec<u8>,
    pub destination: SocketAddrV4,
}

/// The protocol state machine, independent of any socket.
pub struct DhcpResponder {
    allocator: Arc<Ipv4Allocator>,
    server_ip: Ipv4Addr,
    next_server_ip: Ipv4Addr,
    router_ip: Ipv4Addr,
    root_path: Option<String>,
    boot_filename: Option<String>,
    lease_secs: u32,
    /// Confirmed offers by MAC. RELEASE/DECLINE drop entries here; the
    /// allocator lease itself is never evicted.
    bindings: Mutex<HashMap<MacAddr, Ipv4Addr>>,
}

impl DhcpResponder {
    /// Builds a responder whose router and next-server default to the
    /// server's own address.
    pub fn new(
        allocator: Arc<Ipv4Allocator>,
        server_ip: Ipv4Addr,
        root_path: Option<String>,
        boot_filename: Option<String>,
    ) -> Self {
        Self {
            allocator,
            server_ip,
            next_server_ip: server_ip,
            router_ip: server_ip,
            root_path,
            boot_filename,
            lease_secs: DEFAULT_LEASE_SECS,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    /// Runs one datagram through the state machine.
    pub fn handle_message(&self, pkt: &[u8]) -> Option<DhcpReply> {
        let msg = DhcpMessage::parse(pkt)?;
        if msg.op != BOOTREQUEST {
            return None;
        }
        let mac = msg.client_mac()?;
        let requested = msg
            .option(OPT_REQUESTED_IP)
            .filter(|b| b.len() == 4)
            .map(|b| Ipv4Addr::new(b[0], b[1], b[2], b[3]));

        match msg.message_type()? {
            MessageType::Discover => {
                let ip = self.find_or_allocate(mac)?;
                debug!(
                    target: "bootp",
                    "DISCOVER {} requested={:?} -> OFFER {}",
                    mac_string(&mac), requested, ip
                );
                Some(self.build_reply(&msg, MessageType::Offer, ip))
            }
            MessageType::Request => match self.find_or_allocate(mac) {
                Some(ip) => {
                    info!(
                        target: "bootp",
                        "REQUEST {} requested={:?} -> ACK {}",
                        mac_string(&mac), requested, ip
                    );
                    Some(self.build_reply(&msg, MessageType::Ack, ip))
                }
                None => {
                    info!(target: "bootp", "REQUEST {} -> NAK (pool exhausted)", mac_string(&mac));
                    Some(self.build_nak(&msg))
                }
            },
            MessageType::Release | MessageType::Decline => {
                self.bindings
                    .lock()
                    .expect("bootp bindings lock poisoned")
                    .remove(&mac);
                debug!(target: "bootp", "dropped binding for {}", mac_string(&mac));
                None
            }
            _ => None,
        }
    }

    fn find_or_allocate(&self, mac: MacAddr) -> Option<Ipv4Addr> {
        let ip = self.allocator.allocate_for_mac(mac)?;
        self.bindings
            .lock()
            .expect("bootp bindings lock poisoned")
            .insert(mac, ip);
        Some(ip)
    }

    /// Options every reply must carry, in the order used when the client
    /// sends no Parameter Request List.
    fn base_options(&self) -> Vec<(u8, Vec<u8>)> {
        let mut base = vec![
            (OPT_SUBNET_MASK, self.allocator.netmask().octets().to_vec()),
            (OPT_ROUTER, self.router_ip.octets().to_vec()),
            (OPT_SERVER_ID, self.server_ip.octets().to_vec()),
            (
                OPT_TFTP_SERVER_NAME,
                self.next_server_ip.to_string().into_bytes(),
            ),
        ];
        if let Some(root) = &self.root_path {
            base.push((OPT_ROOT_PATH, root.clone().into_bytes()));
        }
        if let Some(file) = &self.boot_filename {
            base.push((OPT_BOOTFILE_NAME, file.clone().into_bytes()));
        }
        base.push((OPT_LEASE_TIME, self.lease_secs.to_be_bytes().to_vec()));
        base
    }

    fn build_reply(&self, req: &DhcpMessage, mt: MessageType, yiaddr: Ipv4Addr) -> DhcpReply {
        let ordered = order_options(self.base_options(), req.option(OPT_PARAM_REQUEST_LIST));

        let mut pkt = self.reply_header(req, mt, yiaddr, self.next_server_ip);
        for (code, body) in &ordered {
            push_option(&mut pkt, *code, body);
        }
        pkt.push(OPT_END);

        DhcpReply {
            packet: pkt,
            destination: reply_destination(req),
        }
    }

    fn build_nak(&self, req: &DhcpMessage) -> DhcpReply {
        let mut pkt = self.reply_header(
            req,
            MessageType::Nak,
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::UNSPECIFIED,
        );
        push_option(&mut pkt, OPT_SERVER_ID, &self.server_ip.octets());
        pkt.push(OPT_END);
        DhcpReply {
            packet: pkt,
            destination: reply_destination(req),
        }
    }

    /// Fixed fields plus cookie plus the always-first message-type option.
    fn reply_header(
        &self,
        req: &DhcpMessage,
        mt: MessageType,
        yiaddr: Ipv4Addr,
        siaddr: Ipv4Addr,
    ) -> Vec<u8> {
        let mut pkt = vec![0_u8; OPTIONS_OFFSET];
        pkt[0] = BOOTREPLY;
        pkt[1] = HTYPE_ETHERNET;
        pkt[2] = 6;
        pkt[4..8].copy_from_slice(&req.xid.to_be_bytes());
        pkt[10..12].copy_from_slice(&req.flags.to_be_bytes());
        pkt[16..20].copy_from_slice(&yiaddr.octets());
        pkt[20..24].copy_from_slice(&siaddr.octets());
        pkt[24..28].copy_from_slice(&req.giaddr.octets());
        pkt[28..44].copy_from_slice(&req.chaddr);
        pkt[44..44 + SERVER_NAME.len()].copy_from_slice(SERVER_NAME);
        if let Some(file) = &self.boot_filename {
            let file = file.as_bytes();
            let len = file.len().min(127);
            pkt[108..108 + len].copy_from_slice(&file[..len]);
        }
        pkt[236..240].copy_from_slice(&MAGIC_COOKIE);
        push_option(&mut pkt, OPT_MESSAGE_TYPE, &[mt as u8]);
        pkt
    }
}

/// Reorders `base` by the client's Parameter Request List, appending the
/// required options the client did not list.
///
/// The list is walked in the client's order, not the table's; map
/// iteration order never reaches the wire.
fn order_options(mut base: Vec<(u8, Vec<u8>)>, prl: Option<&[u8]>) -> Vec<(u8, Vec<u8>)> {
    let mut out = Vec::with_capacity(base.len());
    if let Some(prl) = prl {
        for code in prl {
            if let Some(pos) = base.iter().position(|(c, _)| c == code) {
                out.push(base.remove(pos));
            }
        }
    }
    out.extend(base);
    out
}

fn push_option(pkt: &mut Vec<u8>, code: u8, body: &[u8]) {
    pkt.push(code);
    pkt.push(body.len() as u8);
    pkt.extend_from_slice(body);
}

/// Where a reply goes: a relay if one forwarded the request, the client's
/// own address once it has one, otherwise limited broadcast.
fn reply_destination(req: &DhcpMessage) -> SocketAddrV4 {
    if !req.giaddr.is_unspecified() {
        SocketAddrV4::new(req.giaddr, SERVER_PORT)
    } else if !req.ciaddr.is_unspecified() {
        SocketAddrV4::new(req.ciaddr, CLIENT_PORT)
    } else {
        SocketAddrV4::new(Ipv4Addr::BROADCAST, CLIENT_PORT)
    }
}

fn mac_string(mac: &MacAddr) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// The UDP/67 server loop around a [`DhcpResponder`].
pub struct BootpServer {
    socket: UdpSocket,
    responder: Arc<DhcpResponder>,
}

impl BootpServer {
    /// Binds UDP/67 on `iface` with broadcast enabled.
    pub fn bind(iface: &str, responder: Arc<DhcpResponder>) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;
        #[cfg(target_os = "linux")]
        socket.bind_device(Some(iface.as_bytes()))?;
        #[cfg(not(target_os = "linux"))]
        let _ = iface;
        socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SERVER_PORT).into())?;

        let socket = UdpSocket::from_std(socket.into())?;
        info!(target: "bootp", "listening on 0.0.0.0:{SERVER_PORT}");
        Ok(Self { socket, responder })
    }

    /// Receives and answers datagrams until the socket fails.
    pub async fn handle_forever(&self) -> io::Result<()> {
        let mut buf = [0_u8; 1500];
        loop {
            let (n, peer) = self.socket.recv_from(&mut buf).await?;
            let Some(reply) = self.responder.handle_message(&buf[..n]) else {
                continue;
            };
            if let Err(err) = self
                .socket
                .send_to(&reply.packet, SocketAddr::V4(reply.destination))
                .await
            {
                error!(target: "bootp", "send to {} (for {}) failed: {}", reply.destination, peer, err);
            }
        }
    }
}
