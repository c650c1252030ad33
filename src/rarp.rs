//! RARP responder (RFC 903).
//!
//! Legacy workstation firmware broadcasts a reverse-ARP request ("who am
//! I?") carrying only its own MAC; the responder answers with the address
//! the shared allocator assigns to that MAC. Because the allocator is the
//! same one BOOTP uses, a client that later switches to DHCP keeps the
//! address RARP first told it.
//!
//! Capturing EtherType 0x8035 needs a raw packet socket and the privileges
//! that go with it. The socket is isolated behind the [`RarpLink`] trait
//! with one concrete implementation per platform; the protocol logic
//! consumes parsed frames and produces reply bytes, and is testable
//! without any socket at all.

use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;

use tracing::{debug, info};

use crate::allocator::{Ipv4Allocator, MacAddr};

/// EtherType of (reverse) ARP-over-Ethernet frames served here.
pub const ETHERTYPE_RARP: u16 = 0x8035;

/// RARP opcode: request-reverse ("what is my protocol address?").
const OP_REQUEST_REVERSE: u16 = 3;
/// RARP opcode: reply-reverse.
const OP_REPLY_REVERSE: u16 = 4;

/// Ethernet header plus the fixed 28-byte ARP body.
const FRAME_LEN: usize = 42;

/// Transport seam for the responder: one frame in, one frame out.
///
/// The real implementation is a bound packet socket; tests drive the
/// protocol logic directly through [`build_reply`] instead.
pub trait RarpLink: Send {
    /// Receives one frame, blocking until one arrives.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// Transmits one frame.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Builds the reply frame for a single received frame, or `None` when the
/// frame is not a RARP request or no address can be allocated.
///
/// The reply carries the allocated address in the target fields and the
/// server's own MAC and address in the sender fields, per RFC 903.
pub fn build_reply(
    frame: &[u8],
    server_mac: MacAddr,
    server_ip: Ipv4Addr,
    allocator: &Ipv4Allocator,
) -> Option<Vec<u8>> {
    if frame.len() < FRAME_LEN {
        return None;
    }
    if u16::from_be_bytes([frame[12], frame[13]]) != ETHERTYPE_RARP {
        return None;
    }
    let arp = &frame[14..FRAME_LEN];
    let htype = u16::from_be_bytes([arp[0], arp[1]]);
    let ptype = u16::from_be_bytes([arp[2], arp[3]]);
    let (hlen, plen) = (arp[4], arp[5]);
    let opcode = u16::from_be_bytes([arp[6], arp[7]]);
    if htype != 1 || ptype != 0x0800 || hlen != 6 || plen != 4 {
        return None;
    }
    if opcode != OP_REQUEST_REVERSE {
        return None;
    }

    let mut sender_mac = [0_u8; 6];
    sender_mac.copy_from_slice(&arp[8..14]);

    let ip = allocator.allocate_for_mac(sender_mac)?;

    let mut reply = Vec::with_capacity(FRAME_LEN);
    reply.extend_from_slice(&sender_mac);
    reply.extend_from_slice(&server_mac);
    reply.extend_from_slice(&ETHERTYPE_RARP.to_be_bytes());
    reply.extend_from_slice(&1_u16.to_be_bytes());
    reply.extend_from_slice(&0x0800_u16.to_be_bytes());
    reply.push(6);
    reply.push(4);
    reply.extend_from_slice(&OP_REPLY_REVERSE.to_be_bytes());
    reply.extend_from_slice(&server_mac);
    reply.extend_from_slice(&server_ip.octets());
    reply.extend_from_slice(&sender_mac);
    reply.extend_from_slice(&ip.octets());
    Some(reply)
}

/// The responder's receive loop over some [`RarpLink`].
pub struct RarpServer {
    link: Box<dyn RarpLink>,
    server_mac: MacAddr,
    server_ip: Ipv4Addr,
    allocator: Arc<Ipv4Allocator>,
}

impl RarpServer {
    pub fn new(
        link: Box<dyn RarpLink>,
        server_mac: MacAddr,
        server_ip: Ipv4Addr,
        allocator: Arc<Ipv4Allocator>,
    ) -> Self {
        Self {
            link,
            server_mac,
            server_ip,
            allocator,
        }
    }

    /// Receives and answers requests until the link fails.
    ///
    /// Frames that are not RARP requests, and requests the allocator
    /// cannot satisfy, are dropped silently.
    pub fn handle_forever(&mut self) -> io::Result<()> {
        let mut buf = [0_u8; 1600];
        loop {
            let n = self.link.recv(&mut buf)?;
            let Some(reply) = build_reply(&buf[..n], self.server_mac, self.server_ip, &self.allocator)
            else {
                debug!(target: "rarp", "ignoring {n}-byte frame");
                continue;
            };
            // Target protocol address sits in the last 4 bytes of the reply.
            let assigned: [u8; 4] = reply[FRAME_LEN - 4..].try_into().unwrap_or_default();
            info!(
                target: "rarp",
                "answered {:02x?} with {}",
                &reply[..6],
                Ipv4Addr::from(assigned)
            );
            self.link.send(&reply)?;
        }
    }
}

/// Raw `AF_PACKET` socket bound to one interface and filtered to RARP.
#[cfg(target_os = "linux")]
pub struct PacketSocket {
    fd: std::os::fd::OwnedFd,
}

#[cfg(target_os = "linux")]
impl PacketSocket {
    /// Opens a raw packet socket for EtherType 0x8035 on the interface
    /// with the given kernel index. Requires CAP_NET_RAW.
    pub fn open(ifindex: u32) -> io::Result<Self> {
        use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

        let protocol = ETHERTYPE_RARP.to_be() as libc::c_int;
        let fd = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, protocol) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        let mut sll: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        sll.sll_family = libc::AF_PACKET as libc::sa_family_t;
        sll.sll_protocol = ETHERTYPE_RARP.to_be();
        sll.sll_ifindex = ifindex as libc::c_int;
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &sll as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { fd })
    }
}

/// Placeholder on platforms without packet sockets; opening always fails,
/// which startup reports as an unusable interface.
#[cfg(not(target_os = "linux"))]
pub struct PacketSocket;

#[cfg(not(target_os = "linux"))]
impl PacketSocket {
    pub fn open(_ifindex: u32) -> io::Result<Self> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "raw RARP capture is only implemented for Linux",
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl RarpLink for PacketSocket {
    fn recv(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn send(&mut self, _frame: &[u8]) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }
}

#[cfg(target_os = "linux")]
impl RarpLink for PacketSocket {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use std::os::fd::AsRawFd;
        let n = unsafe {
            libc::recv(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        use std::os::fd::AsRawFd;
        let n = unsafe {
            libc::send(
                self.fd.as_raw_fd(),
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
                0,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
