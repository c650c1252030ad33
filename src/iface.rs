//! Network interface discovery.
//!
//! The RARP and BOOTP servers need four facts about the host interface:
//! its index (to bind the packet socket), its MAC (to source RARP
//! replies), and its IPv4 address and netmask (to derive the allocator
//! pool and the server identifier). On Linux these come from the
//! classic SIOCGIF* ioctls; other platforms report unsupported, which
//! startup turns into a clean failure.

use std::io;
use std::net::Ipv4Addr;

/// Everything startup needs to know about the boot interface.
#[derive(Clone, Debug)]
pub struct IfaceInfo {
    /// Interface name as configured (e.g. `eth0`)
    pub name: String,
    /// Kernel interface index
    pub index: u32,
    /// 6-byte hardware address
    pub mac: [u8; 6],
    /// First IPv4 address bound to the interface
    pub addr: Ipv4Addr,
    /// Netmask of that address
    pub netmask: Ipv4Addr,
}

impl IfaceInfo {
    /// The interface address in `a.b.c.d/n` form, suitable for building
    /// the allocator pool.
    pub fn cidr(&self) -> String {
        let prefix = u32::from(self.netmask).leading_ones();
        format!("{}/{}", self.addr, prefix)
    }
}

/// Looks up an interface by name, requiring it to be up and to carry a
/// 6-byte MAC and an IPv4 address.
#[cfg(target_os = "linux")]
pub fn lookup(name: &str) -> io::Result<IfaceInfo> {
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    if name.is_empty() || name.len() >= libc::IFNAMSIZ {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid interface name {name:?}"),
        ));
    }

    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };

    let mut req: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in req.ifr_name.iter_mut().zip(name.as_bytes()) {
        *dst = *src as libc::c_char;
    }

    unsafe {
        ifreq_ioctl(fd.as_raw_fd(), libc::SIOCGIFFLAGS, &mut req)?;
        if req.ifr_ifru.ifru_flags & libc::IFF_UP as libc::c_short == 0 {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("interface {name} is down"),
            ));
        }

        ifreq_ioctl(fd.as_raw_fd(), libc::SIOCGIFINDEX, &mut req)?;
        let index = req.ifr_ifru.ifru_ifindex as u32;

        ifreq_ioctl(fd.as_raw_fd(), libc::SIOCGIFHWADDR, &mut req)?;
        if req.ifr_ifru.ifru_hwaddr.sa_family != libc::ARPHRD_ETHER {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("interface {name} has no 6-byte MAC"),
            ));
        }
        let mut mac = [0_u8; 6];
        for (dst, src) in mac.iter_mut().zip(req.ifr_ifru.ifru_hwaddr.sa_data.iter()) {
            *dst = *src as u8;
        }

        ifreq_ioctl(fd.as_raw_fd(), libc::SIOCGIFADDR, &mut req)?;
        let addr = sockaddr_to_ipv4(&req.ifr_ifru.ifru_addr).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no IPv4 on interface {name}"),
            )
        })?;

        ifreq_ioctl(fd.as_raw_fd(), libc::SIOCGIFNETMASK, &mut req)?;
        let netmask = sockaddr_to_ipv4(&req.ifr_ifru.ifru_netmask).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no IPv4 netmask on interface {name}"),
            )
        })?;

        Ok(IfaceInfo {
            name: name.to_string(),
            index,
            mac,
            addr,
            netmask,
        })
    }
}

#[cfg(not(target_os = "linux"))]
pub fn lookup(name: &str) -> io::Result<IfaceInfo> {
    let _ = name;
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interface discovery is only implemented for Linux",
    ))
}

#[cfg(target_os = "linux")]
unsafe fn ifreq_ioctl(
    fd: std::os::fd::RawFd,
    request: libc::c_ulong,
    req: &mut libc::ifreq,
) -> io::Result<()> {
    if libc::ioctl(fd, request as _, req as *mut libc::ifreq) < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(target_os = "linux")]
unsafe fn sockaddr_to_ipv4(sa: &libc::sockaddr) -> Option<Ipv4Addr> {
    if sa.sa_family != libc::AF_INET as libc::sa_family_t {
        return None;
    }
    let sin = &*(sa as *const libc::sockaddr as *const libc::sockaddr_in);
    Some(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)))
}
