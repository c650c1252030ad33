//! Stable MAC to IPv4 address assignment.
//!
//! The allocator is the piece of state the RARP and BOOTP responders share:
//! whichever protocol sees a client's MAC first fixes that client's address,
//! and every later request from either protocol gets the same answer. Leases
//! live for the process lifetime and are never evicted.
//!
//! The pool is a contiguous `[start, end]` range inside one subnet, with the
//! network and broadcast addresses always excluded and an explicit reserved
//! set on top (typically the server's own address and the gateway).

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Mutex;

use ipnet::Ipv4Net;
use thiserror::Error;

/// A raw Ethernet hardware address.
pub type MacAddr = [u8; 6];

/// Errors raised while constructing an allocator pool.
#[derive(Debug, Error)]
pub enum AllocatorError {
    /// The CIDR string did not parse as `a.b.c.d/n`.
    #[error("invalid cidr {0:?}: {1}")]
    InvalidCidr(String, ipnet::AddrParseError),
    /// The prefix leaves no usable host addresses.
    #[error("subnet {0} has no allocatable addresses")]
    EmptyPool(Ipv4Net),
    /// An explicit range had start above end.
    #[error("range start {start} is above range end {end}")]
    InvertedRange { start: Ipv4Addr, end: Ipv4Addr },
    /// An explicit range bound fell outside the subnet, or on its
    /// network or broadcast address.
    #[error("address {0} is not a host address of subnet {1}")]
    OutOfSubnet(Ipv4Addr, Ipv4Net),
}

#[derive(Default)]
struct Inner {
    leases: HashMap<MacAddr, Ipv4Addr>,
    in_use: HashSet<Ipv4Addr>,
    reserved: HashSet<Ipv4Addr>,
    cursor: u32,
}

/// Process-wide MAC to IPv4 allocator.
///
/// All mutation happens under one internal lock, so `allocate_for_mac` is a
/// single linearizable step: once it hands out an address for a MAC, every
/// concurrent and subsequent call for that MAC observes the same address.
pub struct Ipv4Allocator {
    subnet: Ipv4Net,
    start: Ipv4Addr,
    end: Ipv4Addr,
    inner: Mutex<Inner>,
}

impl Ipv4Allocator {
    /// Builds a pool covering every host address of `cidr`:
    /// `start = network+1`, `end = broadcast-1`.
    pub fn from_cidr(cidr: &str) -> Result<Self, AllocatorError> {
        let subnet: Ipv4Net = cidr
            .trim()
            .parse()
            .map_err(|e| AllocatorError::InvalidCidr(cidr.to_string(), e))?;
        let subnet = subnet.trunc();
        if subnet.prefix_len() >= 31 {
            return Err(AllocatorError::EmptyPool(subnet));
        }
        let start = Ipv4Addr::from(u32::from(subnet.network()) + 1);
        let end = Ipv4Addr::from(u32::from(subnet.broadcast()) - 1);
        Self::with_range(subnet, start, end)
    }

    /// Builds a pool over an explicit `[start, end]` range inside `subnet`.
    pub fn with_range(
        subnet: Ipv4Net,
        start: Ipv4Addr,
        end: Ipv4Addr,
    ) -> Result<Self, AllocatorError> {
        if start > end {
            return Err(AllocatorError::InvertedRange { start, end });
        }
        for bound in [start, end] {
            if !subnet.contains(&bound)
                || bound == subnet.network()
                || bound == subnet.broadcast()
            {
                return Err(AllocatorError::OutOfSubnet(bound, subnet));
            }
        }
        Ok(Self {
            subnet,
            start,
            end,
            inner: Mutex::new(Inner {
                cursor: u32::from(start),
                ..Inner::default()
            }),
        })
    }

    /// Returns the stable address for `mac`, allocating one on first sight.
    ///
    /// Allocation scans from the current cursor through the pool, wrapping
    /// once, and takes the first address that is neither reserved nor
    /// already leased. Returns `None` when the pool is exhausted.
    pub fn allocate_for_mac(&self, mac: MacAddr) -> Option<Ipv4Addr> {
        let mut inner = self.inner.lock().expect("allocator lock poisoned");
        if let Some(ip) = inner.leases.get(&mac) {
            return Some(*ip);
        }

        let (first, last) = (u32::from(self.start), u32::from(self.end));
        let advance = |v: u32| if v == last { first } else { v + 1 };

        let mut candidate = inner.cursor;
        for _ in first..=last {
            let ip = Ipv4Addr::from(candidate);
            if !inner.reserved.contains(&ip) && !inner.in_use.contains(&ip) {
                inner.leases.insert(mac, ip);
                inner.in_use.insert(ip);
                inner.cursor = advance(candidate);
                return Some(ip);
            }
            candidate = advance(candidate);
        }
        None
    }

    /// Excludes `ip` from future allocation.
    ///
    /// Addresses outside the pool are ignored, repeated calls are no-ops,
    /// and an address that is already leased stays leased.
    pub fn reserve_ip(&self, ip: Ipv4Addr) {
        if ip < self.start || ip > self.end {
            return;
        }
        let mut inner = self.inner.lock().expect("allocator lock poisoned");
        if inner.in_use.contains(&ip) {
            return;
        }
        inner.reserved.insert(ip);
    }

    /// First allocatable address of the pool.
    pub fn range_start(&self) -> Ipv4Addr {
        self.start
    }

    /// Last allocatable address of the pool.
    pub fn range_end(&self) -> Ipv4Addr {
        self.end
    }

    /// Netmask of the containing subnet.
    pub fn netmask(&self) -> Ipv4Addr {
        self.subnet.netmask()
    }

    /// Network address of the containing subnet.
    pub fn network(&self) -> Ipv4Addr {
        self.subnet.network()
    }
}
