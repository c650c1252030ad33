use std::collections::HashSet;
use std::net::Ipv4Addr;

use bootplane::allocator::{Ipv4Allocator, MacAddr};

const MAC_A: MacAddr = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
const MAC_B: MacAddr = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];

fn ip(s: &str) -> Ipv4Addr {
    s.parse().expect("ip literal")
}

#[test]
fn from_cidr_and_allocate() {
    let alloc = Ipv4Allocator::from_cidr("192.168.10.0/24").expect("from_cidr");
    assert_eq!(alloc.range_start(), ip("192.168.10.1"));
    assert_eq!(alloc.range_end(), ip("192.168.10.254"));
    assert_eq!(alloc.netmask(), ip("255.255.255.0"));
    assert_eq!(alloc.network(), ip("192.168.10.0"));

    alloc.reserve_ip(ip("192.168.10.1"));

    let ip_a = alloc.allocate_for_mac(MAC_A).expect("allocate macA");
    assert_eq!(ip_a, ip("192.168.10.2"));
    let ip_a2 = alloc.allocate_for_mac(MAC_A).expect("stable lease for macA");
    assert_eq!(ip_a2, ip_a);
    let ip_b = alloc.allocate_for_mac(MAC_B).expect("allocate macB");
    assert_eq!(ip_b, ip("192.168.10.3"));
}

#[test]
fn distinct_macs_get_distinct_ips() {
    let alloc = Ipv4Allocator::from_cidr("10.1.0.0/26").expect("from_cidr");
    let mut seen = HashSet::new();
    for i in 0..62_u8 {
        let assigned = alloc
            .allocate_for_mac([2, 0, 0, 0, 0, i])
            .expect("pool has room");
        assert!(seen.insert(assigned), "{assigned} assigned twice");
    }
}

#[test]
fn pool_of_one() {
    let subnet = "10.0.0.0/24".parse().expect("subnet");
    let alloc = Ipv4Allocator::with_range(subnet, ip("10.0.0.5"), ip("10.0.0.5")).expect("range");

    let only = alloc.allocate_for_mac(MAC_A).expect("first allocation");
    assert_eq!(only, ip("10.0.0.5"));
    // A new MAC finds the pool exhausted; the old one keeps its lease.
    assert!(alloc.allocate_for_mac(MAC_B).is_none());
    assert_eq!(alloc.allocate_for_mac(MAC_A), Some(only));
}

#[test]
fn reserved_ips_are_never_allocated() {
    let subnet = "10.0.0.0/24".parse().expect("subnet");
    let alloc = Ipv4Allocator::with_range(subnet, ip("10.0.0.5"), ip("10.0.0.6")).expect("range");
    alloc.reserve_ip(ip("10.0.0.5"));
    alloc.reserve_ip(ip("10.0.0.5")); // idempotent

    assert_eq!(alloc.allocate_for_mac(MAC_A), Some(ip("10.0.0.6")));
    // Only remaining address is reserved.
    assert!(alloc.allocate_for_mac(MAC_B).is_none());
}

#[test]
fn reserving_outside_pool_is_ignored() {
    let subnet = "10.0.0.0/24".parse().expect("subnet");
    let alloc = Ipv4Allocator::with_range(subnet, ip("10.0.0.5"), ip("10.0.0.5")).expect("range");
    alloc.reserve_ip(ip("192.168.0.1"));
    assert_eq!(alloc.allocate_for_mac(MAC_A), Some(ip("10.0.0.5")));
}

#[test]
fn rejects_bad_pools() {
    assert!(Ipv4Allocator::from_cidr("not-a-cidr").is_err());
    assert!(Ipv4Allocator::from_cidr("10.0.0.1/32").is_err());
    assert!(Ipv4Allocator::from_cidr("10.0.0.0/31").is_err());

    let subnet = "10.0.0.0/24".parse().expect("subnet");
    assert!(Ipv4Allocator::with_range(subnet, ip("10.0.0.9"), ip("10.0.0.3")).is_err());
    assert!(Ipv4Allocator::with_range(subnet, ip("10.0.1.1"), ip("10.0.1.2")).is_err());
    // Network and broadcast addresses are not host addresses.
    assert!(Ipv4Allocator::with_range(subnet, ip("10.0.0.0"), ip("10.0.0.5")).is_err());
    assert!(Ipv4Allocator::with_range(subnet, ip("10.0.0.5"), ip("10.0.0.255")).is_err());
}

/// Concurrent callers agree on assignments: one address per MAC, no
/// address handed out twice.
#[test]
fn concurrent_allocation_is_consistent() {
    let alloc = Ipv4Allocator::from_cidr("172.16.0.0/24").expect("from_cidr");

    let assignments: Vec<(MacAddr, Ipv4Addr)> = std::thread::scope(|scope| {
        let mut workers = Vec::new();
        for worker in 0..8_u8 {
            let alloc = &alloc;
            workers.push(scope.spawn(move || {
                let mut got = Vec::new();
                for i in 0..16_u8 {
                    // Half the MACs are shared between workers.
                    let mac = [4, 0, 0, 0, worker % 4, i];
                    if let Some(assigned) = alloc.allocate_for_mac(mac) {
                        got.push((mac, assigned));
                    }
                }
                got
            }));
        }
        workers
            .into_iter()
            .flat_map(|w| w.join().expect("worker panicked"))
            .collect()
    });

    let mut by_mac = std::collections::HashMap::new();
    for (mac, assigned) in &assignments {
        let prev = by_mac.insert(*mac, *assigned);
        assert!(prev.is_none_or(|p| p == *assigned), "unstable lease for {mac:?}");
    }
    let unique_ips: HashSet<_> = by_mac.values().collect();
    assert_eq!(unique_ips.len(), by_mac.len(), "an address was shared");
}
