// Route lookup with longest prefix matching

use super::{AddressFamily, RouteEntry, RouteTable};
use std::net::IpAddr;

/// Destination address in the form route entries are matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    family: AddressFamily,
    bytes: [u8; 16],
}

impl Destination {
    /// IPv4-mapped IPv6 addresses are unmapped to plain IPv4
    pub fn new(addr: IpAddr) -> Self {
        let mut bytes = [0u8; 16];
        let family = match addr.to_canonical() {
            IpAddr::V4(v4) => {
                bytes[..4].copy_from_slice(&v4.octets());
                AddressFamily::Inet
            }
            IpAddr::V6(v6) => {
                bytes = v6.octets();
                AddressFamily::Inet6
            }
        };
        Destination { family, bytes }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.family.address_len()]
    }
}

impl RouteEntry {
    /// Masks are assumed contiguous: comparison stops at the first zero
    /// mask byte.
    pub fn matches(&self, dest: &[u8]) -> bool {
        dest.iter()
            .zip(self.netmask.iter().zip(&self.address))
            .take_while(|(_, (mask, _))| **mask != 0)
            .all(|(d, (mask, addr))| d & mask == *addr)
    }
}

impl RouteTable {
    /// Interface index of the most specific route for `dest`
    pub fn lookup(&self, dest: &Destination) -> Option<u32> {
        self.entries()
            .iter()
            .find(|route| route.matches(dest.as_bytes()))
            .map(|route| route.interface_index)
    }
}
