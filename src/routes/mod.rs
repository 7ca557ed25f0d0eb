// Routes module - kernel routing table reading, parsing and route lookups

pub mod lookup;
pub mod parser;
pub mod resolver;
pub mod sysctl;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::config::ResolverConfig;
use crate::error::RouteResult;

/// Address family of a routing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl AddressFamily {
    /// Family the route lookup for `addr` uses; IPv4-mapped IPv6 counts as IPv4
    pub fn of(addr: &IpAddr) -> Self {
        match addr.to_canonical() {
            IpAddr::V4(_) => AddressFamily::Inet,
            IpAddr::V6(_) => AddressFamily::Inet6,
        }
    }

    /// Darwin `AF_*` value
    pub fn sa_family(self) -> u8 {
        match self {
            AddressFamily::Inet => wire::AF_INET,
            AddressFamily::Inet6 => wire::AF_INET6,
        }
    }

    pub fn address_len(self) -> usize {
        match self {
            AddressFamily::Inet => 4,
            AddressFamily::Inet6 => 16,
        }
    }

    /// Offset of `sin_addr` / `sin6_addr` within the sockaddr
    pub(crate) fn address_offset(self) -> usize {
        match self {
            AddressFamily::Inet => 4,
            AddressFamily::Inet6 => 8,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Inet => f.write_str("IPv4"),
            AddressFamily::Inet6 => f.write_str("IPv6"),
        }
    }
}

/// One retained kernel route. IPv4 routes use the first 4 bytes of
/// `address` and `netmask`, the rest stays zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteEntry {
    pub address: [u8; 16],
    pub netmask: [u8; 16],
    pub interface_index: u32,
}

impl RouteEntry {
    /// Number of set mask bits
    pub fn prefix_len(&self) -> u32 {
        self.netmask.iter().map(|b| b.count_ones()).sum()
    }

    pub fn destination(&self, family: AddressFamily) -> IpAddr {
        match family {
            AddressFamily::Inet => {
                let [a, b, c, d, ..] = self.address;
                IpAddr::V4(Ipv4Addr::new(a, b, c, d))
            }
            AddressFamily::Inet6 => IpAddr::V6(Ipv6Addr::from(self.address)),
        }
    }

    pub fn describe(&self, family: AddressFamily) -> Route {
        Route {
            destination: format!("{}/{}", self.destination(family), self.prefix_len()),
            interface_index: self.interface_index,
            interface: interface_name(self.interface_index),
        }
    }
}

/// Routes ordered most specific first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Sorts by descending netmask; equal masks keep their order
    pub fn from_unsorted(mut entries: Vec<RouteEntry>) -> Self {
        entries.sort_by(|a, b| b.netmask.cmp(&a.netmask));
        RouteTable { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Human-readable route, as printed by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub destination: String, // CIDR notation
    pub interface_index: u32,
    pub interface: String,
}

/// Read and parse the system routing table for `family`
pub fn read_system_table(
    family: AddressFamily,
    config: &ResolverConfig,
) -> RouteResult<RouteTable> {
    use crate::routes::sysctl::TableSource;

    let source = sysctl::system_source(config)?;
    let buf = source.dump(family)?;
    Ok(parser::parse_routing_table(&buf, family))
}

/// Interface name for diagnostics
#[cfg(unix)]
pub fn interface_name(index: u32) -> String {
    let mut buf = [0 as libc::c_char; libc::IF_NAMESIZE];
    // SAFETY: buf has the IF_NAMESIZE bytes if_indextoname writes at most
    let name = unsafe { libc::if_indextoname(index, buf.as_mut_ptr()) };
    if name.is_null() {
        let err = std::io::Error::last_os_error();
        return format!(
            "(idx: {}, error: ({}) {})",
            index,
            err.raw_os_error().unwrap_or(0),
            err
        );
    }
    // SAFETY: on success buf holds a NUL-terminated name
    unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

#[cfg(not(unix))]
pub fn interface_name(index: u32) -> String {
    format!("(idx: {})", index)
}
