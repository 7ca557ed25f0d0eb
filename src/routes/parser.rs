// Routing table parser for NET_RT_DUMP2 dumps

use super::wire::{
    Messages, RTAX_DST, RTAX_NETMASK, RTF_IFSCOPE, RTF_STATIC, RTF_UP, RTF_WASCLONED, RouteMessage,
    Sockaddr,
};
use super::{AddressFamily, RouteEntry, RouteTable};

/// Parse a raw dump into the routes default routing would consider,
/// most specific first
pub fn parse_routing_table(buf: &[u8], family: AddressFamily) -> RouteTable {
    let mut routes = Vec::new();

    for message in Messages::new(buf) {
        if !is_default_route_candidate(&message) {
            continue;
        }
        if message.family() != Some(family.sa_family()) {
            continue;
        }

        let sockaddrs = message.sockaddrs();
        let Some(dst) = sockaddrs[RTAX_DST] else {
            continue;
        };

        match parse_route(family, message.index(), dst, sockaddrs[RTAX_NETMASK]) {
            Some(route) => routes.push(route),
            None => tracing::debug!(
                "Skipping {} route with truncated destination (index {})",
                family,
                message.index()
            ),
        }
    }

    RouteTable::from_unsorted(routes)
}

/// Usable, static routes that were not cloned. Interface-scoped routes
/// are skipped: the OS only uses them for sockets already bound to the
/// interface, never when picking a route by default.
fn is_default_route_candidate(message: &RouteMessage<'_>) -> bool {
    let flags = message.flags();
    flags & RTF_UP != 0
        && flags & RTF_STATIC != 0
        && flags & RTF_WASCLONED == 0
        && flags & RTF_IFSCOPE == 0
}

fn parse_route(
    family: AddressFamily,
    interface_index: u32,
    dst: Sockaddr<'_>,
    netmask: Option<Sockaddr<'_>>,
) -> Option<RouteEntry> {
    let len = family.address_len();
    let offset = family.address_offset();

    if dst.family() != Some(family.sa_family()) {
        return None;
    }
    let addr = dst.data_from(offset).get(..len)?;

    let mut route = RouteEntry {
        interface_index,
        ..RouteEntry::default()
    };
    route.address[..len].copy_from_slice(addr);

    match netmask {
        // Host route
        None => route.netmask[..len].fill(0xff),
        // Default route: the mask carries no address bytes at all
        Some(mask) if mask.len() <= offset => {}
        // Netmask is in the kernel's compact form, not a full sockaddr
        Some(mask) => {
            let bytes = mask.data_from(offset);
            let n = bytes.len().min(len);
            route.netmask[..n].copy_from_slice(&bytes[..n]);
        }
    }

    Some(route)
}
