//! Route resolver: picks the interface default routing would use for an address.
//!
//! On Apple platforms, a socket may need to be bound to an interface
//! explicitly (`IP_BOUND_IF` / `IPV6_BOUND_IF`) to reach a destination
//! routed through another network extension's tunnel. The resolver reads
//! the kernel routing table, keeps only the routes the OS would pick by
//! default, and returns the interface index of the most specific match.
//! Elsewhere it resolves nothing.

use parking_lot::Mutex;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Level;

use super::lookup::Destination;
use super::parser::parse_routing_table;
use super::sysctl::TableSource;
use super::{AddressFamily, RouteTable, interface_name};
use crate::clock::{Clock, MonotonicClock};
use crate::config::ResolverConfig;

/// Interface lookup for outgoing connections. Thread-safe.
pub trait RouteResolver: Send + Sync {
    /// Index of the interface to bind to when connecting to `address`,
    /// or `None` if no route was found or the table could not be read
    fn resolve(&self, address: IpAddr) -> Option<u32>;

    /// Drop cached routing tables
    fn flush_cache(&self);
}

pub type RouteResolverPtr = Box<dyn RouteResolver>;

/// Resolver for platforms without routing table introspection
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRouteResolver;

impl RouteResolver for NoopRouteResolver {
    fn resolve(&self, _address: IpAddr) -> Option<u32> {
        None
    }

    fn flush_cache(&self) {}
}

#[derive(Debug, Default)]
struct CacheSlots {
    ipv4: Option<Arc<RouteTable>>,
    ipv6: Option<Arc<RouteTable>>,
}

impl CacheSlots {
    fn slot_mut(&mut self, family: AddressFamily) -> &mut Option<Arc<RouteTable>> {
        match family {
            AddressFamily::Inet => &mut self.ipv4,
            AddressFamily::Inet6 => &mut self.ipv6,
        }
    }
}

/// Resolver that caches one parsed table per address family.
///
/// For `grace_period` after creation the cache is neither read nor written,
/// so a table taken while the network is still settling does not stick.
/// After that a table is read on first use and kept until `flush_cache`.
pub struct CachingRouteResolver<S, C = MonotonicClock> {
    source: S,
    clock: C,
    created_at: Instant,
    grace_period: Duration,
    cache: Mutex<CacheSlots>,
}

impl<S: TableSource> CachingRouteResolver<S> {
    pub fn new(source: S, config: &ResolverConfig) -> Self {
        Self::with_clock(source, MonotonicClock, config)
    }
}

impl<S: TableSource, C: Clock> CachingRouteResolver<S, C> {
    pub fn with_clock(source: S, clock: C, config: &ResolverConfig) -> Self {
        let created_at = clock.now();
        CachingRouteResolver {
            source,
            clock,
            created_at,
            grace_period: config.grace_period(),
            cache: Mutex::new(CacheSlots::default()),
        }
    }

    fn in_grace_period(&self) -> bool {
        self.clock.now().saturating_duration_since(self.created_at) < self.grace_period
    }

    fn read_table(&self, family: AddressFamily) -> Option<RouteTable> {
        match self.source.dump(family) {
            Ok(buf) => Some(parse_routing_table(&buf, family)),
            Err(e) => {
                tracing::warn!("Failed to dump routing table: {}", e);
                None
            }
        }
    }

    /// Table to match against, and whether it came from the cache
    fn table(&self, family: AddressFamily) -> Option<(Arc<RouteTable>, bool)> {
        let mut cache = self.cache.lock();

        if self.in_grace_period() {
            return self.read_table(family).map(|table| (Arc::new(table), false));
        }

        let slot = cache.slot_mut(family);
        if let Some(table) = slot.as_ref() {
            return Some((Arc::clone(table), true));
        }
        // An empty table is never cached, so routes appearing later are picked up
        let table = Arc::new(self.read_table(family)?);
        if !table.is_empty() {
            *slot = Some(Arc::clone(&table));
        }
        Some((table, false))
    }
}

impl<S: TableSource, C: Clock> RouteResolver for CachingRouteResolver<S, C> {
    fn resolve(&self, address: IpAddr) -> Option<u32> {
        let dest = Destination::new(address);
        let (table, cached) = self.table(dest.family())?;

        if tracing::enabled!(Level::TRACE) {
            log_table(dest.family(), &table, cached);
        }

        match table.lookup(&dest) {
            Some(index) => {
                tracing::debug!("Match {} -> {}", address, interface_name(index));
                Some(index)
            }
            None => {
                tracing::debug!("No match for {}", address);
                None
            }
        }
    }

    fn flush_cache(&self) {
        tracing::debug!("Flushing routing cache");
        let mut cache = self.cache.lock();
        *cache = CacheSlots::default();
    }
}

fn log_table(family: AddressFamily, table: &RouteTable, cached: bool) {
    tracing::trace!(
        "Using {} table ({} entries, {}):",
        family,
        table.len(),
        if cached { "cached" } else { "just read" }
    );
    for route in table.entries() {
        tracing::trace!(
            "{}/{} -> {}",
            route.destination(family),
            route.prefix_len(),
            interface_name(route.interface_index)
        );
    }
    tracing::trace!("End of table");
}

/// Create the resolver for this platform with default settings
pub fn create() -> RouteResolverPtr {
    create_with_config(&ResolverConfig::default())
}

/// Create the resolver for this platform
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub fn create_with_config(config: &ResolverConfig) -> RouteResolverPtr {
    use super::sysctl::{KernelTableSource, Sysctl};

    Box::new(CachingRouteResolver::new(
        KernelTableSource::new(Sysctl, config.max_dump_attempts),
        config,
    ))
}

/// Create the resolver for this platform
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub fn create_with_config(config: &ResolverConfig) -> RouteResolverPtr {
    let _ = config;
    Box::new(NoopRouteResolver)
}
