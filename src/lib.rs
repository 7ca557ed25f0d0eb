//! Outgoing interface resolution from the kernel routing table.
//!
//! ```no_run
//! let resolver = route_resolver::create();
//! if let Some(index) = resolver.resolve("10.1.2.3".parse().unwrap()) {
//!     println!("bind to interface {}", index);
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod routes;

pub use config::ResolverConfig;
pub use error::{RouteError, RouteResult};
pub use routes::resolver::{
    CachingRouteResolver, NoopRouteResolver, RouteResolver, RouteResolverPtr, create,
    create_with_config,
};
pub use routes::{AddressFamily, RouteEntry, RouteTable};
