//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Service construction (at startup):
//!     ServiceRoutes builder (one explicit registration call per handler)
//!     → RouteRegistry::build (duplicate detection, introspection route)
//!     → Freeze as immutable registry shared behind Arc
//!
//! Per request:
//!     registry.resolve(method, path)
//!     → Return: matched Route or no-match (404)
//! ```
//!
//! # Design Decisions
//! - Routes registered once, immutable at runtime (no locking)
//! - Explicit builder calls instead of runtime introspection of tagged
//!   handlers; the route descriptor carries everything the pipeline needs
//! - The introspection listing is rendered once at build time; the
//!   registry never changes afterwards

pub mod registry;
pub mod route;

pub use registry::{RegistryError, RouteRegistry, INTROSPECT_PATH};
pub use route::{Handler, HandlerFuture, Reply, Route, ServiceRoutes};
