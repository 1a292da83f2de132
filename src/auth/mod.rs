//! Authentication and authorization subsystem.
//!
//! # Data Flow
//! ```text
//! Route declaration
//!     → descriptor.rs (allowed-role set attached to the route)
//!
//! Per request (auth-required routes only):
//!     session user → present? → role sets intersect? → handler
//!                  → absent   → 401
//!
//! Login (reference endpoints in routes.rs):
//!     credentials → users.rs directory lookup → digest check
//!                 → session user projection stored, cookie issued
//! ```
//!
//! # Design Decisions
//! - The dispatch core enforces authorization but mandates no login
//!   mechanism; login/logout are ordinary routes built from the same
//!   primitives every service uses
//! - Users are an external collaborator's data; the pipeline only ever
//!   consumes their role set

pub mod descriptor;
pub mod routes;
pub mod users;

pub use descriptor::Authorization;
pub use users::{DirectoryError, InMemoryUserDirectory, User, UserDirectory};
