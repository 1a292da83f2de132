//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request cookie
//!     → store.get(id); unknown/expired ids yield a fresh unsaved Session
//!     → SessionHandle bound to the request context
//!     → handler mutates through set/get/mark_for_removal
//!     → pipeline finalization: remove if marked, persist if dirty,
//!       Set-Cookie with the (possibly new) id
//! ```
//!
//! # Design Decisions
//! - Each request works on a private in-memory Session copy; the store is
//!   the only object shared across concurrent requests
//! - Records carry a version tag so backends can evolve the payload format
//! - Ids are bearer tokens: drawn from the OS entropy source, 48
//!   alphanumeric chars, retry-on-conflict against existing keys

pub mod memory;
pub mod record;
pub mod store;

pub use memory::InMemorySessionStore;
pub use record::{Session, SessionHandle, SessionRecord, SessionUser, SESSION_USER_KEY};
pub use store::{SessionStore, StoreError};
