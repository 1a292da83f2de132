//! Session store contract, polymorphic over backends.

use async_trait::async_trait;
use thiserror::Error;

use crate::session::record::Session;

/// Session backend failure. Reaching the backend at all is the only thing
/// that can go wrong at this contract's level; lookups of unknown or
/// expired ids are not errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session backend unavailable: {0}")]
    Unavailable(String),
}

/// Keyed persistence for session records.
///
/// Backends must be safe under concurrent `get`/`set`/`remove` for
/// different ids; same-id races are last-writer-wins by design (cookie
/// bearer model, not a CRDT).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolve an id to a session. A `None`, unknown, or expired id yields
    /// a fresh unsaved session, never an error.
    async fn get(&self, session_id: Option<&str>) -> Session;

    /// Persist a session. Assigns a fresh unique id when the session has
    /// none, refreshes its expiry, and clears the dirty flag.
    async fn set(&self, session: &mut Session) -> Result<(), StoreError>;

    /// Delete by id. Returns `false` when the id was absent or unknown;
    /// the caller decides how suspicious that is.
    async fn remove(&self, session: &Session) -> Result<bool, StoreError>;

    /// Number of live (unexpired) sessions.
    fn count(&self) -> usize;
}
