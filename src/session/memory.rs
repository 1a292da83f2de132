//! In-memory session store.
//!
//! # Responsibilities
//! - Keep session records in a concurrent map keyed by id
//! - Generate collision-free, unpredictable session ids
//! - Enforce expiry lazily on reads and via an optional background sweeper
//!
//! # Design Decisions
//! - DashMap per-entry atomicity is sufficient: the cooperative scheduling
//!   model has no preemptive parallelism over one worker's state, and
//!   cross-worker deployments shard by process
//! - Expired records are never returned as valid, whether or not the
//!   sweeper has reclaimed them yet

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::session::record::{Session, SessionRecord};
use crate::session::store::{SessionStore, StoreError};

/// Matches the default `session.ttl_secs`: 30 days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

// 48 alphanumeric chars ≈ 285 bits of entropy, comfortably above the
// 192-bit floor for bearer tokens.
const SESSION_ID_LEN: usize = 48;

/// Session store backed by a concurrent in-process map.
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    fn generate_id() -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect()
    }

    /// Drop every expired record. Returns how many were reclaimed.
    pub fn sweep(&self) -> usize {
        let now = SystemTime::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, record| !record.is_expired(now));
        before - self.sessions.len()
    }

    /// Run `sweep` on an interval until the shutdown signal fires.
    pub fn spawn_sweeper(
        store: Arc<Self>,
        every: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let reclaimed = store.sweep();
                        if reclaimed > 0 {
                            tracing::debug!(reclaimed, "Swept expired sessions");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: Option<&str>) -> Session {
        let Some(id) = session_id else {
            return Session::unsaved();
        };
        // Clone out under the shard lock, decide after releasing it;
        // removing while holding the entry guard would deadlock.
        let record = self.sessions.get(id).map(|entry| entry.value().clone());
        match record {
            Some(record) if record.is_expired(SystemTime::now()) => {
                self.sessions.remove(id);
                Session::unsaved()
            }
            Some(record) => Session::from_record(id, &record).unwrap_or_else(Session::unsaved),
            None => Session::unsaved(),
        }
    }

    async fn set(&self, session: &mut Session) -> Result<(), StoreError> {
        session.refresh_expiry(self.ttl);
        let record = session.to_record();

        match session.id() {
            Some(id) => {
                self.sessions.insert(id.to_string(), record);
            }
            None => {
                let id = loop {
                    let candidate = Self::generate_id();
                    if !self.sessions.contains_key(&candidate) {
                        break candidate;
                    }
                };
                self.sessions.insert(id.clone(), record);
                session.assign_id(id);
            }
        }

        session.clear_dirty();
        Ok(())
    }

    async fn remove(&self, session: &Session) -> Result<bool, StoreError> {
        let removed = match session.id() {
            Some(id) => self.sessions.remove(id).is_some(),
            None => false,
        };
        Ok(removed)
    }

    fn count(&self) -> usize {
        let now = SystemTime::now();
        self.sessions
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_id_yields_unsaved_session() {
        let store = InMemorySessionStore::default();
        let session = store.get(None).await;
        assert!(session.id().is_none());
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_unknown_id_yields_unsaved_session() {
        let store = InMemorySessionStore::default();
        let session = store.get(Some("nosuchsession")).await;
        assert!(session.id().is_none());
    }

    #[tokio::test]
    async fn test_set_assigns_id_and_clears_dirty() {
        let store = InMemorySessionStore::default();
        let mut session = Session::unsaved();
        session.set("k", "v");
        store.set(&mut session).await.unwrap();

        let id = session.id().expect("id assigned").to_string();
        assert_eq!(id.len(), SESSION_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!session.is_dirty());

        let loaded = store.get(Some(&id)).await;
        assert_eq!(loaded.id(), Some(id.as_str()));
        assert_eq!(loaded.get("k"), Some(&serde_json::Value::from("v")));
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let store = InMemorySessionStore::default();
        for _ in 0..50 {
            let mut session = Session::unsaved();
            session.set("k", "v");
            store.set(&mut session).await.unwrap();
        }
        assert_eq!(store.count(), 50);
    }

    #[tokio::test]
    async fn test_remove_twice_reports_not_found() {
        let store = InMemorySessionStore::default();
        let mut session = Session::unsaved();
        session.set("k", "v");
        store.set(&mut session).await.unwrap();

        assert!(store.remove(&session).await.unwrap());
        assert!(!store.remove(&session).await.unwrap());
        assert!(!store.remove(&Session::unsaved()).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_session_is_not_returned() {
        let store = InMemorySessionStore::new(Duration::ZERO);
        let mut session = Session::unsaved();
        session.set("k", "v");
        store.set(&mut session).await.unwrap();
        let id = session.id().unwrap().to_string();

        let loaded = store.get(Some(&id)).await;
        assert!(loaded.id().is_none(), "expired record must read as unsaved");
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_reclaims_expired() {
        let store = InMemorySessionStore::new(Duration::ZERO);
        let mut session = Session::unsaved();
        session.set("k", "v");
        store.set(&mut session).await.unwrap();

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.sweep(), 0);
    }
}
