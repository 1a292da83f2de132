//! Session representation and its serialized form.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved session key holding the logged-in user projection.
pub const SESSION_USER_KEY: &str = "_user_";

/// Version tag written into every stored record. Readers treat an
/// unrecognized version the same as an unknown id.
pub const RECORD_VERSION: u16 = 1;

/// The user projection kept in a session: a reference by username plus the
/// role snapshot authorization needs, never the full user object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub roles: BTreeSet<String>,
}

impl SessionUser {
    pub fn new(username: impl Into<String>, roles: BTreeSet<String>) -> Self {
        Self {
            username: username.into(),
            roles,
        }
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }
}

/// One session's in-memory state: a key-value bag plus lifecycle flags.
///
/// Created transiently for every request lacking a valid cookie (no id,
/// empty data). Becomes persistent only when `dirty` is set and the request
/// completes; removed when `pending_removal` is set.
#[derive(Debug, Clone)]
pub struct Session {
    id: Option<String>,
    data: BTreeMap<String, Value>,
    expires_at: Option<SystemTime>,
    dirty: bool,
    pending_removal: bool,
}

impl Session {
    /// A fresh session that exists only in memory until first persisted.
    pub fn unsaved() -> Self {
        Self {
            id: None,
            data: BTreeMap::new(),
            expires_at: None,
            dirty: false,
            pending_removal: false,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Store a value and mark the session dirty.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the session for removal at finalization.
    pub fn mark_for_removal(&mut self) {
        self.pending_removal = true;
    }

    pub fn pending_removal(&self) -> bool {
        self.pending_removal
    }

    /// The logged-in user, if any.
    pub fn user(&self) -> Option<SessionUser> {
        let value = self.data.get(SESSION_USER_KEY)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Attach a user projection; marks the session dirty.
    pub fn set_user(&mut self, user: SessionUser) {
        let value = serde_json::to_value(&user).unwrap_or(Value::Null);
        self.set(SESSION_USER_KEY, value);
    }

    /// Detach the user while keeping the session alive; marks it dirty.
    pub fn clear_user(&mut self) {
        self.set(SESSION_USER_KEY, Value::Null);
    }

    /// Backend API: attach the id the store chose.
    pub fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    /// Backend API: push the expiry out to `now + ttl`.
    pub fn refresh_expiry(&mut self, ttl: Duration) {
        self.expires_at = Some(SystemTime::now() + ttl);
    }

    /// Backend API: acknowledge a completed write.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Serialize into the versioned store format.
    pub fn to_record(&self) -> SessionRecord {
        let expires_at = self
            .expires_at
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        SessionRecord {
            version: RECORD_VERSION,
            data: self.data.clone(),
            expires_at,
        }
    }

    /// Rehydrate from a stored record. Returns `None` for records written
    /// by an incompatible version; callers fall back to a fresh session.
    pub fn from_record(id: &str, record: &SessionRecord) -> Option<Self> {
        if record.version != RECORD_VERSION {
            return None;
        }
        Some(Self {
            id: Some(id.to_string()),
            data: record.data.clone(),
            expires_at: Some(UNIX_EPOCH + Duration::from_secs(record.expires_at)),
            dirty: false,
            pending_removal: false,
        })
    }
}

/// The serialized form a store keeps: a tagged key-value encoding, not a
/// runtime object graph, so the payload format survives schema changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "v")]
    pub version: u16,
    pub data: BTreeMap<String, Value>,
    /// Unix seconds.
    pub expires_at: u64,
}

impl SessionRecord {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        let now = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        self.expires_at <= now
    }
}

/// Shared handle a handler uses to mutate its request's session.
///
/// Each request owns an independent session; the handle only exists so the
/// handler future and the finalization step can see the same state.
#[derive(Clone)]
pub struct SessionHandle(Arc<Mutex<Session>>);

impl SessionHandle {
    pub(crate) fn new(session: Session) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    pub fn id(&self) -> Option<String> {
        self.lock().id().map(str::to_string)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.lock().set(key, value);
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.lock().user()
    }

    pub fn set_user(&self, user: SessionUser) {
        self.lock().set_user(user);
    }

    pub fn clear_user(&self) {
        self.lock().clear_user();
    }

    pub fn mark_for_removal(&self) {
        self.lock().mark_for_removal();
    }

    /// Clone out the current state for finalization.
    pub(crate) fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    /// Write back state mutated by the store (assigned id, cleared flags).
    pub(crate) fn replace(&self, session: Session) {
        *self.lock() = session;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Session> {
        // The handle never crosses an await while locked; poisoning would
        // require a panic inside these short accessors.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}
