//! User records and the directory the login flow consults.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::session::SessionUser;

/// User directory backend failure.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// A registered user. The dispatch core never persists or mutates these;
/// it only consumes the role set through the session projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_digest: String,
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub additional_info: BTreeMap<String, Value>,
}

impl User {
    /// Build a user from plaintext credentials, digesting the password.
    pub fn create<I, S>(username: impl Into<String>, password: &str, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            password_digest: digest_password(password),
            roles: roles.into_iter().map(Into::into).collect(),
            additional_info: BTreeMap::new(),
        }
    }

    pub fn check_password(&self, password: &str) -> bool {
        digest_password(password) == self.password_digest
    }

    pub fn get_roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// The minimal projection stored in a session on login.
    pub fn session_user(&self) -> SessionUser {
        SessionUser::new(self.username.clone(), self.roles.clone())
    }
}

fn digest_password(password: &str) -> String {
    let hash = Sha256::digest(password.as_bytes());
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Lookup capability the login flow needs from the auth collaborator.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, username: &str) -> Result<Option<User>, DirectoryError>;
}

/// Process-local user directory for tests and small deployments.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<String, User>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub fn put_user(&self, user: User) {
        self.users.insert(user.username.clone(), user);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, username: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }
}
