//! Registry of dashboard login users.
//!
//! Users come from bootstrap code or from a `user:pass,user2:pass2` string
//! (CLI flag or environment). Verifying credentials and signing session
//! cookies happens in the HTTP layer, which consumes [`AuthRegistry::users`].

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// A username/password pair.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub username: String,
    pub password: String,
}

impl AuthUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parse `"user:pass,user2:pass2"`.
///
/// Each entry splits on its first colon, so passwords may contain colons.
/// Entries without a colon, or with an empty username, are dropped.
pub fn parse_auth_users(raw: &str) -> Vec<AuthUser> {
    raw.split(',')
        .filter_map(|entry| match entry.split_once(':') {
            Some((user, pass)) if !user.is_empty() => Some(AuthUser::new(user, pass)),
            _ => None,
        })
        .collect()
}

/// Append-only list of configured users.
#[derive(Debug, Clone, Default)]
pub struct AuthRegistry {
    users: Arc<RwLock<Vec<AuthUser>>>,
}

impl AuthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `users`; duplicates are kept.
    pub fn register_users(&self, users: impl IntoIterator<Item = AuthUser>) {
        self.users
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .extend(users);
    }

    pub fn users(&self) -> Vec<AuthUser> {
        self.users.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn has_users(&self) -> bool {
        !self.users.read().unwrap_or_else(|p| p.into_inner()).is_empty()
    }

    pub fn clear(&self) {
        self.users.write().unwrap_or_else(|p| p.into_inner()).clear();
    }
}
