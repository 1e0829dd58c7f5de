// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential storage: the access/refresh token pair and the cached user profile.
//!
//! The store is a plain key/value contract. It has no opinion on token
//! lifetimes; the gateway is the only writer and decides when tokens are
//! replaced or wiped.

pub mod persist;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Keys held by a [`CredentialStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
    /// Cached user profile, as JSON text.
    User,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 3] = [Self::AccessToken, Self::RefreshToken, Self::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::User => "user",
        }
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access and refresh tokens issued together by login or SSO exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Synchronous key/value credential storage.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> Option<String>;
    fn set(&self, key: CredentialKey, value: &str);
    fn remove(&self, key: CredentialKey);

    /// Write a freshly issued pair, plus the user profile when the backend sent one.
    fn store_session(&self, pair: &CredentialPair, user: Option<&str>) {
        self.set(CredentialKey::AccessToken, &pair.access_token);
        self.set(CredentialKey::RefreshToken, &pair.refresh_token);
        match user {
            Some(user) => self.set(CredentialKey::User, user),
            None => self.remove(CredentialKey::User),
        }
    }

    /// Remove every stored credential.
    fn clear(&self) {
        for key in CredentialKey::ALL {
            self.remove(key);
        }
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<CredentialKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: &CredentialPair) -> Self {
        let store = Self::new();
        store.set(CredentialKey::AccessToken, &pair.access_token);
        store.set(CredentialKey::RefreshToken, &pair.refresh_token);
        store
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.values.lock().get(&key).cloned()
    }

    fn set(&self, key: CredentialKey, value: &str) {
        self.values.lock().insert(key, value.to_owned());
    }

    fn remove(&self, key: CredentialKey) {
        self.values.lock().remove(&key);
    }
}

/// Resolve the state directory for persisted credentials.
///
/// Checks `ARCALL_STATE_DIR`, then `$XDG_STATE_HOME/arcall`,
/// then `$HOME/.local/state/arcall`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ARCALL_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("arcall");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/arcall");
    }
    PathBuf::from(".arcall")
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
