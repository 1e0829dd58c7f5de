// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use super::*;

fn pair() -> CredentialPair {
    CredentialPair { access_token: "a-1".to_owned(), refresh_token: "r-1".to_owned() }
}

#[test]
fn memory_store_get_set_remove() {
    let store = MemoryStore::new();
    assert_eq!(store.get(CredentialKey::AccessToken), None);

    store.set(CredentialKey::AccessToken, "a-1");
    assert_eq!(store.get(CredentialKey::AccessToken).as_deref(), Some("a-1"));

    store.set(CredentialKey::AccessToken, "a-2");
    assert_eq!(store.get(CredentialKey::AccessToken).as_deref(), Some("a-2"));

    store.remove(CredentialKey::AccessToken);
    assert_eq!(store.get(CredentialKey::AccessToken), None);
}

#[test]
fn store_session_writes_pair_and_user() {
    let store = MemoryStore::new();
    store.store_session(&pair(), Some(r#"{"name":"Billing Desk"}"#));

    assert_eq!(store.get(CredentialKey::AccessToken).as_deref(), Some("a-1"));
    assert_eq!(store.get(CredentialKey::RefreshToken).as_deref(), Some("r-1"));
    assert_eq!(store.get(CredentialKey::User).as_deref(), Some(r#"{"name":"Billing Desk"}"#));
}

#[test]
fn store_session_without_user_drops_stale_profile() {
    let store = MemoryStore::with_pair(&pair());
    store.set(CredentialKey::User, r#"{"name":"Previous User"}"#);

    store.store_session(&pair(), None);
    assert_eq!(store.get(CredentialKey::User), None);
}

#[test]
fn clear_removes_every_key() {
    let store = MemoryStore::with_pair(&pair());
    store.set(CredentialKey::User, "{}");

    store.clear();
    for key in CredentialKey::ALL {
        assert_eq!(store.get(key), None, "{key}");
    }
}

#[test]
fn pair_debug_is_redacted() {
    let debug = format!("{:?}", pair());
    assert!(!debug.contains("a-1"), "{debug}");
    assert!(!debug.contains("r-1"), "{debug}");
    assert!(debug.contains("[REDACTED]"));
}

#[yare::parameterized(
    access  = { CredentialKey::AccessToken, "access_token" },
    refresh = { CredentialKey::RefreshToken, "refresh_token" },
    user    = { CredentialKey::User, "user" },
)]
fn key_names(key: CredentialKey, expected: &str) {
    assert_eq!(key.as_str(), expected);
    assert_eq!(key.to_string(), expected);
}

/// Restores the env vars `state_dir` reads once the test is done.
struct EnvGuard(Vec<(&'static str, Option<String>)>);

impl EnvGuard {
    fn capture() -> Self {
        Self(
            ["ARCALL_STATE_DIR", "XDG_STATE_HOME", "HOME"]
                .into_iter()
                .map(|name| (name, std::env::var(name).ok()))
                .collect(),
        )
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.0 {
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
        }
    }
}

#[test]
#[serial_test::serial]
fn state_dir_resolution_order() {
    let _guard = EnvGuard::capture();
    std::env::set_var("HOME", "/home/billing");
    std::env::remove_var("XDG_STATE_HOME");
    std::env::remove_var("ARCALL_STATE_DIR");
    assert_eq!(state_dir(), PathBuf::from("/home/billing/.local/state/arcall"));

    std::env::set_var("XDG_STATE_HOME", "/var/state");
    assert_eq!(state_dir(), PathBuf::from("/var/state/arcall"));

    std::env::set_var("ARCALL_STATE_DIR", "/srv/arcall");
    assert_eq!(state_dir(), PathBuf::from("/srv/arcall"));
}
