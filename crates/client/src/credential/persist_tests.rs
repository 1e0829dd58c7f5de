// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::credential::CredentialPair;

#[test]
fn missing_file_opens_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::open(dir.path().join("credentials.json"))?;
    for key in CredentialKey::ALL {
        assert_eq!(store.get(key), None);
    }
    assert!(!store.path().exists(), "opening must not create the file");
    Ok(())
}

#[test]
fn values_survive_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::in_dir(dir.path())?;
    let pair =
        CredentialPair { access_token: "a-1".to_owned(), refresh_token: "r-1".to_owned() };
    store.store_session(&pair, Some(r#"{"name":"Billing Desk"}"#));
    drop(store);

    let reopened = FileStore::in_dir(dir.path())?;
    assert_eq!(reopened.get(CredentialKey::AccessToken).as_deref(), Some("a-1"));
    assert_eq!(reopened.get(CredentialKey::RefreshToken).as_deref(), Some("r-1"));
    assert_eq!(reopened.get(CredentialKey::User).as_deref(), Some(r#"{"name":"Billing Desk"}"#));
    Ok(())
}

#[test]
fn clear_is_persisted() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::in_dir(dir.path())?;
    store.set(CredentialKey::AccessToken, "a-1");
    store.set(CredentialKey::RefreshToken, "r-1");
    store.clear();

    assert_eq!(load(store.path())?, PersistedCredentials::default());
    let reopened = FileStore::open(store.path())?;
    assert_eq!(reopened.get(CredentialKey::RefreshToken), None);
    Ok(())
}

#[test]
fn in_dir_creates_missing_directories() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let nested = dir.path().join("state").join("arcall");
    let store = FileStore::in_dir(&nested)?;
    store.set(CredentialKey::AccessToken, "a-1");
    assert_eq!(store.path(), nested.join("credentials.json"));
    assert!(store.path().exists());
    Ok(())
}

#[yare::parameterized(
    truncated = { "{\"access_token\": \"a-1" },
    garbage   = { "{ not json" },
    wrong_type = { "[1, 2, 3]" },
)]
fn malformed_file_opens_empty_and_is_replaced(contents: &str) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, contents).expect("seed file");

    let store = FileStore::in_dir(dir.path()).expect("malformed file must not block opening");
    for key in CredentialKey::ALL {
        assert_eq!(store.get(key), None);
    }

    store.set(CredentialKey::AccessToken, "a-2");
    let reopened = FileStore::open(&path).expect("reopen");
    assert_eq!(reopened.get(CredentialKey::AccessToken).as_deref(), Some("a-2"));
}

#[cfg(unix)]
#[test]
fn credentials_file_is_owner_only() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let store = FileStore::in_dir(dir.path())?;
    store.set(CredentialKey::RefreshToken, "r-1");

    let mode = std::fs::metadata(store.path())?.permissions().mode() & 0o777;
    assert_eq!(mode, 0o600, "got {mode:o}");
    Ok(())
}

#[cfg(unix)]
#[test]
fn existing_world_readable_file_is_tightened_on_write() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, "{}")?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))?;

    let store = FileStore::open(&path)?;
    store.set(CredentialKey::AccessToken, "a-1");
    assert_eq!(std::fs::metadata(&path)?.permissions().mode() & 0o777, 0o600);
    Ok(())
}

#[test]
fn save_leaves_no_temp_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("credentials.json");
    let creds = PersistedCredentials {
        access_token: Some("a-1".to_owned()),
        refresh_token: None,
        user: None,
    };
    save(&path, &creds)?;
    save(&path, &creds)?;

    let names: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["credentials.json".to_owned()]);
    assert_eq!(load(&path)?, creds);
    Ok(())
}

#[test]
fn absent_fields_are_omitted_on_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::in_dir(dir.path())?;
    store.set(CredentialKey::AccessToken, "a-1");

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(store.path())?)?;
    assert_eq!(raw, serde_json::json!({ "access_token": "a-1" }));
    Ok(())
}
