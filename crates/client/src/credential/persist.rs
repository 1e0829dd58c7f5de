// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed credential store: one JSON document, rewritten atomically on
//! every change.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::credential::{CredentialKey, CredentialStore};

/// On-disk shape of the credential file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl PersistedCredentials {
    fn slot(&self, key: CredentialKey) -> &Option<String> {
        match key {
            CredentialKey::AccessToken => &self.access_token,
            CredentialKey::RefreshToken => &self.refresh_token,
            CredentialKey::User => &self.user,
        }
    }

    fn slot_mut(&mut self, key: CredentialKey) -> &mut Option<String> {
        match key {
            CredentialKey::AccessToken => &mut self.access_token,
            CredentialKey::RefreshToken => &mut self.refresh_token,
            CredentialKey::User => &mut self.user,
        }
    }
}

pub fn load(path: &Path) -> anyhow::Result<PersistedCredentials> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write tmp + rename. The file holds live tokens, so on unix it is created
/// owner-only before any bytes land in it.
pub fn save(path: &Path, creds: &PersistedCredentials) -> anyhow::Result<()> {
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(creds)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_path = path.with_file_name(format!(
        "{}.{}.{seq}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
    ));

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&tmp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Credential store persisted to `credentials.json`.
///
/// The in-memory copy is authoritative for the process; a failed write is
/// logged and otherwise ignored.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Mutex<PersistedCredentials>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store, and so is
    /// a malformed one (logged; overwritten by the next change). Read errors
    /// are fatal.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(creds) => creds,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        err = %e,
                        "ignoring unreadable credentials file"
                    );
                    PersistedCredentials::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PersistedCredentials::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, state: Mutex::new(state) })
    }

    /// Open `<dir>/credentials.json`, creating `dir` if needed.
    pub fn in_dir(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Self::open(dir.join("credentials.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, key: CredentialKey, value: Option<String>) {
        let mut state = self.state.lock();
        if *state.slot(key) == value {
            return;
        }
        *state.slot_mut(key) = value;
        // Written under the lock so saves land in mutation order.
        if let Err(e) = save(&self.path, &state) {
            tracing::warn!(path = %self.path.display(), err = %e, "failed to persist credentials");
        }
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.state.lock().slot(key).clone()
    }

    fn set(&self, key: CredentialKey, value: &str) {
        self.update(key, Some(value.to_owned()));
    }

    fn remove(&self, key: CredentialKey) {
        self.update(key, None);
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
