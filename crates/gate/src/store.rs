// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential persistence: three stable keys in a durable key-value store.
//!
//! The key names are a contract — other components read and write the same
//! keys (the login flow creates them, logout removes them), so they must
//! never change. This subsystem mutates credentials in place on refresh and
//! never deletes them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Store key holding the access token.
pub const KEY_ACCESS_TOKEN: &str = "auth_token";
/// Store key holding the refresh token.
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";
/// Store key holding the expiry as a string-encoded integer, milliseconds
/// since the Unix epoch.
pub const KEY_TOKEN_EXPIRY: &str = "auth_token_expiry";

/// Durable string key-value store scoped to the installation.
///
/// Injected into the manager so tests and embedders can substitute their
/// own backing storage.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// The persisted credential pair plus expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Expiry as milliseconds since the Unix epoch, when recorded.
    pub expires_at_ms: Option<u64>,
}

/// Load the credential record from the store. `None` when no access token
/// is present — the logged-out steady state, not an error.
pub fn load_credentials(store: &dyn CredentialStore) -> Option<CredentialRecord> {
    let access_token = store.get(KEY_ACCESS_TOKEN)?;
    let refresh_token = store.get(KEY_REFRESH_TOKEN);
    let expires_at_ms = store.get(KEY_TOKEN_EXPIRY).and_then(|v| v.parse().ok());
    Some(CredentialRecord { access_token, refresh_token, expires_at_ms })
}

/// Write the results of a successful refresh exchange.
///
/// The refresh token is only replaced when the endpoint rotated it. The
/// expiry key is removed when the new token's expiry could not be decoded,
/// so stale expiries never outlive the token they described.
pub fn apply_refresh(
    store: &dyn CredentialStore,
    access_token: &str,
    new_refresh_token: Option<&str>,
    expires_at_ms: Option<u64>,
) {
    store.set(KEY_ACCESS_TOKEN, access_token);
    if let Some(refresh) = new_refresh_token {
        store.set(KEY_REFRESH_TOKEN, refresh);
    }
    match expires_at_ms {
        Some(ms) => store.set(KEY_TOKEN_EXPIRY, &ms.to_string()),
        None => store.remove(KEY_TOKEN_EXPIRY),
    }
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// File-backed store: a single JSON object, saved atomically on every write.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open a store backed by `path`. A missing or unparsable file starts
    /// empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), "unparsable store file, starting empty: {e}");
                    HashMap::new()
                }
            },
            Err(e) => {
                debug!(path = %path.display(), "no store file: {e}");
                HashMap::new()
            }
        };
        Self { path, entries: Mutex::new(entries) }
    }

    /// Save atomically (write tmp + rename).
    ///
    /// Uses a unique temp filename (PID + counter) to avoid corruption when
    /// concurrent saves race on the same `.tmp` file — a shorter write can
    /// leave trailing bytes from a longer previous write.
    fn save(&self, entries: &HashMap<String, String>) {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let json = match serde_json::to_string_pretty(entries) {
            Ok(j) => j,
            Err(e) => {
                warn!("failed to serialize store: {e}");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp = self.path.with_file_name(tmp_name);
        if let Err(e) = std::fs::write(&tmp, json) {
            warn!(path = %tmp.display(), "failed to write store file: {e}");
            return;
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!(path = %self.path.display(), "failed to rename store file: {e}");
        }
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock();
        entries.insert(key.to_owned(), value.to_owned());
        self.save(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.save(&entries);
        }
    }
}

/// In-memory store for tests and embedders that manage their own durability.
#[derive(Default)]
pub struct MemStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
