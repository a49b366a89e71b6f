// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `tokengate` binary as a subprocess against a temp-dir
//! credential store and a local refresh endpoint.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Resolve the path to the compiled `tokengate` binary.
pub fn tokengate_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("tokengate")
}

/// A running `tokengate` process that is killed on drop.
pub struct TokengateProcess {
    child: Child,
    store_path: PathBuf,
    _store_dir: tempfile::TempDir,
}

impl TokengateProcess {
    /// Spawn tokengate against `refresh_addr` with a fresh temp-dir store.
    ///
    /// `seed` is written as the store file before launch; `None` starts
    /// with no store file at all (the logged-out steady state).
    pub fn spawn(
        refresh_addr: SocketAddr,
        seed: Option<&serde_json::Value>,
        extra_args: &[&str],
    ) -> anyhow::Result<Self> {
        let binary = tokengate_binary();
        anyhow::ensure!(binary.exists(), "tokengate binary not found at {}", binary.display());

        let store_dir = tempfile::tempdir()?;
        let store_path = store_dir.path().join("credentials.json");
        if let Some(seed) = seed {
            std::fs::write(&store_path, serde_json::to_string_pretty(seed)?)?;
        }

        let mut args: Vec<String> = vec![
            "--refresh-url".into(),
            format!("http://{refresh_addr}/refresh"),
            "--store-path".into(),
            store_path.to_string_lossy().into_owned(),
        ];
        args.extend(extra_args.iter().map(|s| s.to_string()));

        let child = Command::new(&binary)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child, store_path, _store_dir: store_dir })
    }

    /// Path of the store file the daemon operates on.
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Read the store file as a JSON object, if it exists.
    pub fn read_store(&self) -> Option<serde_json::Value> {
        let data = std::fs::read_to_string(&self.store_path).ok()?;
        serde_json::from_str(&data).ok()
    }

    /// Whether the process is still alive.
    pub fn still_running(&mut self) -> anyhow::Result<bool> {
        Ok(self.child.try_wait()?.is_none())
    }

    /// Poll `predicate` against the store file until it holds or `timeout`
    /// elapses.
    pub async fn wait_for_store(
        &self,
        timeout: Duration,
        predicate: impl Fn(&serde_json::Value) -> bool,
    ) -> anyhow::Result<serde_json::Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("store did not reach expected state within {timeout:?}");
            }
            if let Some(store) = self.read_store() {
                if predicate(&store) {
                    return Ok(store);
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for TokengateProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
