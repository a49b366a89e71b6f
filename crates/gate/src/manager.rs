// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token lifecycle manager: periodic liveness checks and refresh exchanges.
//!
//! Owns the credential record through an injected [`CredentialStore`],
//! decides when the access token needs refreshing, performs the exchange
//! against the configured endpoint, and broadcasts [`TokenEvent`]s.
//! Nothing here is fatal — every failure degrades to "token stays as-is,
//! retry on the next tick or manual trigger".

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::GateConfig;
use crate::jwt;
use crate::status::TokenStatus;
use crate::store::{self, CredentialRecord, CredentialStore};

/// Clock abstraction so tests can steer the cooldown window without real
/// delays.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Lifecycle events broadcast to in-process observers.
///
/// Fire-and-forget: the manager never awaits or depends on listeners, and
/// a send with no receivers is not an error.
#[derive(Debug, Clone)]
pub enum TokenEvent {
    /// A refresh exchange succeeded and the store was updated.
    Refreshed { token: String, timestamp_ms: u64 },
    /// A refresh exchange failed; the store is unchanged.
    RefreshFailed { error: String, timestamp_ms: u64 },
}

/// Snapshot returned by [`TokenLifecycleManager::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub token: TokenStatus,
    pub monitor_active: bool,
}

/// Handle for the active monitor task. At most one per manager.
struct MonitorHandle {
    cancel: CancellationToken,
}

/// Wire body of the refresh request.
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Wire body of a successful refresh response. A missing `token` is a
/// protocol violation treated as failure; `refreshToken` rotation is
/// optional per response.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Why a refresh attempt stopped before reaching the network.
enum RefreshSkip {
    /// No refresh token in the store — the exchange cannot succeed.
    NoRefreshToken,
    /// Another attempt started inside the cooldown window.
    Cooldown,
}

/// Periodic token monitor and refresh executor.
pub struct TokenLifecycleManager {
    config: GateConfig,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    http: reqwest::Client,
    event_tx: broadcast::Sender<TokenEvent>,
    /// Epoch ms at which the last refresh attempt started (successful or
    /// not). Best-effort debounce, not a mutex — recorded before the
    /// network call resolves so near-simultaneous triggers both see it.
    last_attempt_ms: Mutex<Option<u64>>,
    /// Active monitor, if any.
    monitor: Mutex<Option<MonitorHandle>>,
}

impl TokenLifecycleManager {
    pub fn new(config: GateConfig, store: Arc<dyn CredentialStore>) -> Arc<Self> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Construct with an explicit clock (tests).
    pub fn with_clock(
        config: GateConfig,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .unwrap_or_default();
        Arc::new(Self {
            config,
            store,
            clock,
            http,
            event_tx,
            last_attempt_ms: Mutex::new(None),
            monitor: Mutex::new(None),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<TokenEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the periodic monitor is currently armed.
    pub fn monitor_active(&self) -> bool {
        self.monitor.lock().is_some()
    }

    /// Snapshot the current token status and monitor state. Pure read.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot { token: self.token_status(), monitor_active: self.monitor_active() }
    }

    fn token_status(&self) -> TokenStatus {
        let Some(record) = store::load_credentials(self.store.as_ref()) else {
            return TokenStatus::absent();
        };
        match self.resolve_expiry(&record) {
            Some(expires_at_ms) => TokenStatus::from_expiry(
                expires_at_ms,
                self.clock.now_ms(),
                self.config.refresh_threshold_secs,
            ),
            None => TokenStatus::unknown_expiry(),
        }
    }

    /// Resolve the absolute expiry: the stored key wins, otherwise the
    /// token's own `exp` claim.
    fn resolve_expiry(&self, record: &CredentialRecord) -> Option<u64> {
        if let Some(ms) = record.expires_at_ms {
            return Some(ms);
        }
        match jwt::decode_expiry_ms(&record.access_token) {
            Ok(ms) => Some(ms),
            Err(e) => {
                warn!("cannot determine token expiry: {e}");
                None
            }
        }
    }

    /// Start the periodic monitor: one immediate decide-and-refresh pass,
    /// then the same pass on every tick.
    ///
    /// Idempotent — a second call while a monitor is active logs a warning
    /// and does nothing.
    pub fn start(self: &Arc<Self>) {
        let cancel = {
            let mut monitor = self.monitor.lock();
            if monitor.is_some() {
                warn!("token monitor already active, ignoring start");
                return;
            }
            let cancel = CancellationToken::new();
            *monitor = Some(MonitorHandle { cancel: cancel.clone() });
            cancel
        };

        info!(interval_secs = self.config.check_interval_secs, "token monitor started");
        let mgr = Arc::clone(self);
        tokio::spawn(async move { mgr.monitor_loop(cancel).await });
    }

    /// Stop the periodic monitor. Only future ticks are cancelled; an
    /// in-flight refresh exchange still completes and applies its result.
    /// Safe to call when already stopped.
    pub fn stop(&self) {
        match self.monitor.lock().take() {
            Some(handle) => {
                handle.cancel.cancel();
                info!("token monitor stopped");
            }
            None => debug!("token monitor not active"),
        }
    }

    /// Start the monitor if a credential is already present; otherwise stay
    /// idle until [`notify_credential_established`] is called.
    ///
    /// [`notify_credential_established`]: Self::notify_credential_established
    pub fn auto_start(self: &Arc<Self>) {
        if store::load_credentials(self.store.as_ref()).is_some() {
            self.start();
        } else {
            info!("no credential present, monitor idle until a credential is established");
        }
    }

    /// Called by the login flow after it has written the credential keys.
    ///
    /// Arms the monitor after a short delay so companion writes (refresh
    /// token, expiry) land first. No-op when a monitor is already active.
    pub fn notify_credential_established(self: &Arc<Self>) {
        if self.monitor_active() {
            debug!("credential established but monitor already active");
            return;
        }
        let delay = self.config.arm_delay();
        let mgr = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            mgr.start();
        });
    }

    async fn monitor_loop(self: Arc<Self>, cancel: CancellationToken) {
        let interval = self.config.check_interval();
        self.check_and_refresh().await;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => {
                    debug!("monitor loop exiting");
                    return;
                }
            }
            self.check_and_refresh().await;
        }
    }

    /// One decide-and-refresh pass.
    async fn check_and_refresh(&self) {
        let Some(record) = store::load_credentials(self.store.as_ref()) else {
            // Logged-out steady state, not an error.
            debug!("no credential present, skipping check");
            return;
        };
        let Some(expires_at_ms) = self.resolve_expiry(&record) else {
            // No time-based decision possible. A manual refresh() is still
            // honored.
            return;
        };

        let status = TokenStatus::from_expiry(
            expires_at_ms,
            self.clock.now_ms(),
            self.config.refresh_threshold_secs,
        );
        if status.expired {
            // The refresh token may have independent, longer-lived validity.
            info!(seconds_until_expiry = ?status.seconds_until_expiry, "token expired, attempting refresh");
            self.attempt_refresh().await;
        } else if status.refresh_due {
            info!(seconds_until_expiry = ?status.seconds_until_expiry, "token inside refresh window, attempting refresh");
            self.attempt_refresh().await;
        } else {
            debug!(seconds_until_expiry = ?status.seconds_until_expiry, "token healthy");
        }
    }

    /// Force one refresh attempt regardless of due-ness, subject to the
    /// same refresh-token precondition and cooldown as the periodic path.
    /// Returns whether the exchange succeeded.
    pub async fn refresh(&self) -> bool {
        self.attempt_refresh().await
    }

    async fn attempt_refresh(&self) -> bool {
        let refresh_token = match self.guard_attempt() {
            Ok(token) => token,
            Err(RefreshSkip::NoRefreshToken) => {
                warn!("no refresh token available, cannot refresh");
                return false;
            }
            Err(RefreshSkip::Cooldown) => {
                debug!(
                    cooldown_secs = self.config.cooldown_secs,
                    "refresh attempt inside cooldown window, skipping"
                );
                return false;
            }
        };

        match self.exchange(&refresh_token).await {
            Ok(token) => {
                let _ = self
                    .event_tx
                    .send(TokenEvent::Refreshed { token, timestamp_ms: self.clock.now_ms() });
                true
            }
            Err(error) => {
                warn!("token refresh failed: {error}");
                let _ = self
                    .event_tx
                    .send(TokenEvent::RefreshFailed { error, timestamp_ms: self.clock.now_ms() });
                false
            }
        }
    }

    /// Check the refresh-token precondition and the cooldown. The attempt
    /// timestamp is recorded here, before the network call, so racing
    /// triggers inside one cooldown window are all suppressed.
    fn guard_attempt(&self) -> Result<String, RefreshSkip> {
        let refresh_token = store::load_credentials(self.store.as_ref())
            .and_then(|r| r.refresh_token)
            .ok_or(RefreshSkip::NoRefreshToken)?;

        let now = self.clock.now_ms();
        let mut last = self.last_attempt_ms.lock();
        if let Some(prev) = *last {
            if now.saturating_sub(prev) < self.config.cooldown_secs.saturating_mul(1000) {
                return Err(RefreshSkip::Cooldown);
            }
        }
        *last = Some(now);
        Ok(refresh_token)
    }

    /// The network round trip. The error string is human-readable and is
    /// carried on the failure event.
    async fn exchange(&self, refresh_token: &str) -> Result<String, String> {
        let resp = self
            .http
            .post(&self.config.refresh_url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| format!("refresh request failed: {e}"))?;

        let status = resp.status();
        let body =
            resp.text().await.map_err(|e| format!("read refresh response: {e}"))?;
        if !status.is_success() {
            return Err(format!("refresh endpoint returned {status}: {body}"));
        }

        let parsed: RefreshResponse =
            serde_json::from_str(&body).map_err(|e| format!("parse refresh response: {e}"))?;
        let Some(token) = parsed.token else {
            return Err("refresh response missing token".to_owned());
        };

        let expires_at_ms = match jwt::decode_expiry_ms(&token) {
            Ok(ms) => Some(ms),
            Err(e) => {
                warn!("refreshed token has no decodable expiry: {e}");
                None
            }
        };
        store::apply_refresh(
            self.store.as_ref(),
            &token,
            parsed.refresh_token.as_deref(),
            expires_at_ms,
        );
        debug!("token refreshed and persisted");
        Ok(token)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
