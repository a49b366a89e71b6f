// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived token status.

/// Snapshot view of the persisted access token, computed fresh on every
/// check and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenStatus {
    /// Whether an access token is present in the store.
    pub present: bool,
    /// Whole seconds until expiry, negative once past. `None` when the
    /// expiry cannot be determined.
    pub seconds_until_expiry: Option<i64>,
    /// The token is at or past its expiry.
    pub expired: bool,
    /// The token is inside the refresh-due window.
    pub refresh_due: bool,
}

impl TokenStatus {
    /// Status for an empty store — the logged-out steady state.
    pub fn absent() -> Self {
        Self { present: false, seconds_until_expiry: None, expired: false, refresh_due: false }
    }

    /// Status for a present token whose expiry could not be determined.
    /// No time-based refresh decision can be made from this.
    pub fn unknown_expiry() -> Self {
        Self { present: true, seconds_until_expiry: None, expired: false, refresh_due: false }
    }

    /// Derive status from an absolute expiry and the current time.
    ///
    /// Uses euclidean division so a token a fraction of a second past its
    /// expiry still floors to a negative second count.
    pub fn from_expiry(expires_at_ms: u64, now_ms: u64, threshold_secs: u64) -> Self {
        let seconds = (expires_at_ms as i64 - now_ms as i64).div_euclid(1000);
        Self {
            present: true,
            seconds_until_expiry: Some(seconds),
            expired: seconds <= 0,
            refresh_due: seconds <= threshold_secs as i64,
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
