// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Default liveness check interval.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
/// Default width of the refresh-due window before expiry.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 300;
/// Default minimum spacing between refresh attempts.
pub const DEFAULT_COOLDOWN_SECS: u64 = 5;
/// Default delay before arming the monitor after a credential appears,
/// letting companion writes (refresh token, expiry) land first.
pub const DEFAULT_ARM_DELAY_MS: u64 = 1000;
/// Default timeout for the refresh HTTP exchange.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration for the token lifecycle monitor.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "tokengate", about = "Session token lifecycle monitor")]
pub struct GateConfig {
    /// Refresh endpoint URL (POST {"refreshToken": "..."}).
    #[arg(long, env = "TOKENGATE_REFRESH_URL")]
    pub refresh_url: String,

    /// Path to the credential store file.
    #[arg(long, env = "TOKENGATE_STORE_PATH")]
    pub store_path: PathBuf,

    /// Liveness check interval in seconds.
    #[arg(long, default_value_t = DEFAULT_CHECK_INTERVAL_SECS, env = "TOKENGATE_CHECK_INTERVAL_SECS")]
    pub check_interval_secs: u64,

    /// Seconds before expiry at which a refresh becomes due.
    #[arg(long, default_value_t = DEFAULT_REFRESH_THRESHOLD_SECS, env = "TOKENGATE_REFRESH_THRESHOLD_SECS")]
    pub refresh_threshold_secs: u64,

    /// Minimum spacing between successive refresh attempts, in seconds.
    #[arg(long, default_value_t = DEFAULT_COOLDOWN_SECS, env = "TOKENGATE_COOLDOWN_SECS")]
    pub cooldown_secs: u64,

    /// Delay in milliseconds before arming the monitor once a credential
    /// is established.
    #[arg(long, default_value_t = DEFAULT_ARM_DELAY_MS, env = "TOKENGATE_ARM_DELAY_MS")]
    pub arm_delay_ms: u64,

    /// HTTP timeout for the refresh exchange, in seconds.
    #[arg(long, default_value_t = DEFAULT_HTTP_TIMEOUT_SECS, env = "TOKENGATE_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: u64,

    /// Enable debug logging.
    #[arg(long, env = "TOKENGATE_DEBUG")]
    pub debug: bool,
}

impl GateConfig {
    /// Config with defaults for library embedding; the binary parses the
    /// same struct from CLI args and environment.
    pub fn new(refresh_url: impl Into<String>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            refresh_url: refresh_url.into(),
            store_path: store_path.into(),
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            arm_delay_ms: DEFAULT_ARM_DELAY_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            debug: false,
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn arm_delay(&self) -> Duration {
        Duration::from_millis(self.arm_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
