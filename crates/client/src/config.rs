// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use crate::gateway::retry::BackoffPolicy;

/// Configuration for the gateway client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Backend base URL; request paths are appended to it.
    #[arg(long, default_value = "http://localhost:8000/api", env = "ARCALL_API_URL")]
    pub api_url: String,

    /// Per-request timeout in seconds. Bulk endpoints (uploads, listings) are slow.
    #[arg(long, default_value_t = 120, env = "ARCALL_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Retries for connection failures and timeouts.
    #[arg(long, default_value_t = 2, env = "ARCALL_MAX_NETWORK_RETRIES")]
    pub max_network_retries: u32,

    /// Backoff base in milliseconds; retry `n` waits `base * 2^n`.
    #[arg(long, default_value_t = 1000, env = "ARCALL_BACKOFF_BASE_MS")]
    pub backoff_base_ms: u64,

    /// Token refresh endpoint path.
    #[arg(long, default_value = "/auth/refresh", env = "ARCALL_REFRESH_PATH")]
    pub refresh_path: String,

    /// Login entry point reported when the session can't be recovered.
    #[arg(long, default_value = "/login?session=expired", env = "ARCALL_LOGIN_REDIRECT")]
    pub login_redirect: String,

    /// Directory holding `credentials.json`.
    #[arg(long, env = "ARCALL_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Log format (json or text).
    #[arg(long, env = "ARCALL_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "ARCALL_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

impl ClientConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| anyhow::anyhow!("--api-url {:?} is not a valid URL: {e}", self.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("--api-url must use http or https, got {}", url.scheme());
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be greater than zero");
        }
        if !self.refresh_path.starts_with('/') {
            anyhow::bail!("--refresh-path must start with '/'");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_network_retries: self.max_network_retries,
            base: Duration::from_millis(self.backoff_base_ms),
        }
    }

    /// Explicit `--state-dir`, else the default resolution in [`crate::credential::state_dir`].
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(crate::credential::state_dir)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
