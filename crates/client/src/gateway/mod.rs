// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The authenticated gateway: every backend call goes through here.
//!
//! Per request:
//! - attach `Authorization: Bearer <access_token>` when one is stored;
//! - on 401, refresh the access token once (single-flight across all
//!   concurrent callers) and retry with the new token;
//! - on a connection failure or timeout, retry up to the policy's budget
//!   with exponential backoff;
//! - anything else comes back to the caller untouched.

pub mod refresh;
pub mod retry;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::ClientConfig;
use crate::credential::persist::FileStore;
use crate::credential::{CredentialKey, CredentialPair, CredentialStore};
use crate::error::GatewayError;
use crate::gateway::refresh::{exchange_refresh_token, RefreshCoordinator, Ticket};
use crate::gateway::retry::{Attempt, BackoffPolicy};
use crate::transport::http::HttpTransport;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Session lifecycle notifications for the application shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A credential pair was stored after login or SSO exchange.
    Established,
    /// The access token was replaced by a refresh.
    Refreshed,
    /// Credentials were wiped because the session can't be recovered. The
    /// shell should send the user to `redirect`.
    Terminated { reason: TerminationReason, redirect: String },
    /// Credentials were wiped on request.
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MissingRefreshToken,
    RefreshFailed,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRefreshToken => "missing_refresh_token",
            Self::RefreshFailed => "refresh_failed",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for a [`GatewayClient`].
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub policy: BackoffPolicy,
    pub refresh_path: String,
    pub login_redirect: String,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            policy: BackoffPolicy::default(),
            refresh_path: "/auth/refresh".to_owned(),
            login_redirect: "/login?session=expired".to_owned(),
        }
    }
}

impl From<&ClientConfig> for GatewayOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            policy: config.backoff_policy(),
            refresh_path: config.refresh_path.clone(),
            login_redirect: config.login_redirect.clone(),
        }
    }
}

/// Authenticated API client. Construct once and share via `Arc`; refresh
/// coordination is per instance.
pub struct GatewayClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    refresh: RefreshCoordinator,
    options: GatewayOptions,
    events: broadcast::Sender<SessionEvent>,
}

impl GatewayClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        options: GatewayOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self { transport, store, refresh: RefreshCoordinator::new(), options, events }
    }

    /// Production wiring: reqwest transport and the on-disk credential store.
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Arc<Self>> {
        let transport = HttpTransport::new(&config.api_url, config.timeout())?;
        let store = FileStore::in_dir(&config.state_dir())?;
        Ok(Arc::new(Self::new(Arc::new(transport), Arc::new(store), GatewayOptions::from(config))))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Whether an access token is currently stored.
    pub fn has_session(&self) -> bool {
        self.store.get(CredentialKey::AccessToken).is_some()
    }

    /// Store a pair issued by login or SSO exchange.
    pub fn establish_session(&self, pair: &CredentialPair, user: Option<&serde_json::Value>) {
        let user = user.map(|u| u.to_string());
        self.store.store_session(pair, user.as_deref());
        tracing::info!("session established");
        let _ = self.events.send(SessionEvent::Established);
    }

    /// Wipe stored credentials on request.
    pub fn end_session(&self) {
        self.store.clear();
        tracing::info!("session ended");
        let _ = self.events.send(SessionEvent::LoggedOut);
    }

    /// Issue `request`, recovering from expired credentials and transient
    /// network failures. Returns the first 2xx response, or the error that
    /// could not be recovered.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut attempt = Attempt::new();

        loop {
            let token = if request.authenticated {
                attempt
                    .token()
                    .map(str::to_owned)
                    .or_else(|| self.store.get(CredentialKey::AccessToken))
            } else {
                request.bearer.clone()
            };
            let outbound = request.clone().header("x-request-id", &request_id).bearer(token);

            tracing::debug!(
                method = %request.method,
                path = %request.path,
                request_id = %request_id,
                network_retries = attempt.network_retries(),
                "sending request"
            );

            match self.transport.send(outbound).await {
                Ok(resp) if resp.is_success() => return Ok(resp),
                Ok(resp)
                    if resp.is_unauthorized()
                        && request.authenticated
                        && !attempt.refresh_attempted() =>
                {
                    let token = self.recover_auth(&mut attempt).await?;
                    attempt.use_token(token);
                }
                Ok(resp) => {
                    tracing::debug!(path = %request.path, status = resp.status, "request failed");
                    return Err(GatewayError::Status(resp));
                }
                Err(e) if e.is_network() => match attempt.next_network_retry(&self.options.policy) {
                    Some(delay) => {
                        tracing::warn!(
                            path = %request.path,
                            attempt = attempt.network_retries(),
                            delay_ms = delay.as_millis() as u64,
                            err = %e,
                            "network failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(GatewayError::Transport(e)),
                },
                Err(e) => return Err(GatewayError::Transport(e)),
            }
        }
    }

    /// [`Self::request`] and decode the 2xx body as JSON.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, GatewayError> {
        let resp = self.request(request).await?;
        resp.json().map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Obtain a new access token after a 401, either by running the refresh
    /// or by waiting on the one already in flight.
    async fn recover_auth(&self, attempt: &mut Attempt) -> Result<String, GatewayError> {
        let Some(refresh_token) = self.store.get(CredentialKey::RefreshToken) else {
            self.store.clear();
            self.terminate_session(TerminationReason::MissingRefreshToken);
            return Err(GatewayError::SessionTerminated);
        };
        attempt.mark_refresh_attempted();

        let lease = match self.refresh.acquire() {
            Ticket::Lead(lease) => lease,
            Ticket::Wait(pending) => {
                tracing::debug!("refresh in flight, waiting");
                return pending.wait().await.map_err(GatewayError::Refresh);
            }
        };

        match exchange_refresh_token(
            self.transport.as_ref(),
            &self.options.refresh_path,
            &refresh_token,
        )
        .await
        {
            Ok(token) => {
                self.store.set(CredentialKey::AccessToken, &token.access_token);
                if let Some(ref rotated) = token.refresh_token {
                    self.store.set(CredentialKey::RefreshToken, rotated);
                }
                let released = lease.settle(&Ok(token.access_token.clone()));
                tracing::info!(released, "access token refreshed");
                let _ = self.events.send(SessionEvent::Refreshed);
                Ok(token.access_token)
            }
            Err(e) => {
                self.store.clear();
                let released = lease.settle(&Err(e.clone()));
                tracing::warn!(err = %e, released, "token refresh failed");
                self.terminate_session(TerminationReason::RefreshFailed);
                Err(GatewayError::Refresh(e))
            }
        }
    }

    fn terminate_session(&self, reason: TerminationReason) {
        tracing::warn!(%reason, redirect = %self.options.login_redirect, "session terminated");
        let _ = self.events.send(SessionEvent::Terminated {
            reason,
            redirect: self.options.login_redirect.clone(),
        });
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
