// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight token refresh: at most one refresh call in flight, with
//! everyone else queued behind it in arrival order.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::oneshot;

use crate::error::RefreshError;
use crate::transport::{ApiRequest, Transport};

/// What a queued caller receives: the new access token or the refresh error.
pub type RefreshOutcome = Result<String, RefreshError>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    pending: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Refresh-in-progress flag plus the FIFO of callers waiting on it.
///
/// The flag check, flag set and enqueue all happen under one lock that is
/// never held across an await.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Result of [`RefreshCoordinator::acquire`].
pub enum Ticket<'a> {
    /// No refresh was running; the holder must perform it and settle the lease.
    Lead(RefreshLease<'a>),
    /// A refresh is running; wait for its outcome.
    Wait(PendingRefresh),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().in_progress
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Become the refresh leader, or queue behind the refresh in flight.
    pub fn acquire(&self) -> Ticket<'_> {
        let mut state = self.state.lock();
        if state.in_progress {
            let (tx, rx) = oneshot::channel();
            state.pending.push_back(tx);
            Ticket::Wait(PendingRefresh { rx })
        } else {
            state.in_progress = true;
            Ticket::Lead(RefreshLease { coordinator: self, settled: false })
        }
    }

    /// Clear the flag and take the queue in one step.
    fn drain(&self) -> VecDeque<oneshot::Sender<RefreshOutcome>> {
        let mut state = self.state.lock();
        state.in_progress = false;
        std::mem::take(&mut state.pending)
    }
}

/// Proof of refresh leadership. Dropping it unsettled releases the queue
/// with [`RefreshError::Cancelled`].
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    /// Clear the flag, then hand `outcome` to every queued caller in arrival
    /// order. Returns how many were released.
    pub fn settle(mut self, outcome: &RefreshOutcome) -> usize {
        self.settled = true;
        release(self.coordinator.drain(), outcome)
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            release(self.coordinator.drain(), &Err(RefreshError::Cancelled));
        }
    }
}

fn release(waiters: VecDeque<oneshot::Sender<RefreshOutcome>>, outcome: &RefreshOutcome) -> usize {
    let count = waiters.len();
    for tx in waiters {
        // Receiver gone means that caller was cancelled; nothing to deliver.
        let _ = tx.send(outcome.clone());
    }
    count
}

/// A caller suspended behind an in-flight refresh.
pub struct PendingRefresh {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl PendingRefresh {
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(Err(RefreshError::Cancelled))
    }
}

/// Body returned by the refresh endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    /// Present when the backend rotates refresh tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Exchange a refresh token for a new access token.
///
/// Goes straight to the transport: a 401 here is a failed refresh, never a
/// reason to start another one.
pub async fn exchange_refresh_token(
    transport: &dyn Transport,
    path: &str,
    refresh_token: &str,
) -> Result<RefreshResponse, RefreshError> {
    let request =
        ApiRequest::post(path).json(serde_json::json!({ "refresh_token": refresh_token }));
    let resp = transport.send(request).await.map_err(RefreshError::Transport)?;

    if !resp.is_success() {
        return Err(RefreshError::Rejected { status: resp.status, body: resp.text() });
    }

    let token: RefreshResponse =
        resp.json().map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
    if token.access_token.is_empty() {
        return Err(RefreshError::InvalidResponse("empty access_token".to_owned()));
    }
    Ok(token)
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
