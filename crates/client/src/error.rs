// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transport::{ApiResponse, TransportError};

/// Why a token refresh did not produce a new access token.
///
/// Cloned to every caller queued behind the refresh, so it carries only
/// owned, cheap data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// The refresh endpoint answered with a non-2xx status.
    #[error("refresh rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    /// The refresh call never got a response.
    #[error("refresh request failed: {0}")]
    Transport(TransportError),
    /// 2xx, but the body had no usable access token.
    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),
    /// The caller running the refresh was dropped before it finished.
    #[error("refresh abandoned before completion")]
    Cancelled,
}

/// Errors surfaced by [`crate::gateway::GatewayClient`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Non-2xx response that was not recovered. Carries the response verbatim.
    #[error("request failed with status {}", .0.status)]
    Status(ApiResponse),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("session refresh failed: {0}")]
    Refresh(RefreshError),
    #[error("session terminated: no refresh token available")]
    SessionTerminated,
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Status(resp) => match resp.status {
                401 | 403 => ErrorKind::Unauthorized,
                400..=499 => ErrorKind::Client,
                500..=599 => ErrorKind::Server,
                _ => ErrorKind::Other,
            },
            Self::Transport(e) if e.is_network() => ErrorKind::Network,
            Self::Transport(_) => ErrorKind::Other,
            // Credentials are intact; only the task running the refresh went away.
            Self::Refresh(RefreshError::Cancelled) => ErrorKind::Other,
            Self::Refresh(_) | Self::SessionTerminated => ErrorKind::Session,
            Self::Decode(_) => ErrorKind::Other,
            Self::InvalidRequest(_) => ErrorKind::Client,
        }
    }

    /// The backend response, when the error carries one.
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            Self::Status(resp) => Some(resp),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }
}

/// Coarse classification for choosing user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Network,
    Client,
    Server,
    Session,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Network => "network",
            Self::Client => "client",
            Self::Server => "server",
            Self::Session => "session",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
