// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use super::*;

fn status(code: u16) -> GatewayError {
    GatewayError::Status(ApiResponse::new(code, "{}"))
}

#[parameterized(
    unauthorized = { status(401), ErrorKind::Unauthorized },
    forbidden = { status(403), ErrorKind::Unauthorized },
    not_found = { status(404), ErrorKind::Client },
    validation = { status(422), ErrorKind::Client },
    internal = { status(500), ErrorKind::Server },
    unavailable = { status(503), ErrorKind::Server },
    odd_status = { status(302), ErrorKind::Other },
    timeout = { GatewayError::Transport(TransportError::timeout("elapsed")), ErrorKind::Network },
    connect = { GatewayError::Transport(TransportError::connect("refused")), ErrorKind::Network },
    transport_other = { GatewayError::Transport(TransportError::other("bad")), ErrorKind::Other },
    refresh = {
        GatewayError::Refresh(RefreshError::Rejected { status: 401, body: String::new() }),
        ErrorKind::Session
    },
    refresh_cancelled = { GatewayError::Refresh(RefreshError::Cancelled), ErrorKind::Other },
    terminated = { GatewayError::SessionTerminated, ErrorKind::Session },
    decode = { GatewayError::Decode("eof".to_owned()), ErrorKind::Other },
    invalid = { GatewayError::InvalidRequest("bad file".to_owned()), ErrorKind::Client },
)]
fn kind_classification(err: GatewayError, expected: ErrorKind) {
    assert_eq!(err.kind(), expected);
}

#[test]
fn status_error_exposes_response() {
    let err = status(422);
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.response().map(|r| r.text()), Some("{}".to_owned()));
    assert_eq!(GatewayError::SessionTerminated.status(), None);
}

#[test]
fn display_messages() {
    assert_eq!(status(500).to_string(), "request failed with status 500");
    assert_eq!(
        GatewayError::Transport(TransportError::timeout("elapsed")).to_string(),
        "timeout error: elapsed"
    );
    assert_eq!(
        GatewayError::Refresh(RefreshError::Rejected { status: 401, body: "revoked".to_owned() })
            .to_string(),
        "session refresh failed: refresh rejected (401): revoked"
    );
}

#[test]
fn kind_serializes_as_snake_case() -> anyhow::Result<()> {
    assert_eq!(serde_json::to_string(&ErrorKind::Unauthorized)?, "\"unauthorized\"");
    assert_eq!(ErrorKind::Network.to_string(), "network");
    Ok(())
}
