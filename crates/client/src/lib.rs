// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! arcall: authenticated API gateway client for the accounts-receivable
//! calling backend.
//!
//! Every feature call goes through one [`gateway::GatewayClient`], which
//! attaches the stored bearer token, refreshes it (once, no matter how many
//! requests fail at the same time) when the backend answers 401, and retries
//! connection failures and timeouts with exponential backoff.

pub mod api;
pub mod command;
pub mod config;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod test_support;
pub mod transport;

use tokio::sync::broadcast::error::TryRecvError;

use crate::api::ArApi;
use crate::command::Command;
use crate::config::ClientConfig;
use crate::gateway::{GatewayClient, SessionEvent};

/// Install the global tracing subscriber.
///
/// Uses `try_init` so it's safe to call multiple times (e.g. from tests).
pub fn init_tracing(config: &ClientConfig) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
    drop(result);
}

/// Run a single CLI command and return the process exit code.
///
/// Builds one gateway for the whole run; the command and every request it
/// makes share it. Session termination is reported to the user here, the
/// shell side of the gateway's [`SessionEvent::Terminated`] signal.
pub async fn run(config: ClientConfig, command: Command) -> i32 {
    if let Err(e) = config.validate() {
        tracing::error!("invalid configuration: {e:#}");
        return 1;
    }

    let gateway = match GatewayClient::from_config(&config) {
        Ok(g) => g,
        Err(e) => {
            tracing::error!("failed to initialize client: {e:#}");
            return 1;
        }
    };
    let mut events = gateway.subscribe();
    let api = ArApi::new(gateway);

    let result = command::run(command, &api).await;

    loop {
        match events.try_recv() {
            Ok(SessionEvent::Terminated { reason, redirect }) => {
                eprintln!(
                    "Session ended ({reason}). Sign in again with `arcall login` [{redirect}]"
                );
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            command::exit_code(&e)
        }
    }
}
