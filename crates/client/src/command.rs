// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI subcommands over the feature API.

use std::path::PathBuf;

use clap::Subcommand;
use serde_json::Value;

use crate::api::{ArApi, PatientFilter};
use crate::error::{ErrorKind, GatewayError};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long, env = "ARCALL_EMAIL")]
        email: String,
        #[arg(long, env = "ARCALL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Exchange an SSO token for a session
    Sso {
        /// Token issued by the identity provider
        token: String,
    },
    /// Sign out and wipe stored credentials
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List patients
    Patients {
        /// Balance status filter (e.g. outstanding, paid)
        #[arg(long)]
        status: Option<String>,
        /// Name or account number search
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show one patient
    Patient { id: String },
    /// Upload an invoice export (.csv, .xlsx or .pdf)
    Upload { file: PathBuf },
    /// Place an outbound collection call to a patient
    Call { patient_id: String },
    /// Show call history
    History {
        /// Limit to one patient
        #[arg(long)]
        patient: Option<String>,
    },
    /// Show dashboard aggregates
    Stats,
    /// List staff users
    Users,
}

pub async fn run(command: Command, api: &ArApi) -> Result<(), GatewayError> {
    match command {
        Command::Login { email, password } => {
            let login = api.login(&email, &password).await?;
            match login.user.as_ref().and_then(display_name) {
                Some(name) => println!("Signed in as {name}"),
                None => println!("Signed in"),
            }
        }
        Command::Sso { token } => {
            let login = api.exchange_sso(&token).await?;
            match login.user.as_ref().and_then(display_name) {
                Some(name) => println!("Signed in as {name}"),
                None => println!("Signed in"),
            }
        }
        Command::Logout => {
            api.logout().await?;
            println!("Signed out");
        }
        Command::Whoami => match api.current_user().await {
            Ok(user) => print_json(&user),
            Err(e) if e.kind() == ErrorKind::Network => match api.cached_user() {
                Some(user) => {
                    eprintln!("backend unreachable, showing cached profile");
                    print_json(&user);
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        },
        Command::Patients { status, search, page } => {
            let filter = PatientFilter { status, search, page };
            print_json(&api.list_patients(&filter).await?);
        }
        Command::Patient { id } => print_json(&api.patient(&id).await?),
        Command::Upload { file } => print_json(&api.upload_invoices(&file).await?),
        Command::Call { patient_id } => print_json(&api.initiate_call(&patient_id).await?),
        Command::History { patient } => print_json(&api.call_history(patient.as_deref()).await?),
        Command::Stats => print_json(&api.dashboard_stats().await?),
        Command::Users => print_json(&api.list_users().await?),
    }
    Ok(())
}

/// Exit code for a failed command: 2 when the user has to sign in again.
pub fn exit_code(err: &GatewayError) -> i32 {
    match err.kind() {
        ErrorKind::Session => 2,
        _ => 1,
    }
}

fn display_name(user: &Value) -> Option<String> {
    ["name", "email", "username"]
        .iter()
        .find_map(|key| user.get(key).and_then(Value::as_str))
        .map(str::to_owned)
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
