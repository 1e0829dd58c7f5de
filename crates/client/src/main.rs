// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use arcall::command::Command;
use arcall::config::ClientConfig;

/// Accounts-receivable calling backend client.
#[derive(Parser)]
#[command(name = "arcall", version)]
struct Cli {
    #[command(flatten)]
    config: ClientConfig,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    arcall::init_tracing(&cli.config);

    let code = arcall::run(cli.config, cli.command).await;
    std::process::exit(code);
}
