// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::ClientConfig;

#[derive(Parser)]
struct TestCli {
    #[command(flatten)]
    config: ClientConfig,
}

fn parse(args: &[&str]) -> ClientConfig {
    TestCli::parse_from(args).config
}

#[test]
#[serial_test::serial]
fn defaults_are_valid() -> anyhow::Result<()> {
    let config = parse(&["arcall"]);
    config.validate()?;
    assert_eq!(config.timeout(), Duration::from_secs(120));
    assert_eq!(config.backoff_policy().max_network_retries, 2);
    assert_eq!(config.backoff_policy().delay(1), Duration::from_secs(2));
    assert_eq!(config.refresh_path, "/auth/refresh");
    assert_eq!(config.login_redirect, "/login?session=expired");
    assert_eq!(config.log_format, "text");
    Ok(())
}

#[test]
#[serial_test::serial]
fn flags_override_defaults() -> anyhow::Result<()> {
    let config = parse(&[
        "arcall",
        "--api-url",
        "https://ar.clinic.test/api",
        "--timeout-secs",
        "30",
        "--max-network-retries",
        "4",
        "--backoff-base-ms",
        "250",
        "--state-dir",
        "/tmp/arcall-state",
    ]);
    config.validate()?;
    assert_eq!(config.api_url, "https://ar.clinic.test/api");
    assert_eq!(config.timeout(), Duration::from_secs(30));
    assert_eq!(config.backoff_policy().max_network_retries, 4);
    assert_eq!(config.backoff_policy().delay(2), Duration::from_secs(1));
    assert_eq!(config.state_dir(), PathBuf::from("/tmp/arcall-state"));
    Ok(())
}

#[yare::parameterized(
    bad_url      = { &["arcall", "--api-url", "not a url"], "not a valid URL" },
    bad_scheme   = { &["arcall", "--api-url", "ftp://ar.clinic.test"], "http or https" },
    zero_timeout = { &["arcall", "--timeout-secs", "0"], "greater than zero" },
    relative_refresh = { &["arcall", "--refresh-path", "auth/refresh"], "must start with '/'" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let config = parse(args);
    crate::assert_err_contains!(config.validate(), expected_substr);
}
