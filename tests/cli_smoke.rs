//! Behavioural tests for the `gpu-chase` CLI entrypoint.
//!
//! None of these reach Compute Engine: each run stops at configuration,
//! token resolution, or a refused connection.

#[path = "common/test_constants.rs"]
mod test_constants;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use predicates::str::contains;
use rstest::rstest;

use test_constants::{CONFIG_ENV, PROJECT_ID};

const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:9/compute/v1";

fn configured_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("gpu-chase");
    cmd.current_dir(std::env::temp_dir());
    cmd.env_remove("GPU_CHASE_CONFIG_PATH");
    cmd.envs(CONFIG_ENV);
    cmd
}

#[test]
fn cli_without_arguments_prints_help() {
    let mut cmd = cargo_bin_cmd!("gpu-chase");
    cmd.assert().failure().code(2).stderr(contains("Usage"));
}

#[test]
fn cli_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("gpu-chase");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(contains("chase"))
        .stdout(contains("sweep"));
}

#[test]
fn cli_chase_rejects_zero_poll_interval() {
    let mut cmd = configured_cmd();
    cmd.env("GPU_CHASE_POLL_INTERVAL_SECS", "0");
    cmd.arg("chase");

    cmd.assert()
        .code(1)
        .stderr(contains("poll_interval_secs must be greater than zero"));
}

#[rstest]
#[case("GPU_CHASE_POLL_INTERVAL_SECS", "0", "poll_interval_secs must be greater than zero")]
#[case("GPU_CHASE_MAX_WAIT_SECS", "0", "must not be shorter than poll_interval_secs")]
fn cli_sweep_rejects_inconsistent_polling(
    #[case] env_var: &str,
    #[case] value: &str,
    #[case] expected: &str,
) {
    let mut cmd = configured_cmd();
    cmd.env("GPU_CHASE_API_ENDPOINT", UNREACHABLE_ENDPOINT);
    cmd.env(env_var, value);
    cmd.args(["sweep", "--prefix", "mg7609-vm"]);

    cmd.assert()
        .code(1)
        .stderr(contains(expected))
        .stderr(contains("failed to list zones").not());
}

#[test]
fn cli_sweep_needs_only_project_and_token() {
    let mut cmd = cargo_bin_cmd!("gpu-chase");
    cmd.current_dir(std::env::temp_dir());
    cmd.env_clear();
    cmd.env("GPU_CHASE_PROJECT_ID", PROJECT_ID);
    cmd.env("GPU_CHASE_ACCESS_TOKEN", "ya29.test-token");
    cmd.env("GPU_CHASE_API_ENDPOINT", UNREACHABLE_ENDPOINT);
    cmd.args(["sweep", "--prefix", "mg7609-vm"]);

    cmd.assert()
        .code(1)
        .stderr(contains("sweep aborted: failed to list zones"))
        .stderr(contains("configuration").not());
}

#[test]
fn cli_sweep_rejects_blank_prefix() {
    let mut cmd = configured_cmd();
    cmd.args(["sweep", "--prefix", "  "]);

    cmd.assert().code(1).stderr(contains("missing prefix"));
}

#[test]
fn cli_reports_missing_gcloud() {
    let mut cmd = configured_cmd();
    cmd.env_remove("GPU_CHASE_ACCESS_TOKEN");
    cmd.env("GPU_CHASE_GCLOUD_BIN", "/nonexistent/gpu-chase-test/gcloud");
    cmd.args(["chase", "--dry-run"]);

    cmd.assert()
        .code(1)
        .stderr(contains("could not obtain an access token"));
}

#[test]
fn cli_chase_fails_when_zones_cannot_be_listed() {
    let mut cmd = configured_cmd();
    cmd.env("GPU_CHASE_API_ENDPOINT", UNREACHABLE_ENDPOINT);
    cmd.args(["chase", "--dry-run"]);

    cmd.assert()
        .code(1)
        .stderr(contains("chase aborted: failed to list zones"));
}
