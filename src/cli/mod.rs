//! Command-line interface definitions for the `gpu-chase` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `gpu-chase` binary.
#[derive(Debug, Parser)]
#[command(
    name = "gpu-chase",
    about = "Find Compute Engine zones with spare GPU capacity and provision instances there",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Walk zones and create GPU instances until the target is met.
    #[command(
        name = "chase",
        about = "Walk zones and create GPU instances until the target is met"
    )]
    Chase(ChaseCommand),
    /// Delete every instance whose name starts with a prefix.
    #[command(
        name = "sweep",
        about = "Delete every instance whose name starts with a prefix"
    )]
    Sweep(SweepCommand),
}

/// Arguments for the `gpu-chase chase` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ChaseCommand {
    /// Report zones offering the accelerator without creating instances.
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Number of instances to create; overrides `target_count`.
    #[arg(long, value_name = "COUNT")]
    pub(crate) target_count: Option<u32>,
}

/// Arguments for the `gpu-chase sweep` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct SweepCommand {
    /// Name prefix selecting instances to delete; defaults to `name_prefix`.
    ///
    /// Surrounding whitespace is trimmed; the remainder is matched
    /// case-sensitively against the start of each instance name.
    #[arg(long, value_name = "PREFIX")]
    pub(crate) prefix: Option<String>,
}
