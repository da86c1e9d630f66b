//! Binary entry point for the gpu-chase CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use gpu_chase::{
    BulkDeleter, ChaseConfig, ChaseError, ChaseLoop, ChaseSummary, ConfigError, GceCompute,
    OperationWaiter, ProcessCommandRunner, RollbackOutcome, SweepError, SweepSettings,
    SweepSummary, TokenError, TokenSource, ZoneOutcome,
};

mod cli;

use cli::{ChaseCommand, Cli, SweepCommand};

/// Exit status when a chase created nothing against a non-zero target.
const EXIT_NOTHING_CREATED: i32 = 2;
/// Exit status when a sweep finished with per-instance failures.
const EXIT_SWEEP_FAILURES: i32 = 3;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("could not obtain an access token: {0}")]
    Token(#[from] TokenError),
    #[error("chase aborted: {0}")]
    Chase(#[from] ChaseError),
    #[error("sweep aborted: {0}")]
    Sweep(#[from] SweepError),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Chase(command) => run_chase(command).await,
        Cli::Sweep(command) => run_sweep(command).await,
    }
}

fn connect(token_source: &TokenSource, api_endpoint: &str) -> Result<GceCompute, CliError> {
    let token = token_source.resolve(&ProcessCommandRunner)?;
    Ok(GceCompute::new(token).with_base_url(api_endpoint))
}

async fn run_chase(args: ChaseCommand) -> Result<i32, CliError> {
    let config = ChaseConfig::load_without_cli_args()?;
    let template = config.template()?;
    let target = args.target_count.unwrap_or(config.target_count);
    let dry_run = args.dry_run || config.dry_run;
    let api = connect(&config.token_source(), &config.api_endpoint)?;

    let mut chase = ChaseLoop::new(template, &config.name_prefix, target)
        .with_waiter(OperationWaiter::new(config.wait_policy()))
        .with_dry_run(dry_run);
    let summary = chase.run(&api).await?;

    write_chase_summary(io::stdout(), &summary);
    Ok(chase_exit_code(&summary))
}

async fn run_sweep(args: SweepCommand) -> Result<i32, CliError> {
    let settings = SweepSettings::load_without_cli_args()?;
    let sweep_config = settings.sweep_config(args.prefix.as_deref())?;
    let api = connect(&settings.token_source(), &settings.api_endpoint)?;

    let deleter =
        BulkDeleter::new(sweep_config).with_waiter(OperationWaiter::new(settings.wait_policy()));
    let summary = deleter.sweep(&api).await?;

    write_sweep_summary(io::stdout(), &summary);
    Ok(sweep_exit_code(&summary))
}

fn chase_exit_code(summary: &ChaseSummary) -> i32 {
    if summary.is_failure() {
        EXIT_NOTHING_CREATED
    } else {
        0
    }
}

fn sweep_exit_code(summary: &SweepSummary) -> i32 {
    if summary.is_clean() {
        0
    } else {
        EXIT_SWEEP_FAILURES
    }
}

fn write_chase_summary(mut target: impl Write, summary: &ChaseSummary) {
    for report in &summary.zones {
        let line = match &report.outcome {
            ZoneOutcome::NoAccelerator => continue,
            ZoneOutcome::ScanFailed(err) => format!("{}: scan failed: {err}", report.zone),
            ZoneOutcome::WouldCreate { accelerator } => {
                format!("{}: would create ({accelerator})", report.zone)
            }
            ZoneOutcome::Created {
                instance,
                accelerator,
            } => format!("{}: created {instance} ({accelerator})", report.zone),
            ZoneOutcome::Failed {
                instance,
                error,
                rollback,
            } => format!(
                "{}: {instance} failed: {error}{}",
                report.zone,
                rollback_note(rollback)
            ),
        };
        writeln!(target, "{line}").ok();
    }
    let verb = if summary.dry_run {
        "matched"
    } else {
        "created"
    };
    writeln!(
        target,
        "chase complete: {verb}={}/{}, zones_visited={}, leaked={}",
        summary.hits(),
        summary.target,
        summary.zones.len(),
        summary.leaked().len()
    )
    .ok();
}

fn rollback_note(rollback: &RollbackOutcome) -> String {
    match rollback {
        RollbackOutcome::NotNeeded => String::new(),
        RollbackOutcome::Deleted => String::from(" (cleaned up)"),
        RollbackOutcome::Failed(message) => format!(" (cleanup failed: {message})"),
    }
}

fn write_sweep_summary(mut target: impl Write, summary: &SweepSummary) {
    for failure in &summary.failures {
        let subject = failure.instance.as_deref().unwrap_or("<zone listing>");
        writeln!(
            target,
            "{}: {subject}: {}",
            failure.zone, failure.message
        )
        .ok();
    }
    writeln!(
        target,
        "sweep complete: matched={}, deleted={}, already_gone={}, failed={}",
        summary.matched,
        summary.deleted,
        summary.already_gone,
        summary.failures.len()
    )
    .ok();
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
