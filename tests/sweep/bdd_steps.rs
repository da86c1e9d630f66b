//! BDD step definitions for prefix sweeps.

use gpu_chase::SweepError;
use gpu_chase::test_support::FakeCompute;
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{SweepContext, SweepOutcome, build_deleter};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a project with zones \"{zones}\"")]
fn project_with_zones(mut sweep_context: SweepContext, zones: String) -> SweepContext {
    let names: Vec<&str> = zones
        .split(',')
        .map(str::trim)
        .filter(|zone| !zone.is_empty())
        .collect();
    sweep_context.compute = FakeCompute::with_zones(&names);
    sweep_context
}

#[given("instance \"{name}\" runs in zone \"{zone}\"")]
fn instance_runs(sweep_context: SweepContext, name: String, zone: String) -> SweepContext {
    sweep_context.compute.add_instance(&zone, &name);
    sweep_context
}

#[given("deleting \"{name}\" fails")]
fn deleting_fails(sweep_context: SweepContext, name: String) -> SweepContext {
    sweep_context.compute.fail_delete_of(&name);
    sweep_context
}

fn sweep_once(sweep_context: &SweepContext, prefix: &str) -> Result<SweepOutcome, StepError> {
    let deleter = match build_deleter(prefix) {
        Ok(deleter) => deleter,
        Err(err) => return Ok(SweepOutcome::Failure(err)),
    };
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let compute = sweep_context.compute.clone();
    let result = runtime.block_on(async move { deleter.sweep(&compute).await });
    Ok(match result {
        Ok(summary) => SweepOutcome::Success(summary),
        Err(err) => SweepOutcome::Failure(err),
    })
}

#[when("I sweep instances with prefix \"{prefix}\"")]
fn sweep(mut sweep_context: SweepContext, prefix: String) -> Result<SweepContext, StepError> {
    sweep_context.outcome = Some(sweep_once(&sweep_context, &prefix)?);
    Ok(sweep_context)
}

#[when("I sweep twice with prefix \"{prefix}\"")]
fn sweep_twice(mut sweep_context: SweepContext, prefix: String) -> Result<SweepContext, StepError> {
    let first = sweep_once(&sweep_context, &prefix)?;
    if let SweepOutcome::Failure(err) = first {
        return Err(StepError::Assertion(format!("first sweep failed: {err}")));
    }
    sweep_context.outcome = Some(sweep_once(&sweep_context, &prefix)?);
    Ok(sweep_context)
}

#[then("the sweep reports deleting {count:u32} instances")]
fn reports_deleted(sweep_context: &SweepContext, count: u32) -> Result<(), StepError> {
    let summary = sweep_context.summary().map_err(StepError::Assertion)?;
    if summary.deleted == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} deletions, got {summary:?}"
        )))
    }
}

#[then("the sweep reports matching {count:u32} instances")]
fn reports_matched(sweep_context: &SweepContext, count: u32) -> Result<(), StepError> {
    let summary = sweep_context.summary().map_err(StepError::Assertion)?;
    if summary.matched == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} matches, got {summary:?}"
        )))
    }
}

#[then("the sweep reports {count:u32} failures")]
fn reports_failures(sweep_context: &SweepContext, count: u32) -> Result<(), StepError> {
    let summary = sweep_context.summary().map_err(StepError::Assertion)?;
    if summary.failures.len() == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} failures, got {:?}",
            summary.failures
        )))
    }
}

#[then("the sweep reports no failures")]
fn reports_no_failures(sweep_context: &SweepContext) -> Result<(), StepError> {
    let summary = sweep_context.summary().map_err(StepError::Assertion)?;
    if summary.is_clean() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a clean sweep, got {:?}",
            summary.failures
        )))
    }
}

#[then("instance \"{name}\" still runs in zone \"{zone}\"")]
fn still_runs(sweep_context: &SweepContext, name: String, zone: String) -> Result<(), StepError> {
    if sweep_context.compute.instances_in(&zone).contains(&name) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "{name} should still exist in {zone}"
        )))
    }
}

#[then("instance \"{name}\" no longer exists in zone \"{zone}\"")]
fn no_longer_exists(
    sweep_context: &SweepContext,
    name: String,
    zone: String,
) -> Result<(), StepError> {
    if sweep_context.compute.instances_in(&zone).contains(&name) {
        Err(StepError::Assertion(format!(
            "{name} should have been deleted from {zone}"
        )))
    } else {
        Ok(())
    }
}

#[then("the sweep is rejected for \"{field}\"")]
fn sweep_rejected(sweep_context: &SweepContext, field: String) -> Result<(), StepError> {
    match sweep_context.outcome.as_ref() {
        Some(SweepOutcome::Failure(SweepError::InvalidConfig { field: actual })) if *actual == field => {
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected invalid {field}, got {other:?}"
        ))),
    }
}
