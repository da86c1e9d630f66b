//! BDD step definitions for the zone chase loop.

use gpu_chase::test_support::{FakeCompute, InsertBehaviour};
use gpu_chase::{ChaseLoop, ZoneOutcome};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{ChaseContext, ChaseOutcome, fast_waiter, split_zones, template};
use crate::test_constants::NAME_BASE;

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a project with zones \"{zones}\"")]
fn project_with_zones(mut chase_context: ChaseContext, zones: String) -> ChaseContext {
    chase_context.zones = split_zones(&zones);
    let names: Vec<&str> = chase_context.zones.iter().map(String::as_str).collect();
    chase_context.compute = FakeCompute::with_zones(&names);
    chase_context
}

#[given("zone \"{zone}\" offers \"{accelerator}\"")]
fn zone_offers(chase_context: ChaseContext, zone: String, accelerator: String) -> ChaseContext {
    chase_context
        .compute
        .offer_accelerators(&zone, &[accelerator.as_str()]);
    chase_context
}

#[given("every zone offers \"{accelerator}\"")]
fn every_zone_offers(chase_context: ChaseContext, accelerator: String) -> ChaseContext {
    for zone in &chase_context.zones {
        chase_context
            .compute
            .offer_accelerators(zone, &[accelerator.as_str()]);
    }
    chase_context
}

#[given("inserts in zone \"{zone}\" fail with \"{code}\" leaving an instance behind")]
fn inserts_fail_leaving_instance(
    chase_context: ChaseContext,
    zone: String,
    code: String,
) -> ChaseContext {
    chase_context
        .compute
        .script_insert(&zone, InsertBehaviour::FailLeavingInstance(code));
    chase_context
}

#[given("a target of {count:u32} instances")]
fn target_of(mut chase_context: ChaseContext, count: u32) -> ChaseContext {
    chase_context.target = count;
    chase_context
}

#[given("dry run is enabled")]
fn dry_run_enabled(mut chase_context: ChaseContext) -> ChaseContext {
    chase_context.dry_run = true;
    chase_context
}

#[when("I run the chase")]
fn run_chase(mut chase_context: ChaseContext) -> Result<ChaseContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let mut chase = ChaseLoop::new(template(), NAME_BASE, chase_context.target)
        .with_waiter(fast_waiter())
        .with_dry_run(chase_context.dry_run);
    let compute = chase_context.compute.clone();
    let result = runtime.block_on(async move { chase.run(&compute).await });
    chase_context.outcome = Some(match result {
        Ok(summary) => ChaseOutcome::Success(summary),
        Err(err) => ChaseOutcome::Failure(err.to_string()),
    });
    Ok(chase_context)
}

#[then("{count:u32} instances exist")]
fn instances_exist(chase_context: &ChaseContext, count: u32) -> Result<(), StepError> {
    let actual = chase_context.compute.instance_count();
    if actual == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} instances, found {actual}"
        )))
    }
}

#[then("an instance exists in zone \"{zone}\"")]
fn instance_in_zone(chase_context: &ChaseContext, zone: String) -> Result<(), StepError> {
    let names = chase_context.compute.instances_in(&zone);
    let prefix = format!("{NAME_BASE}-");
    if names.iter().any(|name| name.starts_with(&prefix)) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected an instance in {zone}, found {names:?}"
        )))
    }
}

#[then("no instance is left in zone \"{zone}\"")]
fn no_instance_in_zone(chase_context: &ChaseContext, zone: String) -> Result<(), StepError> {
    let names = chase_context.compute.instances_in(&zone);
    if names.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {zone} to be empty, found {names:?}"
        )))
    }
}

#[then("zone \"{zone}\" was never scanned")]
fn zone_never_scanned(chase_context: &ChaseContext, zone: String) -> Result<(), StepError> {
    let scanned = chase_context.compute.scanned_zones();
    if scanned.contains(&zone) {
        Err(StepError::Assertion(format!(
            "{zone} should not be scanned, scanned: {scanned:?}"
        )))
    } else {
        Ok(())
    }
}

#[then("the chase reports a failed attempt in zone \"{zone}\"")]
fn failed_attempt_reported(chase_context: &ChaseContext, zone: String) -> Result<(), StepError> {
    let summary = chase_context.summary().map_err(StepError::Assertion)?;
    let failed = summary.zones.iter().any(|report| {
        report.zone == zone && matches!(report.outcome, ZoneOutcome::Failed { .. })
    });
    if failed {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a failed attempt in {zone}, got {:?}",
            summary.zones
        )))
    }
}

#[then("no instances were created or deleted")]
fn nothing_mutated(chase_context: &ChaseContext) -> Result<(), StepError> {
    let mutations = chase_context.compute.mutation_count();
    if mutations == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no mutating calls, saw {mutations}"
        )))
    }
}

#[then("the chase matched {count:u32} zones")]
fn chase_matched(chase_context: &ChaseContext, count: u32) -> Result<(), StepError> {
    let summary = chase_context.summary().map_err(StepError::Assertion)?;
    if summary.hits() == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} matches, got {}",
            summary.hits()
        )))
    }
}

#[then("the chase is reported as failed")]
fn chase_failed(chase_context: &ChaseContext) -> Result<(), StepError> {
    let summary = chase_context.summary().map_err(StepError::Assertion)?;
    if summary.is_failure() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a failed chase, got {summary:?}"
        )))
    }
}
