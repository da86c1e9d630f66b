//! BDD scenarios for the zone chase loop.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ChaseContext, chase_context};

#[scenario(
    path = "tests/features/chase.feature",
    name = "Stop after the first zone with capacity"
)]
fn scenario_stop_after_first_success(chase_context: ChaseContext) {
    let _ = chase_context;
}

#[scenario(
    path = "tests/features/chase.feature",
    name = "Roll back a failed creation and keep going"
)]
fn scenario_roll_back_failed_creation(chase_context: ChaseContext) {
    let _ = chase_context;
}

#[scenario(
    path = "tests/features/chase.feature",
    name = "Create exactly the requested number of instances"
)]
fn scenario_exact_target(chase_context: ChaseContext) {
    let _ = chase_context;
}

#[scenario(
    path = "tests/features/chase.feature",
    name = "Dry run reports matches without creating anything"
)]
fn scenario_dry_run(chase_context: ChaseContext) {
    let _ = chase_context;
}

#[scenario(
    path = "tests/features/chase.feature",
    name = "Report failure when no zone has capacity"
)]
fn scenario_no_capacity(chase_context: ChaseContext) {
    let _ = chase_context;
}
