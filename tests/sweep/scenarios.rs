//! BDD scenarios for prefix sweeps.

use rstest_bdd_macros::scenario;

use super::test_helpers::{SweepContext, sweep_context};

#[scenario(
    path = "tests/features/sweep.feature",
    name = "Delete only instances carrying the prefix"
)]
fn scenario_delete_prefixed(sweep_context: SweepContext) {
    let _ = sweep_context;
}

#[scenario(
    path = "tests/features/sweep.feature",
    name = "A repeated sweep finds nothing to delete"
)]
fn scenario_repeat_sweep(sweep_context: SweepContext) {
    let _ = sweep_context;
}

#[scenario(
    path = "tests/features/sweep.feature",
    name = "Keep going after a failed delete"
)]
fn scenario_failed_delete(sweep_context: SweepContext) {
    let _ = sweep_context;
}

#[scenario(path = "tests/features/sweep.feature", name = "Reject a blank prefix")]
fn scenario_blank_prefix(sweep_context: SweepContext) {
    let _ = sweep_context;
}
