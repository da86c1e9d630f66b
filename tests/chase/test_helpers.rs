//! Shared fixtures and helpers for chase BDD scenarios.

use std::time::Duration;

use gpu_chase::test_support::FakeCompute;
use gpu_chase::{ChaseSummary, InstanceTemplate, OperationWaiter, WaitPolicy};
use rstest::fixture;

use crate::test_constants::{ACCELERATOR, PROJECT_ID};

#[derive(Clone, Debug)]
pub enum ChaseOutcome {
    Success(ChaseSummary),
    Failure(String),
}

#[derive(Clone, Debug)]
pub struct ChaseContext {
    pub compute: FakeCompute,
    pub zones: Vec<String>,
    pub target: u32,
    pub dry_run: bool,
    pub outcome: Option<ChaseOutcome>,
}

impl ChaseContext {
    pub fn summary(&self) -> Result<&ChaseSummary, String> {
        match self.outcome.as_ref() {
            Some(ChaseOutcome::Success(summary)) => Ok(summary),
            Some(ChaseOutcome::Failure(message)) => {
                Err(format!("expected chase to finish, got: {message}"))
            }
            None => Err(String::from("missing outcome")),
        }
    }
}

#[fixture]
pub fn chase_context() -> ChaseContext {
    ChaseContext {
        compute: FakeCompute::default(),
        zones: Vec::new(),
        target: 1,
        dry_run: false,
        outcome: None,
    }
}

pub fn template() -> InstanceTemplate {
    InstanceTemplate::builder()
        .project_id(PROJECT_ID)
        .network("default")
        .subnetwork("default")
        .machine_type("n1-standard-4")
        .image_project("ml-images")
        .image_family("common-cu121")
        .accelerator_type(ACCELERATOR)
        .build()
        .unwrap_or_else(|err| panic!("template fixture should be valid: {err}"))
}

pub const fn fast_waiter() -> OperationWaiter {
    OperationWaiter::new(WaitPolicy {
        poll_interval: Duration::from_millis(1),
        max_wait: Duration::from_secs(5),
        max_poll_failures: 3,
    })
}

pub fn split_zones(zones: &str) -> Vec<String> {
    zones
        .split(',')
        .map(str::trim)
        .filter(|zone| !zone.is_empty())
        .map(str::to_owned)
        .collect()
}
