//! Shared fixtures and helpers for sweep BDD scenarios.

use std::time::Duration;

use gpu_chase::test_support::FakeCompute;
use gpu_chase::{BulkDeleter, OperationWaiter, SweepConfig, SweepError, SweepSummary, WaitPolicy};
use rstest::fixture;

use crate::test_constants::PROJECT_ID;

#[derive(Clone, Debug)]
pub enum SweepOutcome {
    Success(SweepSummary),
    Failure(SweepError),
}

#[derive(Clone, Debug)]
pub struct SweepContext {
    pub compute: FakeCompute,
    pub outcome: Option<SweepOutcome>,
}

impl SweepContext {
    pub fn summary(&self) -> Result<&SweepSummary, String> {
        match self.outcome.as_ref() {
            Some(SweepOutcome::Success(summary)) => Ok(summary),
            Some(SweepOutcome::Failure(err)) => Err(format!("expected sweep to finish, got: {err}")),
            None => Err(String::from("missing outcome")),
        }
    }
}

#[fixture]
pub fn sweep_context() -> SweepContext {
    SweepContext {
        compute: FakeCompute::default(),
        outcome: None,
    }
}

pub fn build_deleter(prefix: &str) -> Result<BulkDeleter, SweepError> {
    let config = SweepConfig::new(PROJECT_ID, prefix)?;
    Ok(BulkDeleter::new(config).with_waiter(OperationWaiter::new(WaitPolicy {
        poll_interval: Duration::from_millis(1),
        max_wait: Duration::from_secs(5),
        max_poll_failures: 3,
    })))
}
