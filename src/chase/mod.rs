//! The zone chase loop.
//!
//! Zones are visited in the order the provider lists them. In each zone the
//! loop looks for the configured accelerator type; on a match it creates one
//! instance and waits for the operation. Successes are counted against the
//! target and the loop stops as soon as the target is reached. A failed
//! attempt is rolled back: the attempted name is probed and deleted if the
//! provider left it behind. Every per-zone failure is contained in that
//! zone's [`ZoneOutcome`]; only a failure to enumerate zones aborts the run.

use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::compute::{ComputeApi, ComputeError};
use crate::instance::{InstanceTemplate, NameGenerator};
use crate::operation::{OperationWaiter, WaitError};
use crate::probe::{Presence, probe};
use crate::provision::{ProvisionError, Provisioner};

/// Default number of probes made when an existence check keeps failing.
pub const CLEANUP_ATTEMPTS: u32 = 3;

/// Fatal errors that stop a chase before any zone is attempted.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ChaseError {
    /// Zones could not be enumerated; usually a credentials or project
    /// configuration problem.
    #[error("failed to list zones: {0}")]
    ZoneListing(#[source] ComputeError),
}

/// Why a creation attempt failed.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AttemptError {
    /// The request could not be built or was rejected outright.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    /// The operation failed, timed out, or could not be polled.
    #[error(transparent)]
    Wait(#[from] WaitError),
}

/// Result of cleaning up after a failed attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RollbackOutcome {
    /// Nothing was left behind.
    NotNeeded,
    /// A leftover instance was deleted.
    Deleted,
    /// The leftover instance could not be deleted.
    Failed(String),
}

/// What happened in one zone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ZoneOutcome {
    /// The zone does not list the accelerator type.
    NoAccelerator,
    /// Accelerator types could not be listed for the zone.
    ScanFailed(ComputeError),
    /// Dry run: the zone lists the accelerator and would be attempted.
    WouldCreate {
        /// Matching accelerator type name.
        accelerator: String,
    },
    /// An instance was created.
    Created {
        /// Instance name.
        instance: String,
        /// Matching accelerator type name.
        accelerator: String,
    },
    /// Creation failed; the rollback outcome records any cleanup.
    Failed {
        /// Instance name that was attempted.
        instance: String,
        /// Failure cause.
        error: AttemptError,
        /// Cleanup result.
        rollback: RollbackOutcome,
    },
}

/// Per-zone entry of a [`ChaseSummary`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ZoneReport {
    /// Zone name.
    pub zone: String,
    /// Outcome for the zone.
    pub outcome: ZoneOutcome,
}

/// An instance left running by a successful attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreatedInstance {
    /// Instance name.
    pub name: String,
    /// Zone hosting the instance.
    pub zone: String,
}

/// Summary of a chase run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChaseSummary {
    /// Number of instances requested.
    pub target: u32,
    /// Whether the run was a dry run.
    pub dry_run: bool,
    /// Instances created, in creation order.
    pub created: Vec<CreatedInstance>,
    /// Zones visited, in visiting order.
    pub zones: Vec<ZoneReport>,
}

impl ChaseSummary {
    /// Number of zones that matched: creations, or would-be creations in a
    /// dry run.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.zones
            .iter()
            .filter(|report| {
                matches!(
                    report.outcome,
                    ZoneOutcome::Created { .. } | ZoneOutcome::WouldCreate { .. }
                )
            })
            .count()
    }

    /// Returns `true` when the run reached its target.
    #[must_use]
    pub fn target_met(&self) -> bool {
        u32::try_from(self.hits()).is_ok_and(|hits| hits >= self.target)
    }

    /// Returns `true` when a real run created nothing against a non-zero
    /// target.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.dry_run && self.target > 0 && self.created.is_empty()
    }

    /// Failed attempts whose rollback did not complete.
    #[must_use]
    pub fn leaked(&self) -> Vec<&ZoneReport> {
        self.zones
            .iter()
            .filter(|report| {
                matches!(
                    report.outcome,
                    ZoneOutcome::Failed {
                        rollback: RollbackOutcome::Failed(_),
                        ..
                    }
                )
            })
            .collect()
    }
}

/// Drives the scan-and-attempt state machine across zones.
#[derive(Debug)]
pub struct ChaseLoop {
    provisioner: Provisioner,
    waiter: OperationWaiter,
    names: NameGenerator,
    target: u32,
    dry_run: bool,
    cleanup_attempts: u32,
}

impl ChaseLoop {
    /// Creates a loop that names instances `<name_base>-<suffix>` and stops
    /// after `target` successes.
    #[must_use]
    pub fn new(template: InstanceTemplate, name_base: &str, target: u32) -> Self {
        Self {
            provisioner: Provisioner::new(template),
            waiter: OperationWaiter::default(),
            names: NameGenerator::new(name_base),
            target,
            dry_run: false,
            cleanup_attempts: CLEANUP_ATTEMPTS,
        }
    }

    /// Overrides the operation waiter.
    #[must_use]
    pub const fn with_waiter(mut self, waiter: OperationWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Overrides the instance name generator.
    #[must_use]
    pub fn with_name_generator(mut self, names: NameGenerator) -> Self {
        self.names = names;
        self
    }

    /// Overrides how many times an inconclusive existence probe is repeated.
    #[must_use]
    pub const fn with_cleanup_attempts(mut self, attempts: u32) -> Self {
        self.cleanup_attempts = attempts;
        self
    }

    fn project(&self) -> &str {
        &self.provisioner.template().project_id
    }

    fn accelerator_type(&self) -> &str {
        &self.provisioner.template().accelerator_type
    }

    /// Runs the chase until the target is met or zones run out.
    ///
    /// # Errors
    ///
    /// Returns [`ChaseError::ZoneListing`] when zones cannot be enumerated.
    /// Per-zone failures never abort the run; they are reported in the
    /// returned [`ChaseSummary`].
    pub async fn run<A>(&mut self, api: &A) -> Result<ChaseSummary, ChaseError>
    where
        A: ComputeApi + ?Sized,
    {
        let mut summary = ChaseSummary {
            target: self.target,
            dry_run: self.dry_run,
            created: Vec::new(),
            zones: Vec::new(),
        };
        if self.target == 0 {
            info!("target is zero; nothing to do");
            return Ok(summary);
        }

        let zones = api
            .list_zones(self.project())
            .await
            .map_err(ChaseError::ZoneListing)?;
        info!(
            zones = zones.len(),
            accelerator = self.accelerator_type(),
            target_count = self.target,
            "starting chase"
        );

        let mut hits = 0_u32;
        for zone in zones {
            let outcome = self.visit_zone(api, &zone).await;
            match &outcome {
                ZoneOutcome::Created { instance, .. } => {
                    summary.created.push(CreatedInstance {
                        name: instance.clone(),
                        zone: zone.clone(),
                    });
                    hits += 1;
                }
                ZoneOutcome::WouldCreate { .. } => hits += 1,
                _ => {}
            }
            summary.zones.push(ZoneReport { zone, outcome });

            if hits >= self.target {
                info!(target_count = self.target, "reached target; stopping");
                break;
            }
        }

        info!(
            created = summary.created.len(),
            target_count = self.target,
            dry_run = self.dry_run,
            "chase finished"
        );
        Ok(summary)
    }

    async fn visit_zone<A>(&mut self, api: &A, zone: &str) -> ZoneOutcome
    where
        A: ComputeApi + ?Sized,
    {
        info!(zone, "checking availability");
        let accelerators = match api.list_accelerator_types(self.project(), zone).await {
            Ok(list) => list,
            Err(err) => {
                warn!(zone, error = %err, "failed to list accelerator types");
                return ZoneOutcome::ScanFailed(err);
            }
        };

        let wanted = self.accelerator_type();
        let Some(accelerator) = accelerators
            .into_iter()
            .find(|candidate| candidate.name.contains(wanted))
            .map(|candidate| candidate.name)
        else {
            info!(zone, accelerator = wanted, "accelerator not offered");
            return ZoneOutcome::NoAccelerator;
        };

        if self.dry_run {
            info!(zone, accelerator = %accelerator, "dry run: would create instance");
            return ZoneOutcome::WouldCreate { accelerator };
        }

        let instance = self.names.next_name();
        info!(
            zone,
            instance = %instance,
            accelerator = %accelerator,
            "accelerator available; creating instance"
        );
        match self.create(api, zone, &instance).await {
            Ok(()) => {
                info!(zone, instance = %instance, "instance created");
                ZoneOutcome::Created {
                    instance,
                    accelerator,
                }
            }
            Err(error) => {
                warn!(zone, instance = %instance, error = %error, "instance creation failed");
                // A spec that never left the process cannot have created anything.
                let rollback =
                    if matches!(error, AttemptError::Provision(ProvisionError::Template(_))) {
                        RollbackOutcome::NotNeeded
                    } else {
                        self.roll_back(api, zone, &instance).await
                    };
                ZoneOutcome::Failed {
                    instance,
                    error,
                    rollback,
                }
            }
        }
    }

    async fn create<A>(&self, api: &A, zone: &str, instance: &str) -> Result<(), AttemptError>
    where
        A: ComputeApi + ?Sized,
    {
        let operation = self.provisioner.submit(api, zone, instance).await?;
        self.waiter
            .wait(api, self.project(), zone, operation)
            .await?;
        Ok(())
    }

    async fn roll_back<A>(&self, api: &A, zone: &str, instance: &str) -> RollbackOutcome
    where
        A: ComputeApi + ?Sized,
    {
        let mut presence = probe(api, self.project(), zone, instance).await;
        let mut probes = 1_u32;
        while presence.is_unknown() && probes < self.cleanup_attempts {
            sleep(self.waiter.policy().poll_interval).await;
            presence = probe(api, self.project(), zone, instance).await;
            probes += 1;
        }

        let outcome = match presence {
            Presence::NotFound => RollbackOutcome::NotNeeded,
            Presence::Found | Presence::Transient(_) => self.delete(api, zone, instance).await,
        };
        match &outcome {
            RollbackOutcome::NotNeeded => info!(zone, instance, "nothing to roll back"),
            RollbackOutcome::Deleted => info!(zone, instance, "rolled back partial instance"),
            RollbackOutcome::Failed(message) => {
                warn!(zone, instance, error = %message, "rollback failed; instance may remain");
            }
        }
        outcome
    }

    async fn delete<A>(&self, api: &A, zone: &str, instance: &str) -> RollbackOutcome
    where
        A: ComputeApi + ?Sized,
    {
        let operation = match api.delete_instance(self.project(), zone, instance).await {
            Ok(operation) => operation,
            Err(err) if err.is_not_found() => return RollbackOutcome::NotNeeded,
            Err(err) => return RollbackOutcome::Failed(err.to_string()),
        };
        match self.waiter.wait(api, self.project(), zone, operation).await {
            Ok(_) => RollbackOutcome::Deleted,
            Err(err) => RollbackOutcome::Failed(err.to_string()),
        }
    }
}
