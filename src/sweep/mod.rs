//! Bulk deletion of instances by name prefix.
//!
//! The sweep walks every zone of a project, selects instances whose name
//! starts with the configured prefix, and deletes them one at a time,
//! waiting for each delete operation. A failure on one instance is recorded
//! and the sweep moves on, so a single stuck instance never hides the rest.

use thiserror::Error;
use tracing::{info, warn};

use crate::compute::{ComputeApi, ComputeError};
use crate::operation::OperationWaiter;

/// Configuration for a sweep.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SweepConfig {
    /// Project whose zones are swept.
    pub project_id: String,
    /// Case-sensitive name prefix selecting instances to delete, stored
    /// without surrounding whitespace.
    pub prefix: String,
}

impl SweepConfig {
    /// Constructs a config, trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::InvalidConfig`] when either field is blank. A
    /// blank prefix would match every instance in the project.
    pub fn new(
        project_id: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Result<Self, SweepError> {
        let trimmed_project_id = project_id.into().trim().to_owned();
        let trimmed_prefix = prefix.into().trim().to_owned();
        if trimmed_project_id.is_empty() {
            return Err(SweepError::InvalidConfig {
                field: String::from("project_id"),
            });
        }
        if trimmed_prefix.is_empty() {
            return Err(SweepError::InvalidConfig {
                field: String::from("prefix"),
            });
        }
        Ok(Self {
            project_id: trimmed_project_id,
            prefix: trimmed_prefix,
        })
    }

    /// Returns `true` when `name` is selected by the prefix.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }
}

/// A deletion or listing that did not succeed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SweepFailure {
    /// Zone where the failure happened.
    pub zone: String,
    /// Instance being deleted, or `None` when listing the zone failed.
    pub instance: Option<String>,
    /// Error description.
    pub message: String,
}

/// Summary of sweep work.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SweepSummary {
    /// Instances whose name matched the prefix.
    pub matched: usize,
    /// Instances deleted by this sweep.
    pub deleted: usize,
    /// Matched instances that were already gone when deletion was requested.
    pub already_gone: usize,
    /// Failures recorded during the sweep.
    pub failures: Vec<SweepFailure>,
}

impl SweepSummary {
    /// Returns `true` when the sweep recorded no failures.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Errors that stop a sweep before any zone is processed.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SweepError {
    /// Raised when configuration is missing required values.
    #[error("missing {field}")]
    InvalidConfig {
        /// Name of the missing or invalid field.
        field: String,
    },
    /// Zones could not be enumerated.
    #[error("failed to list zones: {0}")]
    ZoneListing(#[source] ComputeError),
}

/// Deletes every instance whose name starts with a prefix.
#[derive(Clone, Debug)]
pub struct BulkDeleter {
    config: SweepConfig,
    waiter: OperationWaiter,
}

impl BulkDeleter {
    /// Creates a deleter using the default operation waiter.
    #[must_use]
    pub fn new(config: SweepConfig) -> Self {
        Self {
            config,
            waiter: OperationWaiter::default(),
        }
    }

    /// Overrides the operation waiter.
    #[must_use]
    pub const fn with_waiter(mut self, waiter: OperationWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// Sweeps all zones and returns what was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::ZoneListing`] when zones cannot be enumerated.
    /// Failures inside a zone are recorded in [`SweepSummary::failures`].
    pub async fn sweep<A>(&self, api: &A) -> Result<SweepSummary, SweepError>
    where
        A: ComputeApi + ?Sized,
    {
        let project = self.config.project_id.as_str();
        let zones = api
            .list_zones(project)
            .await
            .map_err(SweepError::ZoneListing)?;

        let mut summary = SweepSummary::default();
        for zone in zones {
            info!(zone = %zone, prefix = %self.config.prefix, "checking for matching instances");
            let instances = match api.list_instances(project, &zone).await {
                Ok(instances) => instances,
                Err(err) => {
                    warn!(zone = %zone, error = %err, "failed to list instances");
                    summary.failures.push(SweepFailure {
                        zone,
                        instance: None,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            let matched: Vec<String> = instances
                .into_iter()
                .map(|instance| instance.name)
                .filter(|name| self.config.matches(name))
                .collect();
            if matched.is_empty() {
                info!(zone = %zone, "no matching instances");
                continue;
            }

            for name in matched {
                summary.matched += 1;
                self.delete_one(api, &zone, name, &mut summary).await;
            }
        }

        info!(
            matched = summary.matched,
            deleted = summary.deleted,
            failed = summary.failures.len(),
            "sweep finished"
        );
        Ok(summary)
    }

    async fn delete_one<A>(&self, api: &A, zone: &str, name: String, summary: &mut SweepSummary)
    where
        A: ComputeApi + ?Sized,
    {
        let project = self.config.project_id.as_str();
        info!(zone, instance = %name, "deleting instance");
        let result = match api.delete_instance(project, zone, &name).await {
            Ok(operation) => self
                .waiter
                .wait(api, project, zone, operation)
                .await
                .map(|_| true)
                .map_err(|err| err.to_string()),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.to_string()),
        };

        match result {
            Ok(true) => {
                info!(zone, instance = %name, "deleted instance");
                summary.deleted += 1;
            }
            Ok(false) => {
                info!(zone, instance = %name, "instance already gone");
                summary.already_gone += 1;
            }
            Err(message) => {
                warn!(zone, instance = %name, error = %message, "failed to delete instance");
                summary.failures.push(SweepFailure {
                    zone: zone.to_owned(),
                    instance: Some(name),
                    message,
                });
            }
        }
    }
}
