//! Submission of GPU instance creation requests.

use thiserror::Error;
use tracing::{debug, warn};

use crate::compute::{ComputeApi, ComputeError, Operation};
use crate::instance::{InstanceSpec, InstanceTemplate, TemplateError};
use crate::zone::has_letter_suffix;

/// Errors raised before a creation request reaches a running operation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProvisionError {
    /// The instance specification could not be built for the zone.
    #[error("cannot build instance spec: {0}")]
    Template(#[from] TemplateError),
    /// The provider rejected the insert call.
    #[error("insert rejected: {0}")]
    Compute(#[from] ComputeError),
}

/// Builds instance specifications and submits them without waiting.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Provisioner {
    template: InstanceTemplate,
}

impl Provisioner {
    /// Creates a provisioner for the given template.
    #[must_use]
    pub const fn new(template: InstanceTemplate) -> Self {
        Self { template }
    }

    /// Returns the template used for every submission.
    #[must_use]
    pub const fn template(&self) -> &InstanceTemplate {
        &self.template
    }

    /// Builds the specification for `name` in `zone`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Template`] when the zone cannot be mapped to
    /// a region.
    pub fn spec(&self, zone: &str, name: &str) -> Result<InstanceSpec, ProvisionError> {
        if !has_letter_suffix(zone) {
            warn!(
                zone,
                "zone does not end in a single-letter suffix; region taken from final segment"
            );
        }
        Ok(self.template.spec_for(zone, name)?)
    }

    /// Submits a creation request and returns the pending operation.
    ///
    /// Completion is left to [`crate::operation::OperationWaiter`].
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when the instance spec cannot be built or the
    /// provider rejects the request.
    pub async fn submit<A>(
        &self,
        api: &A,
        zone: &str,
        name: &str,
    ) -> Result<Operation, ProvisionError>
    where
        A: ComputeApi + ?Sized,
    {
        let spec = self.spec(zone, name)?;
        let operation = api
            .insert_instance(&self.template.project_id, zone, &spec)
            .await?;
        debug!(zone, instance = name, operation = %operation.name, "submitted instance insert");
        Ok(operation)
    }
}
