//! Compute API abstraction consumed by the chase loop and the bulk deleter.
//!
//! The trait mirrors the handful of Compute Engine calls the tool needs so
//! that orchestration code can be exercised against an in-memory double.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::instance::InstanceSpec;

/// Accelerator type offered in a zone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AcceleratorType {
    /// Provider name of the GPU SKU (for example `nvidia-tesla-t4`).
    pub name: String,
}

impl AcceleratorType {
    /// Creates an accelerator type with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Minimal view of an instance as returned by list and get calls.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceSummary {
    /// Instance name, unique within a zone.
    pub name: String,
    /// Lifecycle status reported by the provider (for example `RUNNING`).
    pub status: Option<String>,
}

/// Lifecycle state of a long-running operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OperationStatus {
    /// Queued by the provider.
    Pending,
    /// In progress.
    Running,
    /// Terminal; inspect [`Operation::errors`] for the result.
    Done,
    /// Status string the tool does not recognise; treated as non-terminal.
    Other(String),
}

impl OperationStatus {
    /// Parses the provider's status string.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "DONE" => Self::Done,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns `true` for the terminal `DONE` status.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Single error entry embedded in a finished operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperationErrorDetail {
    /// Provider error code (for example `ZONE_RESOURCE_POOL_EXHAUSTED`).
    pub code: String,
    /// Human readable description, when supplied.
    pub message: Option<String>,
}

/// Handle for an asynchronous create or delete request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Operation {
    /// Provider identifier used to poll the operation.
    pub name: String,
    /// Current status.
    pub status: OperationStatus,
    /// Errors reported once the operation finished; empty on success.
    pub errors: Vec<OperationErrorDetail>,
}

impl Operation {
    /// Returns the first embedded error, if the provider reported any.
    #[must_use]
    pub fn first_error(&self) -> Option<&OperationErrorDetail> {
        self.errors.first()
    }
}

/// Errors raised while talking to the compute API.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ComputeError {
    /// The addressed resource does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// Path or name of the missing resource.
        resource: String,
    },
    /// The provider rejected the call (authentication, quota, validation).
    #[error("provider error{}: {message}", http_status_note(.status.as_ref()))]
    Provider {
        /// HTTP status, when one was received.
        status: Option<u16>,
        /// Message returned by the provider.
        message: String,
    },
    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode {resource} response: {message}")]
    Decode {
        /// Resource being decoded.
        resource: String,
        /// Decoder error message.
        message: String,
    },
}

impl ComputeError {
    /// Returns `true` when the error signals a missing resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn http_status_note(status: Option<&u16>) -> String {
    status.map_or_else(String::new, |code| format!(" (HTTP {code})"))
}

/// Future returned by compute API operations.
pub type ComputeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ComputeError>> + Send + 'a>>;

/// Provider calls required to chase and sweep GPU instances.
pub trait ComputeApi {
    /// Lists zone names visible to the project, in provider order.
    fn list_zones<'a>(&'a self, project: &'a str) -> ComputeFuture<'a, Vec<String>>;

    /// Lists accelerator types offered in a zone.
    fn list_accelerator_types<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
    ) -> ComputeFuture<'a, Vec<AcceleratorType>>;

    /// Lists instances in a zone.
    fn list_instances<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
    ) -> ComputeFuture<'a, Vec<InstanceSummary>>;

    /// Fetches a single instance, failing with [`ComputeError::NotFound`]
    /// when it does not exist.
    fn get_instance<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        name: &'a str,
    ) -> ComputeFuture<'a, InstanceSummary>;

    /// Submits an instance creation request.
    fn insert_instance<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        spec: &'a InstanceSpec,
    ) -> ComputeFuture<'a, Operation>;

    /// Submits an instance deletion request.
    fn delete_instance<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        name: &'a str,
    ) -> ComputeFuture<'a, Operation>;

    /// Fetches the current state of a zonal operation.
    fn get_operation<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        operation: &'a str,
    ) -> ComputeFuture<'a, Operation>;
}
