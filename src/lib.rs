//! Core library for the gpu-chase provisioning tool.
//!
//! GPU capacity on Compute Engine is scarce and uneven across zones. The
//! crate walks the zones of a project, attempts to create a GPU instance in
//! each zone that offers the requested accelerator, rolls back partial
//! failures, and stops once enough instances exist. A companion sweep deletes
//! every instance whose name carries a given prefix.
//!
//! Provider calls go through the [`ComputeApi`] trait; [`GceCompute`] is the
//! REST implementation and [`test_support::FakeCompute`] an in-memory double.

pub mod chase;
pub mod command;
pub mod compute;
pub mod config;
pub mod gce;
pub mod instance;
pub mod operation;
pub mod probe;
pub mod provision;
pub mod sweep;
pub mod test_support;
pub mod zone;

pub use chase::{
    AttemptError, ChaseError, ChaseLoop, ChaseSummary, CreatedInstance, RollbackOutcome,
    ZoneOutcome, ZoneReport,
};
pub use command::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};
pub use compute::{
    AcceleratorType, ComputeApi, ComputeError, ComputeFuture, InstanceSummary, Operation,
    OperationErrorDetail, OperationStatus,
};
pub use config::{ChaseConfig, ConfigError, SweepSettings};
pub use gce::{GceCompute, TokenError, TokenSource};
pub use instance::{InstanceSpec, InstanceTemplate, NameGenerator, TemplateError};
pub use operation::{OperationWaiter, WaitError, WaitPolicy};
pub use probe::{Presence, probe};
pub use provision::{ProvisionError, Provisioner};
pub use sweep::{BulkDeleter, SweepConfig, SweepError, SweepFailure, SweepSummary};
pub use zone::{RegionError, has_letter_suffix, region_for_zone};
