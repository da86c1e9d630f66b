//! Instance templates and the Compute Engine instance specification.
//!
//! An [`InstanceTemplate`] holds the caller-supplied settings shared by every
//! attempt in a run. [`InstanceTemplate::spec_for`] turns it into a fresh
//! [`InstanceSpec`] for one zone and one generated name.

mod name;

use serde::Serialize;
use thiserror::Error;

use crate::zone::{RegionError, region_for_zone};

pub use name::{NameGenerator, SUFFIX_LEN, SuffixSource};

/// Boot disk size in GB for every provisioned instance.
pub const BOOT_DISK_SIZE_GB: u64 = 100;

/// Number of accelerators attached to every provisioned instance.
pub const ACCELERATOR_COUNT: u32 = 1;

/// Maintenance policy required for GPU instances, which cannot live-migrate.
pub const ON_HOST_MAINTENANCE: &str = "TERMINATE";

/// Caller-supplied settings used to build every instance in a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceTemplate {
    /// Project that owns the instances and the subnetwork.
    pub project_id: String,
    /// VPC network name.
    pub network: String,
    /// Subnetwork name; resolved per region.
    pub subnetwork: String,
    /// Machine type (for example `n1-standard-4`).
    pub machine_type: String,
    /// Project hosting the boot image.
    pub image_project: String,
    /// Boot image family.
    pub image_family: String,
    /// Accelerator type to attach (for example `nvidia-tesla-t4`).
    pub accelerator_type: String,
}

impl InstanceTemplate {
    /// Starts a builder for an [`InstanceTemplate`].
    #[must_use]
    pub fn builder() -> InstanceTemplateBuilder {
        InstanceTemplateBuilder::new()
    }

    /// Validates the template, naming the first empty field.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingField`] when any field is empty.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let fields = [
            ("project_id", &self.project_id),
            ("network", &self.network),
            ("subnetwork", &self.subnetwork),
            ("machine_type", &self.machine_type),
            ("image_project", &self.image_project),
            ("image_family", &self.image_family),
            ("accelerator_type", &self.accelerator_type),
        ];
        for (field, value) in fields {
            if value.is_empty() {
                return Err(TemplateError::MissingField(field.to_owned()));
            }
        }
        Ok(())
    }

    /// Source image path: `projects/<image_project>/global/images/<image_family>`.
    #[must_use]
    pub fn source_image(&self) -> String {
        format!(
            "projects/{}/global/images/{}",
            self.image_project, self.image_family
        )
    }

    /// Machine type path for a zone.
    #[must_use]
    pub fn machine_type_path(&self, zone: &str) -> String {
        format!("zones/{zone}/machineTypes/{}", self.machine_type)
    }

    /// Accelerator type path for a zone.
    #[must_use]
    pub fn accelerator_path(&self, zone: &str) -> String {
        format!("zones/{zone}/acceleratorTypes/{}", self.accelerator_type)
    }

    /// Network path.
    #[must_use]
    pub fn network_path(&self) -> String {
        format!("global/networks/{}", self.network)
    }

    /// Subnetwork path for the region that hosts `zone`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Region`] when the zone name has no region
    /// component.
    pub fn subnetwork_path(&self, zone: &str) -> Result<String, TemplateError> {
        let region = region_for_zone(zone)?;
        Ok(format!(
            "projects/{}/regions/{region}/subnetworks/{}",
            self.project_id, self.subnetwork
        ))
    }

    /// Builds the full instance specification for one attempt.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Region`] when the zone name cannot be mapped
    /// to a region.
    pub fn spec_for(&self, zone: &str, name: &str) -> Result<InstanceSpec, TemplateError> {
        Ok(InstanceSpec {
            name: name.to_owned(),
            machine_type: self.machine_type_path(zone),
            disks: vec![AttachedDisk {
                boot: true,
                auto_delete: true,
                initialize_params: DiskInitializeParams {
                    source_image: self.source_image(),
                    disk_size_gb: BOOT_DISK_SIZE_GB,
                },
            }],
            network_interfaces: vec![NetworkInterface {
                network: self.network_path(),
                subnetwork: self.subnetwork_path(zone)?,
            }],
            guest_accelerators: vec![AcceleratorConfig {
                accelerator_type: self.accelerator_path(zone),
                accelerator_count: ACCELERATOR_COUNT,
            }],
            scheduling: Scheduling {
                on_host_maintenance: ON_HOST_MAINTENANCE.to_owned(),
                automatic_restart: true,
            },
        })
    }
}

/// Builder for [`InstanceTemplate`] that trims inputs and validates on build.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceTemplateBuilder {
    project_id: String,
    network: String,
    subnetwork: String,
    machine_type: String,
    image_project: String,
    image_family: String,
    accelerator_type: String,
}

impl InstanceTemplateBuilder {
    /// Creates an empty builder; fields must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the project identifier.
    #[must_use]
    pub fn project_id(mut self, value: impl Into<String>) -> Self {
        self.project_id = value.into();
        self
    }

    /// Sets the network name.
    #[must_use]
    pub fn network(mut self, value: impl Into<String>) -> Self {
        self.network = value.into();
        self
    }

    /// Sets the subnetwork name.
    #[must_use]
    pub fn subnetwork(mut self, value: impl Into<String>) -> Self {
        self.subnetwork = value.into();
        self
    }

    /// Sets the machine type.
    #[must_use]
    pub fn machine_type(mut self, value: impl Into<String>) -> Self {
        self.machine_type = value.into();
        self
    }

    /// Sets the image project.
    #[must_use]
    pub fn image_project(mut self, value: impl Into<String>) -> Self {
        self.image_project = value.into();
        self
    }

    /// Sets the image family.
    #[must_use]
    pub fn image_family(mut self, value: impl Into<String>) -> Self {
        self.image_family = value.into();
        self
    }

    /// Sets the accelerator type.
    #[must_use]
    pub fn accelerator_type(mut self, value: impl Into<String>) -> Self {
        self.accelerator_type = value.into();
        self
    }

    /// Builds and validates the [`InstanceTemplate`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingField`] when any field is empty.
    pub fn build(self) -> Result<InstanceTemplate, TemplateError> {
        let template = InstanceTemplate {
            project_id: self.project_id.trim().to_owned(),
            network: self.network.trim().to_owned(),
            subnetwork: self.subnetwork.trim().to_owned(),
            machine_type: self.machine_type.trim().to_owned(),
            image_project: self.image_project.trim().to_owned(),
            image_family: self.image_family.trim().to_owned(),
            accelerator_type: self.accelerator_type.trim().to_owned(),
        };
        template.validate()?;
        Ok(template)
    }
}

/// Compute Engine `Instance` resource submitted by the provisioner.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    /// Generated instance name.
    pub name: String,
    /// Zonal machine type path.
    pub machine_type: String,
    /// Attached disks; the boot disk is the only entry.
    pub disks: Vec<AttachedDisk>,
    /// Network interfaces; a single interface on the configured subnetwork.
    pub network_interfaces: Vec<NetworkInterface>,
    /// Attached GPUs.
    pub guest_accelerators: Vec<AcceleratorConfig>,
    /// Scheduling policy.
    pub scheduling: Scheduling,
}

/// Disk attached to an instance at creation time.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    /// Whether this is the boot disk.
    pub boot: bool,
    /// Whether the disk is deleted with the instance.
    pub auto_delete: bool,
    /// Parameters for creating the disk.
    pub initialize_params: DiskInitializeParams,
}

/// Parameters for a disk created alongside the instance.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInitializeParams {
    /// Image path the disk is created from.
    pub source_image: String,
    /// Disk size in GB.
    pub disk_size_gb: u64,
}

/// Network interface definition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NetworkInterface {
    /// Network path.
    pub network: String,
    /// Regional subnetwork path.
    pub subnetwork: String,
}

/// Accelerator attachment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorConfig {
    /// Zonal accelerator type path.
    pub accelerator_type: String,
    /// Number of accelerators.
    pub accelerator_count: u32,
}

/// Scheduling policy.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheduling {
    /// Action on host maintenance; always `TERMINATE` for GPU instances.
    pub on_host_maintenance: String,
    /// Restart automatically after a host event.
    pub automatic_restart: bool,
}

/// Errors raised while building instance templates and specifications.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TemplateError {
    /// Raised when a template field is empty.
    #[error("missing or empty field: {0}")]
    MissingField(String),
    /// Raised when the zone cannot be mapped to a region.
    #[error(transparent)]
    Region(#[from] RegionError),
}
