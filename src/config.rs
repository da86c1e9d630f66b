//! Configuration loading via `ortho-config`.
//!
//! [`ChaseConfig`] merges defaults, `gpu-chase.toml` files and `GPU_CHASE_*`
//! environment variables. Validation happens once at start-up and produces
//! messages naming both the environment variable and the TOML key to set.
//!
//! [`SweepSettings`] reads the same sources but only the keys a sweep needs,
//! so deleting instances never requires the network or image settings.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::gce::{DEFAULT_BASE_URL, TokenSource};
use crate::instance::InstanceTemplate;
use crate::operation::{MAX_POLL_FAILURES, WaitPolicy};
use crate::sweep::SweepConfig;

/// Name of the configuration file searched for by discovery.
pub const CONFIG_FILE_NAME: &str = "gpu-chase.toml";

/// Default base for generated instance names and sweep prefixes.
pub const DEFAULT_NAME_PREFIX: &str = "gpu-chase-vm";

/// Settings for chasing GPU instances.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "GPU_CHASE",
    discovery(
        app_name = "gpu-chase",
        env_var = "GPU_CHASE_CONFIG_PATH",
        config_file_name = "gpu-chase.toml",
        dotfile_name = ".gpu-chase.toml",
        project_file_name = "gpu-chase.toml"
    )
)]
pub struct ChaseConfig {
    /// Project that owns the instances and the subnetwork.
    pub project_id: String,
    /// VPC network name.
    pub network: String,
    /// Subnetwork name; the region is derived from each zone.
    pub subnetwork: String,
    /// Machine type for new instances.
    #[ortho_config(default = "n1-standard-4".to_owned())]
    pub machine_type: String,
    /// Project hosting the boot image.
    #[ortho_config(default = "ml-images".to_owned())]
    pub image_project: String,
    /// Boot image family.
    pub image_family: String,
    /// Accelerator type to chase. Zones match when an offered type contains
    /// this value.
    #[ortho_config(default = "nvidia-tesla-t4".to_owned())]
    pub accelerator_type: String,
    /// Number of instances to create before stopping.
    #[ortho_config(default = 1)]
    pub target_count: u32,
    /// Base for generated instance names, also the default sweep prefix.
    #[ortho_config(default = DEFAULT_NAME_PREFIX.to_owned())]
    pub name_prefix: String,
    /// Report matching zones without creating anything.
    #[ortho_config(default = false)]
    pub dry_run: bool,
    /// Bearer token for API calls. When unset the token is obtained from
    /// `gcloud auth print-access-token`.
    pub access_token: Option<String>,
    /// Path to the `gcloud` executable.
    #[ortho_config(default = "gcloud".to_owned())]
    pub gcloud_bin: String,
    /// Compute Engine REST endpoint.
    #[ortho_config(default = DEFAULT_BASE_URL.to_owned())]
    pub api_endpoint: String,
    /// Seconds between operation polls.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Upper bound in seconds on waiting for one operation.
    #[ortho_config(default = 600)]
    pub max_wait_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to {CONFIG_FILE_NAME}",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const REQUIRED_FIELDS: [FieldMetadata; 10] = [
    FieldMetadata::new("project ID", "GPU_CHASE_PROJECT_ID", "project_id"),
    FieldMetadata::new("VPC network", "GPU_CHASE_NETWORK", "network"),
    FieldMetadata::new("subnetwork", "GPU_CHASE_SUBNETWORK", "subnetwork"),
    FieldMetadata::new("machine type", "GPU_CHASE_MACHINE_TYPE", "machine_type"),
    FieldMetadata::new("image project", "GPU_CHASE_IMAGE_PROJECT", "image_project"),
    FieldMetadata::new("image family", "GPU_CHASE_IMAGE_FAMILY", "image_family"),
    FieldMetadata::new(
        "accelerator type",
        "GPU_CHASE_ACCELERATOR_TYPE",
        "accelerator_type",
    ),
    FieldMetadata::new("instance name prefix", "GPU_CHASE_NAME_PREFIX", "name_prefix"),
    FieldMetadata::new("gcloud executable", "GPU_CHASE_GCLOUD_BIN", "gcloud_bin"),
    FieldMetadata::new("API endpoint", "GPU_CHASE_API_ENDPOINT", "api_endpoint"),
];

impl ChaseConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("gpu-chase")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    fn required_values(&self) -> [&str; 10] {
        [
            &self.project_id,
            &self.network,
            &self.subnetwork,
            &self.machine_type,
            &self.image_project,
            &self.image_family,
            &self.accelerator_type,
            &self.name_prefix,
            &self.gcloud_bin,
            &self.api_endpoint,
        ]
    }

    /// Performs semantic validation. Error messages include guidance on how
    /// to provide missing values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is blank
    /// and [`ConfigError::Invalid`] when the polling bounds are inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (value, metadata) in self.required_values().into_iter().zip(&REQUIRED_FIELDS) {
            if value.trim().is_empty() {
                return Err(metadata.missing());
            }
        }
        validate_polling(self.poll_interval_secs, self.max_wait_secs)
    }

    /// Builds the instance template shared by every attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn template(&self) -> Result<InstanceTemplate, ConfigError> {
        self.validate()?;
        InstanceTemplate::builder()
            .project_id(&self.project_id)
            .network(&self.network)
            .subnetwork(&self.subnetwork)
            .machine_type(&self.machine_type)
            .image_project(&self.image_project)
            .image_family(&self.image_family)
            .accelerator_type(&self.accelerator_type)
            .build()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Polling policy for create and delete operations.
    #[must_use]
    pub const fn wait_policy(&self) -> WaitPolicy {
        polling_policy(self.poll_interval_secs, self.max_wait_secs)
    }

    /// Where the API bearer token comes from.
    #[must_use]
    pub fn token_source(&self) -> TokenSource {
        token_source_for(self.access_token.as_deref(), &self.gcloud_bin)
    }
}

/// Settings for `gpu-chase sweep`, loaded from the same sources as
/// [`ChaseConfig`].
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "GPU_CHASE",
    discovery(
        app_name = "gpu-chase",
        env_var = "GPU_CHASE_CONFIG_PATH",
        config_file_name = "gpu-chase.toml",
        dotfile_name = ".gpu-chase.toml",
        project_file_name = "gpu-chase.toml"
    )
)]
pub struct SweepSettings {
    /// Project whose zones are swept.
    pub project_id: String,
    /// Prefix used when `--prefix` is not given.
    #[ortho_config(default = DEFAULT_NAME_PREFIX.to_owned())]
    pub name_prefix: String,
    /// Bearer token for API calls.
    pub access_token: Option<String>,
    /// Path to the `gcloud` executable.
    #[ortho_config(default = "gcloud".to_owned())]
    pub gcloud_bin: String,
    /// Compute Engine REST endpoint.
    #[ortho_config(default = DEFAULT_BASE_URL.to_owned())]
    pub api_endpoint: String,
    /// Seconds between delete operation polls.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Upper bound in seconds on waiting for one delete.
    #[ortho_config(default = 600)]
    pub max_wait_secs: u64,
}

const SWEEP_REQUIRED_FIELDS: [FieldMetadata; 3] = [
    FieldMetadata::new("project ID", "GPU_CHASE_PROJECT_ID", "project_id"),
    FieldMetadata::new("gcloud executable", "GPU_CHASE_GCLOUD_BIN", "gcloud_bin"),
    FieldMetadata::new("API endpoint", "GPU_CHASE_API_ENDPOINT", "api_endpoint"),
];

impl SweepSettings {
    /// Loads sweep settings from defaults, configuration files, and
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("gpu-chase")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks the fields a sweep uses and the polling bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for a blank required field and
    /// [`ConfigError::Invalid`] for inconsistent polling bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [&self.project_id, &self.gcloud_bin, &self.api_endpoint];
        for (value, metadata) in values.into_iter().zip(&SWEEP_REQUIRED_FIELDS) {
            if value.trim().is_empty() {
                return Err(metadata.missing());
            }
        }
        validate_polling(self.poll_interval_secs, self.max_wait_secs)
    }

    /// Polling policy for delete operations.
    #[must_use]
    pub const fn wait_policy(&self) -> WaitPolicy {
        polling_policy(self.poll_interval_secs, self.max_wait_secs)
    }

    /// Where the API bearer token comes from.
    #[must_use]
    pub fn token_source(&self) -> TokenSource {
        token_source_for(self.access_token.as_deref(), &self.gcloud_bin)
    }

    /// Builds sweep settings, using `prefix` when given and `name_prefix`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails or the project or
    /// prefix is blank.
    pub fn sweep_config(&self, prefix: Option<&str>) -> Result<SweepConfig, ConfigError> {
        self.validate()?;
        SweepConfig::new(&self.project_id, prefix.unwrap_or(&self.name_prefix))
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

fn validate_polling(poll_interval_secs: u64, max_wait_secs: u64) -> Result<(), ConfigError> {
    if poll_interval_secs == 0 {
        return Err(ConfigError::Invalid(String::from(
            "poll_interval_secs must be greater than zero (GPU_CHASE_POLL_INTERVAL_SECS)",
        )));
    }
    if max_wait_secs < poll_interval_secs {
        return Err(ConfigError::Invalid(format!(
            "max_wait_secs ({max_wait_secs}) must not be shorter than poll_interval_secs ({poll_interval_secs})"
        )));
    }
    Ok(())
}

const fn polling_policy(poll_interval_secs: u64, max_wait_secs: u64) -> WaitPolicy {
    WaitPolicy {
        poll_interval: Duration::from_secs(poll_interval_secs),
        max_wait: Duration::from_secs(max_wait_secs),
        max_poll_failures: MAX_POLL_FAILURES,
    }
}

fn token_source_for(access_token: Option<&str>, gcloud_bin: &str) -> TokenSource {
    match access_token.map(str::trim) {
        Some(token) if !token.is_empty() => TokenSource::Static(token.to_owned()),
        _ => TokenSource::Gcloud {
            program: gcloud_bin.to_owned(),
        },
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates values that are present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
