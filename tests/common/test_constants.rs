//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Project used by every fake compute fixture.
pub const PROJECT_ID: &str = "mg7609";

/// Accelerator requested by chase fixtures.
pub const ACCELERATOR: &str = "nvidia-tesla-t4";

/// Base name for instances created by chase fixtures.
pub const NAME_BASE: &str = "mg7609-vm";

/// Environment variables that make up a complete configuration.
pub const CONFIG_ENV: [(&str, &str); 6] = [
    ("GPU_CHASE_PROJECT_ID", PROJECT_ID),
    ("GPU_CHASE_NETWORK", "default"),
    ("GPU_CHASE_SUBNETWORK", "default"),
    ("GPU_CHASE_IMAGE_FAMILY", "common-cu121"),
    ("GPU_CHASE_NAME_PREFIX", NAME_BASE),
    ("GPU_CHASE_ACCESS_TOKEN", "ya29.test-token"),
];
