//! Existence checks for instances, used to decide whether a failed creation
//! left anything behind.

use tracing::debug;

use crate::compute::{ComputeApi, ComputeError};

/// Result of looking up an instance by name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Presence {
    /// The instance exists.
    Found,
    /// The provider confirmed the instance does not exist.
    NotFound,
    /// The lookup failed for another reason; existence is unknown.
    Transient(ComputeError),
}

impl Presence {
    /// Returns `true` when existence could not be determined.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Looks up a named instance in a zone.
///
/// Only a provider not-found maps to [`Presence::NotFound`]; permission,
/// quota and network failures are reported as [`Presence::Transient`].
pub async fn probe<A>(api: &A, project: &str, zone: &str, name: &str) -> Presence
where
    A: ComputeApi + ?Sized,
{
    let presence = match api.get_instance(project, zone, name).await {
        Ok(_) => Presence::Found,
        Err(err) if err.is_not_found() => Presence::NotFound,
        Err(err) => Presence::Transient(err),
    };
    debug!(zone, instance = name, presence = ?presence, "probed instance");
    presence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeCompute;

    #[tokio::test]
    async fn existing_instance_is_found() {
        let fake = FakeCompute::with_zones(&["us-central1-a"]);
        fake.add_instance("us-central1-a", "vm-1234");
        assert_eq!(
            probe(&fake, "proj", "us-central1-a", "vm-1234").await,
            Presence::Found
        );
    }

    #[tokio::test]
    async fn missing_instance_is_not_found() {
        let fake = FakeCompute::with_zones(&["us-central1-a"]);
        assert_eq!(
            probe(&fake, "proj", "us-central1-a", "vm-1234").await,
            Presence::NotFound
        );
    }

    #[tokio::test]
    async fn lookup_failure_is_not_treated_as_absence() {
        let fake = FakeCompute::with_zones(&["us-central1-a"]);
        fake.add_instance("us-central1-a", "vm-1234");
        fake.fail_next_instance_lookups(1);

        let presence = probe(&fake, "proj", "us-central1-a", "vm-1234").await;
        assert!(presence.is_unknown(), "got {presence:?}");
        assert_eq!(
            probe(&fake, "proj", "us-central1-a", "vm-1234").await,
            Presence::Found
        );
    }
}
