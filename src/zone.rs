//! Zone name helpers.

use thiserror::Error;

/// Errors raised when a zone name cannot be mapped to its region.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RegionError {
    /// The zone name does not follow the `<region>-<suffix>` convention.
    #[error("zone '{zone}' does not follow the <region>-<suffix> naming convention")]
    Malformed {
        /// Zone name as supplied.
        zone: String,
    },
}

/// Derives the region of a zone by splitting on the last `-`.
///
/// `us-central1-a` maps to `us-central1`. Unlike a fixed two-character trim,
/// this keeps working for suffixes longer than one letter.
///
/// # Errors
///
/// Returns [`RegionError::Malformed`] when the zone contains no `-` or when
/// either side of the final `-` is empty.
pub fn region_for_zone(zone: &str) -> Result<&str, RegionError> {
    match zone.rsplit_once('-') {
        Some((region, suffix)) if !region.is_empty() && !suffix.is_empty() => Ok(region),
        _ => Err(RegionError::Malformed {
            zone: zone.to_owned(),
        }),
    }
}

/// Returns `true` when the zone ends in the conventional single-letter
/// suffix (`-a`, `-b`, ...).
#[must_use]
pub fn has_letter_suffix(zone: &str) -> bool {
    zone.rsplit_once('-').is_some_and(|(_, suffix)| {
        let mut chars = suffix.chars();
        matches!((chars.next(), chars.next()), (Some(ch), None) if ch.is_ascii_lowercase())
    })
}
