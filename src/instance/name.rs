//! Generation of unique instance names.

use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

/// Number of lowercase hex characters appended to the base name.
pub const SUFFIX_LEN: usize = 4;

/// Source of name suffixes; called again whenever a suffix collides.
pub type SuffixSource = Box<dyn FnMut() -> String + Send>;

/// Issues `<base>-<suffix>` names, never repeating one within its lifetime.
pub struct NameGenerator {
    base: String,
    issued: HashSet<String>,
    source: SuffixSource,
}

impl NameGenerator {
    /// Creates a generator drawing suffixes from random v4 UUIDs.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_source(base, Box::new(random_suffix))
    }

    /// Creates a generator with a custom suffix source.
    #[must_use]
    pub fn with_source(base: impl Into<String>, source: SuffixSource) -> Self {
        Self {
            base: base.into(),
            issued: HashSet::new(),
            source,
        }
    }

    /// Returns the next unused name.
    pub fn next_name(&mut self) -> String {
        loop {
            let candidate = format!("{}-{}", self.base, (self.source)());
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Names issued so far.
    #[must_use]
    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}

impl fmt::Debug for NameGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameGenerator")
            .field("base", &self.base)
            .field("issued", &self.issued)
            .finish_non_exhaustive()
    }
}

fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string().chars().take(SUFFIX_LEN).collect()
}
