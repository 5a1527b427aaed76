use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, globally unique particle identifier.
///
/// Tags survive domain decomposition and neighbor-list rebuilds, so they are what
/// bond identity is keyed on. Local array indices are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticleTag(pub u64);

impl fmt::Display for ParticleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for ParticleTag {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
