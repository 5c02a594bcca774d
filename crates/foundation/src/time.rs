use serde::{Deserialize, Serialize};

/// Monotonic timestamp in milliseconds, as stamped by the location provider.
///
/// Only ordering and differences are meaningful; the epoch is arbitrary.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn millis(&self) -> u64 {
        self.0
    }
}
