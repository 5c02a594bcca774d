use foundation::coord::Coordinate;
use foundation::time::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::SampleError;

/// One fix from the location provider.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Monotonic provider time; only ordering matters.
    #[serde(rename = "timestamp_ms")]
    pub timestamp: Timestamp,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, timestamp: Timestamp) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    pub fn at(coordinate: Coordinate, timestamp: Timestamp) -> Self {
        Self::new(coordinate.latitude, coordinate.longitude, timestamp)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Boundary check applied before a sample may touch any state.
    pub fn validate(&self) -> Result<(), SampleError> {
        let coordinate = self.coordinate();
        if !coordinate.is_finite() {
            return Err(SampleError::NonFinite);
        }
        if !coordinate.is_in_range() {
            return Err(SampleError::OutOfRange {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        Ok(())
    }
}
