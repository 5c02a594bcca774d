use serde::{Deserialize, Serialize};

use crate::coord::Coordinate;

/// Axis-aligned geographic rectangle in degrees, as reported by a map camera.
///
/// No antimeridian handling: `east`/`west` are treated as plain numbers and
/// [`ViewportBounds::normalized`] orders them with min/max.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl ViewportBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.north.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.west.is_finite()
    }

    /// `true` when both corners are valid geographic coordinates.
    pub fn is_in_range(&self) -> bool {
        Coordinate::new(self.north, self.east).is_in_range()
            && Coordinate::new(self.south, self.west).is_in_range()
    }

    /// Returns bounds with `north >= south` and `east >= west`.
    pub fn normalized(&self) -> Self {
        Self {
            north: self.north.max(self.south),
            south: self.north.min(self.south),
            east: self.east.max(self.west),
            west: self.east.min(self.west),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ViewportBounds;

    #[test]
    fn normalized_swaps_inverted_edges() {
        let b = ViewportBounds::new(9.0, 10.0, 19.0, 20.0).normalized();
        assert_eq!(b, ViewportBounds::new(10.0, 9.0, 20.0, 19.0));
    }

    #[test]
    fn range_check_covers_every_edge() {
        assert!(ViewportBounds::new(90.0, -90.0, 180.0, -180.0).is_in_range());
        assert!(!ViewportBounds::new(1e300, 0.0, 1.0, 0.0).is_in_range());
        assert!(!ViewportBounds::new(1.0, -90.5, 1.0, 0.0).is_in_range());
        assert!(!ViewportBounds::new(1.0, 0.0, 181.0, 0.0).is_in_range());
        assert!(!ViewportBounds::new(1.0, 0.0, 1.0, -180.01).is_in_range());
    }

    #[test]
    fn non_finite_edges_are_reported() {
        assert!(!ViewportBounds::new(f64::NAN, 0.0, 1.0, 0.0).is_finite());
        assert!(ViewportBounds::new(1.0, 0.0, 1.0, 0.0).is_finite());
    }
}
