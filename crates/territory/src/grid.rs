use foundation::coord::Coordinate;
use foundation::math::{decimal_places, round_to_places, stable_total_cmp_f64};

use crate::cell::{Cell, CellKey};
use crate::error::GridError;

/// Largest supported number of fractional digits in a cell step.
pub const MAX_STEP_PLACES: u32 = 6;

/// Tolerance, in lattice units, for points sitting on a cell boundary.
///
/// Keeps e.g. `10.002 / 0.001` from landing in the neighbouring cell because
/// of binary floating-point error.
const BOUNDARY_EPSILON: f64 = 1e-7;

/// Integer position of a cell on the lattice.
///
/// `row` counts cell heights up to the cell's north edge, `col` counts cell
/// widths up to its west edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LatticeIndex {
    pub row: i64,
    pub col: i64,
}

impl LatticeIndex {
    pub const fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// `true` for the "even" squares of the checkerboard.
    pub fn is_even(&self) -> bool {
        (self.row + self.col).rem_euclid(2) == 0
    }
}

/// The fixed grid: step sizes plus the decimal precision derived from them.
///
/// A cell keyed `(y, x)` covers latitudes `(y - height, y]` and longitudes
/// `[x, x + width)`, which makes quantization idempotent on keys.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridSpec {
    width_deg: f64,
    height_deg: f64,
    places: u32,
}

impl GridSpec {
    pub fn new(width_deg: f64, height_deg: f64) -> Result<Self, GridError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width_deg) || !valid(height_deg) {
            return Err(GridError::InvalidStep {
                width: width_deg,
                height: height_deg,
            });
        }

        let places = decimal_places(width_deg).max(decimal_places(height_deg));
        if places > MAX_STEP_PLACES {
            return Err(GridError::StepTooPrecise {
                places,
                max: MAX_STEP_PLACES,
            });
        }

        Ok(Self {
            width_deg,
            height_deg,
            places,
        })
    }

    pub fn width_deg(&self) -> f64 {
        self.width_deg
    }

    pub fn height_deg(&self) -> f64 {
        self.height_deg
    }

    /// Fractional digits every key is rounded to.
    pub fn places(&self) -> u32 {
        self.places
    }

    /// Lattice position of the cell containing `coord`.
    pub fn lattice_index(&self, coord: Coordinate) -> LatticeIndex {
        LatticeIndex {
            row: self.row_at_or_above(coord.latitude),
            col: self.col_at_or_left(coord.longitude),
        }
    }

    /// Maps a raw coordinate to the key of the cell containing it.
    pub fn quantize(&self, coord: Coordinate) -> CellKey {
        self.key_at(self.lattice_index(coord))
    }

    pub fn key_at(&self, index: LatticeIndex) -> CellKey {
        CellKey::new(self.row_latitude(index.row), self.col_longitude(index.col))
    }

    /// Materializes the cell at `index`: corners NW, NE, SE, SW.
    pub fn cell_at(&self, index: LatticeIndex) -> Cell {
        let north = self.row_latitude(index.row);
        let south = self.row_latitude(index.row - 1);
        let west = self.col_longitude(index.col);
        let east = self.col_longitude(index.col + 1);

        let corners = [
            Coordinate::new(north, west),
            Coordinate::new(north, east),
            Coordinate::new(south, east),
            Coordinate::new(south, west),
        ];
        Cell::new(
            CellKey::new(north, west),
            self.width_deg,
            self.height_deg,
            corners,
        )
    }

    /// Row whose north edge is the first at or above `latitude`.
    pub(crate) fn row_at_or_above(&self, latitude: f64) -> i64 {
        (latitude / self.height_deg - BOUNDARY_EPSILON).ceil() as i64
    }

    /// Row of the cell that contains a point just above `latitude`.
    pub(crate) fn row_above(&self, latitude: f64) -> i64 {
        (latitude / self.height_deg + BOUNDARY_EPSILON).floor() as i64 + 1
    }

    /// Column whose west edge is the last at or left of `longitude`.
    pub(crate) fn col_at_or_left(&self, longitude: f64) -> i64 {
        (longitude / self.width_deg + BOUNDARY_EPSILON).floor() as i64
    }

    /// Column of the cell that contains a point just left of `longitude`.
    pub(crate) fn col_left_of(&self, longitude: f64) -> i64 {
        (longitude / self.width_deg - BOUNDARY_EPSILON).ceil() as i64 - 1
    }

    fn row_latitude(&self, row: i64) -> f64 {
        round_to_places(row as f64 * self.height_deg, self.places)
    }

    fn col_longitude(&self, col: i64) -> f64 {
        round_to_places(col as f64 * self.width_deg, self.places)
    }
}

/// Recovers the north-west corner from an unordered set of polygon points:
/// highest latitude first, then lowest longitude.
pub fn top_left_of(points: &[Coordinate]) -> Option<Coordinate> {
    points.iter().copied().min_by(|a, b| {
        stable_total_cmp_f64(b.latitude, a.latitude)
            .then_with(|| stable_total_cmp_f64(a.longitude, b.longitude))
    })
}

#[cfg(test)]
mod tests {
    use super::{GridSpec, LatticeIndex, top_left_of};
    use crate::cell::CellKey;
    use crate::error::GridError;
    use foundation::coord::Coordinate;
    use pretty_assertions::assert_eq;

    fn spec() -> GridSpec {
        GridSpec::new(0.001, 0.001).unwrap()
    }

    #[test]
    fn precision_follows_step_digits() {
        assert_eq!(spec().places(), 3);
        assert_eq!(GridSpec::new(0.0025, 0.01).unwrap().places(), 4);
    }

    #[test]
    fn rejects_bad_steps() {
        assert!(matches!(
            GridSpec::new(0.0, 0.001),
            Err(GridError::InvalidStep { .. })
        ));
        assert!(matches!(
            GridSpec::new(f64::NAN, 0.001),
            Err(GridError::InvalidStep { .. })
        ));
        assert_eq!(
            GridSpec::new(0.0000001, 0.001),
            Err(GridError::StepTooPrecise { places: 7, max: 6 })
        );
    }

    #[test]
    fn quantizes_to_north_west_corner() {
        let key = spec().quantize(Coordinate::new(10.0004, 20.0006));
        assert_eq!(key, CellKey::new(10.001, 20.0));
    }

    #[test]
    fn quantize_is_idempotent_on_keys() {
        let s = spec();
        for &(lat, lon) in &[
            (10.002, 20.002),
            (55.6388593, 37.6704059),
            (-33.8688, 151.2093),
            (0.0, 0.0),
            (-0.0005, -0.0005),
        ] {
            let key = s.quantize(Coordinate::new(lat, lon));
            assert_eq!(s.quantize(key.coordinate()), key, "key {key}");
        }
    }

    #[test]
    fn boundary_points_resolve_consistently() {
        let s = spec();
        // North edge belongs to the cell, west edge belongs to the cell.
        assert_eq!(
            s.quantize(Coordinate::new(10.002, 20.002)),
            CellKey::new(10.002, 20.002)
        );
        // Just below the north edge still belongs to the same cell.
        assert_eq!(
            s.quantize(Coordinate::new(10.0019999, 20.0020001)),
            CellKey::new(10.002, 20.002)
        );
        // Just above moves one row up.
        assert_eq!(
            s.quantize(Coordinate::new(10.0020001, 20.002)),
            CellKey::new(10.003, 20.002)
        );
    }

    #[test]
    fn negative_coordinates_stay_on_lattice() {
        let key = spec().quantize(Coordinate::new(-12.3456, -45.6789));
        assert_eq!(key, CellKey::new(-12.345, -45.679));
    }

    #[test]
    fn quantize_is_deterministic() {
        let s = spec();
        let c = Coordinate::new(48.85837, 2.294481);
        let first = s.quantize(c);
        for _ in 0..100 {
            assert_eq!(s.quantize(c), first);
        }
    }

    #[test]
    fn cell_corners_are_anchored_at_key() {
        let cell = spec().cell_at(LatticeIndex::new(10_002, 20_001));
        assert_eq!(cell.key(), CellKey::new(10.002, 20.001));
        assert_eq!(
            cell.corners(),
            &[
                Coordinate::new(10.002, 20.001),
                Coordinate::new(10.002, 20.002),
                Coordinate::new(10.001, 20.002),
                Coordinate::new(10.001, 20.001),
            ]
        );
    }

    #[test]
    fn top_left_picks_highest_then_westmost() {
        let points = [
            Coordinate::new(10.001, 20.002),
            Coordinate::new(10.002, 20.002),
            Coordinate::new(10.001, 20.001),
            Coordinate::new(10.002, 20.001),
        ];
        assert_eq!(top_left_of(&points), Some(Coordinate::new(10.002, 20.001)));
        assert_eq!(top_left_of(&[]), None);
    }

    #[test]
    fn lattice_parity() {
        assert!(LatticeIndex::new(1, 1).is_even());
        assert!(!LatticeIndex::new(-1, 0).is_even());
        assert!(LatticeIndex::new(-3, 1).is_even());
    }
}
