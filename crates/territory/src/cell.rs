use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use foundation::coord::Coordinate;
use foundation::math::{StableF64, distance_m};
use serde::{Deserialize, Serialize};

/// Canonical identity of a grid cell: its quantized north-west corner.
///
/// Keys produced by [`GridSpec`](crate::grid::GridSpec) are snapped to the
/// grid's decimal precision, so two keys for the same cell are bit-identical.
/// Equality, ordering and hashing go through [`StableF64`].
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct CellKey {
    pub latitude: f64,
    pub longitude: f64,
}

impl CellKey {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    fn stable(&self) -> (StableF64, StableF64) {
        (StableF64(self.latitude), StableF64(self.longitude))
    }
}

impl PartialEq for CellKey {
    fn eq(&self, other: &Self) -> bool {
        self.stable() == other.stable()
    }
}

impl Eq for CellKey {}

impl PartialOrd for CellKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.stable().cmp(&other.stable())
    }
}

impl Hash for CellKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.stable().hash(state);
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Capture/selection state of a cell; doubles as the renderer's visual category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Unclaimed,
    Selected,
    Capturing,
    Captured,
}

impl CellState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CellState::Captured)
    }

    /// Selection toggles only apply to cells nobody is capturing or has captured.
    pub fn is_selectable(self) -> bool {
        matches!(self, CellState::Unclaimed | CellState::Selected)
    }
}

/// One tile of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    key: CellKey,
    width_deg: f64,
    height_deg: f64,
    corners: [Coordinate; 4],
    min_side_length_m: f64,
    state: CellState,
    progress: f64,
}

impl Cell {
    /// Builds an `Unclaimed` cell. `corners` are NW, NE, SE, SW.
    pub fn new(key: CellKey, width_deg: f64, height_deg: f64, corners: [Coordinate; 4]) -> Self {
        Self {
            key,
            width_deg,
            height_deg,
            corners,
            min_side_length_m: min_side_length_m(&corners),
            state: CellState::Unclaimed,
            progress: 0.0,
        }
    }

    pub fn key(&self) -> CellKey {
        self.key
    }

    pub fn width_deg(&self) -> f64 {
        self.width_deg
    }

    pub fn height_deg(&self) -> f64 {
        self.height_deg
    }

    pub fn corners(&self) -> &[Coordinate; 4] {
        &self.corners
    }

    /// Shortest geodesic edge; the distance a player must cover to capture.
    pub fn min_side_length_m(&self) -> f64 {
        self.min_side_length_m
    }

    pub fn state(&self) -> CellState {
        self.state
    }

    /// Capture progress in percent: live while `Capturing`, 100 once `Captured`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub(crate) fn set_state(&mut self, state: CellState, progress: f64) {
        self.state = state;
        self.progress = progress;
    }

    pub fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            key: self.key,
            corners: self.corners,
            state: self.state,
            progress: self.progress,
        }
    }
}

/// Owned copy of the renderer-facing part of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub key: CellKey,
    pub corners: [Coordinate; 4],
    pub state: CellState,
    pub progress: f64,
}

/// Minimum geodesic distance between adjacent corners of a closed ring.
fn min_side_length_m(corners: &[Coordinate; 4]) -> f64 {
    (0..corners.len())
        .map(|i| distance_m(corners[i], corners[(i + 1) % corners.len()]))
        .fold(f64::INFINITY, f64::min)
}

/// Capture percentage for a dwell path of `path_length_m` in a cell whose
/// shortest side is `min_side_length_m`, capped at 100.
pub fn capture_progress(path_length_m: f64, min_side_length_m: f64) -> f64 {
    if min_side_length_m <= 0.0 {
        return 100.0;
    }
    (100.0 * path_length_m / min_side_length_m).min(100.0)
}
