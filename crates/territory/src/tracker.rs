use foundation::coord::Coordinate;
use foundation::math::{distance_m, initial_bearing_deg};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cell::{CellKey, CellSnapshot, CellState, capture_progress};
use crate::error::SampleError;
use crate::grid::GridSpec;
use crate::sample::PositionSample;
use crate::store::{CellStore, Transition};

/// Positions recorded since the player entered the capturing cell.
///
/// The length is accumulated leg by leg as points arrive, so it only grows
/// until the path is reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DwellPath {
    points: Vec<Coordinate>,
    length_m: f64,
}

impl DwellPath {
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn length_m(&self) -> f64 {
        self.length_m
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: Coordinate) {
        if let Some(last) = self.points.last() {
            self.length_m += distance_m(*last, point);
        }
        self.points.push(point);
    }

    pub fn reset(&mut self, start: Coordinate) {
        self.clear();
        self.points.push(start);
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.length_m = 0.0;
    }
}

/// Marker/trail update published for every accepted sample.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub coordinate: Coordinate,
    /// Heading from the previous accepted sample, degrees clockwise from north.
    pub bearing_deg: f64,
}

/// What a sample did to the capture state machine.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CaptureStatus {
    /// The sample is not inside any generated cell. Leaving the grid still
    /// counts as leaving the capturing cell, which is `released`.
    OutsideGrid { released: Option<CellKey> },
    /// The sample landed on a cell that is already captured.
    AlreadyCaptured {
        key: CellKey,
        released: Option<CellKey>,
    },
    /// Capturing started on a new cell; `released` lost its partial progress.
    Entered {
        key: CellKey,
        released: Option<CellKey>,
    },
    Progressed {
        key: CellKey,
        progress: f64,
    },
    Captured(CellKey),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    pub path_point: PathPoint,
    pub status: CaptureStatus,
    /// Snapshots of every cell whose state changed, in transition order.
    pub changes: Vec<CellSnapshot>,
}

/// Drives capture transitions from an ordered stream of position samples.
///
/// The store is the source of truth for which cell is capturing; the tracker
/// only keeps the dwell path and the previous sample (for the heading).
#[derive(Debug, Default)]
pub struct CaptureTracker {
    dwell: DwellPath,
    last_sample: Option<PositionSample>,
}

impl CaptureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dwell_path(&self) -> &DwellPath {
        &self.dwell
    }

    pub fn last_sample(&self) -> Option<&PositionSample> {
        self.last_sample.as_ref()
    }

    /// Applies one sample.
    ///
    /// Invalid or out-of-order samples are refused before anything changes.
    pub fn process(
        &mut self,
        store: &mut CellStore,
        spec: &GridSpec,
        sample: PositionSample,
    ) -> Result<SampleOutcome, SampleError> {
        sample.validate()?;
        if let Some(last) = self.last_sample.filter(|l| sample.timestamp < l.timestamp) {
            return Err(SampleError::Stale {
                timestamp_ms: sample.timestamp.millis(),
                last_ms: last.timestamp.millis(),
            });
        }

        let coordinate = sample.coordinate();
        let previous = self.last_sample.map(|s| s.coordinate()).unwrap_or(coordinate);
        let path_point = PathPoint {
            coordinate,
            bearing_deg: initial_bearing_deg(previous, coordinate),
        };

        let mut changes = Vec::new();
        let status = self.transition(store, spec.quantize(coordinate), coordinate, &mut changes)?;
        self.last_sample = Some(sample);

        Ok(SampleOutcome {
            path_point,
            status,
            changes,
        })
    }

    fn transition(
        &mut self,
        store: &mut CellStore,
        key: CellKey,
        coordinate: Coordinate,
        changes: &mut Vec<CellSnapshot>,
    ) -> Result<CaptureStatus, SampleError> {
        let Some(cell) = store.get(&key) else {
            let released = self.release_capturing(store, changes)?;
            return Ok(CaptureStatus::OutsideGrid { released });
        };

        match cell.state() {
            CellState::Captured => {
                let released = self.release_capturing(store, changes)?;
                Ok(CaptureStatus::AlreadyCaptured { key, released })
            }
            CellState::Capturing => {
                let min_side = cell.min_side_length_m();
                self.dwell.push(coordinate);
                let progress = capture_progress(self.dwell.length_m(), min_side);

                if progress >= 100.0 {
                    changes.push(store.update(key, Transition::Complete)?);
                    info!(
                        cell = %key,
                        dwell_m = self.dwell.length_m(),
                        min_side_m = min_side,
                        "cell captured"
                    );
                    self.dwell.clear();
                    Ok(CaptureStatus::Captured(key))
                } else {
                    changes.push(store.update(key, Transition::Advance { progress })?);
                    Ok(CaptureStatus::Progressed { key, progress })
                }
            }
            CellState::Unclaimed | CellState::Selected => {
                let released = self.release_capturing(store, changes)?;
                changes.push(store.update(key, Transition::BeginCapture)?);
                self.dwell.reset(coordinate);
                Ok(CaptureStatus::Entered { key, released })
            }
        }
    }

    /// Drops the partial capture (if any) the player just walked out of.
    fn release_capturing(
        &mut self,
        store: &mut CellStore,
        changes: &mut Vec<CellSnapshot>,
    ) -> Result<Option<CellKey>, SampleError> {
        let released = store.capturing_key();
        if let Some(previous) = released {
            changes.push(store.update(previous, Transition::Release)?);
        }
        self.dwell.clear();
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::{CaptureStatus, CaptureTracker, DwellPath};
    use crate::cell::{CellKey, CellState};
    use crate::error::SampleError;
    use crate::grid::{GridSpec, LatticeIndex};
    use crate::sample::PositionSample;
    use crate::store::CellStore;
    use foundation::coord::Coordinate;
    use foundation::math::{distance_m, path_length_m};
    use foundation::time::Timestamp;

    fn setup() -> (GridSpec, CellStore) {
        let spec = GridSpec::new(0.001, 0.001).unwrap();
        let mut store = CellStore::new();
        for row in 10_000..10_003 {
            for col in 20_000..20_003 {
                store.insert(spec.cell_at(LatticeIndex::new(row, col))).unwrap();
            }
        }
        (spec, store)
    }

    fn sample(lat: f64, lon: f64, ms: u64) -> PositionSample {
        PositionSample::new(lat, lon, Timestamp::from_millis(ms))
    }

    #[test]
    fn dwell_length_matches_path_length() {
        let mut dwell = DwellPath::default();
        let points = [
            Coordinate::new(10.0, 20.0),
            Coordinate::new(10.0001, 20.0),
            Coordinate::new(10.0001, 20.0002),
        ];
        for p in points {
            dwell.push(p);
        }
        assert_eq!(dwell.length_m(), path_length_m(&points));
        dwell.reset(points[0]);
        assert_eq!(dwell.length_m(), 0.0);
        assert_eq!(dwell.points().len(), 1);
    }

    #[test]
    fn first_sample_starts_capturing() {
        let (spec, mut store) = setup();
        let mut tracker = CaptureTracker::new();
        let out = tracker
            .process(&mut store, &spec, sample(10.0015, 20.0015, 0))
            .unwrap();

        let key = CellKey::new(10.002, 20.001);
        assert_eq!(
            out.status,
            CaptureStatus::Entered {
                key,
                released: None
            }
        );
        assert_eq!(out.path_point.bearing_deg, 0.0);
        assert_eq!(out.changes.len(), 1);
        assert_eq!(store.get(&key).unwrap().state(), CellState::Capturing);
    }

    #[test]
    fn moving_to_new_cell_releases_previous() {
        let (spec, mut store) = setup();
        let mut tracker = CaptureTracker::new();
        tracker
            .process(&mut store, &spec, sample(10.0015, 20.0015, 0))
            .unwrap();
        tracker
            .process(&mut store, &spec, sample(10.0015, 20.0017, 100))
            .unwrap();
        let out = tracker
            .process(&mut store, &spec, sample(10.0015, 20.0025, 200))
            .unwrap();

        let old = CellKey::new(10.002, 20.001);
        let new = CellKey::new(10.002, 20.002);
        assert_eq!(
            out.status,
            CaptureStatus::Entered {
                key: new,
                released: Some(old)
            }
        );
        assert_eq!(out.changes[0].key, old);
        assert_eq!(out.changes[0].state, CellState::Unclaimed);
        assert_eq!(out.changes[0].progress, 0.0);
        assert_eq!(store.get(&old).unwrap().progress(), 0.0);
        assert_eq!(tracker.dwell_path().points().len(), 1);
        assert!((out.path_point.bearing_deg - 90.0).abs() < 0.01);
    }

    #[test]
    fn samples_outside_the_grid_change_nothing() {
        let (spec, mut store) = setup();
        let mut tracker = CaptureTracker::new();
        let out = tracker
            .process(&mut store, &spec, sample(50.0, 50.0, 0))
            .unwrap();
        assert_eq!(out.status, CaptureStatus::OutsideGrid { released: None });
        assert!(out.changes.is_empty());
        assert_eq!(store.capturing_key(), None);
    }

    #[test]
    fn leaving_the_grid_discards_partial_capture() {
        let (spec, mut store) = setup();
        let mut tracker = CaptureTracker::new();
        let key = CellKey::new(10.002, 20.001);
        tracker
            .process(&mut store, &spec, sample(10.0015, 20.0011, 0))
            .unwrap();
        tracker
            .process(&mut store, &spec, sample(10.0015, 20.0019, 100))
            .unwrap();
        assert!(store.get(&key).unwrap().progress() > 0.0);

        let out = tracker
            .process(&mut store, &spec, sample(50.0, 50.0, 200))
            .unwrap();
        assert_eq!(
            out.status,
            CaptureStatus::OutsideGrid {
                released: Some(key)
            }
        );
        assert_eq!(out.changes.len(), 1);
        assert_eq!(out.changes[0].state, CellState::Unclaimed);
        assert_eq!(store.capturing_key(), None);
        assert!(tracker.dwell_path().is_empty());

        let back = tracker
            .process(&mut store, &spec, sample(10.0015, 20.0019, 300))
            .unwrap();
        assert_eq!(
            back.status,
            CaptureStatus::Entered {
                key,
                released: None
            }
        );
        assert_eq!(store.get(&key).unwrap().progress(), 0.0);
    }

    #[test]
    fn stale_and_malformed_samples_are_refused() {
        let (spec, mut store) = setup();
        let mut tracker = CaptureTracker::new();
        tracker
            .process(&mut store, &spec, sample(10.0015, 20.0015, 500))
            .unwrap();

        assert_eq!(
            tracker.process(&mut store, &spec, sample(10.0015, 20.0025, 400)),
            Err(SampleError::Stale {
                timestamp_ms: 400,
                last_ms: 500
            })
        );
        assert_eq!(
            tracker.process(&mut store, &spec, sample(f64::INFINITY, 20.0, 600)),
            Err(SampleError::NonFinite)
        );
        assert_eq!(
            store.capturing_key(),
            Some(CellKey::new(10.002, 20.001))
        );
        assert_eq!(tracker.last_sample().unwrap().timestamp.millis(), 500);
    }

    #[test]
    fn walking_the_short_side_captures() {
        let (spec, mut store) = setup();
        let mut tracker = CaptureTracker::new();
        let key = CellKey::new(10.002, 20.001);
        let min_side = store.get(&key).unwrap().min_side_length_m();

        // Zig-zag east/west inside the cell until the distance is covered.
        let west = Coordinate::new(10.0015, 20.0011);
        let east = Coordinate::new(10.0015, 20.0019);
        let leg = distance_m(west, east);
        let legs = (min_side / leg).ceil() as u64;

        let mut last = None;
        for i in 0..=legs {
            let p = if i % 2 == 0 { west } else { east };
            last = Some(
                tracker
                    .process(&mut store, &spec, sample(p.latitude, p.longitude, i * 100))
                    .unwrap(),
            );
        }

        assert_eq!(last.unwrap().status, CaptureStatus::Captured(key));
        assert_eq!(store.get(&key).unwrap().state(), CellState::Captured);
        assert!(tracker.dwell_path().is_empty());

        let after = tracker
            .process(&mut store, &spec, sample(10.0015, 20.0015, 10_000))
            .unwrap();
        assert_eq!(
            after.status,
            CaptureStatus::AlreadyCaptured {
                key,
                released: None
            }
        );
        assert!(after.changes.is_empty());
    }
}
