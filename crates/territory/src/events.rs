use serde::{Deserialize, Serialize};

use crate::cell::CellSnapshot;
use crate::tracker::PathPoint;

/// Everything the renderer needs to mirror the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A cell was generated or changed state/progress.
    CellChanged(CellSnapshot),
    /// An accepted position sample, for the marker and the live trail.
    PathPoint(PathPoint),
}

impl GameEvent {
    pub fn is_cell_change(&self) -> bool {
        matches!(self, GameEvent::CellChanged(_))
    }
}

impl From<CellSnapshot> for GameEvent {
    fn from(snapshot: CellSnapshot) -> Self {
        GameEvent::CellChanged(snapshot)
    }
}

impl From<PathPoint> for GameEvent {
    fn from(point: PathPoint) -> Self {
        GameEvent::PathPoint(point)
    }
}
