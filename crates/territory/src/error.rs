use foundation::bounds::ViewportBounds;
use thiserror::Error;

use crate::cell::{CellKey, CellState};
use crate::store::Transition;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("cell step must be finite and positive: width={width} height={height}")]
    InvalidStep { width: f64, height: f64 },
    #[error("cell step needs {places} fractional digits; at most {max} are supported")]
    StepTooPrecise { places: u32, max: u32 },
    #[error("viewport bounds must be finite")]
    NonFiniteBounds,
    #[error("viewport bounds out of range: {0:?}")]
    BoundsOutOfRange(ViewportBounds),
    #[error("viewport covers {cells} cells, limit is {limit}")]
    ViewportTooLarge { cells: u64, limit: u64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("no cell with key {0}")]
    UnknownKey(CellKey),
    #[error("cell {0} already exists")]
    DuplicateKey(CellKey),
    #[error("cell {key} cannot apply {transition:?} while {from:?}")]
    IllegalTransition {
        key: CellKey,
        from: CellState,
        transition: Transition,
    },
    #[error("cell {key} cannot start capturing while {capturing} is capturing")]
    AlreadyCapturing { key: CellKey, capturing: CellKey },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("sample coordinate is not finite")]
    NonFinite,
    #[error("sample coordinate out of range: lat={latitude} lon={longitude}")]
    OutOfRange { latitude: f64, longitude: f64 },
    #[error("sample at {timestamp_ms}ms is older than last accepted sample at {last_ms}ms")]
    Stale { timestamp_ms: u64, last_ms: u64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("generation batch size and step budget must be positive")]
    InvalidGenerationLimits,
    #[error("max_cells_per_viewport must be positive")]
    InvalidCellLimit,
    #[error("fastest location interval {fastest_ms}ms exceeds interval {interval_ms}ms")]
    InvalidLocationInterval { interval_ms: u64, fastest_ms: u64 },
}
