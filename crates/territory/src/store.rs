use std::collections::BTreeMap;

use foundation::arena::Arena;
use foundation::handles::Handle;
use serde::Serialize;

use crate::cell::{Cell, CellKey, CellSnapshot, CellState};
use crate::error::StoreError;
use crate::generator::{KeySet, KnownKeys, LatticeRange};
use crate::grid::{GridSpec, LatticeIndex};

/// A requested state change for one cell.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Transition {
    /// `Unclaimed -> Selected`.
    Select,
    /// `Selected -> Unclaimed`.
    Deselect,
    /// `Unclaimed | Selected -> Capturing`, progress reset to 0.
    BeginCapture,
    /// `Capturing -> Capturing`; progress never moves backwards.
    Advance { progress: f64 },
    /// `Capturing -> Unclaimed`, progress discarded.
    Release,
    /// `Capturing -> Captured`. Terminal.
    Complete,
}

/// Per-state cell counts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub unclaimed: usize,
    pub selected: usize,
    pub capturing: usize,
    pub captured: usize,
}

/// Authoritative cell storage.
///
/// Cells live in an append-only arena and are found through an ordered key
/// index, so iteration and snapshots are deterministic. Every transition is
/// validated before anything is written; a refused transition leaves the
/// store untouched. At most one cell is `Capturing` at a time.
#[derive(Debug, Default)]
pub struct CellStore {
    cells: Arena<Cell>,
    index: BTreeMap<CellKey, Handle>,
    capturing: Option<Handle>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.index.contains_key(key)
    }

    /// Adds a new cell. Existing keys are refused with `DuplicateKey`.
    pub fn insert(&mut self, cell: Cell) -> Result<&Cell, StoreError> {
        let key = cell.key();
        if self.index.contains_key(&key) {
            return Err(StoreError::DuplicateKey(key));
        }
        let handle = self.cells.alloc(cell);
        self.index.insert(key, handle);
        self.cells.get(handle).ok_or(StoreError::UnknownKey(key))
    }

    pub fn get(&self, key: &CellKey) -> Option<&Cell> {
        self.index.get(key).and_then(|h| self.cells.get(*h))
    }

    pub fn capturing(&self) -> Option<&Cell> {
        self.capturing.and_then(|h| self.cells.get(h))
    }

    pub fn capturing_key(&self) -> Option<CellKey> {
        self.capturing().map(Cell::key)
    }

    /// Applies `transition` to the cell at `key` and returns its new snapshot.
    pub fn update(
        &mut self,
        key: CellKey,
        transition: Transition,
    ) -> Result<CellSnapshot, StoreError> {
        let handle = *self.index.get(&key).ok_or(StoreError::UnknownKey(key))?;
        let cell = self.cells.get(handle).ok_or(StoreError::UnknownKey(key))?;
        let from = cell.state();
        let illegal = || StoreError::IllegalTransition {
            key,
            from,
            transition,
        };

        let (state, progress) = match (from, transition) {
            (CellState::Unclaimed, Transition::Select) => (CellState::Selected, 0.0),
            (CellState::Selected, Transition::Deselect) => (CellState::Unclaimed, 0.0),
            (CellState::Unclaimed | CellState::Selected, Transition::BeginCapture) => {
                if let Some(other) = self.capturing.filter(|h| *h != handle) {
                    let capturing = self
                        .cells
                        .get(other)
                        .map(Cell::key)
                        .ok_or(StoreError::UnknownKey(key))?;
                    return Err(StoreError::AlreadyCapturing { key, capturing });
                }
                (CellState::Capturing, 0.0)
            }
            (CellState::Capturing, Transition::Advance { progress }) => {
                if !progress.is_finite() {
                    return Err(illegal());
                }
                (CellState::Capturing, cell.progress().max(progress.min(100.0)))
            }
            (CellState::Capturing, Transition::Release) => (CellState::Unclaimed, 0.0),
            (CellState::Capturing, Transition::Complete) => (CellState::Captured, 100.0),
            _ => return Err(illegal()),
        };

        self.capturing = match state {
            CellState::Capturing => Some(handle),
            _ if self.capturing == Some(handle) => None,
            _ => self.capturing,
        };

        let cell = self
            .cells
            .get_mut(handle)
            .ok_or(StoreError::UnknownKey(key))?;
        cell.set_state(state, progress);
        Ok(cell.snapshot())
    }

    /// Owned copies of every cell, ordered by key.
    pub fn snapshot(&self) -> Vec<CellSnapshot> {
        self.index
            .values()
            .filter_map(|h| self.cells.get(*h))
            .map(Cell::snapshot)
            .collect()
    }

    /// Owned copy of the known keys inside `range`, for an off-owner
    /// generation worker.
    ///
    /// The index is ordered by latitude first, so only the rows of `range`
    /// are walked; columns are filtered per key.
    pub fn key_set_within(&self, spec: &GridSpec, range: &LatticeRange) -> KeySet {
        let south = spec.key_at(LatticeIndex::new(range.row_min, range.col_min));
        let north = spec.key_at(LatticeIndex::new(range.row_max, range.col_min));
        let from = CellKey::new(south.latitude, f64::NEG_INFINITY);
        let to = CellKey::new(north.latitude, f64::INFINITY);

        self.index
            .range(from..=to)
            .map(|(key, _)| *key)
            .filter(|key| range.contains(spec.lattice_index(key.coordinate())))
            .collect()
    }

    pub fn state_counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for (_, cell) in self.cells.iter() {
            match cell.state() {
                CellState::Unclaimed => counts.unclaimed += 1,
                CellState::Selected => counts.selected += 1,
                CellState::Capturing => counts.capturing += 1,
                CellState::Captured => counts.captured += 1,
            }
        }
        counts
    }
}

impl KnownKeys for CellStore {
    fn contains_key(&self, key: &CellKey) -> bool {
        self.contains(key)
    }
}
