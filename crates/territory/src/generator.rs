use std::collections::HashSet;

use foundation::bounds::ViewportBounds;
use runtime::cancel::GenerationToken;
use tracing::trace;

use crate::cell::{Cell, CellKey};
use crate::error::GridError;
use crate::grid::{GridSpec, LatticeIndex};

/// Anything that can answer "does this cell already exist?".
pub trait KnownKeys {
    fn contains_key(&self, key: &CellKey) -> bool;
}

impl KnownKeys for HashSet<CellKey> {
    fn contains_key(&self, key: &CellKey) -> bool {
        self.contains(key)
    }
}

/// Owned snapshot of known keys, handed to off-owner generation workers.
pub type KeySet = HashSet<CellKey>;

/// Inclusive lattice rectangle covering a viewport plus one cell of padding
/// on every side.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LatticeRange {
    pub row_min: i64,
    pub row_max: i64,
    pub col_min: i64,
    pub col_max: i64,
}

impl LatticeRange {
    pub fn covering(spec: &GridSpec, bounds: &ViewportBounds) -> Result<Self, GridError> {
        if !bounds.is_finite() {
            return Err(GridError::NonFiniteBounds);
        }
        if !bounds.is_in_range() {
            return Err(GridError::BoundsOutOfRange(*bounds));
        }
        let b = bounds.normalized();

        let west = spec.col_at_or_left(b.west);
        let east = spec.col_left_of(b.east);
        let north = spec.row_at_or_above(b.north);
        let south = spec.row_above(b.south);

        Ok(Self {
            row_min: north.min(south).saturating_sub(1),
            row_max: north.max(south).saturating_add(1),
            col_min: west.min(east).saturating_sub(1),
            col_max: west.max(east).saturating_add(1),
        })
    }

    pub fn rows(&self) -> u64 {
        span(self.row_min, self.row_max)
    }

    pub fn cols(&self) -> u64 {
        span(self.col_min, self.col_max)
    }

    pub fn cell_count(&self) -> u64 {
        self.rows().saturating_mul(self.cols())
    }

    pub fn contains(&self, index: LatticeIndex) -> bool {
        (self.row_min..=self.row_max).contains(&index.row)
            && (self.col_min..=self.col_max).contains(&index.col)
    }
}

/// Number of lattice points in `min..=max`, saturating at `u64::MAX`.
fn span(min: i64, max: i64) -> u64 {
    (max as i128 - min as i128 + 1).clamp(0, u64::MAX as i128) as u64
}

/// Result of one lattice step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A cell that did not exist yet.
    Cell(Cell),
    /// The lattice point already has a cell; nothing to build.
    Known(CellKey),
    Done,
    Cancelled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Pass {
    Even,
    Odd,
}

/// Summary of a finished or abandoned generation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub generation: u64,
    pub visited: u64,
    pub emitted: u64,
    pub cancelled: bool,
}

/// Cursor over the lattice of one viewport.
///
/// Points are visited column by column in two passes, even checkerboard
/// squares first, so a renderer drawing cells as they arrive fills the view
/// progressively. Every step checks the generation token first; once the
/// token is stale the plan ends with [`Step::Cancelled`].
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    spec: GridSpec,
    range: LatticeRange,
    token: GenerationToken,
    pass: Option<Pass>,
    cursor: LatticeIndex,
    visited: u64,
    emitted: u64,
    cancelled: bool,
}

impl GenerationPlan {
    pub fn new(
        spec: GridSpec,
        bounds: &ViewportBounds,
        token: GenerationToken,
        max_cells: u64,
    ) -> Result<Self, GridError> {
        let range = LatticeRange::covering(&spec, bounds)?;
        let cells = range.cell_count();
        if cells > max_cells {
            return Err(GridError::ViewportTooLarge {
                cells,
                limit: max_cells,
            });
        }

        Ok(Self {
            spec,
            range,
            token,
            pass: Some(Pass::Even),
            cursor: LatticeIndex::new(range.row_min, range.col_min),
            visited: 0,
            emitted: 0,
            cancelled: false,
        })
    }

    pub fn range(&self) -> LatticeRange {
        self.range
    }

    pub fn token(&self) -> &GenerationToken {
        &self.token
    }

    pub fn is_finished(&self) -> bool {
        self.pass.is_none()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn report(&self) -> GenerationReport {
        GenerationReport {
            generation: self.token.generation(),
            visited: self.visited,
            emitted: self.emitted,
            cancelled: self.cancelled,
        }
    }

    /// Advances by one lattice point.
    pub fn advance<K: KnownKeys + ?Sized>(&mut self, known: &K) -> Step {
        if self.pass.is_none() {
            return if self.cancelled {
                Step::Cancelled
            } else {
                Step::Done
            };
        }

        if self.token.is_stale() {
            trace!(
                generation = self.token.generation(),
                visited = self.visited,
                emitted = self.emitted,
                "grid generation superseded"
            );
            self.cancelled = true;
            self.pass = None;
            return Step::Cancelled;
        }

        let Some(index) = self.next_index() else {
            return Step::Done;
        };
        self.visited += 1;

        let key = self.spec.key_at(index);
        if known.contains_key(&key) {
            return Step::Known(key);
        }
        self.emitted += 1;
        Step::Cell(self.spec.cell_at(index))
    }

    /// Lazily yields the new cells, borrowing `known` for the whole run.
    pub fn cells<K: KnownKeys + ?Sized>(self, known: &K) -> Generate<'_, K> {
        Generate { plan: self, known }
    }

    fn next_index(&mut self) -> Option<LatticeIndex> {
        loop {
            let pass = self.pass?;

            if self.cursor.col > self.range.col_max {
                match pass {
                    Pass::Even => {
                        self.pass = Some(Pass::Odd);
                        self.cursor = LatticeIndex::new(self.range.row_min, self.range.col_min);
                        continue;
                    }
                    Pass::Odd => {
                        self.pass = None;
                        return None;
                    }
                }
            }

            if self.cursor.is_even() != (pass == Pass::Even) {
                self.cursor.row += 1;
            }
            if self.cursor.row > self.range.row_max {
                self.cursor = LatticeIndex::new(self.range.row_min, self.cursor.col + 1);
                continue;
            }

            let index = self.cursor;
            self.cursor.row += 2;
            return Some(index);
        }
    }
}

/// Iterator adapter over [`GenerationPlan`] that skips known cells.
pub struct Generate<'a, K: ?Sized> {
    plan: GenerationPlan,
    known: &'a K,
}

impl<K: ?Sized> Generate<'_, K> {
    pub fn report(&self) -> GenerationReport {
        self.plan.report()
    }
}

impl<K: KnownKeys + ?Sized> Iterator for Generate<'_, K> {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        loop {
            match self.plan.advance(self.known) {
                Step::Cell(cell) => return Some(cell),
                Step::Known(_) => continue,
                Step::Done | Step::Cancelled => return None,
            }
        }
    }
}

/// Enumerates the cells covering `bounds` that are not in `known`.
pub fn generate<'a, K: KnownKeys + ?Sized>(
    spec: GridSpec,
    bounds: &ViewportBounds,
    known: &'a K,
    token: GenerationToken,
    max_cells: u64,
) -> Result<Generate<'a, K>, GridError> {
    Ok(GenerationPlan::new(spec, bounds, token, max_cells)?.cells(known))
}

/// A generation that owns its key snapshot and can run on another thread.
#[derive(Debug, Clone)]
pub struct DetachedGeneration {
    plan: GenerationPlan,
    known: KeySet,
}

impl DetachedGeneration {
    pub fn new(plan: GenerationPlan, known: KeySet) -> Self {
        Self { plan, known }
    }

    pub fn token(&self) -> &GenerationToken {
        self.plan.token()
    }

    /// Runs to completion, handing cells to `sink` in batches of `batch_size`.
    ///
    /// Stops early when the token goes stale or `sink` returns `false`.
    pub fn run_batches(
        mut self,
        batch_size: usize,
        mut sink: impl FnMut(Vec<Cell>) -> bool,
    ) -> GenerationReport {
        let batch_size = batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);

        loop {
            match self.plan.advance(&self.known) {
                Step::Cell(cell) => {
                    batch.push(cell);
                    if batch.len() >= batch_size && !sink(std::mem::take(&mut batch)) {
                        break;
                    }
                }
                Step::Known(_) => {}
                Step::Done => {
                    if !batch.is_empty() {
                        sink(std::mem::take(&mut batch));
                    }
                    break;
                }
                Step::Cancelled => break,
            }
        }

        self.plan.report()
    }
}
