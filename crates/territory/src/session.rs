use foundation::bounds::ViewportBounds;
use foundation::coord::Coordinate;
use runtime::budget::StepBudget;
use runtime::cancel::{GenerationCounter, GenerationToken};
use runtime::event_bus::{EventBus, ObserverId};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::cell::{Cell, CellKey, CellSnapshot, CellState};
use crate::config::GameConfig;
use crate::error::{ConfigError, GridError, SampleError, StoreError};
use crate::events::GameEvent;
use crate::generator::{DetachedGeneration, GenerationPlan, GenerationReport, Step};
use crate::grid::{GridSpec, top_left_of};
use crate::sample::PositionSample;
use crate::store::{CellStore, StateCounts, Transition};
use crate::tracker::{CaptureTracker, SampleOutcome};

/// Result of one cooperative generation slice.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PumpOutcome {
    /// No generation is running.
    Idle,
    /// The budget ran out; call again to continue.
    Pending { inserted: usize },
    /// The plan ended, either done or cancelled (see `report.cancelled`).
    Finished {
        inserted: usize,
        report: GenerationReport,
    },
}

/// Result of a selection request.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SelectionOutcome {
    Selected(CellKey),
    Deselected(CellKey),
    /// The cell is capturing or captured; selection does not apply.
    Unchanged { key: CellKey, state: CellState },
    /// No generated cell under the tap.
    Missed,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub cells: usize,
    pub states: StateCounts,
    pub generations_started: u64,
    pub generations_refused: u64,
    pub accepted_samples: u64,
    pub rejected_samples: u64,
    pub events_published: u64,
}

/// One game session: the single owner of all mutable engine state.
///
/// Every store mutation and every event goes through `&mut self`, so the
/// host only has to make sure one task owns the session. Grid generation
/// can run here in budgeted slices ([`GameSession::pump_generation`]) or on
/// a worker ([`GameSession::start_detached_generation`]) whose output comes
/// back through [`GameSession::apply_generated`].
#[derive(Debug)]
pub struct GameSession {
    config: GameConfig,
    spec: GridSpec,
    store: CellStore,
    tracker: CaptureTracker,
    generations: GenerationCounter,
    active: Option<GenerationPlan>,
    events: EventBus<GameEvent>,
    stats: SessionStats,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let spec = config.grid_spec()?;
        Ok(Self {
            config,
            spec,
            store: CellStore::new(),
            tracker: CaptureTracker::new(),
            generations: GenerationCounter::new(),
            active: None,
            events: EventBus::new(),
            stats: SessionStats::default(),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn is_generating(&self) -> bool {
        self.active.is_some()
    }

    /// Starts an owner-side generation for `bounds`, superseding any other.
    pub fn set_viewport(&mut self, bounds: ViewportBounds) -> Result<GenerationToken, GridError> {
        let plan = self.begin_generation(&bounds)?;
        let token = plan.token().clone();
        self.active = Some(plan);
        Ok(token)
    }

    /// Like [`GameSession::set_viewport`], but hands the enumeration to the
    /// caller to run elsewhere against a snapshot of the keys already known
    /// inside the viewport.
    pub fn start_detached_generation(
        &mut self,
        bounds: ViewportBounds,
    ) -> Result<DetachedGeneration, GridError> {
        let plan = self.begin_generation(&bounds)?;
        let known = self.store.key_set_within(&self.spec, &plan.range());
        Ok(DetachedGeneration::new(plan, known))
    }

    /// Stales every outstanding generation.
    pub fn cancel_generation(&mut self) {
        self.generations.cancel_all();
        self.active = None;
    }

    fn begin_generation(&mut self, bounds: &ViewportBounds) -> Result<GenerationPlan, GridError> {
        let token = self.generations.advance();
        self.active = None;

        let max_cells = self.config.generation.max_cells_per_viewport;
        match GenerationPlan::new(self.spec, bounds, token, max_cells) {
            Ok(plan) => {
                self.stats.generations_started += 1;
                let range = plan.range();
                debug!(
                    generation = plan.token().generation(),
                    rows = range.rows(),
                    cols = range.cols(),
                    "grid generation started"
                );
                Ok(plan)
            }
            Err(err) => {
                self.stats.generations_refused += 1;
                warn!(?bounds, %err, "viewport refused");
                Err(err)
            }
        }
    }

    /// Runs one slice of the active plan, bounded by the configured
    /// `steps_per_pump`.
    pub fn pump_generation_slice(&mut self) -> PumpOutcome {
        let mut budget = StepBudget::new(self.config.generation.steps_per_pump);
        self.pump_generation(&mut budget)
    }

    /// Runs the active plan for at most `budget` lattice steps.
    pub fn pump_generation(&mut self, budget: &mut StepBudget) -> PumpOutcome {
        let Some(plan) = self.active.as_mut() else {
            return PumpOutcome::Idle;
        };

        let mut inserted = 0;
        while budget.try_step() {
            match plan.advance(&self.store) {
                Step::Cell(cell) => {
                    if insert_cell(&mut self.store, &mut self.events, cell) {
                        inserted += 1;
                    }
                }
                Step::Known(_) => {}
                Step::Done | Step::Cancelled => {
                    let report = plan.report();
                    self.active = None;
                    debug!(
                        generation = report.generation,
                        visited = report.visited,
                        emitted = report.emitted,
                        cancelled = report.cancelled,
                        "grid generation finished"
                    );
                    return PumpOutcome::Finished { inserted, report };
                }
            }
        }
        PumpOutcome::Pending { inserted }
    }

    /// Inserts cells produced by a detached worker. Batches for a superseded
    /// generation are dropped whole.
    pub fn apply_generated(&mut self, token: &GenerationToken, cells: Vec<Cell>) -> usize {
        if token.is_stale() {
            trace!(
                generation = token.generation(),
                dropped = cells.len(),
                "stale generation batch dropped"
            );
            return 0;
        }

        cells
            .into_iter()
            .map(|cell| insert_cell(&mut self.store, &mut self.events, cell))
            .filter(|inserted| *inserted)
            .count()
    }

    /// Feeds one location sample through the capture tracker and publishes
    /// the resulting path point and cell changes, in that order.
    pub fn push_sample(&mut self, sample: PositionSample) -> Result<SampleOutcome, SampleError> {
        match self.tracker.process(&mut self.store, &self.spec, sample) {
            Ok(outcome) => {
                self.stats.accepted_samples += 1;
                self.events.emit(GameEvent::PathPoint(outcome.path_point));
                for change in &outcome.changes {
                    self.events.emit(GameEvent::CellChanged(change.clone()));
                }
                Ok(outcome)
            }
            Err(err) => {
                self.stats.rejected_samples += 1;
                debug!(?sample, %err, "position sample rejected");
                Err(err)
            }
        }
    }

    /// Flips `Unclaimed <-> Selected`. Capturing and captured cells are left
    /// alone.
    pub fn toggle_selection(&mut self, key: CellKey) -> Result<SelectionOutcome, StoreError> {
        let state = self
            .store
            .get(&key)
            .map(Cell::state)
            .ok_or(StoreError::UnknownKey(key))?;

        let (transition, outcome) = match state {
            CellState::Unclaimed => (Transition::Select, SelectionOutcome::Selected(key)),
            CellState::Selected => (Transition::Deselect, SelectionOutcome::Deselected(key)),
            CellState::Capturing | CellState::Captured => {
                return Ok(SelectionOutcome::Unchanged { key, state });
            }
        };

        let snapshot = self.store.update(key, transition)?;
        self.events.emit(GameEvent::CellChanged(snapshot));
        Ok(outcome)
    }

    /// Toggles the selection of the cell under a tapped coordinate.
    pub fn tap(&mut self, coordinate: Coordinate) -> Result<SelectionOutcome, StoreError> {
        if !coordinate.is_finite() || !coordinate.is_in_range() {
            return Ok(SelectionOutcome::Missed);
        }
        self.toggle_known(self.spec.quantize(coordinate))
    }

    /// Toggles the selection of a tapped cell polygon, identified by its
    /// north-west corner.
    pub fn tap_polygon(&mut self, points: &[Coordinate]) -> Result<SelectionOutcome, StoreError> {
        let valid = |c: &Coordinate| c.is_finite() && c.is_in_range();
        match top_left_of(points).filter(valid) {
            Some(corner) => self.toggle_known(self.spec.quantize(corner)),
            None => Ok(SelectionOutcome::Missed),
        }
    }

    fn toggle_known(&mut self, key: CellKey) -> Result<SelectionOutcome, StoreError> {
        if !self.store.contains(&key) {
            return Ok(SelectionOutcome::Missed);
        }
        self.toggle_selection(key)
    }

    pub fn cell(&self, key: &CellKey) -> Option<CellSnapshot> {
        self.store.get(key).map(Cell::snapshot)
    }

    pub fn capturing(&self) -> Option<CellSnapshot> {
        self.store.capturing().map(Cell::snapshot)
    }

    pub fn snapshot(&self) -> Vec<CellSnapshot> {
        self.store.snapshot()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            cells: self.store.len(),
            states: self.store.state_counts(),
            events_published: self.events.published(),
            ..self.stats
        }
    }

    pub fn events(&self) -> &[GameEvent] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// Registers an observer called synchronously on every published event.
    pub fn subscribe(&mut self, observer: impl FnMut(&GameEvent) + Send + 'static) -> ObserverId {
        self.events.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.events.unsubscribe(id)
    }
}

/// Duplicate keys are a no-op; the cell already exists with its own state.
fn insert_cell(store: &mut CellStore, events: &mut EventBus<GameEvent>, cell: Cell) -> bool {
    match store.insert(cell) {
        Ok(cell) => {
            events.emit(GameEvent::CellChanged(cell.snapshot()));
            true
        }
        Err(_) => false,
    }
}
