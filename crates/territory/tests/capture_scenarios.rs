use std::collections::HashSet;

use foundation::bounds::ViewportBounds;
use foundation::coord::Coordinate;
use foundation::math::path_length_m;
use foundation::time::Timestamp;
use pretty_assertions::assert_eq;
use runtime::budget::StepBudget;
use territory::{
    CaptureStatus, CellKey, CellState, GameConfig, GameEvent, GameSession, PositionSample,
    PumpOutcome, SelectionOutcome,
};

fn session_with(bounds: ViewportBounds) -> GameSession {
    let mut session = GameSession::new(GameConfig::default()).unwrap();
    load(&mut session, bounds);
    session.drain_events();
    session
}

fn load(session: &mut GameSession, bounds: ViewportBounds) -> usize {
    session.set_viewport(bounds).unwrap();
    match session.pump_generation(&mut StepBudget::unlimited()) {
        PumpOutcome::Finished { inserted, .. } => inserted,
        other => panic!("generation did not finish: {other:?}"),
    }
}

fn around_ten_twenty() -> ViewportBounds {
    ViewportBounds::new(10.003, 10.0, 20.003, 20.0)
}

fn at(point: Coordinate, ms: u64) -> PositionSample {
    PositionSample::at(point, Timestamp::from_millis(ms))
}

/// Twelve fixes walking south-east across one cell, starting just inside its
/// north-west corner.
fn diagonal_walk() -> Vec<Coordinate> {
    (0..12)
        .map(|i| Coordinate::new(10.00199 - 0.00007 * i as f64, 20.00101 + 0.00007 * i as f64))
        .collect()
}

#[test]
fn diagonal_walk_captures_cell() {
    let mut session = session_with(around_ten_twenty());
    let key = CellKey::new(10.002, 20.001);
    let spec = *session.spec();
    let min_side = spec
        .cell_at(spec.lattice_index(key.coordinate()))
        .min_side_length_m();

    let walk = diagonal_walk();
    let mut last_progress = 0.0;
    for (i, point) in walk.iter().enumerate() {
        let outcome = session.push_sample(at(*point, i as u64 * 100)).unwrap();
        match (i, outcome.status) {
            (0, status) => assert_eq!(
                status,
                CaptureStatus::Entered {
                    key,
                    released: None
                }
            ),
            (1..=10, CaptureStatus::Progressed { key: k, progress }) => {
                assert_eq!(k, key);
                let expected = 100.0 * path_length_m(&walk[..=i]) / min_side;
                assert!((progress - expected).abs() < 1e-9, "sample {i}");
                assert!(progress > last_progress);
                last_progress = progress;
            }
            (11, status) => assert_eq!(status, CaptureStatus::Captured(key)),
            (i, status) => panic!("sample {i}: unexpected {status:?}"),
        }
    }

    assert!(last_progress > 99.0 && last_progress < 100.0);
    let cell = session.cell(&key).unwrap();
    assert_eq!(cell.state, CellState::Captured);
    assert_eq!(cell.progress, 100.0);
    assert!(session.capturing().is_none());

    let events = session.drain_events();
    let path_points = events
        .iter()
        .filter(|e| matches!(e, GameEvent::PathPoint(_)))
        .count();
    assert_eq!(path_points, 12);
    assert_eq!(
        events.last(),
        Some(&GameEvent::CellChanged(cell.clone()))
    );
}

#[test]
fn at_most_one_cell_captures_while_walking() {
    let mut session = session_with(around_ten_twenty());
    let mut entered = Vec::new();

    // Walk east along one row, crossing two cell boundaries.
    for i in 0..25 {
        let point = Coordinate::new(10.0015, 20.0001 + 0.0001 * i as f64);
        let outcome = session.push_sample(at(point, i * 50)).unwrap();
        if let CaptureStatus::Entered { key, released } = outcome.status {
            entered.push((key, released));
        }
        assert!(session.stats().states.capturing <= 1);
    }

    assert_eq!(
        entered,
        vec![
            (CellKey::new(10.002, 20.0), None),
            (CellKey::new(10.002, 20.001), Some(CellKey::new(10.002, 20.0))),
            (CellKey::new(10.002, 20.002), Some(CellKey::new(10.002, 20.001))),
        ]
    );
    let left_behind = session.cell(&CellKey::new(10.002, 20.0)).unwrap();
    assert_eq!(left_behind.state, CellState::Unclaimed);
    assert_eq!(left_behind.progress, 0.0);
}

#[test]
fn captured_cells_stay_captured() {
    let mut session = session_with(around_ten_twenty());
    let key = CellKey::new(10.002, 20.001);
    let mut t = 0;
    for point in diagonal_walk() {
        session.push_sample(at(point, t)).unwrap();
        t += 100;
    }
    assert_eq!(session.cell(&key).unwrap().state, CellState::Captured);

    // Leave, come back, tap it: nothing moves it out of Captured.
    let neighbour = Coordinate::new(10.0015, 20.0025);
    let inside = Coordinate::new(10.0015, 20.0015);
    for point in [neighbour, inside, neighbour, inside] {
        session.push_sample(at(point, t)).unwrap();
        t += 100;
    }
    assert_eq!(
        session.tap(inside),
        Ok(SelectionOutcome::Unchanged {
            key,
            state: CellState::Captured
        })
    );

    // Regenerating the same view does not reset it either.
    assert_eq!(load(&mut session, around_ten_twenty()), 0);
    let cell = session.cell(&key).unwrap();
    assert_eq!(cell.state, CellState::Captured);
    assert_eq!(cell.progress, 100.0);
}

#[test]
fn stepping_onto_a_captured_cell_discards_partial_progress() {
    let mut session = session_with(around_ten_twenty());
    let captured = CellKey::new(10.002, 20.001);
    let mut t = 0;
    for point in diagonal_walk() {
        session.push_sample(at(point, t)).unwrap();
        t += 100;
    }
    assert_eq!(session.cell(&captured).unwrap().state, CellState::Captured);

    // Start on the eastern neighbour and make some progress there.
    let neighbour = CellKey::new(10.002, 20.002);
    for lon in [20.0021, 20.0029] {
        session.push_sample(at(Coordinate::new(10.0015, lon), t)).unwrap();
        t += 100;
    }
    assert!(session.cell(&neighbour).unwrap().progress > 0.0);

    // Cross into the captured cell: the neighbour is no longer being walked.
    let outcome = session
        .push_sample(at(Coordinate::new(10.0015, 20.0015), t))
        .unwrap();
    t += 100;
    assert_eq!(
        outcome.status,
        CaptureStatus::AlreadyCaptured {
            key: captured,
            released: Some(neighbour)
        }
    );
    let left = session.cell(&neighbour).unwrap();
    assert_eq!(left.state, CellState::Unclaimed);
    assert_eq!(left.progress, 0.0);
    assert!(session.capturing().is_none());

    // Coming back starts from scratch instead of finishing on a jump.
    let back = session
        .push_sample(at(Coordinate::new(10.0015, 20.0029), t))
        .unwrap();
    assert_eq!(
        back.status,
        CaptureStatus::Entered {
            key: neighbour,
            released: None
        }
    );
    assert_eq!(session.cell(&neighbour).unwrap().progress, 0.0);
}

#[test]
fn overlapping_viewports_never_duplicate_cells() {
    let mut session = GameSession::new(GameConfig::default()).unwrap();
    let first = ViewportBounds::new(10.002, 9.998, 20.002, 19.998);
    let shifted = ViewportBounds::new(10.002, 9.998, 20.004, 20.000);

    assert_eq!(load(&mut session, first), 36);
    assert_eq!(load(&mut session, shifted), 12);

    let snapshot = session.snapshot();
    let unique: HashSet<CellKey> = snapshot.iter().map(|c| c.key).collect();
    assert_eq!(snapshot.len(), 48);
    assert_eq!(unique.len(), 48);
}

#[test]
fn samples_outside_generated_cells_only_move_the_marker() {
    let mut session = session_with(around_ten_twenty());
    let outcome = session
        .push_sample(at(Coordinate::new(-33.8688, 151.2093), 0))
        .unwrap();
    assert_eq!(outcome.status, CaptureStatus::OutsideGrid { released: None });
    assert_eq!(
        session.drain_events(),
        vec![GameEvent::PathPoint(outcome.path_point)]
    );
}
