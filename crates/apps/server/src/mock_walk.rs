//! Synthetic location provider for exercising the capture loop without a
//! device.

use std::time::Duration;

use foundation::coord::Coordinate;
use foundation::time::Timestamp;
use territory::sample::PositionSample;
use tokio::sync::mpsc;
use tracing::debug;

use crate::actor::SessionCommand;

/// Walks diagonally north-east by `step_deg` every `interval`.
#[derive(Clone, Debug, PartialEq)]
pub struct MockWalk {
    pub start: Coordinate,
    pub step_deg: f64,
    pub interval: Duration,
}

impl MockWalk {
    pub fn sample(&self, tick: u64) -> PositionSample {
        let offset = self.step_deg * tick as f64;
        let millis = self.interval.as_millis() as u64 * tick;
        PositionSample::at(
            self.start.offset(offset, offset),
            Timestamp::from_millis(millis),
        )
    }
}

/// Feeds samples into a session until its command channel closes.
pub async fn run(walk: MockWalk, commands: mpsc::Sender<SessionCommand>) {
    let mut ticker = tokio::time::interval(walk.interval);
    for tick in 0u64.. {
        ticker.tick().await;
        if commands
            .send(SessionCommand::Sample(walk.sample(tick)))
            .await
            .is_err()
        {
            debug!(ticks = tick, "mock walk stopped");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MockWalk;
    use foundation::coord::Coordinate;
    use std::time::Duration;

    #[test]
    fn steps_north_east_with_increasing_timestamps() {
        let walk = MockWalk {
            start: Coordinate::new(55.0, 37.0),
            step_deg: 0.001,
            interval: Duration::from_millis(50),
        };
        let first = walk.sample(0);
        let third = walk.sample(2);
        assert_eq!(first.coordinate(), Coordinate::new(55.0, 37.0));
        assert!((third.latitude - 55.002).abs() < 1e-12);
        assert!((third.longitude - 37.002).abs() < 1e-12);
        assert_eq!(third.timestamp.millis(), 100);
    }
}
