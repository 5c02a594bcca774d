use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use foundation::coord::Coordinate;
use territory::config::GameConfig;
use tracing::warn;

use crate::mock_walk::MockWalk;

const DEFAULT_ADDR: &str = "127.0.0.1:9200";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub game: GameConfig,
    /// When set, every session is fed a synthetic walk instead of waiting for
    /// client position messages.
    pub mock_walk: Option<MockWalk>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let addr = env::var("TERRITORY_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let addr = addr.parse().unwrap_or_else(|err| {
            warn!("invalid TERRITORY_ADDR {addr:?} ({err}), using {DEFAULT_ADDR}");
            SocketAddr::from(([127, 0, 0, 1], 9200))
        });

        let mock_walk = env_var_bool("TERRITORY_MOCK_WALK", false).then(|| MockWalk {
            start: Coordinate::new(
                env_var("TERRITORY_MOCK_START_LAT", 55.6388593),
                env_var("TERRITORY_MOCK_START_LON", 37.6704059),
            ),
            step_deg: env_var("TERRITORY_MOCK_STEP_DEG", 0.00001),
            interval: Duration::from_millis(env_var("TERRITORY_MOCK_INTERVAL_MS", 50)),
        });

        Self {
            addr,
            game: GameConfig::from_env(),
            mock_walk,
        }
    }
}

fn env_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
