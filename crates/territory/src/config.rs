use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::GridSpec;

/// Grid step sizes in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub cell_width_deg: f64,
    pub cell_height_deg: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_width_deg: 0.001,
            cell_height_deg: 0.001,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPriority {
    HighAccuracy,
    BalancedPowerAccuracy,
    LowPower,
    Passive,
}

/// What the engine asks of the location provider. Opaque to the core; the
/// host hands it to the client unchanged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRequest {
    pub interval_ms: u64,
    pub fastest_interval_ms: u64,
    pub priority: LocationPriority,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            fastest_interval_ms: 50,
            priority: LocationPriority::HighAccuracy,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Viewports whose padded lattice exceeds this are refused.
    pub max_cells_per_viewport: u64,
    /// Cells per batch handed back by an off-owner worker.
    pub batch_size: usize,
    /// Lattice steps per cooperative `pump_generation` slice.
    pub steps_per_pump: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_cells_per_viewport: 40_000,
            batch_size: 256,
            steps_per_pump: 1_024,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub grid: GridConfig,
    pub location: LocationRequest,
    pub generation: GenerationConfig,
}

impl GameConfig {
    /// Reads `TERRITORY_*` variables, falling back to defaults for anything
    /// unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            grid: GridConfig {
                cell_width_deg: lookup_or(
                    &lookup,
                    "TERRITORY_CELL_WIDTH",
                    defaults.grid.cell_width_deg,
                ),
                cell_height_deg: lookup_or(
                    &lookup,
                    "TERRITORY_CELL_HEIGHT",
                    defaults.grid.cell_height_deg,
                ),
            },
            location: LocationRequest {
                interval_ms: lookup_or(
                    &lookup,
                    "TERRITORY_LOCATION_INTERVAL_MS",
                    defaults.location.interval_ms,
                ),
                fastest_interval_ms: lookup_or(
                    &lookup,
                    "TERRITORY_LOCATION_FASTEST_MS",
                    defaults.location.fastest_interval_ms,
                ),
                priority: defaults.location.priority,
            },
            generation: GenerationConfig {
                max_cells_per_viewport: lookup_or(
                    &lookup,
                    "TERRITORY_MAX_CELLS",
                    defaults.generation.max_cells_per_viewport,
                ),
                batch_size: lookup_or(
                    &lookup,
                    "TERRITORY_BATCH_SIZE",
                    defaults.generation.batch_size,
                ),
                steps_per_pump: defaults.generation.steps_per_pump,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid_spec()?;
        if self.generation.max_cells_per_viewport == 0 {
            return Err(ConfigError::InvalidCellLimit);
        }
        if self.generation.batch_size == 0 || self.generation.steps_per_pump == 0 {
            return Err(ConfigError::InvalidGenerationLimits);
        }
        if self.location.fastest_interval_ms > self.location.interval_ms {
            return Err(ConfigError::InvalidLocationInterval {
                interval_ms: self.location.interval_ms,
                fastest_ms: self.location.fastest_interval_ms,
            });
        }
        Ok(())
    }

    pub fn grid_spec(&self) -> Result<GridSpec, ConfigError> {
        Ok(GridSpec::new(
            self.grid.cell_width_deg,
            self.grid.cell_height_deg,
        )?)
    }
}

fn lookup_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
