//! Grid generation and capture state machine for location-based territory
//! capture.
//!
//! A [`GameSession`] owns every piece of mutable state; collaborators feed it
//! viewport bounds and position samples and read back [`GameEvent`]s.

pub mod cell;
pub mod config;
pub mod error;
pub mod events;
pub mod generator;
pub mod grid;
pub mod protocol;
pub mod sample;
pub mod session;
pub mod store;
pub mod tracker;

pub use cell::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use generator::*;
pub use grid::*;
pub use sample::*;
pub use session::*;
pub use store::*;
pub use tracker::*;
