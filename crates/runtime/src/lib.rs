pub mod budget;
pub mod cancel;
pub mod event_bus;

pub use budget::*;
pub use cancel::*;
pub use event_bus::*;
