//! Logging setup and stage timing.

mod logging;
mod timer;

pub use logging::{init, LogFormat};
pub use timer::StageTimer;
