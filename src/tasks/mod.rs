//! Background Tasks Module
//!
//! Periodic maintenance that runs alongside foreground cache callers.

mod reaper;

pub use reaper::{spawn_reaper, ReaperHandle};
