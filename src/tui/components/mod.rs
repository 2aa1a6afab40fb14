//! TUI components

mod console;
mod steps;

pub use console::Console;
pub use steps::StepList;
