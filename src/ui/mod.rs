//! Terminal presentation
//!
//! - `progress`: indicatif bar for the action phase
//! - `display`: summaries of operation reports
//!
//! Everything here writes to the terminal; logging goes through `tracing`
//! on stderr and is configured in `main`.

pub mod display;
pub mod progress;

pub use progress::ActionProgressBar;
