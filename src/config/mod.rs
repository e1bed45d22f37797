//! Runtime configuration for mcp-federation
//!
//! - [`settings`]: paths, retry policy and worker count resolved at startup

pub mod settings;

pub use settings::{Settings, SettingsOverrides};
