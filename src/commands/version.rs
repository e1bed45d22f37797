//! Version command implementation

use crate::catalog::Catalog;
use crate::error::{EXIT_SUCCESS, Result};

/// Run version command
pub fn run() -> Result<i32> {
    println!("mcp-federation {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Build info:");
    println!("  Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("  Profile: {}", build_profile());
    let catalog = Catalog::builtin()?;
    println!(
        "  Builtin catalog: {} {} ({} entries)",
        catalog.name,
        catalog.version,
        catalog.entries.len()
    );

    Ok(EXIT_SUCCESS)
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
