//! Validate command implementation

use crate::catalog::Catalog;
use crate::config::Settings;
use crate::error::Result;
use crate::operations::validate;
use crate::prereq::SystemToolchain;
use crate::ui::display;

pub fn run(settings: &Settings, catalog: &Catalog) -> Result<i32> {
    let report = validate::validate(settings, catalog, &SystemToolchain)?;
    display::display_validate(&report);
    Ok(report.exit_code())
}
