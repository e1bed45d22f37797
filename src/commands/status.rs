//! Status command implementation

use crate::config::Settings;
use crate::error::{EXIT_SUCCESS, Result};
use crate::operations::status;
use crate::ui::display;

pub fn run(settings: &Settings) -> Result<i32> {
    let report = status::status(settings)?;
    display::display_status(&report);
    Ok(EXIT_SUCCESS)
}
