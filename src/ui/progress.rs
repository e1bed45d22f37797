//! Progress bar for acquisition actions

use std::time::Duration;

use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use crate::runner::{ActionFailure, ActionOutcome, ActionProgress};

const TICK: Duration = Duration::from_millis(120);

/// Progress bar driven by the action runner
///
/// Hidden when stderr is not a terminal, so piped output and tests stay
/// clean.
pub struct ActionProgressBar {
    bar: ProgressBar,
}

impl ActionProgressBar {
    pub fn new() -> Self {
        let bar = if Term::stderr().is_term() {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::default_bar()
            .template("{spinner} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for ActionProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionProgress for ActionProgressBar {
    fn begin(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.enable_steady_tick(TICK);
    }

    fn started(&self, entry: &str) {
        self.bar.set_message(entry.to_string());
    }

    fn retrying(&self, entry: &str, attempt: u32, delay: Duration, failure: &ActionFailure) {
        self.bar.println(format!(
            "  {} {entry} (attempt {attempt}) failed, retrying in {}s: {failure}",
            Style::new().yellow().apply_to("!"),
            delay.as_secs()
        ));
    }

    fn finished(&self, entry: &str, outcome: &ActionOutcome) {
        match outcome {
            ActionOutcome::Succeeded { .. } => {
                self.bar
                    .println(format!("  {} {entry}", Style::new().green().apply_to("✓")));
            }
            ActionOutcome::Failed { failure, .. } => {
                self.bar.println(format!(
                    "  {} {entry}: {failure}",
                    Style::new().red().apply_to("✗")
                ));
            }
            ActionOutcome::NotStarted => {}
        }
        self.bar.inc(1);
    }

    fn end(&self) {
        self.bar.finish_and_clear();
    }
}
