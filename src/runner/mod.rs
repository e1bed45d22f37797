//! Acquisition action runner
//!
//! Runs each entry's acquisition with bounded retries. Entries are
//! independent, so they are spread over a fixed number of worker threads
//! pulling from a shared queue; one entry's failure or backoff never holds
//! up the others. Results come back in input order once every entry is
//! done, ready for the single-threaded merge.
//!
//! After cancellation no new action is launched and no retry is started.
//! Actions already running are left to finish or time out.

mod executor;
mod failure;
mod process;
mod retry;

use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;

use crate::cancel::CancelToken;
use crate::catalog::Acquisition;

pub use executor::{ActionExecutor, SystemExecutor};
pub use failure::ActionFailure;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
use retry::{RetryError, retry};

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Succeeded { attempts: u32 },
    Failed { attempts: u32, failure: ActionFailure },
    /// Never launched because the run was cancelled
    NotStarted,
}

/// Observer for action progress
#[allow(unused_variables)]
pub trait ActionProgress: Sync {
    /// A batch of `total` actions is about to run
    fn begin(&self, total: usize) {}
    fn started(&self, entry: &str) {}
    fn retrying(&self, entry: &str, attempt: u32, delay: Duration, failure: &ActionFailure) {}
    fn finished(&self, entry: &str, outcome: &ActionOutcome) {}
    fn end(&self) {}
}

/// Progress observer that ignores everything
pub struct NoProgress;

impl ActionProgress for NoProgress {}

pub struct ActionRunner<'a> {
    executor: &'a dyn ActionExecutor,
    policy: RetryPolicy,
    jobs: usize,
    cancel: CancelToken,
    sleeper: &'a dyn Sleeper,
    progress: &'a dyn ActionProgress,
}

impl<'a> ActionRunner<'a> {
    pub fn new(
        executor: &'a dyn ActionExecutor,
        policy: RetryPolicy,
        jobs: usize,
        cancel: CancelToken,
    ) -> Self {
        Self {
            executor,
            policy,
            jobs: jobs.max(1),
            cancel,
            sleeper: &ThreadSleeper,
            progress: &NoProgress,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ActionProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run one acquisition to success, exhaustion or a fatal failure
    pub fn perform(&self, acquisition: &Acquisition) -> ActionOutcome {
        let entry = acquisition.entry.as_str();
        if self.cancel.is_cancelled() {
            return ActionOutcome::NotStarted;
        }
        self.progress.started(entry);

        let result = retry(
            &self.policy,
            &self.cancel,
            self.sleeper,
            |attempt| {
                tracing::debug!(entry, attempt, kind = acquisition.kind.as_str(), "running action");
                self.executor.execute(acquisition)
            },
            ActionFailure::is_retryable,
            |attempt, delay, failure| {
                tracing::warn!(
                    entry,
                    attempt,
                    delay_secs = delay.as_secs_f32(),
                    "action failed, retrying: {failure}"
                );
                self.progress.retrying(entry, attempt, delay, failure);
            },
        );

        let outcome = match result {
            Ok(((), attempts)) => ActionOutcome::Succeeded { attempts },
            Err(RetryError::Exhausted { attempts, last }) => ActionOutcome::Failed {
                attempts,
                failure: last,
            },
            Err(RetryError::Fatal { attempts, error }) => ActionOutcome::Failed {
                attempts,
                failure: error,
            },
            Err(RetryError::Cancelled { attempts: 0, .. }) => ActionOutcome::NotStarted,
            Err(RetryError::Cancelled { attempts, last }) => ActionOutcome::Failed {
                attempts,
                failure: last.unwrap_or(ActionFailure::Cancelled),
            },
        };

        match &outcome {
            ActionOutcome::Succeeded { attempts } => {
                tracing::info!(entry, attempts, "action succeeded");
            }
            ActionOutcome::Failed { attempts, failure } => {
                tracing::warn!(entry, attempts, "action failed: {failure}");
            }
            ActionOutcome::NotStarted => {}
        }
        self.progress.finished(entry, &outcome);
        outcome
    }

    /// Run all acquisitions on the worker pool, results in input order
    pub fn perform_all(&self, acquisitions: &[&Acquisition]) -> Vec<(String, ActionOutcome)> {
        if acquisitions.is_empty() {
            return Vec::new();
        }

        let (job_tx, job_rx) = unbounded::<usize>();
        let (result_tx, result_rx) = unbounded::<(usize, ActionOutcome)>();
        for index in 0..acquisitions.len() {
            let _ = job_tx.send(index);
        }
        drop(job_tx);

        let workers = self.jobs.min(acquisitions.len());
        tracing::debug!(workers, actions = acquisitions.len(), "starting action workers");
        self.progress.begin(acquisitions.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Ok(index) = job_rx.recv() {
                        let outcome = self.perform(acquisitions[index]);
                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);
        self.progress.end();

        let mut outcomes: Vec<Option<ActionOutcome>> = vec![None; acquisitions.len()];
        for (index, outcome) in result_rx {
            outcomes[index] = Some(outcome);
        }

        acquisitions
            .iter()
            .zip(outcomes)
            .map(|(acq, outcome)| {
                (
                    acq.entry.clone(),
                    outcome.unwrap_or(ActionOutcome::NotStarted),
                )
            })
            .collect()
    }
}
