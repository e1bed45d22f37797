//! Subprocess execution with a timeout
//!
//! Commands run without a shell. Output is captured on reader threads so a
//! chatty child cannot block on a full pipe, and the child is polled with
//! `try_wait` until it exits or the timeout expires, in which case it is
//! killed. On unix each child gets its own process group, so a Ctrl-C at
//! the terminal reaches only this process and is handled by cancellation.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::failure::ActionFailure;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const DETAIL_LINES: usize = 5;

/// One command to run
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec<'a> {
    pub argv: &'a [String],
    pub cwd: &'a Path,
    pub env: &'a [(String, String)],
    pub timeout: Duration,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Last few non-empty lines of the output, joined for one-line reports
fn tail(output: &str) -> String {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(DETAIL_LINES);
    lines[start..].join(" | ")
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run a command to completion, failing on non-zero exit or timeout
pub fn run(invocation: CommandSpec<'_>) -> Result<(), ActionFailure> {
    let Some((program, args)) = invocation.argv.split_first() else {
        return Err(ActionFailure::InvalidDescriptor("empty command".to_string()));
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(invocation.cwd)
        .envs(invocation.env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    tracing::debug!(
        program = %program,
        args = ?args,
        cwd = %invocation.cwd.display(),
        "running command"
    );
    let mut child = command.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound => ActionFailure::ProgramNotFound {
            program: program.clone(),
        },
        _ => ActionFailure::Spawn {
            program: program.clone(),
            reason: e.to_string(),
        },
    })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status =
        wait_with_timeout(&mut child, invocation.timeout).map_err(|e| ActionFailure::Spawn {
            program: program.clone(),
            reason: e.to_string(),
        })?;

    let Some(status) = status else {
        let _ = child.kill();
        let _ = child.wait();
        // Reader threads are left to finish on their own; a grandchild may
        // still hold the pipes open.
        return Err(ActionFailure::Timeout {
            program: program.clone(),
            secs: invocation.timeout.as_secs(),
        });
    };

    let stdout = collect(stdout);
    let stderr = collect(stderr);
    if status.success() {
        return Ok(());
    }

    let detail = if stderr.trim().is_empty() {
        tail(&stdout)
    } else {
        tail(&stderr)
    };
    Err(ActionFailure::NonZeroExit {
        program: program.clone(),
        status: status.to_string(),
        detail,
    })
}
