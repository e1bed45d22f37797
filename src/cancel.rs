//! Cooperative cancellation for the action phase
//!
//! The first Ctrl-C sets a flag that stops new actions and retries from
//! starting; running actions finish or time out. The handler resets itself,
//! so a second Ctrl-C terminates the process the usual way.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    watch_interrupts: bool,
}

impl CancelToken {
    /// A token cancelled only through [`CancelToken::cancel`]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is also cancelled by SIGINT
    pub fn from_interrupts() -> Self {
        install_interrupt_handler();
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            watch_interrupts: true,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || (self.watch_interrupts && INTERRUPTED.load(Ordering::SeqCst))
    }
}

#[cfg(unix)]
extern "C" fn on_interrupt(_: nix::libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_interrupt_handler() {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    let action = SigAction::new(
        SigHandler::Handler(on_interrupt),
        SaFlags::SA_RESETHAND | SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe
    if let Err(e) = unsafe { sigaction(Signal::SIGINT, &action) } {
        tracing::warn!("could not install interrupt handler: {e}");
    }
}

#[cfg(not(unix))]
fn install_interrupt_handler() {
    tracing::debug!("interrupt handling is not available on this platform");
}
