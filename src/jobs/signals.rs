//! Signal Dispositions
//!
//! The shell's own signal setup, async pending-signal flags, and the
//! unified child-signal policy. Every fork site goes through
//! `apply_child_signal_policy`; duplicating the policy inline is how
//! terminal-control bugs happen, so this is the single code path.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{signal, SigHandler, Signal};

/// Highest signal number tracked by the pending table.
pub const MAX_SIGNAL: usize = 64;

/// One pending flag per signal, set from the signal-hook handler.
static PENDING: [AtomicBool; MAX_SIGNAL + 1] =
    [const { AtomicBool::new(false) }; MAX_SIGNAL + 1];

/// Set when SIGCHLD arrives; the job table reaps at command boundaries.
pub static SIGCHLD_PENDING: AtomicBool = AtomicBool::new(false);

/// Set when SIGINT arrives at the shell itself (interactive interrupt).
pub static SIGINT_PENDING: AtomicBool = AtomicBool::new(false);

/// What kind of process a fork produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    /// A child that keeps running shell code (subshell, brace-group fork,
    /// command/process substitution). Keeps SIGTTOU ignored so it can call
    /// tcsetpgrp without being stopped.
    ShellProcess,
    /// A child that will exec an external program; default dispositions.
    Leaf,
}

/// Install the shell's dispositions: job-control signals ignored, SIGCHLD
/// recorded.
pub fn install_shell_handlers(interactive: bool) {
    unsafe {
        if interactive {
            let _ = signal(Signal::SIGINT, SigHandler::Handler(note_sigint));
            let _ = signal(Signal::SIGQUIT, SigHandler::SigIgn);
            let _ = signal(Signal::SIGTSTP, SigHandler::SigIgn);
            let _ = signal(Signal::SIGTTIN, SigHandler::SigIgn);
            let _ = signal(Signal::SIGTTOU, SigHandler::SigIgn);
        }
        let _ = signal(Signal::SIGCHLD, SigHandler::Handler(note_sigchld));
    }
}

extern "C" fn note_sigchld(_sig: i32) {
    SIGCHLD_PENDING.store(true, Ordering::SeqCst);
}

extern "C" fn note_sigint(_sig: i32) {
    SIGINT_PENDING.store(true, Ordering::SeqCst);
}

fn note_pending(sig: i32) {
    if (sig as usize) <= MAX_SIGNAL {
        PENDING[sig as usize].store(true, Ordering::SeqCst);
    }
}

lazy_static::lazy_static! {
    static ref CATCH_IDS: std::sync::Mutex<std::collections::HashMap<i32, signal_hook::SigId>> =
        std::sync::Mutex::new(std::collections::HashMap::new());
}

/// Route a signal into the pending table (used when a trap is set).
pub fn catch_signal(sig: i32) -> std::io::Result<()> {
    let mut ids = CATCH_IDS.lock().unwrap();
    if ids.contains_key(&sig) {
        return Ok(());
    }
    let id = unsafe { signal_hook::low_level::register(sig, move || note_pending(sig))? };
    ids.insert(sig, id);
    Ok(())
}

fn unregister_catch(sig: i32) {
    if let Some(id) = CATCH_IDS.lock().unwrap().remove(&sig) {
        signal_hook::low_level::unregister(id);
    }
}

/// Ignore a signal (trap with an empty action).
pub fn ignore_signal(sig: i32) -> nix::Result<()> {
    unregister_catch(sig);
    let signal_no = Signal::try_from(sig)?;
    unsafe {
        signal(signal_no, SigHandler::SigIgn).map(|_| ())
    }
}

/// Restore a signal's default disposition (trap reset).
pub fn default_signal(sig: i32) -> nix::Result<()> {
    unregister_catch(sig);
    let signal_no = Signal::try_from(sig)?;
    unsafe {
        signal(signal_no, SigHandler::SigDfl).map(|_| ())
    }
}

/// Drain and return the pending signal numbers, in signal order.
pub fn take_pending_signals() -> Vec<i32> {
    let mut out = Vec::new();
    for (sig, flag) in PENDING.iter().enumerate() {
        if flag.swap(false, Ordering::SeqCst) {
            out.push(sig as i32);
        }
    }
    out
}

pub fn take_sigint() -> bool {
    SIGINT_PENDING.swap(false, Ordering::SeqCst)
}

/// The unified child-signal policy, applied immediately after fork in the
/// child branch:
///   1. the caller marks the state as a forked child,
///   2. SIGTTOU is ignored during setup,
///   3. every shell-managed signal is reset to default,
///   4. shell-process children re-ignore SIGTTOU so tcsetpgrp cannot stop
///      them; leaf processes keep the defaults.
pub fn apply_child_signal_policy(kind: ChildKind) {
    unsafe {
        let _ = signal(Signal::SIGTTOU, SigHandler::SigIgn);
        for sig in [
            Signal::SIGINT,
            Signal::SIGQUIT,
            Signal::SIGTSTP,
            Signal::SIGTTOU,
            Signal::SIGTTIN,
            Signal::SIGCHLD,
            Signal::SIGPIPE,
            Signal::SIGWINCH,
        ] {
            let _ = signal(sig, SigHandler::SigDfl);
        }
        if kind == ChildKind::ShellProcess {
            let _ = signal(Signal::SIGTTOU, SigHandler::SigIgn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_table_drains() {
        note_pending(10);
        note_pending(12);
        let pending = take_pending_signals();
        assert!(pending.contains(&10));
        assert!(pending.contains(&12));
        assert!(take_pending_signals().is_empty());
    }

    #[test]
    fn sigint_flag_swaps() {
        SIGINT_PENDING.store(true, Ordering::SeqCst);
        assert!(take_sigint());
        assert!(!take_sigint());
    }
}
