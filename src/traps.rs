//! Trap Management
//!
//! The trap table for signals plus the EXIT/DEBUG/ERR pseudo-signals.
//! Deliverable signals accumulate in the pending table; the executor runs
//! pending actions after each command, in signal order.

use std::collections::BTreeMap;

use crate::jobs::signals;

/// Pseudo-signal and signal targets a trap can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrapTarget {
    Signal(i32),
    Exit,
    Debug,
    Err,
}

/// Signal names without the SIG prefix, indexed by number (1-based).
pub const SIGNAL_NAMES: &[(i32, &str)] = &[
    (1, "HUP"),
    (2, "INT"),
    (3, "QUIT"),
    (4, "ILL"),
    (5, "TRAP"),
    (6, "ABRT"),
    (7, "BUS"),
    (8, "FPE"),
    (9, "KILL"),
    (10, "USR1"),
    (11, "SEGV"),
    (12, "USR2"),
    (13, "PIPE"),
    (14, "ALRM"),
    (15, "TERM"),
    (17, "CHLD"),
    (18, "CONT"),
    (19, "STOP"),
    (20, "TSTP"),
    (21, "TTIN"),
    (22, "TTOU"),
    (23, "URG"),
    (24, "XCPU"),
    (25, "XFSZ"),
    (26, "VTALRM"),
    (27, "PROF"),
    (28, "WINCH"),
    (29, "IO"),
    (30, "PWR"),
    (31, "SYS"),
];

/// Parse a trap target: a number, a name with or without the SIG prefix,
/// or one of EXIT/DEBUG/ERR (0 is EXIT).
pub fn parse_trap_target(spec: &str) -> Option<TrapTarget> {
    let upper = spec.to_uppercase();
    match upper.as_str() {
        "EXIT" | "0" => return Some(TrapTarget::Exit),
        "DEBUG" => return Some(TrapTarget::Debug),
        "ERR" => return Some(TrapTarget::Err),
        _ => {}
    }
    if let Ok(n) = spec.parse::<i32>() {
        if n > 0 && (n as usize) <= signals::MAX_SIGNAL {
            return Some(TrapTarget::Signal(n));
        }
        return None;
    }
    let name = upper.strip_prefix("SIG").unwrap_or(&upper);
    SIGNAL_NAMES
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(num, _)| TrapTarget::Signal(*num))
}

pub fn signal_name(sig: i32) -> String {
    SIGNAL_NAMES
        .iter()
        .find(|(num, _)| *num == sig)
        .map(|(_, name)| format!("SIG{}", name))
        .unwrap_or_else(|| sig.to_string())
}

#[derive(Debug, Default)]
pub struct TrapManager {
    actions: BTreeMap<TrapTarget, String>,
}

impl TrapManager {
    pub fn new() -> Self {
        TrapManager {
            actions: BTreeMap::new(),
        }
    }

    /// Install a trap action. An empty action ignores the signal.
    pub fn set(&mut self, target: TrapTarget, action: String) {
        if let TrapTarget::Signal(sig) = target {
            if action.is_empty() {
                let _ = signals::ignore_signal(sig);
            } else {
                let _ = signals::catch_signal(sig);
            }
        }
        self.actions.insert(target, action);
    }

    /// Reset a trap to the default disposition.
    pub fn reset(&mut self, target: TrapTarget) {
        if let TrapTarget::Signal(sig) = target {
            let _ = signals::default_signal(sig);
        }
        self.actions.remove(&target);
    }

    pub fn get(&self, target: TrapTarget) -> Option<&str> {
        self.actions.get(&target).map(|s| s.as_str())
    }

    /// (target, action) pairs for `trap -p`.
    pub fn list(&self) -> impl Iterator<Item = (&TrapTarget, &String)> {
        self.actions.iter()
    }

    /// Actions for signals that arrived since the last check, in signal
    /// order. Empty (ignore) actions are filtered out.
    pub fn take_pending_actions(&self) -> Vec<String> {
        let mut out = Vec::new();
        for sig in signals::take_pending_signals() {
            if let Some(action) = self.actions.get(&TrapTarget::Signal(sig)) {
                if !action.is_empty() {
                    out.push(action.clone());
                }
            }
        }
        out
    }

    pub fn exit_action(&self) -> Option<String> {
        self.actions.get(&TrapTarget::Exit).cloned().filter(|a| !a.is_empty())
    }

    pub fn debug_action(&self) -> Option<String> {
        self.actions.get(&TrapTarget::Debug).cloned().filter(|a| !a.is_empty())
    }

    pub fn err_action(&self) -> Option<String> {
        self.actions.get(&TrapTarget::Err).cloned().filter(|a| !a.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parsing() {
        assert_eq!(parse_trap_target("EXIT"), Some(TrapTarget::Exit));
        assert_eq!(parse_trap_target("0"), Some(TrapTarget::Exit));
        assert_eq!(parse_trap_target("ERR"), Some(TrapTarget::Err));
        assert_eq!(parse_trap_target("INT"), Some(TrapTarget::Signal(2)));
        assert_eq!(parse_trap_target("SIGTERM"), Some(TrapTarget::Signal(15)));
        assert_eq!(parse_trap_target("usr1"), Some(TrapTarget::Signal(10)));
        assert_eq!(parse_trap_target("15"), Some(TrapTarget::Signal(15)));
        assert_eq!(parse_trap_target("NOSUCH"), None);
    }

    #[test]
    fn signal_names_round_trip() {
        assert_eq!(signal_name(15), "SIGTERM");
        assert_eq!(signal_name(2), "SIGINT");
    }

    #[test]
    fn exit_action_filtering() {
        let mut traps = TrapManager::new();
        traps.set(TrapTarget::Exit, "echo bye".to_string());
        assert_eq!(traps.exit_action(), Some("echo bye".to_string()));
        traps.set(TrapTarget::Exit, String::new());
        assert_eq!(traps.exit_action(), None);
        traps.reset(TrapTarget::Exit);
        assert!(traps.get(TrapTarget::Exit).is_none());
    }
}
