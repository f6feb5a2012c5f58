//! Redirections
//!
//! Planning happens in the parent (targets are expanded there); applying
//! happens either with fd save/restore (builtins, functions, compound
//! commands) or destructively in a forked child (externals, pipeline
//! stages). Saved descriptors live at fd 10 and above.

use nix::fcntl::{fcntl, open, FcntlArg, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2, pipe, write};
use std::os::fd::IntoRawFd;

use crate::ast::types::{RedirectionNode, RedirectionOperator, RedirectionTarget};
use crate::core::errors::ExecError;
use crate::exec::fork_flushed;
use crate::expansion::{expand_heredoc_body, expand_word_raw};
use crate::jobs::signals::{apply_child_signal_policy, ChildKind};
use crate::shell::Shell;

/// First fd used for save/restore bookkeeping; 0..9 belong to the script.
const SAVE_FD_BASE: i32 = 10;

/// One fd operation, ready to apply on either side of a fork.
#[derive(Debug, Clone)]
pub enum RedirPlan {
    Open { fd: i32, path: String, flags: OFlag },
    Dup { fd: i32, source: i32 },
    Close { fd: i32 },
    HereData { fd: i32, data: String },
}

impl RedirPlan {
    pub fn target_fd(&self) -> i32 {
        match self {
            RedirPlan::Open { fd, .. }
            | RedirPlan::Dup { fd, .. }
            | RedirPlan::Close { fd }
            | RedirPlan::HereData { fd, .. } => *fd,
        }
    }
}

/// Expand targets and produce the fd operations for a redirection list.
pub fn plan_redirections(
    shell: &mut Shell,
    redirects: &[RedirectionNode],
) -> Result<Vec<RedirPlan>, ExecError> {
    let mut plans = Vec::new();
    for redirect in redirects {
        plan_one(shell, redirect, &mut plans)?;
    }
    Ok(plans)
}

fn plan_one(
    shell: &mut Shell,
    redirect: &RedirectionNode,
    plans: &mut Vec<RedirPlan>,
) -> Result<(), ExecError> {
    use RedirectionOperator::*;

    let target_text = match &redirect.target {
        RedirectionTarget::Word(word) => expand_word_raw(shell, word)?,
        RedirectionTarget::HereDoc(_) => String::new(),
    };

    match redirect.operator {
        Less => {
            plans.push(RedirPlan::Open {
                fd: redirect.fd.unwrap_or(0),
                path: target_text,
                flags: OFlag::O_RDONLY,
            });
        }
        Great => {
            let fd = redirect.fd.unwrap_or(1);
            if shell.state.options.noclobber && is_existing_regular_file(&target_text) {
                return Err(ExecError::Redirect(format!(
                    "{}: cannot overwrite existing file",
                    target_text
                )));
            }
            plans.push(RedirPlan::Open {
                fd,
                path: target_text,
                flags: OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            });
        }
        Clobber => {
            plans.push(RedirPlan::Open {
                fd: redirect.fd.unwrap_or(1),
                path: target_text,
                flags: OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            });
        }
        DGreat => {
            plans.push(RedirPlan::Open {
                fd: redirect.fd.unwrap_or(1),
                path: target_text,
                flags: OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
            });
        }
        LessGreat => {
            plans.push(RedirPlan::Open {
                fd: redirect.fd.unwrap_or(0),
                path: target_text,
                flags: OFlag::O_RDWR | OFlag::O_CREAT,
            });
        }
        LessAnd | GreatAnd => {
            let default_fd = if redirect.operator == LessAnd { 0 } else { 1 };
            let fd = redirect.fd.unwrap_or(default_fd);
            let trimmed = target_text.trim();
            if trimmed == "-" {
                plans.push(RedirPlan::Close { fd });
            } else if let Ok(source) = trimmed.parse::<i32>() {
                plans.push(RedirPlan::Dup { fd, source });
            } else if redirect.operator == GreatAnd && redirect.fd.is_none() {
                // Legacy `>&file` form: both stdout and stderr.
                plans.push(RedirPlan::Open {
                    fd: 1,
                    path: target_text,
                    flags: OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                });
                plans.push(RedirPlan::Dup { fd: 2, source: 1 });
            } else {
                return Err(ExecError::Redirect(format!(
                    "{}: ambiguous redirect",
                    target_text
                )));
            }
        }
        AndGreat => {
            plans.push(RedirPlan::Open {
                fd: 1,
                path: target_text,
                flags: OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            });
            plans.push(RedirPlan::Dup { fd: 2, source: 1 });
        }
        AndDGreat => {
            plans.push(RedirPlan::Open {
                fd: 1,
                path: target_text,
                flags: OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
            });
            plans.push(RedirPlan::Dup { fd: 2, source: 1 });
        }
        HereString => {
            let mut data = target_text;
            data.push('\n');
            plans.push(RedirPlan::HereData {
                fd: redirect.fd.unwrap_or(0),
                data,
            });
        }
        HereDoc | HereDocDash => {
            let heredoc = match &redirect.target {
                RedirectionTarget::HereDoc(heredoc) => heredoc,
                RedirectionTarget::Word(_) => unreachable!("here-doc carries a body"),
            };
            let data = expand_heredoc_body(shell, heredoc)?;
            plans.push(RedirPlan::HereData {
                fd: redirect.fd.unwrap_or(0),
                data,
            });
        }
    }
    Ok(())
}

fn is_existing_regular_file(path: &str) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file())
        .unwrap_or(false)
}

// =============================================================================
// applying plans
// =============================================================================

/// Apply one plan to the live fd table.
fn apply_plan(plan: &RedirPlan) -> Result<(), ExecError> {
    match plan {
        RedirPlan::Open { fd, path, flags } => {
            let raw = open(path.as_str(), *flags, Mode::from_bits_truncate(0o666))
                .map_err(|e| ExecError::Redirect(format!("{}: {}", path, e)))?;
            if raw != *fd {
                dup2(raw, *fd).map_err(|e| ExecError::Redirect(e.to_string()))?;
                let _ = close(raw);
            }
        }
        RedirPlan::Dup { fd, source } => {
            dup2(*source, *fd)
                .map_err(|_| ExecError::Redirect(format!("{}: bad file descriptor", source)))?;
        }
        RedirPlan::Close { fd } => {
            let _ = close(*fd);
        }
        RedirPlan::HereData { fd, data } => {
            let read_end = here_pipe(data)?;
            if read_end != *fd {
                dup2(read_end, *fd).map_err(|e| ExecError::Redirect(e.to_string()))?;
                let _ = close(read_end);
            }
        }
    }
    Ok(())
}

/// Feed here-doc data through a pipe. Small bodies fit the pipe buffer;
/// larger ones get a writer child so the shell cannot deadlock on its own
/// pipe.
fn here_pipe(data: &str) -> Result<i32, ExecError> {
    let (read_end, write_end) =
        pipe().map_err(|e| ExecError::Redirect(e.to_string()))?;
    let read_fd = read_end.into_raw_fd();
    let write_fd = write_end.into_raw_fd();

    if data.len() <= 60_000 {
        let mut remaining = data.as_bytes();
        while !remaining.is_empty() {
            match write(write_fd, remaining) {
                Ok(n) => remaining = &remaining[n..],
                Err(_) => break,
            }
        }
        let _ = close(write_fd);
        return Ok(read_fd);
    }

    match unsafe { fork_flushed() } {
        Ok(nix::unistd::ForkResult::Child) => {
            apply_child_signal_policy(ChildKind::Leaf);
            let _ = close(read_fd);
            let mut remaining = data.as_bytes();
            while !remaining.is_empty() {
                match write(write_fd, remaining) {
                    Ok(n) => remaining = &remaining[n..],
                    Err(_) => break,
                }
            }
            unsafe { libc::_exit(0) }
        }
        Ok(nix::unistd::ForkResult::Parent { .. }) => {
            let _ = close(write_fd);
            Ok(read_fd)
        }
        Err(e) => {
            let _ = close(read_fd);
            let _ = close(write_fd);
            Err(ExecError::Redirect(e.to_string()))
        }
    }
}

/// Apply plans destructively (forked children, `exec`).
pub fn apply_plans(plans: &[RedirPlan]) -> Result<(), ExecError> {
    for plan in plans {
        apply_plan(plan)?;
    }
    Ok(())
}

/// Saved descriptors for restore after a builtin or function observes its
/// redirections.
pub struct SavedFds {
    saves: Vec<(i32, Option<i32>)>,
}

impl SavedFds {
    pub fn restore(self) {
        for (fd, saved) in self.saves.into_iter().rev() {
            match saved {
                Some(copy) => {
                    let _ = dup2(copy, fd);
                    let _ = close(copy);
                }
                None => {
                    let _ = close(fd);
                }
            }
        }
    }
}

/// Apply plans after saving every affected fd above `SAVE_FD_BASE`.
pub fn apply_plans_with_save(plans: &[RedirPlan]) -> Result<SavedFds, ExecError> {
    let mut saves = Vec::new();
    for plan in plans {
        let fd = plan.target_fd();
        if saves.iter().all(|(saved_fd, _)| *saved_fd != fd) {
            match fcntl(fd, FcntlArg::F_DUPFD_CLOEXEC(SAVE_FD_BASE)) {
                Ok(copy) => saves.push((fd, Some(copy))),
                // fd was not open: restore means close.
                Err(_) => saves.push((fd, None)),
            }
        }
    }
    let saved = SavedFds { saves };
    for plan in plans {
        if let Err(err) = apply_plan(plan) {
            saved.restore();
            return Err(err);
        }
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::read;

    #[test]
    fn here_pipe_round_trip() {
        let fd = here_pipe("hello\n").unwrap();
        let mut buf = [0u8; 16];
        let n = read(fd, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello\n");
        let _ = close(fd);
    }

    #[test]
    fn plan_fd_defaults() {
        let plan = RedirPlan::Open {
            fd: 1,
            path: "x".into(),
            flags: OFlag::O_WRONLY,
        };
        assert_eq!(plan.target_fd(), 1);
    }
}
