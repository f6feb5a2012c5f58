//! Job Control
//!
//! The job table: process groups, foreground terminal handoff, background
//! reporting, and wait semantics. Each pipeline or background command is
//! one job; its process group is led by the first child.

pub mod signals;

use std::collections::BTreeMap;

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Done,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Running => write!(f, "Running"),
            JobState::Stopped => write!(f, "Stopped"),
            JobState::Done => write!(f, "Done"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: usize,
    pub pgid: i32,
    /// Children in pipeline order, with their last known exit status.
    pub pids: Vec<i32>,
    pub statuses: BTreeMap<i32, Option<i32>>,
    pub state: JobState,
    pub foreground: bool,
    /// Detached with disown -h: survives shell exit.
    pub no_hup: bool,
    pub command: String,
}

impl Job {
    /// Exit status of the job: the last process's status.
    pub fn exit_status(&self) -> i32 {
        self.pids
            .last()
            .and_then(|pid| self.statuses.get(pid).copied().flatten())
            .unwrap_or(0)
    }

    /// Statuses of every stage, pipeline order (PIPESTATUS).
    pub fn pipe_statuses(&self) -> Vec<i32> {
        self.pids
            .iter()
            .map(|pid| self.statuses.get(pid).copied().flatten().unwrap_or(0))
            .collect()
    }

    fn all_reaped(&self) -> bool {
        self.pids
            .iter()
            .all(|pid| self.statuses.get(pid).map(|s| s.is_some()) == Some(true))
    }
}

pub struct JobManager {
    jobs: BTreeMap<usize, Job>,
    next_id: usize,
    current: Option<usize>,
    /// Jobs finished in the background, waiting to be reported.
    pending_notifications: Vec<String>,
    /// Per-stage statuses of the last foreground job (PIPESTATUS).
    pub last_pipe_statuses: Vec<i32>,
    /// Job control active (interactive -m): terminal handoff happens.
    pub job_control: bool,
    shell_pgid: i32,
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

impl JobManager {
    pub fn new() -> Self {
        JobManager {
            jobs: BTreeMap::new(),
            next_id: 1,
            current: None,
            pending_notifications: Vec::new(),
            last_pipe_statuses: Vec::new(),
            job_control: false,
            shell_pgid: nix::unistd::getpgrp().as_raw(),
        }
    }

    /// Claim the terminal and our own process group (interactive startup).
    pub fn init_job_control(&mut self) {
        self.job_control = unsafe { libc::isatty(0) } == 1;
        if !self.job_control {
            return;
        }
        let pgid = nix::unistd::getpid();
        let _ = nix::unistd::setpgid(pgid, pgid);
        self.shell_pgid = pgid.as_raw();
        unsafe {
            libc::tcsetpgrp(0, self.shell_pgid);
        }
    }

    pub fn shell_pgid(&self) -> i32 {
        self.shell_pgid
    }

    pub fn add_job(&mut self, pgid: i32, pids: Vec<i32>, command: String, foreground: bool) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        let statuses = pids.iter().map(|pid| (*pid, None)).collect();
        self.jobs.insert(
            id,
            Job {
                id,
                pgid,
                pids,
                statuses,
                state: JobState::Running,
                foreground,
                no_hup: false,
                command,
            },
        );
        self.current = Some(id);
        id
    }

    pub fn get(&self, id: usize) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn remove(&mut self, id: usize) -> Option<Job> {
        if self.current == Some(id) {
            self.current = None;
        }
        self.jobs.remove(&id)
    }

    pub fn current_job(&self) -> Option<usize> {
        self.current.or_else(|| self.jobs.keys().next_back().copied())
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// Resolve a job spec: %N, %%, %+, %-, %prefix, or a plain job number.
    pub fn resolve_spec(&self, spec: &str) -> Option<usize> {
        let spec = spec.trim();
        if let Some(rest) = spec.strip_prefix('%') {
            match rest {
                "" | "%" | "+" => return self.current_job(),
                "-" => {
                    let mut ids: Vec<usize> = self.jobs.keys().copied().collect();
                    ids.reverse();
                    return ids.get(1).copied().or_else(|| self.current_job());
                }
                _ => {
                    if let Ok(id) = rest.parse::<usize>() {
                        return self.jobs.contains_key(&id).then_some(id);
                    }
                    return self
                        .jobs
                        .values()
                        .find(|job| job.command.starts_with(rest))
                        .map(|job| job.id);
                }
            }
        }
        if let Ok(id) = spec.parse::<usize>() {
            return self.jobs.contains_key(&id).then_some(id);
        }
        None
    }

    /// Hand the terminal to a process group.
    pub fn give_terminal_to(&self, pgid: i32) {
        if self.job_control {
            unsafe {
                libc::tcsetpgrp(0, pgid);
            }
        }
    }

    /// Reclaim the terminal for the shell.
    pub fn reclaim_terminal(&self) {
        if self.job_control {
            unsafe {
                libc::tcsetpgrp(0, self.shell_pgid);
            }
        }
    }

    /// Blocking wait for one foreground job. Returns its exit status.
    /// Stopped jobs stay in the table and report 128+SIGTSTP.
    pub fn wait_for_job(&mut self, id: usize) -> i32 {
        loop {
            let (pgid, next_pid) = match self.jobs.get(&id) {
                Some(job) => {
                    if job.all_reaped() {
                        break;
                    }
                    let next = job
                        .pids
                        .iter()
                        .find(|pid| job.statuses.get(pid).map(|s| s.is_none()) == Some(true))
                        .copied();
                    (job.pgid, next)
                }
                None => return 0,
            };
            // Children only form their own group under job control; fall
            // back to per-pid waits when the group wait has no members.
            let waited = match waitpid(Pid::from_raw(-pgid), Some(WaitPidFlag::WUNTRACED)) {
                Err(nix::errno::Errno::EINTR) => continue,
                Err(_) => match next_pid {
                    Some(pid) => waitpid(Pid::from_raw(pid), Some(WaitPidFlag::WUNTRACED)),
                    None => break,
                },
                ok => ok,
            };
            match waited {
                Ok(status) => {
                    if let Some(stopped) = self.record_status(status) {
                        if stopped == id {
                            // Ctrl-Z: the job keeps its entry, the shell
                            // takes back the terminal.
                            self.reclaim_terminal();
                            if let Some(job) = self.jobs.get_mut(&id) {
                                job.foreground = false;
                            }
                            return 128 + libc::SIGTSTP;
                        }
                    }
                }
                Err(nix::errno::Errno::EINTR) => continue,
                Err(_) => break,
            }
        }
        self.reclaim_terminal();
        let status = self.jobs.get(&id).map(|job| job.exit_status()).unwrap_or(0);
        if let Some(job) = self.jobs.get(&id) {
            self.last_pipe_statuses = job.pipe_statuses();
        }
        if let Some(job) = self.jobs.get(&id) {
            if job.state == JobState::Done || job.all_reaped() {
                self.jobs.remove(&id);
                if self.current == Some(id) {
                    self.current = None;
                }
            }
        }
        status
    }

    /// Record one wait status; returns the job id when the status stopped a
    /// whole job.
    fn record_status(&mut self, status: WaitStatus) -> Option<usize> {
        match status {
            WaitStatus::Exited(pid, code) => {
                self.note_exit(pid.as_raw(), code);
                None
            }
            WaitStatus::Signaled(pid, sig, _) => {
                self.note_exit(pid.as_raw(), 128 + sig as i32);
                None
            }
            WaitStatus::Stopped(pid, _) => {
                let id = self.job_of_pid(pid.as_raw())?;
                let job = self.jobs.get_mut(&id)?;
                job.state = JobState::Stopped;
                Some(id)
            }
            WaitStatus::Continued(pid) => {
                if let Some(id) = self.job_of_pid(pid.as_raw()) {
                    if let Some(job) = self.jobs.get_mut(&id) {
                        job.state = JobState::Running;
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn note_exit(&mut self, pid: i32, code: i32) {
        if let Some(id) = self.job_of_pid(pid) {
            if let Some(job) = self.jobs.get_mut(&id) {
                job.statuses.insert(pid, Some(code));
                if job.all_reaped() {
                    job.state = JobState::Done;
                }
            }
        }
    }

    fn job_of_pid(&self, pid: i32) -> Option<usize> {
        self.jobs
            .values()
            .find(|job| job.pids.contains(&pid))
            .map(|job| job.id)
    }

    /// Non-blocking reap of finished background children; queues the
    /// `[N]+ Done command` notifications for the next prompt.
    pub fn reap_background(&mut self) {
        loop {
            match waitpid(
                Pid::from_raw(-1),
                Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED),
            ) {
                Ok(WaitStatus::StillAlive) => break,
                Ok(status) => {
                    self.record_status(status);
                }
                Err(_) => break,
            }
        }
        let done: Vec<usize> = self
            .jobs
            .values()
            .filter(|job| job.state == JobState::Done && !job.foreground)
            .map(|job| job.id)
            .collect();
        for id in done {
            if let Some(job) = self.jobs.remove(&id) {
                self.pending_notifications
                    .push(format!("[{}]+  Done                    {}", job.id, job.command));
                if self.current == Some(id) {
                    self.current = None;
                }
            }
        }
    }

    /// Wait for every child (the bare `wait` builtin).
    pub fn wait_all(&mut self) -> i32 {
        let ids: Vec<usize> = self.jobs.keys().copied().collect();
        let mut status = 0;
        for id in ids {
            if self.jobs.get(&id).map(|j| j.state) == Some(JobState::Running) {
                status = self.wait_for_job(id);
            }
        }
        status
    }

    pub fn take_notifications(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_notifications)
    }

    /// One line of `jobs` output.
    pub fn format_job(&self, job: &Job) -> String {
        let marker = if Some(job.id) == self.current_job() {
            '+'
        } else {
            '-'
        };
        format!(
            "[{}]{}  {}                 {}",
            job.id, marker, job.state, job.command
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_job(command: &str) -> (JobManager, usize) {
        let mut manager = JobManager::new();
        let id = manager.add_job(4242, vec![4242, 4243], command.to_string(), false);
        (manager, id)
    }

    #[test]
    fn job_spec_resolution() {
        let (mut manager, id) = manager_with_job("sleep 100");
        assert_eq!(manager.resolve_spec("%1"), Some(id));
        assert_eq!(manager.resolve_spec("%%"), Some(id));
        assert_eq!(manager.resolve_spec("%+"), Some(id));
        assert_eq!(manager.resolve_spec("%sleep"), Some(id));
        assert_eq!(manager.resolve_spec("%nope"), None);
        assert_eq!(manager.resolve_spec("1"), Some(id));
        manager.remove(id);
        assert_eq!(manager.resolve_spec("%1"), None);
    }

    #[test]
    fn exit_status_is_last_stage() {
        let (mut manager, id) = manager_with_job("a | b");
        {
            let job = manager.get_mut(id).unwrap();
            job.statuses.insert(4242, Some(1));
            job.statuses.insert(4243, Some(0));
        }
        let job = manager.get(id).unwrap();
        assert_eq!(job.exit_status(), 0);
        assert_eq!(job.pipe_statuses(), vec![1, 0]);
    }

    #[test]
    fn done_jobs_produce_notifications() {
        let (mut manager, id) = manager_with_job("sleep 1");
        {
            let job = manager.get_mut(id).unwrap();
            job.statuses.insert(4242, Some(0));
            job.statuses.insert(4243, Some(0));
            job.state = JobState::Done;
        }
        manager.reap_background();
        let notes = manager.take_notifications();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("Done"));
        assert!(manager.get(id).is_none());
    }
}
