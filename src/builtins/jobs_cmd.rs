//! Job-control builtins: jobs, fg, bg, wait, disown, kill

use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

use crate::core::errors::ExecError;
use crate::exec::{write_stderr, write_stdout};
use crate::jobs::JobState;
use crate::shell::Shell;
use crate::traps::{parse_trap_target, TrapTarget, SIGNAL_NAMES};

pub fn handle_jobs(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let pids_only = args.iter().any(|a| a == "-p");
    let long = args.iter().any(|a| a == "-l");
    shell.jobs.reap_background();
    let lines: Vec<String> = shell
        .jobs
        .jobs()
        .map(|job| {
            if pids_only {
                job.pgid.to_string()
            } else if long {
                format!("[{}]  {} {}  {}", job.id, job.pgid, job.state, job.command)
            } else {
                shell.jobs.format_job(job)
            }
        })
        .collect();
    for line in lines {
        write_stdout(&format!("{}\n", line));
    }
    Ok(0)
}

fn resolve_job(shell: &mut Shell, args: &[String], which: &str) -> Option<usize> {
    let id = match args.first() {
        Some(spec) => shell.jobs.resolve_spec(spec),
        None => shell.jobs.current_job(),
    };
    if id.is_none() {
        write_stderr(&format!(
            "{}: {}: {}: no such job\n",
            shell.state.script_name,
            which,
            args.first().map(|s| s.as_str()).unwrap_or("current")
        ));
    }
    id
}

pub fn handle_fg(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let id = match resolve_job(shell, args, "fg") {
        Some(id) => id,
        None => return Ok(1),
    };
    let (pgid, command) = match shell.jobs.get(id) {
        Some(job) => (job.pgid, job.command.clone()),
        None => return Ok(1),
    };
    write_stdout(&format!("{}\n", command));
    if let Some(job) = shell.jobs.get_mut(id) {
        job.state = JobState::Running;
        job.foreground = true;
    }
    shell.jobs.give_terminal_to(pgid);
    let _ = killpg(Pid::from_raw(pgid), Signal::SIGCONT);
    let status = shell.jobs.wait_for_job(id);
    Ok(status)
}

pub fn handle_bg(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let id = match resolve_job(shell, args, "bg") {
        Some(id) => id,
        None => return Ok(1),
    };
    let pgid = match shell.jobs.get_mut(id) {
        Some(job) => {
            job.state = JobState::Running;
            job.foreground = false;
            job.pgid
        }
        None => return Ok(1),
    };
    let _ = killpg(Pid::from_raw(pgid), Signal::SIGCONT);
    if let Some(job) = shell.jobs.get(id) {
        write_stdout(&format!("[{}]+ {} &\n", job.id, job.command));
    }
    Ok(0)
}

pub fn handle_wait(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    if args.is_empty() {
        return Ok(shell.jobs.wait_all());
    }
    let mut status = 0;
    for spec in args {
        let id = if spec.starts_with('%') {
            shell.jobs.resolve_spec(spec)
        } else if let Ok(pid) = spec.parse::<i32>() {
            shell
                .jobs
                .jobs()
                .find(|job| job.pids.contains(&pid))
                .map(|job| job.id)
        } else {
            None
        };
        match id {
            Some(id) => status = shell.jobs.wait_for_job(id),
            None => {
                status = 127;
            }
        }
    }
    Ok(status)
}

pub fn handle_disown(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let no_hup = args.iter().any(|a| a == "-h");
    let all = args.iter().any(|a| a == "-a");
    let specs: Vec<&String> = args.iter().filter(|a| !a.starts_with('-')).collect();

    let targets: Vec<usize> = if all || specs.is_empty() {
        if all {
            shell.jobs.jobs().map(|job| job.id).collect()
        } else {
            shell.jobs.current_job().into_iter().collect()
        }
    } else {
        let mut ids = Vec::new();
        for spec in specs {
            match shell.jobs.resolve_spec(spec) {
                Some(id) => ids.push(id),
                None => {
                    write_stderr(&format!(
                        "{}: disown: {}: no such job\n",
                        shell.state.script_name, spec
                    ));
                    return Ok(1);
                }
            }
        }
        ids
    };

    for id in targets {
        if no_hup {
            if let Some(job) = shell.jobs.get_mut(id) {
                job.no_hup = true;
            }
        } else {
            shell.jobs.remove(id);
        }
    }
    Ok(0)
}

pub fn handle_kill(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    if args.first().map(|a| a.as_str()) == Some("-l") {
        for (num, name) in SIGNAL_NAMES {
            write_stdout(&format!("{:>2}) SIG{}\n", num, name));
        }
        return Ok(0);
    }

    let mut signal = Signal::SIGTERM;
    let mut targets = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "-s" {
            i += 1;
            if let Some(TrapTarget::Signal(sig)) =
                args.get(i).and_then(|spec| parse_trap_target(spec))
            {
                if let Ok(sig) = Signal::try_from(sig) {
                    signal = sig;
                }
            }
        } else if let Some(spec) = arg.strip_prefix('-') {
            if !spec.is_empty() && !spec.starts_with('%') && arg.parse::<i32>().is_err() {
                if let Some(TrapTarget::Signal(sig)) = parse_trap_target(spec) {
                    if let Ok(sig) = Signal::try_from(sig) {
                        signal = sig;
                    }
                } else {
                    write_stderr(&format!(
                        "{}: kill: {}: invalid signal specification\n",
                        shell.state.script_name, spec
                    ));
                    return Ok(1);
                }
            } else if let Ok(sig_num) = spec.parse::<i32>() {
                if let Ok(sig) = Signal::try_from(sig_num) {
                    signal = sig;
                }
            }
        } else {
            targets.push(arg.clone());
        }
        i += 1;
    }

    let mut status = 0;
    for target in targets {
        if target.starts_with('%') {
            match shell.jobs.resolve_spec(&target) {
                Some(id) => {
                    let pgid = shell.jobs.get(id).map(|job| job.pgid).unwrap_or(0);
                    if killpg(Pid::from_raw(pgid), signal).is_err() {
                        status = 1;
                    }
                }
                None => {
                    write_stderr(&format!(
                        "{}: kill: {}: no such job\n",
                        shell.state.script_name, target
                    ));
                    status = 1;
                }
            }
        } else {
            match target.parse::<i32>() {
                Ok(pid) => {
                    if kill(Pid::from_raw(pid), signal).is_err() {
                        write_stderr(&format!(
                            "{}: kill: ({}) - no such process\n",
                            shell.state.script_name, pid
                        ));
                        status = 1;
                    }
                }
                Err(_) => {
                    write_stderr(&format!(
                        "{}: kill: {}: arguments must be process or job IDs\n",
                        shell.state.script_name, target
                    ));
                    status = 1;
                }
            }
        }
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disown_removes_job() {
        let mut shell = Shell::new();
        shell
            .jobs
            .add_job(999_999, vec![999_999], "sleep".to_string(), false);
        let id = shell.jobs.current_job().unwrap();
        handle_disown(&mut shell, &[format!("%{}", id)]).unwrap();
        assert!(shell.jobs.get(id).is_none());
    }

    #[test]
    fn disown_h_keeps_job_marked() {
        let mut shell = Shell::new();
        shell
            .jobs
            .add_job(999_998, vec![999_998], "sleep".to_string(), false);
        let id = shell.jobs.current_job().unwrap();
        handle_disown(&mut shell, &["-h".to_string(), format!("%{}", id)]).unwrap();
        assert!(shell.jobs.get(id).unwrap().no_hup);
    }

    #[test]
    fn kill_rejects_garbage() {
        let mut shell = Shell::new();
        assert_eq!(
            handle_kill(&mut shell, &["notapid".to_string()]).unwrap(),
            1
        );
    }
}
