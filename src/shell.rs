//! Shell Façade
//!
//! Owns the state, job table, and trap table, and provides the entry
//! points: script files, `-c` strings, and the interactive loop with
//! PS1/PS2 continuation on incomplete input.

use crate::core::errors::ExecError;
use crate::core::state::ShellState;
use crate::exec::context::ExecContext;
use crate::exec::control_flow::read_line_fd0;
use crate::exec::{write_stderr};
use crate::jobs::JobManager;
use crate::parser::types::ParserMode;
use crate::parser::Parser;
use crate::traps::TrapManager;

pub struct Shell {
    pub state: ShellState,
    pub jobs: JobManager,
    pub traps: TrapManager,
    /// Aliases currently being expanded (recursion guard).
    pub expanding_aliases: Vec<String>,
    /// Parent-side process-substitution fds, closed per command.
    pub procsub_fds: Vec<i32>,
    pub parser_mode: ParserMode,
    /// Set when `exit` (or a fatal error) asks the shell to stop.
    pub exit_requested: Option<i32>,
    /// getopts position-within-word and its OPTIND at last call.
    pub getopts_offset: usize,
    pub getopts_optind: usize,
    /// A trap action is running; suppresses nested trap delivery.
    pub in_trap: bool,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    pub fn new() -> Self {
        Shell {
            state: ShellState::new(),
            jobs: JobManager::new(),
            traps: TrapManager::new(),
            expanding_aliases: Vec::new(),
            procsub_fds: Vec::new(),
            parser_mode: ParserMode::Bash,
            exit_requested: None,
            getopts_offset: 1,
            getopts_optind: 1,
            in_trap: false,
        }
    }

    /// Interactive setup: claim the terminal, install dispositions.
    pub fn init_interactive(&mut self) {
        self.state.is_interactive = true;
        self.state.options.monitor = true;
        crate::jobs::signals::install_shell_handlers(true);
        self.jobs.init_job_control();
    }

    pub fn init_noninteractive(&mut self) {
        crate::jobs::signals::install_shell_handlers(false);
    }

    /// Parse and execute a source string. Parse errors report and yield
    /// status 2; runtime errors report per the error taxonomy.
    pub fn run_source(&mut self, source: &str) -> i32 {
        let mut parser = Parser::new(self.parser_mode);
        let script = match parser.parse(source) {
            Ok(script) => script,
            Err(err) => {
                write_stderr(&format!("{}: {}\n", self.state.script_name, err));
                self.state.last_exit_code = 2;
                return 2;
            }
        };
        if self.parser_mode == ParserMode::Permissive {
            for err in &parser.errors {
                write_stderr(&format!("{}: {}\n", self.state.script_name, err));
            }
        }
        match self.exec_script(&script, ExecContext::default()) {
            Ok(status) => status,
            Err(ExecError::Exit(code)) => {
                self.exit_requested = Some(code);
                code
            }
            Err(ExecError::PosixFatal(code)) => {
                self.exit_requested = Some(code);
                code
            }
            Err(err) => {
                let status = self.report_error(&err);
                if !self.state.is_interactive {
                    // Unbound variables and expansion failures abort a
                    // non-interactive shell.
                    if matches!(err, ExecError::Unbound(_) | ExecError::Expansion { .. }) {
                        self.exit_requested = Some(status);
                    }
                }
                self.state.last_exit_code = status;
                status
            }
        }
    }

    /// Run a script file with arguments.
    pub fn run_script_file(&mut self, path: &str, args: Vec<String>) -> i32 {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                write_stderr(&format!("{}: {}: {}\n", self.state.script_name, path, err));
                return 127;
            }
        };
        self.state.script_name = path.to_string();
        self.state.positional = args;
        let status = self.run_source(&source);
        self.exit_requested.unwrap_or(status)
    }

    /// `-c command` mode.
    pub fn run_command_string(&mut self, command: &str, name: Option<String>, args: Vec<String>) -> i32 {
        if let Some(name) = name {
            self.state.script_name = name;
        }
        self.state.positional = args;
        let status = self.run_source(command);
        self.exit_requested.unwrap_or(status)
    }

    /// Read-eval loop: PS1 before each command, PS2 while a construct is
    /// open, EOF exits unless ignoreeof.
    pub fn interactive_loop(&mut self) -> i32 {
        let mut eof_warnings = 0;
        loop {
            self.run_pending_traps();
            for note in self.jobs.take_notifications() {
                write_stderr(&format!("{}\n", note));
            }

            let ps1 = self
                .state
                .scopes
                .get_string("PS1")
                .unwrap_or_else(|| "$ ".to_string());
            write_stderr(&ps1);

            let mut buffer = match read_line_fd0() {
                Some(line) => line,
                None => {
                    if self.state.options.ignoreeof && eof_warnings < 10 {
                        eof_warnings += 1;
                        write_stderr("Use \"exit\" to leave the shell.\n");
                        continue;
                    }
                    break;
                }
            };
            eof_warnings = 0;

            // Keep reading with PS2 while the parse is incomplete.
            loop {
                crate::jobs::signals::take_sigint();
                match Parser::new(self.parser_mode).parse(&buffer) {
                    Err(err) if err.incomplete => {
                        let ps2 = self
                            .state
                            .scopes
                            .get_string("PS2")
                            .unwrap_or_else(|| "> ".to_string());
                        write_stderr(&ps2);
                        match read_line_fd0() {
                            Some(line) => {
                                buffer.push('\n');
                                buffer.push_str(&line);
                            }
                            None => break,
                        }
                    }
                    _ => break,
                }
            }

            if buffer.trim().is_empty() {
                continue;
            }
            if self.state.options.verbose {
                write_stderr(&format!("{}\n", buffer));
            }
            self.run_source(&buffer);
            if self.exit_requested.is_some() {
                break;
            }
        }
        let status = self.exit_requested.unwrap_or(self.state.last_exit_code);
        self.run_exit_trap();
        status
    }

    /// Run the EXIT trap once.
    pub fn run_exit_trap(&mut self) {
        if let Some(action) = self.traps.exit_action() {
            self.traps.reset(crate::traps::TrapTarget::Exit);
            self.run_trap_action(&action);
        }
    }
}
