//! Shell entry point
//!
//! oxsh [options] [script [args...]]
//! oxsh -c command [name [args...]]
//! oxsh            (interactive when stdin is a terminal)
//!
//! Single-letter options map onto `set` letters; `-o name` selects a long
//! option and `+letter` / `+o name` clears one. Option parsing is by hand:
//! the `+` forms and the option-terminating script operand don't fit a
//! derive-style parser.

use oxsh::parser::ParserMode;
use oxsh::Shell;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut shell = Shell::new();

    let mut command: Option<String> = None;
    let mut force_interactive = false;
    let mut read_stdin = false;
    let mut posix_mode = false;

    let mut i = 1;
    while i < args.len() {
        let arg = args[i].clone();
        match arg.as_str() {
            "-c" => {
                i += 1;
                match args.get(i) {
                    Some(cmd) => command = Some(cmd.clone()),
                    None => {
                        eprintln!("{}: -c: option requires an argument", args[0]);
                        std::process::exit(2);
                    }
                }
            }
            "-o" | "+o" => {
                let enable = arg.starts_with('-');
                i += 1;
                match args.get(i) {
                    Some(name) => {
                        if name == "posix" {
                            posix_mode = enable;
                        }
                        if !shell.state.options.set(name, enable) {
                            eprintln!("{}: {}: invalid option name", args[0], name);
                            std::process::exit(2);
                        }
                    }
                    None => {
                        eprintln!("{}: {}: option requires an argument", args[0], arg);
                        std::process::exit(2);
                    }
                }
            }
            "--" => {
                i += 1;
                break;
            }
            "-s" => read_stdin = true,
            "-i" => force_interactive = true,
            _ if arg.starts_with('-') && arg.len() > 1 => {
                for letter in arg[1..].chars() {
                    match letter {
                        'i' => force_interactive = true,
                        's' => read_stdin = true,
                        _ => {
                            if !shell.state.options.set_letter(letter, true) {
                                eprintln!("{}: -{}: invalid option", args[0], letter);
                                std::process::exit(2);
                            }
                        }
                    }
                }
            }
            _ if arg.starts_with('+') && arg.len() > 1 => {
                for letter in arg[1..].chars() {
                    if !shell.state.options.set_letter(letter, false) {
                        eprintln!("{}: +{}: invalid option", args[0], letter);
                        std::process::exit(2);
                    }
                }
            }
            _ => break,
        }
        i += 1;
    }

    if posix_mode {
        shell.parser_mode = ParserMode::Posix;
    }

    let operands: Vec<String> = args[i..].to_vec();

    let status = if let Some(command) = command {
        shell.init_noninteractive();
        let name = operands.first().cloned();
        let positional = if operands.len() > 1 {
            operands[1..].to_vec()
        } else {
            Vec::new()
        };
        shell.run_command_string(&command, name, positional)
    } else if !operands.is_empty() && !read_stdin {
        shell.init_noninteractive();
        let script = operands[0].clone();
        let positional = operands[1..].to_vec();
        shell.run_script_file(&script, positional)
    } else if force_interactive || unsafe { libc::isatty(0) } == 1 {
        shell.init_interactive();
        let status = shell.interactive_loop();
        std::process::exit(status & 0xff);
    } else {
        // Non-interactive stdin: read the whole script.
        shell.init_noninteractive();
        let mut source = String::new();
        use std::io::Read;
        if std::io::stdin().read_to_string(&mut source).is_err() {
            std::process::exit(1);
        }
        shell.state.positional = operands;
        let status = shell.run_source(&source);
        shell.exit_requested.unwrap_or(status)
    };

    shell.run_exit_trap();
    std::process::exit(status & 0xff);
}
