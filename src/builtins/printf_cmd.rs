//! printf - formatted output
//!
//! printf format [args...]
//!
//! The format string is reused until the arguments run out; conversions
//! cover %s %d %i %o %x %X %c %% with optional `-`, zero-pad, width, and
//! precision.

use crate::core::errors::ExecError;
use crate::exec::{write_stderr, write_stdout};
use crate::shell::Shell;

pub fn handle_printf(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let format = match args.first() {
        Some(format) => format.clone(),
        None => {
            write_stderr(&format!(
                "{}: printf: usage: printf format [arguments]\n",
                shell.state.script_name
            ));
            return Ok(2);
        }
    };

    let mut rest: &[String] = &args[1..];
    let mut out = String::new();
    loop {
        let consumed = render(&format, rest, &mut out);
        if consumed == 0 || consumed >= rest.len() {
            break;
        }
        rest = &rest[consumed..];
    }
    write_stdout(&out);
    Ok(0)
}

/// Render one pass of the format; returns how many arguments it used.
fn render(format: &str, args: &[String], out: &mut String) -> usize {
    let chars: Vec<char> = format.chars().collect();
    let mut used = 0;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                let (text, _) = super::echo_cmd::process_escapes(
                    &chars[i..i + 2].iter().collect::<String>(),
                );
                out.push_str(&text);
                i += 2;
            }
            '%' => {
                i += 1;
                if chars.get(i) == Some(&'%') {
                    out.push('%');
                    i += 1;
                    continue;
                }
                // flags / width / precision
                let mut left = false;
                let mut zero = false;
                while matches!(chars.get(i), Some('-') | Some('0') | Some('+') | Some(' ')) {
                    match chars[i] {
                        '-' => left = true,
                        '0' => zero = true,
                        _ => {}
                    }
                    i += 1;
                }
                let mut width = 0usize;
                while chars.get(i).map(|c| c.is_ascii_digit()) == Some(true) {
                    width = width * 10 + chars[i].to_digit(10).unwrap() as usize;
                    i += 1;
                }
                let mut precision: Option<usize> = None;
                if chars.get(i) == Some(&'.') {
                    i += 1;
                    let mut p = 0usize;
                    while chars.get(i).map(|c| c.is_ascii_digit()) == Some(true) {
                        p = p * 10 + chars[i].to_digit(10).unwrap() as usize;
                        i += 1;
                    }
                    precision = Some(p);
                }
                let conv = match chars.get(i) {
                    Some(c) => *c,
                    None => break,
                };
                i += 1;

                let arg = args.get(used).map(|s| s.as_str()).unwrap_or("");
                if used < args.len() {
                    used += 1;
                } else if !args.is_empty() {
                    used += 1;
                }
                let rendered = convert(conv, arg, precision);
                out.push_str(&pad(&rendered, width, left, zero && !left));
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    used
}

fn convert(conv: char, arg: &str, precision: Option<usize>) -> String {
    match conv {
        's' => {
            let mut s = arg.to_string();
            if let Some(p) = precision {
                s.truncate(p);
            }
            s
        }
        'd' | 'i' => parse_int(arg).to_string(),
        'o' => format!("{:o}", parse_int(arg)),
        'x' => format!("{:x}", parse_int(arg)),
        'X' => format!("{:X}", parse_int(arg)),
        'u' => (parse_int(arg).max(0)).to_string(),
        'c' => arg.chars().next().map(String::from).unwrap_or_default(),
        'b' => super::echo_cmd::process_escapes(arg).0,
        'q' => format!("'{}'", arg.replace('\'', "'\\''")),
        other => format!("%{}", other),
    }
}

fn parse_int(arg: &str) -> i64 {
    let trimmed = arg.trim();
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).unwrap_or(0);
    }
    trimmed.parse::<i64>().unwrap_or(0)
}

fn pad(text: &str, width: usize, left: bool, zero: bool) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let fill = width - len;
    if left {
        format!("{}{}", text, " ".repeat(fill))
    } else if zero {
        // The sign stays in front of the zeros.
        if let Some(rest) = text.strip_prefix('-') {
            format!("-{}{}", "0".repeat(fill), rest)
        } else {
            format!("{}{}", "0".repeat(fill), text)
        }
    } else {
        format!("{}{}", " ".repeat(fill), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(format: &str, args: &[&str]) -> String {
        let mut out = String::new();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut rest: &[String] = &args;
        loop {
            let used = render(format, rest, &mut out);
            if used == 0 || used >= rest.len() {
                break;
            }
            rest = &rest[used..];
        }
        out
    }

    #[test]
    fn basic_conversions() {
        assert_eq!(run("%s-%s", &["a", "b"]), "a-b");
        assert_eq!(run("%d", &["42"]), "42");
        assert_eq!(run("%x", &["255"]), "ff");
        assert_eq!(run("%o", &["8"]), "10");
        assert_eq!(run("%%", &[]), "%");
    }

    #[test]
    fn width_and_alignment() {
        assert_eq!(run("%5d", &["42"]), "   42");
        assert_eq!(run("%-5d|", &["42"]), "42   |");
        assert_eq!(run("%05d", &["42"]), "00042");
        assert_eq!(run("%05d", &["-42"]), "-0042");
    }

    #[test]
    fn precision_truncates_strings() {
        assert_eq!(run("%.3s", &["hello"]), "hel");
    }

    #[test]
    fn format_reuses_for_extra_args() {
        assert_eq!(run("<%s>", &["x", "y", "z"]), "<x><y><z>");
    }

    #[test]
    fn escapes_in_format() {
        assert_eq!(run("a\\tb", &[]), "a\tb");
    }
}
