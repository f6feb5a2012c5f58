//! read - read a line into variables
//!
//! read [-r] [-p prompt] [-a array] [-d delim] [-n nchars] [vars...]
//!
//! Input comes from fd 0 one byte at a time so nothing beyond the line is
//! consumed. Without -r, backslash escapes quote the next character and a
//! backslash-newline continues the line. Fields split by IFS; the last
//! variable takes the remainder.

use crate::core::errors::ExecError;
use crate::exec::write_stderr;
use crate::shell::Shell;

struct ReadOptions {
    raw: bool,
    prompt: Option<String>,
    array: Option<String>,
    delimiter: u8,
    nchars: Option<usize>,
}

pub fn handle_read(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let mut opts = ReadOptions {
        raw: false,
        prompt: None,
        array: None,
        delimiter: b'\n',
        nchars: None,
    };
    let mut vars: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-r" => opts.raw = true,
            "-p" => {
                i += 1;
                opts.prompt = args.get(i).cloned();
            }
            "-a" => {
                i += 1;
                opts.array = args.get(i).cloned();
            }
            "-d" => {
                i += 1;
                opts.delimiter = args
                    .get(i)
                    .and_then(|d| d.bytes().next())
                    .unwrap_or(b'\0');
            }
            "-n" | "-N" => {
                i += 1;
                opts.nchars = args.get(i).and_then(|n| n.parse().ok());
            }
            "--" => {
                vars.extend(args[i + 1..].iter().cloned());
                break;
            }
            arg => vars.push(arg.to_string()),
        }
        i += 1;
    }

    if let Some(prompt) = &opts.prompt {
        write_stderr(prompt);
    }

    let (line, saw_eof) = read_input(&opts);

    // Marks: (char, escaped) — an escaped char never acts as a separator.
    let marked = if opts.raw {
        line.chars().map(|c| (c, false)).collect::<Vec<_>>()
    } else {
        unescape(&line)
    };

    let ifs = shell.state.ifs();

    if let Some(array_name) = &opts.array {
        let fields = split_marked(&marked, &ifs, usize::MAX);
        shell.state.scopes.unset(array_name).ok();
        for (index, field) in fields.iter().enumerate() {
            shell
                .state
                .scopes
                .set_index(array_name, index as i64, field.clone())?;
        }
        return Ok(if saw_eof { 1 } else { 0 });
    }

    if vars.is_empty() {
        let text: String = marked.iter().map(|(c, _)| *c).collect();
        shell.state.scopes.set_scalar("REPLY", text, false)?;
        return Ok(if saw_eof { 1 } else { 0 });
    }

    let fields = split_marked(&marked, &ifs, vars.len());
    for (i, var) in vars.iter().enumerate() {
        let value = fields.get(i).cloned().unwrap_or_default();
        shell.state.scopes.set_scalar(var, value, false)?;
    }
    Ok(if saw_eof { 1 } else { 0 })
}

/// Read up to the delimiter (or nchars). Returns the text and whether EOF
/// arrived before the delimiter.
fn read_input(opts: &ReadOptions) -> (String, bool) {
    let mut bytes: Vec<u8> = Vec::new();
    let mut buf = [0u8; 1];
    let mut saw_eof = false;
    loop {
        if let Some(n) = opts.nchars {
            if bytes.len() >= n {
                break;
            }
        }
        match nix::unistd::read(0, &mut buf) {
            Ok(0) => {
                saw_eof = true;
                break;
            }
            Ok(_) => {
                if buf[0] == opts.delimiter {
                    break;
                }
                bytes.push(buf[0]);
            }
            Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => {
                saw_eof = true;
                break;
            }
        }
    }
    (String::from_utf8_lossy(&bytes).into_owned(), saw_eof)
}

/// Process backslash escapes: `\X` yields a literally-marked X, and a
/// trailing backslash would have continued the line (the lexer level reads
/// continuations before the delimiter check, so here it just drops).
fn unescape(line: &str) -> Vec<(char, bool)> {
    let mut out = Vec::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push((next, true)),
                None => break,
            }
        } else {
            out.push((c, false));
        }
    }
    out
}

/// IFS split over marked chars; at most `max_fields`, the last taking the
/// remainder with outer IFS whitespace trimmed.
fn split_marked(marked: &[(char, bool)], ifs: &str, max_fields: usize) -> Vec<String> {
    let is_sep = |&(c, escaped): &(char, bool)| !escaped && ifs.contains(c);
    let is_ws_sep =
        |&(c, escaped): &(char, bool)| !escaped && ifs.contains(c) && c.is_whitespace();

    let mut fields: Vec<String> = Vec::new();
    let mut i = 0;
    // Leading IFS whitespace never delimits.
    while i < marked.len() && is_ws_sep(&marked[i]) {
        i += 1;
    }
    while i < marked.len() {
        if fields.len() + 1 == max_fields {
            // Remainder: trim trailing IFS whitespace only.
            let mut end = marked.len();
            while end > i && is_ws_sep(&marked[end - 1]) {
                end -= 1;
            }
            fields.push(marked[i..end].iter().map(|(c, _)| *c).collect());
            return fields;
        }
        let mut field = String::new();
        while i < marked.len() && !is_sep(&marked[i]) {
            field.push(marked[i].0);
            i += 1;
        }
        fields.push(field);
        // Consume one separator plus surrounding whitespace.
        if i < marked.len() {
            let non_ws = !is_ws_sep(&marked[i]);
            i += 1;
            while i < marked.len() && is_ws_sep(&marked[i]) {
                i += 1;
            }
            if non_ws {
                continue;
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marks(s: &str) -> Vec<(char, bool)> {
        s.chars().map(|c| (c, false)).collect()
    }

    #[test]
    fn split_two_vars_remainder() {
        let fields = split_marked(&marks("one two three"), " \t\n", 2);
        assert_eq!(fields, vec!["one", "two three"]);
    }

    #[test]
    fn split_all_fields() {
        let fields = split_marked(&marks("a b c"), " \t\n", usize::MAX);
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn leading_trailing_whitespace_trimmed() {
        let fields = split_marked(&marks("  a b  "), " \t\n", 1);
        assert_eq!(fields, vec!["a b"]);
    }

    #[test]
    fn colon_ifs() {
        let fields = split_marked(&marks("a:b:c"), ":", usize::MAX);
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn escaped_separator_is_literal() {
        let marked = unescape("a\\ b c");
        let fields = split_marked(&marked, " \t\n", usize::MAX);
        assert_eq!(fields, vec!["a b", "c"]);
    }

    #[test]
    fn unescape_drops_backslashes() {
        let marked = unescape("a\\nb");
        let text: String = marked.iter().map(|(c, _)| *c).collect();
        assert_eq!(text, "anb");
    }
}
