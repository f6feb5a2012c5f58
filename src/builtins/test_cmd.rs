//! test / [ - condition evaluation
//!
//! File tests, string tests, integer comparisons, file-relational
//! operators, and the classic -a / -o / ! / ( ) combinators, evaluated
//! over already-expanded arguments.

use crate::ast::types::{CondBinaryOp, CondUnaryOp};
use crate::core::errors::ExecError;
use crate::exec::conditional::{file_compare, file_test};
use crate::exec::write_stderr;
use crate::shell::Shell;

pub fn handle_test(shell: &mut Shell, name: &str, args: &[String]) -> Result<i32, ExecError> {
    let mut args: Vec<String> = args.to_vec();
    if name == "[" {
        match args.last().map(|s| s.as_str()) {
            Some("]") => {
                args.pop();
            }
            _ => {
                write_stderr(&format!(
                    "{}: [: missing `]'\n",
                    shell.state.script_name
                ));
                return Ok(2);
            }
        }
    }

    let mut parser = TestParser {
        shell,
        args: &args,
        pos: 0,
    };
    match parser.parse_or() {
        Ok(value) => {
            if parser.pos != args.len() {
                write_stderr(&format!(
                    "{}: test: too many arguments\n",
                    parser.shell.state.script_name
                ));
                return Ok(2);
            }
            Ok(if value { 0 } else { 1 })
        }
        Err(message) => {
            write_stderr(&format!(
                "{}: test: {}\n",
                parser.shell.state.script_name, message
            ));
            Ok(2)
        }
    }
}

struct TestParser<'a> {
    shell: &'a mut Shell,
    args: &'a [String],
    pos: usize,
}

impl<'a> TestParser<'a> {
    fn current(&self) -> Option<&str> {
        self.args.get(self.pos).map(|s| s.as_str())
    }

    fn parse_or(&mut self) -> Result<bool, String> {
        let mut left = self.parse_and()?;
        while self.current() == Some("-o") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = left || right;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<bool, String> {
        let mut left = self.parse_term()?;
        while self.current() == Some("-a") {
            self.pos += 1;
            let right = self.parse_term()?;
            left = left && right;
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<bool, String> {
        match self.current() {
            None => Ok(false),
            Some("!") => {
                self.pos += 1;
                // `! )` and a bare trailing ! treat ! as a word.
                if self.current().is_none() {
                    self.pos -= 1;
                    return self.parse_primary();
                }
                Ok(!self.parse_term()?)
            }
            Some("(") => {
                // `( x )` grouping, unless the paren is really an operand.
                if self.args.len() - self.pos >= 2 {
                    self.pos += 1;
                    let value = self.parse_or()?;
                    if self.current() != Some(")") {
                        return Err("expected `)'".to_string());
                    }
                    self.pos += 1;
                    Ok(value)
                } else {
                    self.parse_primary()
                }
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<bool, String> {
        let first = match self.current() {
            Some(first) => first.to_string(),
            None => return Ok(false),
        };

        // Binary operator in second position?
        if let Some(op_text) = self.args.get(self.pos + 1) {
            if let Some(op) = CondBinaryOp::from_str(op_text) {
                if op != CondBinaryOp::Regex {
                    let right = self
                        .args
                        .get(self.pos + 2)
                        .ok_or_else(|| format!("{}: unary operator expected", op_text))?
                        .clone();
                    self.pos += 3;
                    return self.eval_binary(op, &first, &right);
                }
            }
        }

        // Unary operator with operand.
        if let Some(op) = CondUnaryOp::from_str(&first) {
            if let Some(operand) = self.args.get(self.pos + 1) {
                let operand = operand.clone();
                self.pos += 2;
                return Ok(self.eval_unary(op, &operand));
            }
            // A lone operator string is a non-empty word.
            self.pos += 1;
            return Ok(true);
        }

        // Bare word: true when non-empty.
        self.pos += 1;
        Ok(!first.is_empty())
    }

    fn eval_unary(&mut self, op: CondUnaryOp, operand: &str) -> bool {
        match op {
            CondUnaryOp::ZeroLength => operand.is_empty(),
            CondUnaryOp::NonZeroLength => !operand.is_empty(),
            CondUnaryOp::VarSet => self.shell.state.scopes.is_set(operand),
            CondUnaryOp::OptionEnabled => {
                self.shell.state.options.get(operand) == Some(true)
            }
            CondUnaryOp::Terminal => operand
                .parse::<i32>()
                .map(|fd| unsafe { libc::isatty(fd) } == 1)
                .unwrap_or(false),
            _ => file_test(op, operand),
        }
    }

    fn eval_binary(&mut self, op: CondBinaryOp, left: &str, right: &str) -> Result<bool, String> {
        use CondBinaryOp::*;
        match op {
            StrEq => Ok(left == right),
            StrNe => Ok(left != right),
            StrLt => Ok(left < right),
            StrGt => Ok(left > right),
            NumEq | NumNe | NumLt | NumLe | NumGt | NumGe => {
                let l: i64 = left
                    .trim()
                    .parse()
                    .map_err(|_| format!("{}: integer expression expected", left))?;
                let r: i64 = right
                    .trim()
                    .parse()
                    .map_err(|_| format!("{}: integer expression expected", right))?;
                Ok(match op {
                    NumEq => l == r,
                    NumNe => l != r,
                    NumLt => l < r,
                    NumLe => l <= r,
                    NumGt => l > r,
                    NumGe => l >= r,
                    _ => unreachable!(),
                })
            }
            NewerThan | OlderThan | SameFile => Ok(file_compare(op, left, right)),
            Regex => Err("=~: operator not supported by test".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_status(shell: &mut Shell, args: &[&str]) -> i32 {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        handle_test(shell, "test", &args).unwrap()
    }

    #[test]
    fn string_tests() {
        let mut shell = Shell::new();
        assert_eq!(test_status(&mut shell, &["-n", "abc"]), 0);
        assert_eq!(test_status(&mut shell, &["-z", "abc"]), 1);
        assert_eq!(test_status(&mut shell, &["-z", ""]), 0);
        assert_eq!(test_status(&mut shell, &["abc"]), 0);
        assert_eq!(test_status(&mut shell, &[""]), 1);
        assert_eq!(test_status(&mut shell, &[]), 1);
    }

    #[test]
    fn string_comparisons() {
        let mut shell = Shell::new();
        assert_eq!(test_status(&mut shell, &["a", "=", "a"]), 0);
        assert_eq!(test_status(&mut shell, &["a", "!=", "b"]), 0);
        assert_eq!(test_status(&mut shell, &["a", "=", "b"]), 1);
    }

    #[test]
    fn integer_comparisons() {
        let mut shell = Shell::new();
        assert_eq!(test_status(&mut shell, &["3", "-eq", "3"]), 0);
        assert_eq!(test_status(&mut shell, &["3", "-lt", "5"]), 0);
        assert_eq!(test_status(&mut shell, &["5", "-le", "4"]), 1);
        assert_eq!(test_status(&mut shell, &["x", "-eq", "3"]), 2);
    }

    #[test]
    fn negation_and_connectives() {
        let mut shell = Shell::new();
        assert_eq!(test_status(&mut shell, &["!", "-z", "x"]), 0);
        assert_eq!(test_status(&mut shell, &["a", "=", "a", "-a", "b", "=", "b"]), 0);
        assert_eq!(test_status(&mut shell, &["a", "=", "b", "-o", "b", "=", "b"]), 0);
        assert_eq!(test_status(&mut shell, &["a", "=", "b", "-a", "b", "=", "b"]), 1);
    }

    #[test]
    fn bracket_requires_closer() {
        let mut shell = Shell::new();
        let status = handle_test(&mut shell, "[", &["x".to_string()]).unwrap();
        assert_eq!(status, 2);
        let status =
            handle_test(&mut shell, "[", &["x".to_string(), "]".to_string()]).unwrap();
        assert_eq!(status, 0);
    }

    #[test]
    fn file_tests_through_test() {
        let mut shell = Shell::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::File::create(&path).unwrap();
        assert_eq!(test_status(&mut shell, &["-f", path.to_str().unwrap()]), 0);
        assert_eq!(test_status(&mut shell, &["-d", path.to_str().unwrap()]), 1);
        assert_eq!(
            test_status(&mut shell, &["-d", dir.path().to_str().unwrap()]),
            0
        );
    }
}
