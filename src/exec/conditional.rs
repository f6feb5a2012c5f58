//! Conditional Evaluation
//!
//! `[[ ... ]]` execution: file tests, string and numeric comparisons,
//! pattern matching for `==`/`!=`, and `=~` with capture groups recorded
//! in the REMATCH array. The file-test helpers are shared with the `test`
//! builtin.

use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};

use regex_lite::RegexBuilder;

use crate::ast::types::{CondBinaryOp, CondExpr, CondUnaryOp, ConditionalCommandNode};
use crate::core::errors::ExecError;
use crate::expansion::pattern::{match_pattern, MatchOptions};
use crate::expansion::{expand_word_pattern, expand_word_raw};
use crate::shell::Shell;

impl Shell {
    /// `[[ expr ]]` — 0 when true, 1 when false, 2 on expression errors.
    pub fn exec_conditional(&mut self, node: &ConditionalCommandNode) -> Result<i32, ExecError> {
        match self.eval_cond(&node.expression) {
            Ok(true) => Ok(0),
            Ok(false) => Ok(1),
            Err(err) => {
                crate::exec::write_stderr(&format!("{}: {}\n", self.state.script_name, err));
                Ok(2)
            }
        }
    }

    fn eval_cond(&mut self, expr: &CondExpr) -> Result<bool, ExecError> {
        match expr {
            CondExpr::Word(word) => {
                let value = expand_word_raw(self, word)?;
                Ok(!value.is_empty())
            }
            CondExpr::Not(inner) => Ok(!self.eval_cond(inner)?),
            CondExpr::And(left, right) => {
                Ok(self.eval_cond(left)? && self.eval_cond(right)?)
            }
            CondExpr::Or(left, right) => {
                Ok(self.eval_cond(left)? || self.eval_cond(right)?)
            }
            CondExpr::Unary { op, operand } => {
                let operand = expand_word_raw(self, operand)?;
                self.eval_cond_unary(*op, &operand)
            }
            CondExpr::Binary { op, left, right } => self.eval_cond_binary(*op, left, right),
        }
    }

    fn eval_cond_unary(&mut self, op: CondUnaryOp, operand: &str) -> Result<bool, ExecError> {
        Ok(match op {
            CondUnaryOp::ZeroLength => operand.is_empty(),
            CondUnaryOp::NonZeroLength => !operand.is_empty(),
            CondUnaryOp::VarSet => self.state.scopes.is_set(operand),
            CondUnaryOp::OptionEnabled => {
                self.state.options.get(operand) == Some(true)
            }
            CondUnaryOp::Terminal => operand
                .parse::<i32>()
                .map(|fd| unsafe { libc::isatty(fd) } == 1)
                .unwrap_or(false),
            _ => file_test(op, operand),
        })
    }

    fn eval_cond_binary(
        &mut self,
        op: CondBinaryOp,
        left: &crate::ast::types::WordNode,
        right: &crate::ast::types::WordNode,
    ) -> Result<bool, ExecError> {
        use CondBinaryOp::*;
        match op {
            StrEq | StrNe => {
                let value = expand_word_raw(self, left)?;
                let pattern = expand_word_pattern(self, right)?;
                let matched = match_pattern(
                    &pattern,
                    &value,
                    MatchOptions {
                        extglob: self.state.shopt.extglob,
                        nocase: self.state.shopt.nocasematch,
                    },
                );
                Ok(if op == StrEq { matched } else { !matched })
            }
            Regex => {
                let value = expand_word_raw(self, left)?;
                let pattern = expand_word_raw(self, right)?;
                let re = RegexBuilder::new(&pattern)
                    .case_insensitive(self.state.shopt.nocasematch)
                    .build()
                    .map_err(|e| ExecError::expansion(format!("invalid regex: {}", e)))?;
                match re.captures(&value) {
                    Some(caps) => {
                        self.state.rematch = caps
                            .iter()
                            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                            .collect();
                        Ok(true)
                    }
                    None => {
                        self.state.rematch.clear();
                        Ok(false)
                    }
                }
            }
            StrLt | StrGt => {
                let l = expand_word_raw(self, left)?;
                let r = expand_word_raw(self, right)?;
                Ok(if op == StrLt { l < r } else { l > r })
            }
            NumEq | NumNe | NumLt | NumLe | NumGt | NumGe => {
                let l_text = expand_word_raw(self, left)?;
                let r_text = expand_word_raw(self, right)?;
                let l = crate::arith::eval_arith_string(&mut self.state, &l_text)?;
                let r = crate::arith::eval_arith_string(&mut self.state, &r_text)?;
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
            NewerThan | OlderThan | SameFile => {
                let l = expand_word_raw(self, left)?;
                let r = expand_word_raw(self, right)?;
                Ok(file_compare(op, &l, &r))
            }
        }
    }
}

/// File tests shared by `[[ ]]` and `test`/`[`.
pub fn file_test(op: CondUnaryOp, path: &str) -> bool {
    use CondUnaryOp::*;
    let symlink_meta = std::fs::symlink_metadata(path);
    let meta = std::fs::metadata(path);
    match op {
        Exists => meta.is_ok(),
        RegularFile => meta.map(|m| m.is_file()).unwrap_or(false),
        Directory => meta.map(|m| m.is_dir()).unwrap_or(false),
        Symlink => symlink_meta.map(|m| m.file_type().is_symlink()).unwrap_or(false),
        NamedPipe => meta.map(|m| m.file_type().is_fifo()).unwrap_or(false),
        Socket => meta.map(|m| m.file_type().is_socket()).unwrap_or(false),
        BlockSpecial => meta.map(|m| m.file_type().is_block_device()).unwrap_or(false),
        CharSpecial => meta.map(|m| m.file_type().is_char_device()).unwrap_or(false),
        NonEmptyFile => meta.map(|m| m.len() > 0).unwrap_or(false),
        SetUid => meta.map(|m| m.permissions().mode() & 0o4000 != 0).unwrap_or(false),
        SetGid => meta.map(|m| m.permissions().mode() & 0o2000 != 0).unwrap_or(false),
        Sticky => meta.map(|m| m.permissions().mode() & 0o1000 != 0).unwrap_or(false),
        Readable => nix::unistd::access(path, nix::unistd::AccessFlags::R_OK).is_ok(),
        Writable => nix::unistd::access(path, nix::unistd::AccessFlags::W_OK).is_ok(),
        Executable => nix::unistd::access(path, nix::unistd::AccessFlags::X_OK).is_ok(),
        OwnedByEuid => meta
            .map(|m| m.uid() == nix::unistd::Uid::effective().as_raw())
            .unwrap_or(false),
        OwnedByEgid => meta
            .map(|m| m.gid() == nix::unistd::Gid::effective().as_raw())
            .unwrap_or(false),
        ZeroLength | NonZeroLength | OptionEnabled | VarSet | Terminal => false,
    }
}

/// -nt / -ot / -ef comparisons.
pub fn file_compare(op: CondBinaryOp, left: &str, right: &str) -> bool {
    let l = std::fs::metadata(left);
    let r = std::fs::metadata(right);
    match op {
        CondBinaryOp::NewerThan => match (l, r) {
            (Ok(l), Ok(r)) => l.mtime() > r.mtime() || (l.mtime() == r.mtime() && l.mtime_nsec() > r.mtime_nsec()),
            (Ok(_), Err(_)) => true,
            _ => false,
        },
        CondBinaryOp::OlderThan => match (l, r) {
            (Ok(l), Ok(r)) => l.mtime() < r.mtime() || (l.mtime() == r.mtime() && l.mtime_nsec() < r.mtime_nsec()),
            (Err(_), Ok(_)) => true,
            _ => false,
        },
        CondBinaryOp::SameFile => match (l, r) {
            (Ok(l), Ok(r)) => l.dev() == r.dev() && l.ino() == r.ino(),
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_tests_on_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe");
        let path_str = path.to_str().unwrap();
        assert!(!file_test(CondUnaryOp::Exists, path_str));
        let mut f = std::fs::File::create(&path).unwrap();
        assert!(file_test(CondUnaryOp::Exists, path_str));
        assert!(file_test(CondUnaryOp::RegularFile, path_str));
        assert!(!file_test(CondUnaryOp::Directory, path_str));
        assert!(!file_test(CondUnaryOp::NonEmptyFile, path_str));
        f.write_all(b"data").unwrap();
        f.flush().unwrap();
        assert!(file_test(CondUnaryOp::NonEmptyFile, path_str));
        assert!(file_test(CondUnaryOp::Directory, dir.path().to_str().unwrap()));
    }

    #[test]
    fn same_file_detection() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        std::fs::File::create(&a).unwrap();
        let b = dir.path().join("b");
        std::fs::hard_link(&a, &b).unwrap();
        assert!(file_compare(
            CondBinaryOp::SameFile,
            a.to_str().unwrap(),
            b.to_str().unwrap()
        ));
    }
}
