//! Arithmetic Evaluator
//!
//! Evaluates the arithmetic AST with C-style semantics on 64-bit signed
//! integers: wrap-around on overflow, truncated division, shift counts
//! masked to `& 63`, short-circuiting `&&`/`||`, comma sequencing, and
//! assignments that mutate variables in their resolved scope.
//!
//! Non-numeric variable values are themselves evaluated as arithmetic,
//! recursively, with a depth cap instead of a host stack overflow.

use crate::ast::types::{
    ArithAssignOp, ArithBinaryOp, ArithExpr, ArithTarget, ArithUnaryOp,
};
use crate::core::errors::ArithError;
use crate::core::state::ShellState;
use crate::parser::arith_parser::parse_arith;

const MAX_VALUE_RECURSION: usize = 64;

/// Evaluate an arithmetic expression against the shell's scope chain.
pub fn eval_arith(state: &mut ShellState, expr: &ArithExpr) -> Result<i64, ArithError> {
    eval(state, expr, 0)
}

/// Parse and evaluate arithmetic text (integer-attribute assignments,
/// substring operands, `let`).
pub fn eval_arith_string(state: &mut ShellState, text: &str) -> Result<i64, ArithError> {
    let expr = parse_arith(text)?;
    eval(state, &expr, 0)
}

fn eval(state: &mut ShellState, expr: &ArithExpr, depth: usize) -> Result<i64, ArithError> {
    if depth > MAX_VALUE_RECURSION {
        return Err(ArithError::TooDeep);
    }
    match expr {
        ArithExpr::Number(n) => Ok(*n),
        ArithExpr::Var(name) => read_variable(state, name, depth),
        ArithExpr::Element { name, index } => {
            let index = eval(state, index, depth + 1)?;
            let value = state
                .scopes
                .get(name)
                .and_then(|var| var.index_get(index))
                .unwrap_or_default();
            resolve_numeric(state, &value, depth + 1)
        }
        ArithExpr::AssocElement { name, key } => {
            let value = match state.scopes.get(name) {
                Some(var) => match &var.value {
                    crate::core::variables::VarValue::Assoc(map) => {
                        map.get(key).cloned().unwrap_or_default()
                    }
                    _ => {
                        // A bare-word subscript on an indexed array is a
                        // variable reference.
                        let index = read_variable(state, key, depth + 1)?;
                        state
                            .scopes
                            .get(name)
                            .and_then(|v| v.index_get(index))
                            .unwrap_or_default()
                    }
                },
                None => String::new(),
            };
            resolve_numeric(state, &value, depth + 1)
        }
        ArithExpr::Unary { op, operand } => {
            let value = eval(state, operand, depth + 1)?;
            Ok(match op {
                ArithUnaryOp::Negate => value.wrapping_neg(),
                ArithUnaryOp::Plus => value,
                ArithUnaryOp::Not => i64::from(value == 0),
                ArithUnaryOp::BitNot => !value,
            })
        }
        ArithExpr::IncrDecr {
            target,
            increment,
            prefix,
        } => {
            let old = read_target(state, target, depth + 1)?;
            let new = if *increment {
                old.wrapping_add(1)
            } else {
                old.wrapping_sub(1)
            };
            write_target(state, target, new, depth + 1)?;
            Ok(if *prefix { new } else { old })
        }
        ArithExpr::Binary { op, left, right } => match op {
            ArithBinaryOp::LogicalAnd => {
                if eval(state, left, depth + 1)? == 0 {
                    Ok(0)
                } else {
                    Ok(i64::from(eval(state, right, depth + 1)? != 0))
                }
            }
            ArithBinaryOp::LogicalOr => {
                if eval(state, left, depth + 1)? != 0 {
                    Ok(1)
                } else {
                    Ok(i64::from(eval(state, right, depth + 1)? != 0))
                }
            }
            ArithBinaryOp::Comma => {
                eval(state, left, depth + 1)?;
                eval(state, right, depth + 1)
            }
            _ => {
                let l = eval(state, left, depth + 1)?;
                let r = eval(state, right, depth + 1)?;
                apply_binary(*op, l, r)
            }
        },
        ArithExpr::Ternary {
            condition,
            consequent,
            alternate,
        } => {
            if eval(state, condition, depth + 1)? != 0 {
                eval(state, consequent, depth + 1)
            } else {
                eval(state, alternate, depth + 1)
            }
        }
        ArithExpr::Assign { op, target, value } => {
            let rhs = eval(state, value, depth + 1)?;
            let new = match op {
                ArithAssignOp::Assign => rhs,
                _ => {
                    let current = read_target(state, target, depth + 1)?;
                    apply_binary(assign_binary_op(*op), current, rhs)?
                }
            };
            write_target(state, target, new, depth + 1)?;
            Ok(new)
        }
    }
}

fn assign_binary_op(op: ArithAssignOp) -> ArithBinaryOp {
    match op {
        ArithAssignOp::Assign => unreachable!("plain assignment has no binary op"),
        ArithAssignOp::Add => ArithBinaryOp::Add,
        ArithAssignOp::Sub => ArithBinaryOp::Sub,
        ArithAssignOp::Mul => ArithBinaryOp::Mul,
        ArithAssignOp::Div => ArithBinaryOp::Div,
        ArithAssignOp::Mod => ArithBinaryOp::Mod,
        ArithAssignOp::ShiftLeft => ArithBinaryOp::ShiftLeft,
        ArithAssignOp::ShiftRight => ArithBinaryOp::ShiftRight,
        ArithAssignOp::And => ArithBinaryOp::BitAnd,
        ArithAssignOp::Or => ArithBinaryOp::BitOr,
        ArithAssignOp::Xor => ArithBinaryOp::BitXor,
    }
}

fn apply_binary(op: ArithBinaryOp, left: i64, right: i64) -> Result<i64, ArithError> {
    Ok(match op {
        ArithBinaryOp::Add => left.wrapping_add(right),
        ArithBinaryOp::Sub => left.wrapping_sub(right),
        ArithBinaryOp::Mul => left.wrapping_mul(right),
        ArithBinaryOp::Div => {
            if right == 0 {
                return Err(ArithError::DivideByZero);
            }
            left.wrapping_div(right)
        }
        ArithBinaryOp::Mod => {
            if right == 0 {
                return Err(ArithError::DivideByZero);
            }
            left.wrapping_rem(right)
        }
        ArithBinaryOp::Pow => {
            if right < 0 {
                return Err(ArithError::NegativeExponent);
            }
            if right > 63 {
                return Err(ArithError::ExponentTooLarge);
            }
            left.wrapping_pow(right as u32)
        }
        ArithBinaryOp::ShiftLeft => left.wrapping_shl((right & 63) as u32),
        ArithBinaryOp::ShiftRight => left.wrapping_shr((right & 63) as u32),
        ArithBinaryOp::Lt => i64::from(left < right),
        ArithBinaryOp::Le => i64::from(left <= right),
        ArithBinaryOp::Gt => i64::from(left > right),
        ArithBinaryOp::Ge => i64::from(left >= right),
        ArithBinaryOp::Eq => i64::from(left == right),
        ArithBinaryOp::Ne => i64::from(left != right),
        ArithBinaryOp::BitAnd => left & right,
        ArithBinaryOp::BitOr => left | right,
        ArithBinaryOp::BitXor => left ^ right,
        ArithBinaryOp::LogicalAnd | ArithBinaryOp::LogicalOr | ArithBinaryOp::Comma => {
            unreachable!("handled with short-circuit evaluation")
        }
    })
}

/// Variables with special arithmetic meaning, then the scope chain.
fn read_variable(state: &mut ShellState, name: &str, depth: usize) -> Result<i64, ArithError> {
    match name {
        "?" => return Ok(state.last_exit_code as i64),
        "#" => return Ok(state.positional.len() as i64),
        "$" => return Ok(std::process::id() as i64),
        "!" => return Ok(state.last_background_pid.unwrap_or(0) as i64),
        "RANDOM" => return Ok((rand::random::<u16>() % 32768) as i64),
        "SECONDS" => return Ok(state.seconds() as i64),
        "LINENO" => return Ok(state.current_line as i64),
        _ => {}
    }
    if let Ok(n) = name.parse::<usize>() {
        let value = state.positional_get(n).unwrap_or_default();
        return resolve_numeric(state, &value, depth + 1);
    }
    let value = state.scopes.get_string(name).unwrap_or_default();
    resolve_numeric(state, &value, depth + 1)
}

/// Turn a variable's string value into an integer: empty is 0, a plain
/// literal parses directly, anything else is evaluated as an expression.
fn resolve_numeric(state: &mut ShellState, value: &str, depth: usize) -> Result<i64, ArithError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n);
    }
    if depth > MAX_VALUE_RECURSION {
        return Err(ArithError::TooDeep);
    }
    let expr = parse_arith(trimmed)?;
    eval(state, &expr, depth + 1)
}

fn read_target(state: &mut ShellState, target: &ArithTarget, depth: usize) -> Result<i64, ArithError> {
    match target {
        ArithTarget::Var(name) => read_variable(state, name, depth),
        ArithTarget::Element { name, index } => {
            let index = eval(state, index, depth + 1)?;
            let value = state
                .scopes
                .get(name)
                .and_then(|var| var.index_get(index))
                .unwrap_or_default();
            resolve_numeric(state, &value, depth + 1)
        }
        ArithTarget::AssocElement { name, key } => {
            let var = state.scopes.get(name).cloned();
            let value = match &var {
                Some(var) => match &var.value {
                    crate::core::variables::VarValue::Assoc(map) => {
                        map.get(key).cloned().unwrap_or_default()
                    }
                    _ => var.index_get(read_variable(state, key, depth + 1)?).unwrap_or_default(),
                },
                None => String::new(),
            };
            resolve_numeric(state, &value, depth + 1)
        }
    }
}

fn write_target(state: &mut ShellState, target: &ArithTarget, value: i64, depth: usize) -> Result<(), ArithError> {
    let result = match target {
        ArithTarget::Var(name) => state.scopes.set_scalar(name, value.to_string(), false),
        ArithTarget::Element { name, index } => {
            let index = eval(state, index, depth + 1)?;
            state.scopes.set_index(name, index, value.to_string())
        }
        ArithTarget::AssocElement { name, key } => {
            let is_assoc = matches!(
                state.scopes.get(name).map(|v| &v.value),
                Some(crate::core::variables::VarValue::Assoc(_))
            );
            if is_assoc {
                state.scopes.set_assoc(name, key, value.to_string())
            } else {
                let index = read_variable(state, key, depth + 1)?;
                state.scopes.set_index(name, index, value.to_string())
            }
        }
    };
    result.map_err(|e| ArithError::Syntax(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(state: &mut ShellState, s: &str) -> Result<i64, ArithError> {
        eval_arith_string(state, s)
    }

    #[test]
    fn basic_arithmetic() {
        let mut state = ShellState::new();
        assert_eq!(eval_str(&mut state, "2 + 3 * 4"), Ok(14));
        assert_eq!(eval_str(&mut state, "(2 + 3) * 4"), Ok(20));
        assert_eq!(eval_str(&mut state, "7 / 2"), Ok(3));
        assert_eq!(eval_str(&mut state, "-7 / 2"), Ok(-3));
        assert_eq!(eval_str(&mut state, "7 % 3"), Ok(1));
    }

    #[test]
    fn division_by_zero() {
        let mut state = ShellState::new();
        assert_eq!(eval_str(&mut state, "1 / 0"), Err(ArithError::DivideByZero));
        assert_eq!(eval_str(&mut state, "1 % 0"), Err(ArithError::DivideByZero));
    }

    #[test]
    fn power_rules() {
        let mut state = ShellState::new();
        assert_eq!(eval_str(&mut state, "2 ** 10"), Ok(1024));
        assert_eq!(
            eval_str(&mut state, "2 ** -1"),
            Err(ArithError::NegativeExponent)
        );
        assert_eq!(
            eval_str(&mut state, "2 ** 64"),
            Err(ArithError::ExponentTooLarge)
        );
    }

    #[test]
    fn shift_masking() {
        let mut state = ShellState::new();
        assert_eq!(eval_str(&mut state, "1 << 64"), Ok(1));
        assert_eq!(eval_str(&mut state, "1 << 65"), Ok(2));
        assert_eq!(eval_str(&mut state, "-8 >> 1"), Ok(-4));
    }

    #[test]
    fn unset_variable_is_zero() {
        let mut state = ShellState::new();
        assert_eq!(eval_str(&mut state, "nosuch + 1"), Ok(1));
    }

    #[test]
    fn variable_values_recurse() {
        let mut state = ShellState::new();
        state.scopes.set_scalar("y", "2", false).unwrap();
        state.scopes.set_scalar("x", "y + 1", false).unwrap();
        assert_eq!(eval_str(&mut state, "x"), Ok(3));
    }

    #[test]
    fn self_referential_value_hits_depth_cap() {
        let mut state = ShellState::new();
        state.scopes.set_scalar("x", "x + 1", false).unwrap();
        assert_eq!(eval_str(&mut state, "x"), Err(ArithError::TooDeep));
    }

    #[test]
    fn assignment_mutates_scope() {
        let mut state = ShellState::new();
        assert_eq!(eval_str(&mut state, "x = 5"), Ok(5));
        assert_eq!(state.scopes.get_string("x"), Some("5".to_string()));
        assert_eq!(eval_str(&mut state, "x += 3"), Ok(8));
        assert_eq!(state.scopes.get_string("x"), Some("8".to_string()));
    }

    #[test]
    fn comma_keeps_side_effects() {
        let mut state = ShellState::new();
        assert_eq!(eval_str(&mut state, "x = 3, y = 4, x + y"), Ok(7));
        assert_eq!(state.scopes.get_string("x"), Some("3".to_string()));
        assert_eq!(state.scopes.get_string("y"), Some("4".to_string()));
    }

    #[test]
    fn increments_pre_and_post() {
        let mut state = ShellState::new();
        state.scopes.set_scalar("i", "5", false).unwrap();
        assert_eq!(eval_str(&mut state, "i++"), Ok(5));
        assert_eq!(state.scopes.get_string("i"), Some("6".to_string()));
        assert_eq!(eval_str(&mut state, "++i"), Ok(7));
        assert_eq!(eval_str(&mut state, "i--"), Ok(7));
        assert_eq!(eval_str(&mut state, "--i"), Ok(5));
    }

    #[test]
    fn short_circuit() {
        let mut state = ShellState::new();
        // The assignment on the right must not run.
        assert_eq!(eval_str(&mut state, "0 && (x = 9)"), Ok(0));
        assert_eq!(state.scopes.get_string("x"), None);
        assert_eq!(eval_str(&mut state, "1 || (y = 9)"), Ok(1));
        assert_eq!(state.scopes.get_string("y"), None);
    }

    #[test]
    fn ternary() {
        let mut state = ShellState::new();
        state.scopes.set_scalar("a", "1", false).unwrap();
        state.scopes.set_scalar("b", "2", false).unwrap();
        assert_eq!(eval_str(&mut state, "a < b ? a : b"), Ok(1));
        assert_eq!(eval_str(&mut state, "a > b ? a : b"), Ok(2));
    }

    #[test]
    fn array_elements() {
        let mut state = ShellState::new();
        state.scopes.set_index("arr", 0, "10").unwrap();
        state.scopes.set_index("arr", 1, "20").unwrap();
        assert_eq!(eval_str(&mut state, "arr[0] + arr[1]"), Ok(30));
        assert_eq!(eval_str(&mut state, "arr[1] = 25"), Ok(25));
        assert_eq!(
            state.scopes.get("arr").unwrap().index_get(1),
            Some("25".to_string())
        );
    }

    #[test]
    fn special_parameters() {
        let mut state = ShellState::new();
        state.last_exit_code = 42;
        assert_eq!(eval_str(&mut state, "$? + 1"), Ok(43));
        state.positional = vec!["5".into(), "6".into()];
        assert_eq!(eval_str(&mut state, "$# == 2"), Ok(1));
        assert_eq!(eval_str(&mut state, "$1 + $2"), Ok(11));
    }

    #[test]
    fn negation_and_logical_not() {
        let mut state = ShellState::new();
        assert_eq!(eval_str(&mut state, "!0"), Ok(1));
        assert_eq!(eval_str(&mut state, "!5"), Ok(0));
        assert_eq!(eval_str(&mut state, "~0"), Ok(-1));
        assert_eq!(eval_str(&mut state, "- -5"), Ok(5));
    }
}
