//! Conditional Expression Parser
//!
//! The `[[ ... ]]` sub-grammar: unary file/string operators, binary string
//! and numeric comparisons, `=~`, `!`, `&&`, `||`, and parentheses.
//! Operates on the main token stream between `[[` and `]]`.

use crate::ast::types::{CondBinaryOp, CondExpr, CondUnaryOp, WordNode};
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::types::ParseError;
use crate::parser::word_parser::parse_word;

pub struct CondParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> CondParser<'a> {
    /// Parse the tokens of a conditional expression (everything between
    /// `[[` and `]]`). Returns the expression and the number of tokens
    /// consumed.
    pub fn parse(tokens: &'a [Token]) -> Result<(CondExpr, usize), ParseError> {
        let mut parser = CondParser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        Ok((expr, parser.pos))
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn err(&self, message: &str) -> ParseError {
        match self.current() {
            Some(tok) => ParseError::new(message, tok.line, tok.column),
            None => ParseError::new(message, 0, 0),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current().map(|t| t.kind), Some(TokenKind::Newline)) {
            self.pos += 1;
        }
    }

    fn parse_or(&mut self) -> Result<CondExpr, ParseError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_newlines();
            if matches!(self.current().map(|t| t.kind), Some(TokenKind::OrOr)) {
                self.pos += 1;
                self.skip_newlines();
                let right = self.parse_and()?;
                left = CondExpr::Or(Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_and(&mut self) -> Result<CondExpr, ParseError> {
        let mut left = self.parse_not()?;
        loop {
            self.skip_newlines();
            if matches!(self.current().map(|t| t.kind), Some(TokenKind::AndAnd)) {
                self.pos += 1;
                self.skip_newlines();
                let right = self.parse_not()?;
                left = CondExpr::And(Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_not(&mut self) -> Result<CondExpr, ParseError> {
        self.skip_newlines();
        if matches!(self.current().map(|t| t.kind), Some(TokenKind::Bang)) {
            self.pos += 1;
            let operand = self.parse_not()?;
            return Ok(CondExpr::Not(Box::new(operand)));
        }
        // `!` inside [[ ]] may lex as a word.
        if let Some(tok) = self.current() {
            if tok.kind == TokenKind::Word && tok.text == "!" && !tok.quoted && !tok.single_quoted {
                self.pos += 1;
                let operand = self.parse_not()?;
                return Ok(CondExpr::Not(Box::new(operand)));
            }
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<CondExpr, ParseError> {
        self.skip_newlines();
        let tok = match self.current() {
            Some(tok) => tok.clone(),
            None => return Err(self.err("unexpected end of conditional expression")),
        };

        if tok.kind == TokenKind::LParen {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.skip_newlines();
            match self.current() {
                Some(t) if t.kind == TokenKind::RParen => {
                    self.pos += 1;
                    Ok(inner)
                }
                _ => Err(self.err("expected `)' in conditional expression")),
            }
        } else if let Some(op) = unary_op(&tok) {
            self.pos += 1;
            let operand = self.operand_word()?;
            Ok(CondExpr::Unary { op, operand })
        } else {
            let left = self.operand_word()?;
            // A binary operator may follow; otherwise it is a bare word.
            if let Some(op) = self.peek_binary_op() {
                self.pos += 1;
                let right = self.operand_word()?;
                return Ok(CondExpr::Binary { op, left, right });
            }
            Ok(CondExpr::Word(left))
        }
    }

    fn operand_word(&mut self) -> Result<WordNode, ParseError> {
        let tok = match self.current() {
            Some(tok) => tok.clone(),
            None => return Err(self.err("expected word in conditional expression")),
        };
        match tok.kind {
            TokenKind::Word
            | TokenKind::Number
            | TokenKind::AssignmentWord
            | TokenKind::In
            | TokenKind::If
            | TokenKind::Then
            | TokenKind::Else
            | TokenKind::Elif
            | TokenKind::Fi
            | TokenKind::For
            | TokenKind::While
            | TokenKind::Until
            | TokenKind::Do
            | TokenKind::Done
            | TokenKind::Case
            | TokenKind::Esac
            | TokenKind::Function
            | TokenKind::Select
            | TokenKind::Time => {
                self.pos += 1;
                parse_word(&tok.text)
            }
            _ => Err(self.err(&format!(
                "unexpected token `{}' in conditional expression",
                tok.text
            ))),
        }
    }

    fn peek_binary_op(&self) -> Option<CondBinaryOp> {
        let tok = self.current()?;
        match tok.kind {
            TokenKind::Less => Some(CondBinaryOp::StrLt),
            TokenKind::Great => Some(CondBinaryOp::StrGt),
            TokenKind::Word if !tok.quoted && !tok.single_quoted => {
                CondBinaryOp::from_str(&tok.text)
            }
            _ => None,
        }
    }
}

fn unary_op(tok: &Token) -> Option<CondUnaryOp> {
    if tok.kind == TokenKind::Word && !tok.quoted && !tok.single_quoted {
        CondUnaryOp::from_str(&tok.text)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;

    fn cond_tokens(input: &str) -> Vec<Token> {
        // Lex the full form and slice out the body between [[ and ]].
        let toks = tokenize(&format!("[[ {} ]]", input)).unwrap();
        toks[1..toks.len() - 2].to_vec()
    }

    #[test]
    fn unary_file_test() {
        let toks = cond_tokens("-f /etc/passwd");
        let (expr, used) = CondParser::parse(&toks).unwrap();
        assert_eq!(used, toks.len());
        assert!(matches!(
            expr,
            CondExpr::Unary { op: CondUnaryOp::RegularFile, .. }
        ));
    }

    #[test]
    fn binary_and_logical() {
        let toks = cond_tokens("$a == foo && -n $b");
        let (expr, _) = CondParser::parse(&toks).unwrap();
        match expr {
            CondExpr::And(left, right) => {
                assert!(matches!(*left, CondExpr::Binary { op: CondBinaryOp::StrEq, .. }));
                assert!(matches!(*right, CondExpr::Unary { op: CondUnaryOp::NonZeroLength, .. }));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn negation_and_parens() {
        let toks = cond_tokens("! ( -e x || -e y )");
        let (expr, _) = CondParser::parse(&toks).unwrap();
        match expr {
            CondExpr::Not(inner) => assert!(matches!(*inner, CondExpr::Or(_, _))),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn regex_operator() {
        let toks = cond_tokens("$x =~ ^[0-9]+$");
        let (expr, _) = CondParser::parse(&toks).unwrap();
        assert!(matches!(expr, CondExpr::Binary { op: CondBinaryOp::Regex, .. }));
    }

    #[test]
    fn numeric_comparison() {
        let toks = cond_tokens("$n -ge 10");
        let (expr, _) = CondParser::parse(&toks).unwrap();
        assert!(matches!(expr, CondExpr::Binary { op: CondBinaryOp::NumGe, .. }));
    }

    #[test]
    fn bare_word() {
        let toks = cond_tokens("$x");
        let (expr, _) = CondParser::parse(&toks).unwrap();
        assert!(matches!(expr, CondExpr::Word(_)));
    }
}
