//! Recursive Descent Parser
//!
//! Consumes the token stream and produces the AST. Grammar, loosest first:
//!
//! ```text
//! script        := ( statement ( ';' | '&' | '\n' ) )*
//! statement     := pipeline ( ('&&'|'||') pipeline )*
//! pipeline      := '!'? 'time'? command ( '|' command )*
//! command       := simple_command | compound_command redirect* | function_def
//! simple_command:= assignment* ( (word|redirect) (word|redirect)* )?
//! ```
//!
//! Here-document bodies are emitted by the lexer as standalone tokens after
//! the starting newline; the parser queues them and fills the here-doc
//! redirections in source order after the script is built.

use std::collections::VecDeque;

use crate::ast::types::*;
use crate::parser::arith_parser::parse_arith;
use crate::parser::cond_parser::CondParser;
use crate::parser::lexer::{is_redirection_token, tokenize, Token, TokenKind};
use crate::parser::types::{ParseError, ParserMode, MAX_INPUT_SIZE, MAX_PARSE_DEPTH, MAX_TOKENS};
use crate::parser::word_parser::{parse_array_elements, parse_word, split_assignment};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    mode: ParserMode,
    heredoc_bodies: VecDeque<String>,
    /// Errors collected in permissive mode.
    pub errors: Vec<ParseError>,
}

/// Parse a script in bash mode.
pub fn parse(input: &str) -> Result<ScriptNode, ParseError> {
    Parser::new(ParserMode::Bash).parse(input)
}

impl Parser {
    pub fn new(mode: ParserMode) -> Self {
        Parser {
            tokens: Vec::new(),
            pos: 0,
            depth: 0,
            mode,
            heredoc_bodies: VecDeque::new(),
            errors: Vec::new(),
        }
    }

    pub fn parse(&mut self, input: &str) -> Result<ScriptNode, ParseError> {
        if input.len() > MAX_INPUT_SIZE {
            return Err(ParseError::new(
                format!("input too large ({} bytes)", input.len()),
                1,
                1,
            ));
        }
        let tokens = tokenize(input)?;
        if tokens.len() > MAX_TOKENS {
            return Err(ParseError::new(
                format!("too many tokens ({})", tokens.len()),
                1,
                1,
            ));
        }
        // Here-doc bodies are pulled out of the stream up front; they are
        // re-attached to their redirections in source order afterwards.
        self.tokens = Vec::with_capacity(tokens.len());
        for tok in tokens {
            if tok.kind == TokenKind::HeredocBody {
                self.heredoc_bodies.push_back(tok.text);
            } else {
                self.tokens.push(tok);
            }
        }
        self.pos = 0;
        self.depth = 0;

        let mut script = self.parse_script()?;
        fill_heredocs(&mut script.statements, &mut self.heredoc_bodies);
        Ok(script)
    }

    // -------------------------------------------------------------------------
    // helpers
    // -------------------------------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let tok = self.current();
        if tok.kind == TokenKind::Eof {
            ParseError::incomplete(message, tok.line, tok.column)
        } else {
            ParseError::new(message, tok.line, tok.column)
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "syntax error near unexpected token `{}' (expected {})",
                self.current().text,
                what
            )))
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(self.error("maximum nesting depth exceeded"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn skip_newlines(&mut self) {
        while self.kind() == TokenKind::Newline {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn is_word_like(&self) -> bool {
        word_like(self.kind())
    }

    fn posix_reject(&self, what: &str) -> Result<(), ParseError> {
        if self.mode == ParserMode::Posix {
            return Err(self.error(format!("{} is not available in posix mode", what)));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // script & statements
    // -------------------------------------------------------------------------

    fn parse_script(&mut self) -> Result<ScriptNode, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.kind() == TokenKind::Eof {
                break;
            }
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) if self.mode == ParserMode::Permissive && !err.incomplete => {
                    self.errors.push(err);
                    self.resync();
                }
                Err(err) => return Err(err),
            }
        }
        Ok(Ast::script(statements))
    }

    /// Permissive mode: skip to the next statement boundary.
    fn resync(&mut self) {
        loop {
            match self.kind() {
                TokenKind::Eof => return,
                TokenKind::Newline | TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Statements terminate this parser's callers.
    fn at_statement_terminator(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Eof
                | TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Amp
                | TokenKind::RParen
                | TokenKind::RBrace
                | TokenKind::DSemi
                | TokenKind::SemiAnd
                | TokenKind::SemiSemiAnd
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::Elif
                | TokenKind::Fi
                | TokenKind::Do
                | TokenKind::Done
                | TokenKind::Esac
        )
    }

    fn parse_statement(&mut self) -> Result<StatementNode, ParseError> {
        self.enter()?;
        let line = self.current().line;
        let mut pipelines = vec![self.parse_pipeline()?];
        let mut operators = Vec::new();
        loop {
            match self.kind() {
                TokenKind::AndAnd => {
                    self.advance();
                    self.skip_newlines();
                    operators.push(AndOrOperator::And);
                    pipelines.push(self.parse_pipeline()?);
                }
                TokenKind::OrOr => {
                    self.advance();
                    self.skip_newlines();
                    operators.push(AndOrOperator::Or);
                    pipelines.push(self.parse_pipeline()?);
                }
                _ => break,
            }
        }
        let mut statement = Ast::statement(pipelines, operators);
        statement.line = line;
        if self.kind() == TokenKind::Amp {
            self.advance();
            statement.background = true;
        } else if self.kind() == TokenKind::Semicolon {
            self.advance();
        }
        self.leave();
        Ok(statement)
    }

    fn parse_statements_until(&mut self, stops: &[TokenKind]) -> Result<Vec<StatementNode>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.kind() == TokenKind::Eof {
                if stops.contains(&TokenKind::Eof) {
                    break;
                }
                return Err(self.error("unexpected end of file"));
            }
            if stops.contains(&self.kind()) {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    // -------------------------------------------------------------------------
    // pipelines
    // -------------------------------------------------------------------------

    fn parse_pipeline(&mut self) -> Result<PipelineNode, ParseError> {
        self.enter()?;
        let mut negated = false;
        let mut timed = false;
        loop {
            match self.kind() {
                TokenKind::Bang => {
                    self.advance();
                    negated = !negated;
                }
                TokenKind::Time => {
                    self.advance();
                    timed = true;
                }
                _ => break,
            }
        }
        let mut commands = vec![self.parse_command()?];
        while self.kind() == TokenKind::Pipe {
            self.advance();
            self.skip_newlines();
            commands.push(self.parse_command()?);
        }
        self.leave();
        Ok(PipelineNode {
            commands,
            negated,
            timed,
        })
    }

    // -------------------------------------------------------------------------
    // commands
    // -------------------------------------------------------------------------

    fn parse_command(&mut self) -> Result<CommandNode, ParseError> {
        self.enter()?;
        let result = match self.kind() {
            TokenKind::If => self.parse_if().map(CompoundCommandNode::If),
            TokenKind::While => self.parse_while().map(CompoundCommandNode::While),
            TokenKind::Until => self.parse_until().map(CompoundCommandNode::Until),
            TokenKind::For => self.parse_for(),
            TokenKind::Case => self.parse_case().map(CompoundCommandNode::Case),
            TokenKind::Select => {
                self.posix_reject("select")?;
                self.parse_select().map(CompoundCommandNode::Select)
            }
            TokenKind::LParen => self.parse_subshell().map(CompoundCommandNode::Subshell),
            TokenKind::LBrace => self.parse_group().map(CompoundCommandNode::Group),
            TokenKind::DParenStart => {
                self.posix_reject("(( ))")?;
                self.parse_arith_command().map(CompoundCommandNode::Arithmetic)
            }
            TokenKind::DBrackStart => {
                self.posix_reject("[[ ]]")?;
                self.parse_conditional().map(CompoundCommandNode::Conditional)
            }
            TokenKind::Function => {
                self.posix_reject("the function keyword")?;
                let def = self.parse_function_keyword()?;
                self.leave();
                return Ok(CommandNode::FunctionDef(def));
            }
            _ => {
                // `name ( )` function definition.
                if self.is_word_like()
                    && self.peek_kind(1) == TokenKind::LParen
                    && self.peek_kind(2) == TokenKind::RParen
                {
                    let def = self.parse_function_posix()?;
                    self.leave();
                    return Ok(CommandNode::FunctionDef(def));
                }
                let simple = self.parse_simple_command()?;
                self.leave();
                return Ok(CommandNode::Simple(simple));
            }
        };
        let mut compound = result?;
        // Redirections apply to the whole compound body.
        let redirects = self.parse_trailing_redirections()?;
        compound.redirections_mut().extend(redirects);
        self.leave();
        Ok(CommandNode::Compound(compound))
    }

    fn parse_trailing_redirections(&mut self) -> Result<Vec<RedirectionNode>, ParseError> {
        let mut redirects = Vec::new();
        loop {
            if is_redirection_token(self.kind()) {
                redirects.push(self.parse_redirection(None)?);
            } else if self.kind() == TokenKind::Number && is_redirection_token(self.peek_kind(1)) {
                let fd_tok = self.advance();
                let fd = fd_tok.text.parse::<i32>().ok();
                redirects.push(self.parse_redirection(fd)?);
            } else {
                break;
            }
        }
        Ok(redirects)
    }

    // -------------------------------------------------------------------------
    // simple commands
    // -------------------------------------------------------------------------

    fn parse_simple_command(&mut self) -> Result<SimpleCommandNode, ParseError> {
        let line = self.current().line;
        let mut assignments = Vec::new();
        let mut name: Option<WordNode> = None;
        let mut args = Vec::new();
        let mut redirections = Vec::new();

        loop {
            if self.at_statement_terminator()
                || matches!(
                    self.kind(),
                    TokenKind::Pipe | TokenKind::AndAnd | TokenKind::OrOr | TokenKind::LParen
                )
            {
                break;
            }
            if is_redirection_token(self.kind()) {
                redirections.push(self.parse_redirection(None)?);
                continue;
            }
            if self.kind() == TokenKind::Number && is_redirection_token(self.peek_kind(1)) {
                let fd_tok = self.advance();
                let fd = fd_tok.text.parse::<i32>().ok();
                redirections.push(self.parse_redirection(fd)?);
                continue;
            }
            if self.kind() == TokenKind::AssignmentWord && name.is_none() {
                let tok = self.advance();
                assignments.push(self.build_assignment(&tok)?);
                continue;
            }
            if self.is_word_like() {
                let tok = self.advance();
                let word = parse_word(&tok.text).map_err(|e| {
                    ParseError::new(e.message, tok.line, tok.column)
                })?;
                if name.is_none() {
                    name = Some(word);
                } else {
                    args.push(word);
                }
                continue;
            }
            break;
        }

        if assignments.is_empty() && name.is_none() && redirections.is_empty() {
            return Err(self.error(format!(
                "syntax error near unexpected token `{}'",
                self.current().text
            )));
        }

        let mut simple = Ast::simple(name, args, assignments, redirections);
        simple.line = line;
        Ok(simple)
    }

    fn build_assignment(&self, tok: &Token) -> Result<AssignmentNode, ParseError> {
        let (name, subscript, append, value_text) = split_assignment(&tok.text)
            .ok_or_else(|| ParseError::new("invalid assignment", tok.line, tok.column))?;
        let subscript = match subscript {
            Some(text) => Some(parse_word(&text)?),
            None => None,
        };
        // Array literal?
        if value_text.starts_with('(') && value_text.ends_with(')') {
            let inner = &value_text[1..value_text.len() - 1];
            let elements = parse_array_elements(inner)?;
            return Ok(AssignmentNode {
                name,
                subscript,
                value: None,
                append,
                array: Some(elements),
            });
        }
        Ok(AssignmentNode {
            name,
            subscript,
            value: Some(parse_word(&value_text)?),
            append,
            array: None,
        })
    }

    // -------------------------------------------------------------------------
    // redirections
    // -------------------------------------------------------------------------

    fn parse_redirection(&mut self, fd: Option<i32>) -> Result<RedirectionNode, ParseError> {
        let op_tok = self.advance();
        let operator = match op_tok.kind {
            TokenKind::Less => RedirectionOperator::Less,
            TokenKind::Great => RedirectionOperator::Great,
            TokenKind::DGreat => RedirectionOperator::DGreat,
            TokenKind::LessAnd => RedirectionOperator::LessAnd,
            TokenKind::GreatAnd => RedirectionOperator::GreatAnd,
            TokenKind::LessGreat => RedirectionOperator::LessGreat,
            TokenKind::Clobber => RedirectionOperator::Clobber,
            TokenKind::AndGreat => RedirectionOperator::AndGreat,
            TokenKind::AndDGreat => RedirectionOperator::AndDGreat,
            TokenKind::TLess => RedirectionOperator::HereString,
            TokenKind::DLess => RedirectionOperator::HereDoc,
            TokenKind::DLessDash => RedirectionOperator::HereDocDash,
            _ => return Err(self.error("expected redirection operator")),
        };

        if !self.is_word_like() {
            return Err(self.error(format!(
                "syntax error near unexpected token `{}'",
                self.current().text
            )));
        }
        let target_tok = self.advance();

        match operator {
            RedirectionOperator::HereDoc | RedirectionOperator::HereDocDash => {
                Ok(RedirectionNode {
                    fd,
                    operator,
                    target: RedirectionTarget::HereDoc(HereDocNode {
                        delimiter: target_tok.unquoted_text(),
                        body: String::new(),
                        strip_tabs: operator == RedirectionOperator::HereDocDash,
                        quoted: target_tok.quoted || target_tok.single_quoted,
                    }),
                })
            }
            _ => Ok(RedirectionNode {
                fd,
                operator,
                target: RedirectionTarget::Word(parse_word(&target_tok.text)?),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // compound commands
    // -------------------------------------------------------------------------

    fn parse_if(&mut self) -> Result<IfNode, ParseError> {
        self.expect(TokenKind::If, "if")?;
        let mut clauses = Vec::new();
        let condition = self.parse_statements_until(&[TokenKind::Then])?;
        self.expect(TokenKind::Then, "then")?;
        let body = self.parse_statements_until(&[TokenKind::Elif, TokenKind::Else, TokenKind::Fi])?;
        clauses.push(IfClause { condition, body });
        let mut else_body = None;
        loop {
            match self.kind() {
                TokenKind::Elif => {
                    self.advance();
                    let condition = self.parse_statements_until(&[TokenKind::Then])?;
                    self.expect(TokenKind::Then, "then")?;
                    let body =
                        self.parse_statements_until(&[TokenKind::Elif, TokenKind::Else, TokenKind::Fi])?;
                    clauses.push(IfClause { condition, body });
                }
                TokenKind::Else => {
                    self.advance();
                    else_body = Some(self.parse_statements_until(&[TokenKind::Fi])?);
                    break;
                }
                _ => break,
            }
        }
        self.expect(TokenKind::Fi, "fi")?;
        Ok(IfNode {
            clauses,
            else_body,
            redirections: Vec::new(),
        })
    }

    fn parse_while(&mut self) -> Result<WhileNode, ParseError> {
        self.expect(TokenKind::While, "while")?;
        let condition = self.parse_statements_until(&[TokenKind::Do])?;
        let body = self.parse_do_done()?;
        Ok(WhileNode {
            condition,
            body,
            redirections: Vec::new(),
        })
    }

    fn parse_until(&mut self) -> Result<UntilNode, ParseError> {
        self.expect(TokenKind::Until, "until")?;
        let condition = self.parse_statements_until(&[TokenKind::Do])?;
        let body = self.parse_do_done()?;
        Ok(UntilNode {
            condition,
            body,
            redirections: Vec::new(),
        })
    }

    fn parse_do_done(&mut self) -> Result<Vec<StatementNode>, ParseError> {
        self.expect(TokenKind::Do, "do")?;
        let body = self.parse_statements_until(&[TokenKind::Done])?;
        self.expect(TokenKind::Done, "done")?;
        Ok(body)
    }

    fn parse_for(&mut self) -> Result<CompoundCommandNode, ParseError> {
        self.expect(TokenKind::For, "for")?;

        if self.kind() == TokenKind::DParenStart {
            self.posix_reject("for (( ))")?;
            return self.parse_c_style_for().map(CompoundCommandNode::CStyleFor);
        }

        let var_tok = self.advance();
        if !word_like(var_tok.kind) {
            return Err(ParseError::new(
                "expected variable name after `for'",
                var_tok.line,
                var_tok.column,
            ));
        }
        let variable = var_tok.text.clone();
        let words = self.parse_in_words()?;
        self.skip_separators();
        let body = self.parse_do_done()?;
        Ok(CompoundCommandNode::For(ForNode {
            variable,
            words,
            body,
            redirections: Vec::new(),
        }))
    }

    /// The optional `in word...` clause shared by for and select.
    fn parse_in_words(&mut self) -> Result<Option<Vec<WordNode>>, ParseError> {
        self.skip_newlines();
        if self.kind() != TokenKind::In {
            return Ok(None);
        }
        self.advance();
        let mut words = Vec::new();
        while self.is_word_like() {
            let tok = self.advance();
            words.push(parse_word(&tok.text)?);
        }
        Ok(Some(words))
    }

    fn parse_c_style_for(&mut self) -> Result<CStyleForNode, ParseError> {
        self.expect(TokenKind::DParenStart, "((")?;
        let inner_tok = self.expect(TokenKind::Word, "arithmetic expression")?;
        self.expect(TokenKind::DParenEnd, "))")?;

        let sections = split_c_for_sections(&inner_tok.text);
        if sections.len() != 3 {
            return Err(ParseError::new(
                "expected `((init; cond; update))'",
                inner_tok.line,
                inner_tok.column,
            ));
        }
        let parse_section = |text: &str| -> Result<Option<ArithExpr>, ParseError> {
            if text.trim().is_empty() {
                Ok(None)
            } else {
                parse_arith(text)
                    .map(Some)
                    .map_err(|e| ParseError::new(e.to_string(), inner_tok.line, inner_tok.column))
            }
        };
        let init = parse_section(&sections[0])?;
        let condition = parse_section(&sections[1])?;
        let update = parse_section(&sections[2])?;

        self.skip_separators();
        let body = self.parse_do_done()?;
        Ok(CStyleForNode {
            init,
            condition,
            update,
            body,
            redirections: Vec::new(),
        })
    }

    fn parse_case(&mut self) -> Result<CaseNode, ParseError> {
        self.expect(TokenKind::Case, "case")?;
        let word_tok = self.advance();
        if !word_like(word_tok.kind) {
            return Err(ParseError::new(
                "expected word after `case'",
                word_tok.line,
                word_tok.column,
            ));
        }
        let word = parse_word(&word_tok.text)?;
        self.skip_newlines();
        self.expect(TokenKind::In, "in")?;
        self.skip_newlines();

        let mut items = Vec::new();
        while self.kind() != TokenKind::Esac {
            if self.kind() == TokenKind::Eof {
                return Err(self.error("unexpected end of file (expected `esac')"));
            }
            // Optional ( before the pattern list.
            if self.kind() == TokenKind::LParen {
                self.advance();
            }
            let mut patterns = Vec::new();
            loop {
                if !self.is_word_like() {
                    return Err(self.error("expected pattern in case item"));
                }
                let tok = self.advance();
                patterns.push(parse_word(&tok.text)?);
                if self.kind() == TokenKind::Pipe {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::RParen, ")")?;
            let body = self.parse_statements_until(&[
                TokenKind::DSemi,
                TokenKind::SemiAnd,
                TokenKind::SemiSemiAnd,
                TokenKind::Esac,
            ])?;
            let terminator = match self.kind() {
                TokenKind::DSemi => {
                    self.advance();
                    CaseTerminator::Break
                }
                TokenKind::SemiAnd => {
                    self.advance();
                    CaseTerminator::FallThrough
                }
                TokenKind::SemiSemiAnd => {
                    self.advance();
                    CaseTerminator::Continue
                }
                _ => CaseTerminator::Break,
            };
            items.push(CaseItemNode {
                patterns,
                body,
                terminator,
            });
            self.skip_newlines();
        }
        self.expect(TokenKind::Esac, "esac")?;
        Ok(CaseNode {
            word,
            items,
            redirections: Vec::new(),
        })
    }

    fn parse_select(&mut self) -> Result<SelectNode, ParseError> {
        self.expect(TokenKind::Select, "select")?;
        let var_tok = self.advance();
        if !word_like(var_tok.kind) {
            return Err(ParseError::new(
                "expected variable name after `select'",
                var_tok.line,
                var_tok.column,
            ));
        }
        let variable = var_tok.text.clone();
        let words = self.parse_in_words()?;
        self.skip_separators();
        let body = self.parse_do_done()?;
        Ok(SelectNode {
            variable,
            words,
            body,
            redirections: Vec::new(),
        })
    }

    fn parse_subshell(&mut self) -> Result<SubshellNode, ParseError> {
        self.expect(TokenKind::LParen, "(")?;
        let body = self.parse_statements_until(&[TokenKind::RParen])?;
        self.expect(TokenKind::RParen, ")")?;
        Ok(SubshellNode {
            body,
            redirections: Vec::new(),
        })
    }

    fn parse_group(&mut self) -> Result<GroupNode, ParseError> {
        self.expect(TokenKind::LBrace, "{")?;
        let body = self.parse_statements_until(&[TokenKind::RBrace])?;
        self.expect(TokenKind::RBrace, "}")?;
        Ok(GroupNode {
            body,
            redirections: Vec::new(),
        })
    }

    fn parse_arith_command(&mut self) -> Result<ArithmeticCommandNode, ParseError> {
        self.expect(TokenKind::DParenStart, "((")?;
        let inner_tok = self.expect(TokenKind::Word, "arithmetic expression")?;
        self.expect(TokenKind::DParenEnd, "))")?;
        let expression = parse_arith(&inner_tok.text)
            .map_err(|e| ParseError::new(e.to_string(), inner_tok.line, inner_tok.column))?;
        Ok(ArithmeticCommandNode {
            expression,
            redirections: Vec::new(),
        })
    }

    fn parse_conditional(&mut self) -> Result<ConditionalCommandNode, ParseError> {
        self.expect(TokenKind::DBrackStart, "[[")?;
        // Find the matching ]] and hand the slice to the sub-parser.
        let start = self.pos;
        let mut end = self.pos;
        while self.tokens[end].kind != TokenKind::DBrackEnd {
            if self.tokens[end].kind == TokenKind::Eof {
                return Err(self.error("unexpected end of file (expected `]]')"));
            }
            end += 1;
        }
        let (expression, used) = CondParser::parse(&self.tokens[start..end])?;
        if start + used != end {
            let tok = &self.tokens[start + used];
            return Err(ParseError::new(
                format!("syntax error in conditional expression near `{}'", tok.text),
                tok.line,
                tok.column,
            ));
        }
        self.pos = end;
        self.expect(TokenKind::DBrackEnd, "]]")?;
        Ok(ConditionalCommandNode {
            expression,
            redirections: Vec::new(),
        })
    }

    // -------------------------------------------------------------------------
    // functions
    // -------------------------------------------------------------------------

    fn parse_function_posix(&mut self) -> Result<FunctionDefNode, ParseError> {
        let name_tok = self.advance();
        self.expect(TokenKind::LParen, "(")?;
        self.expect(TokenKind::RParen, ")")?;
        self.skip_newlines();
        self.parse_function_body(name_tok.text)
    }

    fn parse_function_keyword(&mut self) -> Result<FunctionDefNode, ParseError> {
        self.expect(TokenKind::Function, "function")?;
        let name_tok = self.advance();
        if !word_like(name_tok.kind) {
            return Err(ParseError::new(
                "expected function name",
                name_tok.line,
                name_tok.column,
            ));
        }
        if self.kind() == TokenKind::LParen {
            self.advance();
            self.expect(TokenKind::RParen, ")")?;
        }
        self.skip_newlines();
        self.parse_function_body(name_tok.text)
    }

    fn parse_function_body(&mut self, name: String) -> Result<FunctionDefNode, ParseError> {
        let command = self.parse_command()?;
        let body = match command {
            CommandNode::Compound(compound) => compound,
            CommandNode::Simple(_) | CommandNode::FunctionDef(_) => {
                return Err(self.error("expected compound command as function body"));
            }
        };
        Ok(FunctionDefNode {
            name,
            body: Box::new(body),
            redirections: Vec::new(),
        })
    }
}

/// Token kinds usable as words in argument position.
fn word_like(kind: TokenKind) -> bool {
    matches!(
        kind,
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
            | TokenKind::Time
    )
}

/// Split `init; cond; update` on top-level semicolons.
fn split_c_for_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            ';' if depth == 0 => sections.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    sections.push(current);
    sections
}

/// Fill here-document bodies in source order.
fn fill_heredocs(statements: &mut [StatementNode], bodies: &mut VecDeque<String>) {
    for statement in statements {
        for pipeline in &mut statement.pipelines {
            for command in &mut pipeline.commands {
                fill_command(command, bodies);
            }
        }
    }
}

fn fill_command(command: &mut CommandNode, bodies: &mut VecDeque<String>) {
    match command {
        CommandNode::Simple(simple) => fill_redirects(&mut simple.redirections, bodies),
        CommandNode::FunctionDef(def) => {
            fill_compound(&mut def.body, bodies);
            fill_redirects(&mut def.redirections, bodies);
        }
        CommandNode::Compound(compound) => fill_compound(compound, bodies),
    }
}

fn fill_compound(compound: &mut CompoundCommandNode, bodies: &mut VecDeque<String>) {
    match compound {
        CompoundCommandNode::If(node) => {
            for clause in &mut node.clauses {
                fill_heredocs(&mut clause.condition, bodies);
                fill_heredocs(&mut clause.body, bodies);
            }
            if let Some(else_body) = &mut node.else_body {
                fill_heredocs(else_body, bodies);
            }
        }
        CompoundCommandNode::For(node) => fill_heredocs(&mut node.body, bodies),
        CompoundCommandNode::CStyleFor(node) => fill_heredocs(&mut node.body, bodies),
        CompoundCommandNode::While(node) => {
            fill_heredocs(&mut node.condition, bodies);
            fill_heredocs(&mut node.body, bodies);
        }
        CompoundCommandNode::Until(node) => {
            fill_heredocs(&mut node.condition, bodies);
            fill_heredocs(&mut node.body, bodies);
        }
        CompoundCommandNode::Case(node) => {
            for item in &mut node.items {
                fill_heredocs(&mut item.body, bodies);
            }
        }
        CompoundCommandNode::Select(node) => fill_heredocs(&mut node.body, bodies),
        CompoundCommandNode::Subshell(node) => fill_heredocs(&mut node.body, bodies),
        CompoundCommandNode::Group(node) => fill_heredocs(&mut node.body, bodies),
        CompoundCommandNode::Arithmetic(_) | CompoundCommandNode::Conditional(_) => {}
    }
    fill_redirects(compound.redirections_mut(), bodies);
}

fn fill_redirects(redirects: &mut [RedirectionNode], bodies: &mut VecDeque<String>) {
    for redirect in redirects {
        if let RedirectionTarget::HereDoc(heredoc) = &mut redirect.target {
            if let Some(body) = bodies.pop_front() {
                heredoc.body = body;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> ScriptNode {
        parse(input).unwrap_or_else(|e| panic!("parse failed for {:?}: {}", input, e))
    }

    fn first_simple(script: &ScriptNode) -> &SimpleCommandNode {
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Simple(simple) => simple,
            other => panic!("expected simple command, got {:?}", other),
        }
    }

    #[test]
    fn simple_command_with_args() {
        let script = parse_ok("echo one two");
        let simple = first_simple(&script);
        assert_eq!(simple.name.as_ref().unwrap().as_literal(), Some("echo".into()));
        assert_eq!(simple.args.len(), 2);
    }

    #[test]
    fn assignments_before_command() {
        let script = parse_ok("A=1 B=2 cmd arg");
        let simple = first_simple(&script);
        assert_eq!(simple.assignments.len(), 2);
        assert_eq!(simple.assignments[0].name, "A");
        assert_eq!(simple.args.len(), 1);
    }

    #[test]
    fn assignment_only_statement() {
        let script = parse_ok("X=hello");
        let simple = first_simple(&script);
        assert!(simple.name.is_none());
        assert_eq!(simple.assignments.len(), 1);
    }

    #[test]
    fn array_initialization() {
        let script = parse_ok("arr=(a b c)");
        let simple = first_simple(&script);
        let assignment = &simple.assignments[0];
        assert_eq!(assignment.array.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn array_element_assignment() {
        let script = parse_ok("arr[3]=x");
        let simple = first_simple(&script);
        let assignment = &simple.assignments[0];
        assert!(assignment.subscript.is_some());
    }

    #[test]
    fn pipeline_and_negation() {
        let script = parse_ok("! a | b | c");
        let pipeline = &script.statements[0].pipelines[0];
        assert!(pipeline.negated);
        assert_eq!(pipeline.commands.len(), 3);
    }

    #[test]
    fn and_or_list() {
        let script = parse_ok("a && b || c");
        let statement = &script.statements[0];
        assert_eq!(statement.pipelines.len(), 3);
        assert_eq!(
            statement.operators,
            vec![AndOrOperator::And, AndOrOperator::Or]
        );
    }

    #[test]
    fn background_statement() {
        let script = parse_ok("sleep 5 &");
        assert!(script.statements[0].background);
    }

    #[test]
    fn if_elif_else() {
        let script = parse_ok("if a; then b; elif c; then d; else e; fi");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::If(node)) => {
                assert_eq!(node.clauses.len(), 2);
                assert!(node.else_body.is_some());
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn while_loop() {
        let script = parse_ok("while true; do echo x; done");
        assert!(matches!(
            &script.statements[0].pipelines[0].commands[0],
            CommandNode::Compound(CompoundCommandNode::While(_))
        ));
    }

    #[test]
    fn for_in_loop() {
        let script = parse_ok("for i in a b c; do echo $i; done");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::For(node)) => {
                assert_eq!(node.variable, "i");
                assert_eq!(node.words.as_ref().unwrap().len(), 3);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn for_without_in() {
        let script = parse_ok("for arg; do echo $arg; done");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::For(node)) => {
                assert!(node.words.is_none());
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn c_style_for() {
        let script = parse_ok("for ((i=0; i<3; i++)); do echo $i; done");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::CStyleFor(node)) => {
                assert!(node.init.is_some());
                assert!(node.condition.is_some());
                assert!(node.update.is_some());
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn c_style_for_empty_condition() {
        let script = parse_ok("for ((;;)); do break; done");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::CStyleFor(node)) => {
                assert!(node.init.is_none());
                assert!(node.condition.is_none());
                assert!(node.update.is_none());
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn case_with_terminators() {
        let script = parse_ok("case $x in a) echo 1 ;; b|c) echo 2 ;& d) echo 3 ;;& e) echo 4 ;; esac");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::Case(node)) => {
                assert_eq!(node.items.len(), 4);
                assert_eq!(node.items[0].terminator, CaseTerminator::Break);
                assert_eq!(node.items[1].patterns.len(), 2);
                assert_eq!(node.items[1].terminator, CaseTerminator::FallThrough);
                assert_eq!(node.items[2].terminator, CaseTerminator::Continue);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn select_loop() {
        let script = parse_ok("select opt in a b; do echo $opt; done");
        assert!(matches!(
            &script.statements[0].pipelines[0].commands[0],
            CommandNode::Compound(CompoundCommandNode::Select(_))
        ));
    }

    #[test]
    fn subshell_and_group() {
        let script = parse_ok("(cd /; ls)");
        assert!(matches!(
            &script.statements[0].pipelines[0].commands[0],
            CommandNode::Compound(CompoundCommandNode::Subshell(_))
        ));
        let script = parse_ok("{ echo a; echo b; }");
        assert!(matches!(
            &script.statements[0].pipelines[0].commands[0],
            CommandNode::Compound(CompoundCommandNode::Group(_))
        ));
    }

    #[test]
    fn arithmetic_command() {
        let script = parse_ok("((x = 1 + 2))");
        assert!(matches!(
            &script.statements[0].pipelines[0].commands[0],
            CommandNode::Compound(CompoundCommandNode::Arithmetic(_))
        ));
    }

    #[test]
    fn conditional_command() {
        let script = parse_ok("[[ -f /etc/passwd && $x == y* ]]");
        assert!(matches!(
            &script.statements[0].pipelines[0].commands[0],
            CommandNode::Compound(CompoundCommandNode::Conditional(_))
        ));
    }

    #[test]
    fn function_definitions() {
        let script = parse_ok("f() { echo hi; }");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::FunctionDef(def) => assert_eq!(def.name, "f"),
            other => panic!("{:?}", other),
        }
        let script = parse_ok("function g { echo hi; }");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::FunctionDef(def) => assert_eq!(def.name, "g"),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn redirections_on_simple_command() {
        let script = parse_ok("cmd < in.txt > out.txt 2>&1");
        let simple = first_simple(&script);
        assert_eq!(simple.redirections.len(), 3);
        assert_eq!(simple.redirections[2].fd, Some(2));
        assert_eq!(
            simple.redirections[2].operator,
            RedirectionOperator::GreatAnd
        );
    }

    #[test]
    fn redirection_on_compound() {
        let script = parse_ok("while read l; do echo $l; done < file");
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(compound) => {
                assert_eq!(compound.redirections().len(), 1);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn heredoc_body_attached() {
        let script = parse_ok("cat <<EOF\nhello\nworld\nEOF\n");
        let simple = first_simple(&script);
        match &simple.redirections[0].target {
            RedirectionTarget::HereDoc(heredoc) => {
                assert_eq!(heredoc.body, "hello\nworld\n");
                assert!(!heredoc.quoted);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn two_heredocs_fill_in_order() {
        let script = parse_ok("cat <<A <<B\none\nA\ntwo\nB\n");
        let simple = first_simple(&script);
        let bodies: Vec<String> = simple
            .redirections
            .iter()
            .map(|r| match &r.target {
                RedirectionTarget::HereDoc(h) => h.body.clone(),
                _ => panic!("expected heredoc"),
            })
            .collect();
        assert_eq!(bodies, vec!["one\n".to_string(), "two\n".to_string()]);
    }

    #[test]
    fn here_string() {
        let script = parse_ok("read a <<< \"one two\"");
        let simple = first_simple(&script);
        assert_eq!(
            simple.redirections[0].operator,
            RedirectionOperator::HereString
        );
    }

    #[test]
    fn posix_mode_rejects_bashisms() {
        let mut parser = Parser::new(ParserMode::Posix);
        assert!(parser.parse("[[ -f x ]]").is_err());
        let mut parser = Parser::new(ParserMode::Posix);
        assert!(parser.parse("select x in a; do :; done").is_err());
        let mut parser = Parser::new(ParserMode::Posix);
        assert!(parser.parse("function f { :; }").is_err());
    }

    #[test]
    fn permissive_mode_collects_errors() {
        let mut parser = Parser::new(ParserMode::Permissive);
        let script = parser.parse("echo ok\ncase\necho also-ok").unwrap();
        assert!(!parser.errors.is_empty());
        assert_eq!(script.statements.len(), 2);
    }

    #[test]
    fn incomplete_input_flagged() {
        let err = parse("if true; then echo hi").unwrap_err();
        assert!(err.incomplete);
        let err = parse("echo 'unterminated").unwrap_err();
        assert!(err.incomplete);
    }

    #[test]
    fn keyword_as_argument() {
        let script = parse_ok("echo if then done");
        let simple = first_simple(&script);
        assert_eq!(simple.args.len(), 3);
    }

    #[test]
    fn line_numbers_recorded() {
        let script = parse_ok("echo a\necho b\necho c");
        assert_eq!(script.statements[1].line, 2);
        assert_eq!(script.statements[2].line, 3);
    }
}
