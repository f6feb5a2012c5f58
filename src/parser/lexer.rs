//! Lexer
//!
//! Tokenizes shell source into a materialized token list ending with an EOF
//! sentinel. Handles operators (greedy max-munch), reserved words in command
//! position, assignment words, composite word text with balanced expansions,
//! comments, line continuations, and here-document collection. The lexer
//! never expands anything; words keep their raw text for the word parser.

use std::collections::HashMap;

use crate::parser::types::ParseError;

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Newline,
    Semicolon,
    Amp, // &

    Pipe,   // |
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    Less,      // <
    Great,     // >
    DLess,     // <<
    DGreat,    // >>
    LessAnd,   // <&
    GreatAnd,  // >&
    LessGreat, // <>
    DLessDash, // <<-
    Clobber,   // >|
    TLess,     // <<<
    AndGreat,  // &>
    AndDGreat, // &>>

    LParen, // (
    RParen, // )
    LBrace, // { (command position only)
    RBrace, // } (command position only)

    DSemi,       // ;;
    SemiAnd,     // ;&
    SemiSemiAnd, // ;;&

    DBrackStart, // [[
    DBrackEnd,   // ]]
    DParenStart, // ((
    DParenEnd,   // ))

    If,
    Then,
    Else,
    Elif,
    Fi,
    For,
    While,
    Until,
    Do,
    Done,
    Case,
    Esac,
    In,
    Function,
    Select,
    Time,

    Word,
    /// Digits directly before a redirection operator (2>&1).
    Number,
    /// NAME=..., NAME+=..., NAME[sub]=... — shape-tagged; the parser decides
    /// whether it is actually an assignment by position.
    AssignmentWord,
    /// Collected here-document body, emitted after the newline that starts it.
    HeredocBody,
}

/// A token with its raw text and source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    /// Any part of the word was double-quoted or escaped.
    pub quoted: bool,
    /// Any part of the word was single-quoted.
    pub single_quoted: bool,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, start: usize, end: usize, line: usize, column: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            start,
            end,
            line,
            column,
            quoted: false,
            single_quoted: false,
        }
    }

    pub fn eof(pos: usize, line: usize, column: usize) -> Self {
        Token::new(TokenKind::Eof, "", pos, pos, line, column)
    }

    /// The here-doc delimiter with quoting removed.
    pub fn unquoted_text(&self) -> String {
        let mut out = String::new();
        let mut chars = self.text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\'' | '"' => {}
                '\\' => {
                    if let Some(&next) = chars.peek() {
                        out.push(next);
                        chars.next();
                    }
                }
                _ => out.push(c),
            }
        }
        out
    }
}

lazy_static::lazy_static! {
    static ref RESERVED_WORDS: HashMap<&'static str, TokenKind> = {
        let mut m = HashMap::new();
        m.insert("if", TokenKind::If);
        m.insert("then", TokenKind::Then);
        m.insert("else", TokenKind::Else);
        m.insert("elif", TokenKind::Elif);
        m.insert("fi", TokenKind::Fi);
        m.insert("for", TokenKind::For);
        m.insert("while", TokenKind::While);
        m.insert("until", TokenKind::Until);
        m.insert("do", TokenKind::Do);
        m.insert("done", TokenKind::Done);
        m.insert("case", TokenKind::Case);
        m.insert("esac", TokenKind::Esac);
        m.insert("function", TokenKind::Function);
        m.insert("select", TokenKind::Select);
        m.insert("time", TokenKind::Time);
        m
    };
}

/// Three-character operators, longest first.
const THREE_CHAR_OPS: &[(&str, TokenKind)] = &[
    (";;&", TokenKind::SemiSemiAnd),
    ("<<<", TokenKind::TLess),
    ("<<-", TokenKind::DLessDash),
    ("&>>", TokenKind::AndDGreat),
];

const TWO_CHAR_OPS: &[(&str, TokenKind)] = &[
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    (";;", TokenKind::DSemi),
    (";&", TokenKind::SemiAnd),
    ("<<", TokenKind::DLess),
    (">>", TokenKind::DGreat),
    ("<&", TokenKind::LessAnd),
    (">&", TokenKind::GreatAnd),
    ("<>", TokenKind::LessGreat),
    (">|", TokenKind::Clobber),
    ("&>", TokenKind::AndGreat),
];

/// Check if a token kind is a redirection operator.
pub fn is_redirection_token(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Less
            | TokenKind::Great
            | TokenKind::DLess
            | TokenKind::DGreat
            | TokenKind::LessAnd
            | TokenKind::GreatAnd
            | TokenKind::LessGreat
            | TokenKind::DLessDash
            | TokenKind::Clobber
            | TokenKind::TLess
            | TokenKind::AndGreat
            | TokenKind::AndDGreat
    )
}

fn is_word_boundary(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')' | '<' | '>')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Does this word text have the shape of an assignment (NAME=, NAME+=,
/// NAME[sub]=)? Returns the index of '=' when it does.
pub fn assignment_eq_index(text: &str) -> Option<usize> {
    let chars: Vec<char> = text.chars().collect();
    let first = *chars.first()?;
    if !first.is_ascii_alphabetic() && first != '_' {
        return None;
    }
    let mut i = 0;
    while i < chars.len() && is_name_char(chars[i]) {
        i += 1;
    }
    if i == 0 {
        return None;
    }
    // Optional [subscript] with balanced brackets.
    if chars.get(i) == Some(&'[') {
        let mut depth = 0;
        while i < chars.len() {
            match chars[i] {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        if depth != 0 {
            return None;
        }
    }
    match (chars.get(i), chars.get(i + 1)) {
        (Some('='), _) => Some(i),
        (Some('+'), Some('=')) => Some(i + 1),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct PendingHeredoc {
    delimiter: String,
    strip_tabs: bool,
}

/// The lexer. One pass, single cursor, materialized output.
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    pending_heredocs: Vec<PendingHeredoc>,
    /// A here-doc operator was just emitted; the next word is its delimiter.
    expect_heredoc_delimiter: Option<bool>, // strip_tabs
    /// Inside [[ ]]: suppress here-doc handling for < and >.
    in_dbrack: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            pending_heredocs: Vec::new(),
            expect_heredoc_delimiter: None,
            in_dbrack: false,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        while self.pos < self.input.len() {
            self.skip_blanks();
            if self.pos >= self.input.len() {
                break;
            }
            let c = self.current();
            if c == '#' && self.at_word_start() {
                self.skip_comment();
                continue;
            }
            if c == '\n' {
                self.emit_newline()?;
                continue;
            }
            if self.try_operator()? {
                continue;
            }
            self.lex_word()?;
        }
        if !self.pending_heredocs.is_empty() {
            // EOF inside a here-document body.
            let delim = self.pending_heredocs[0].delimiter.clone();
            return Err(ParseError::incomplete(
                format!("here-document delimited by end-of-file (wanted `{}')", delim),
                self.line,
                self.column,
            ));
        }
        self.tokens.push(Token::eof(self.pos, self.line, self.column));
        Ok(self.tokens)
    }

    // -------------------------------------------------------------------------
    // cursor helpers
    // -------------------------------------------------------------------------

    fn current(&self) -> char {
        self.input[self.pos]
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> char {
        let c = self.input[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek(i) == Some(c))
    }

    fn skip_blanks(&mut self) {
        while self.pos < self.input.len() {
            match self.current() {
                ' ' | '\t' => {
                    self.advance();
                }
                // Line continuation between tokens.
                '\\' if self.peek(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while self.pos < self.input.len() && self.current() != '\n' {
            self.advance();
        }
    }

    /// True when a `#` begins a comment (start of input or after a blank or
    /// operator, never mid-word).
    fn at_word_start(&self) -> bool {
        if self.pos == 0 {
            return true;
        }
        let prev = self.input[self.pos - 1];
        is_word_boundary(prev)
    }

    /// Reserved words are only recognized in command position.
    fn at_command_position(&self) -> bool {
        for tok in self.tokens.iter().rev() {
            return match tok.kind {
                TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Amp
                | TokenKind::Pipe
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::DSemi
                | TokenKind::SemiAnd
                | TokenKind::SemiSemiAnd
                | TokenKind::LParen
                | TokenKind::LBrace
                | TokenKind::RParen
                | TokenKind::Bang
                | TokenKind::If
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::Elif
                | TokenKind::While
                | TokenKind::Until
                | TokenKind::Do
                | TokenKind::For
                | TokenKind::Time
                | TokenKind::In
                | TokenKind::HeredocBody
                | TokenKind::AssignmentWord => true,
                _ => false,
            };
        }
        true
    }

    // -------------------------------------------------------------------------
    // operators & newlines
    // -------------------------------------------------------------------------

    fn emit_op(&mut self, kind: TokenKind, len: usize) {
        let start = self.pos;
        let line = self.line;
        let column = self.column;
        let text: String = self.input[self.pos..self.pos + len].iter().collect();
        for _ in 0..len {
            self.advance();
        }
        self.tokens.push(Token::new(kind, text, start, self.pos, line, column));
    }

    fn emit_newline(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let line = self.line;
        let column = self.column;
        self.advance();
        self.tokens
            .push(Token::new(TokenKind::Newline, "\n", start, self.pos, line, column));
        if !self.pending_heredocs.is_empty() {
            self.collect_heredoc_bodies()?;
        }
        Ok(())
    }

    fn try_operator(&mut self) -> Result<bool, ParseError> {
        // (( in command position opens an arithmetic command; capture the
        // balanced inner text as one word so the parser can hand it to the
        // arithmetic parser.
        if self.starts_with("((") && self.at_command_position() {
            return self.lex_arith_command().map(|_| true);
        }
        if self.starts_with("[[") && self.at_command_position() {
            let after = self.peek(2);
            if after.is_none() || after.map(is_word_boundary) == Some(true) {
                self.emit_op(TokenKind::DBrackStart, 2);
                self.in_dbrack = true;
                return Ok(true);
            }
        }
        if self.in_dbrack && self.starts_with("]]") {
            let after = self.peek(2);
            if after.is_none() || after.map(is_word_boundary) == Some(true) {
                self.emit_op(TokenKind::DBrackEnd, 2);
                self.in_dbrack = false;
                return Ok(true);
            }
        }

        // Process substitution starts a word, not an operator.
        if (self.starts_with("<(") || self.starts_with(">(")) && !self.in_dbrack {
            return Ok(false);
        }

        for (text, kind) in THREE_CHAR_OPS {
            if self.starts_with(text) {
                self.emit_op(*kind, 3);
                if *kind == TokenKind::DLessDash {
                    self.expect_heredoc_delimiter = Some(true);
                }
                return Ok(true);
            }
        }
        for (text, kind) in TWO_CHAR_OPS {
            if self.starts_with(text) {
                self.emit_op(*kind, 2);
                if *kind == TokenKind::DLess && !self.in_dbrack {
                    self.expect_heredoc_delimiter = Some(false);
                }
                return Ok(true);
            }
        }

        let kind = match self.current() {
            '|' => Some(TokenKind::Pipe),
            '&' => Some(TokenKind::Amp),
            ';' => Some(TokenKind::Semicolon),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '<' => Some(TokenKind::Less),
            '>' => Some(TokenKind::Great),
            _ => None,
        };
        if let Some(kind) = kind {
            self.emit_op(kind, 1);
            return Ok(true);
        }

        // ! is a keyword only in command position; elsewhere it is word text.
        if self.current() == '!' && self.at_command_position() {
            let after = self.peek(1);
            if after.is_none() || after.map(is_word_boundary) == Some(true) {
                self.emit_op(TokenKind::Bang, 1);
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Lex `(( ... ))` into DParenStart, one Word holding the inner text,
    /// and DParenEnd.
    fn lex_arith_command(&mut self) -> Result<(), ParseError> {
        self.emit_op(TokenKind::DParenStart, 2);
        let start = self.pos;
        let line = self.line;
        let column = self.column;
        let mut depth: i32 = 0;
        loop {
            if self.pos >= self.input.len() {
                return Err(ParseError::incomplete(
                    "unexpected EOF while looking for matching `))'",
                    self.line,
                    self.column,
                ));
            }
            if depth == 0 && self.starts_with("))") {
                break;
            }
            match self.current() {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        let text: String = self.input[start..self.pos].iter().collect();
        self.tokens
            .push(Token::new(TokenKind::Word, text, start, self.pos, line, column));
        self.emit_op(TokenKind::DParenEnd, 2);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // words
    // -------------------------------------------------------------------------

    fn lex_word(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let line = self.line;
        let column = self.column;
        let mut text = String::new();
        let mut quoted = false;
        let mut single_quoted = false;

        // Process substitution glues the leading <( or >( into the word.
        if self.starts_with("<(") || self.starts_with(">(") {
            text.push(self.advance());
            text.push(self.advance());
            self.consume_balanced_parens(&mut text, 1)?;
        }

        while self.pos < self.input.len() {
            let c = self.current();
            if is_word_boundary(c) {
                // `=(` after an assignment prefix is an array literal.
                if c == '('
                    && (text.ends_with('=') )
                    && assignment_eq_index(&text).is_some()
                {
                    text.push(self.advance());
                    self.consume_balanced_parens(&mut text, 1)?;
                    continue;
                }
                // Extglob operator groups keep the parens inside the word.
                if c == '('
                    && matches!(text.chars().last(), Some('?' | '*' | '+' | '@' | '!'))
                {
                    text.push(self.advance());
                    self.consume_balanced_parens(&mut text, 1)?;
                    continue;
                }
                break;
            }
            match c {
                '\'' => {
                    single_quoted = true;
                    text.push(self.advance());
                    loop {
                        if self.pos >= self.input.len() {
                            return Err(ParseError::incomplete(
                                "unexpected EOF while looking for matching `''",
                                line,
                                column,
                            ));
                        }
                        let q = self.advance();
                        text.push(q);
                        if q == '\'' {
                            break;
                        }
                    }
                }
                '"' => {
                    quoted = true;
                    text.push(self.advance());
                    self.consume_double_quoted(&mut text, line, column)?;
                }
                '\\' => {
                    if self.peek(1) == Some('\n') {
                        // Line continuation disappears.
                        self.advance();
                        self.advance();
                        continue;
                    }
                    quoted = true;
                    text.push(self.advance());
                    if self.pos < self.input.len() {
                        text.push(self.advance());
                    }
                }
                '`' => {
                    text.push(self.advance());
                    self.consume_backquoted(&mut text, line, column)?;
                }
                '$' => {
                    text.push(self.advance());
                    match self.peek(0) {
                        Some('(') => {
                            text.push(self.advance());
                            self.consume_balanced_parens(&mut text, 1)?;
                        }
                        Some('{') => {
                            text.push(self.advance());
                            self.consume_balanced_braces(&mut text, 1)?;
                        }
                        _ => {}
                    }
                }
                _ => {
                    text.push(self.advance());
                }
            }
        }

        // Here-doc delimiter word.
        if let Some(strip_tabs) = self.expect_heredoc_delimiter.take() {
            let mut token = Token::new(TokenKind::Word, text.clone(), start, self.pos, line, column);
            token.quoted = quoted;
            token.single_quoted = single_quoted;
            self.pending_heredocs.push(PendingHeredoc {
                delimiter: token.unquoted_text(),
                strip_tabs,
            });
            self.tokens.push(token);
            return Ok(());
        }

        let mut kind = TokenKind::Word;
        if !quoted && !single_quoted {
            if let Some(reserved) = RESERVED_WORDS.get(text.as_str()) {
                if self.at_command_position() {
                    kind = *reserved;
                }
            }
            if text == "in" {
                // Contextual keyword; the parser checks position.
                kind = TokenKind::In;
            }
            if text == "{" && self.at_command_position() {
                kind = TokenKind::LBrace;
            }
            if text == "}" && self.at_command_position() {
                kind = TokenKind::RBrace;
            }
            if text.chars().all(|c| c.is_ascii_digit())
                && !text.is_empty()
                && matches!(self.peek(0), Some('<') | Some('>'))
            {
                kind = TokenKind::Number;
            }
            if assignment_eq_index(&text).is_some() {
                kind = TokenKind::AssignmentWord;
            }
        }

        let mut token = Token::new(kind, text, start, self.pos, line, column);
        token.quoted = quoted;
        token.single_quoted = single_quoted;
        self.tokens.push(token);
        Ok(())
    }

    fn consume_double_quoted(&mut self, text: &mut String, line: usize, column: usize) -> Result<(), ParseError> {
        loop {
            if self.pos >= self.input.len() {
                return Err(ParseError::incomplete(
                    "unexpected EOF while looking for matching `\"'",
                    line,
                    column,
                ));
            }
            let c = self.advance();
            match c {
                '"' => {
                    text.push(c);
                    return Ok(());
                }
                '\\' => {
                    if self.peek(0) == Some('\n') {
                        self.advance();
                        continue;
                    }
                    text.push(c);
                    if self.pos < self.input.len() {
                        text.push(self.advance());
                    }
                }
                '$' => {
                    text.push(c);
                    match self.peek(0) {
                        Some('(') => {
                            text.push(self.advance());
                            self.consume_balanced_parens(text, 1)?;
                        }
                        Some('{') => {
                            text.push(self.advance());
                            self.consume_balanced_braces(text, 1)?;
                        }
                        _ => {}
                    }
                }
                '`' => {
                    text.push(c);
                    self.consume_backquoted(text, line, column)?;
                }
                _ => text.push(c),
            }
        }
    }

    fn consume_backquoted(&mut self, text: &mut String, line: usize, column: usize) -> Result<(), ParseError> {
        loop {
            if self.pos >= self.input.len() {
                return Err(ParseError::incomplete(
                    "unexpected EOF while looking for matching ``'",
                    line,
                    column,
                ));
            }
            let c = self.advance();
            text.push(c);
            match c {
                '`' => return Ok(()),
                '\\' => {
                    if self.pos < self.input.len() {
                        text.push(self.advance());
                    }
                }
                _ => {}
            }
        }
    }

    /// Consume until parens balance back to zero, quote-aware.
    fn consume_balanced_parens(&mut self, text: &mut String, mut depth: i32) -> Result<(), ParseError> {
        while depth > 0 {
            if self.pos >= self.input.len() {
                return Err(ParseError::incomplete(
                    "unexpected EOF while looking for matching `)'",
                    self.line,
                    self.column,
                ));
            }
            let c = self.advance();
            text.push(c);
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                '\'' => {
                    while self.pos < self.input.len() {
                        let q = self.advance();
                        text.push(q);
                        if q == '\'' {
                            break;
                        }
                    }
                }
                '"' => {
                    while self.pos < self.input.len() {
                        let q = self.advance();
                        text.push(q);
                        if q == '\\' && self.pos < self.input.len() {
                            text.push(self.advance());
                        } else if q == '"' {
                            break;
                        }
                    }
                }
                '\\' => {
                    if self.pos < self.input.len() {
                        text.push(self.advance());
                    }
                }
                '#' => {
                    // Comment inside $( ... ) runs to end of line.
                    if text
                        .chars()
                        .rev()
                        .nth(1)
                        .map(|p| p.is_whitespace() || p == '(')
                        .unwrap_or(false)
                    {
                        while self.pos < self.input.len() && self.current() != '\n' {
                            text.push(self.advance());
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn consume_balanced_braces(&mut self, text: &mut String, mut depth: i32) -> Result<(), ParseError> {
        while depth > 0 {
            if self.pos >= self.input.len() {
                return Err(ParseError::incomplete(
                    "unexpected EOF while looking for matching `}'",
                    self.line,
                    self.column,
                ));
            }
            let c = self.advance();
            text.push(c);
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                '\'' => {
                    while self.pos < self.input.len() {
                        let q = self.advance();
                        text.push(q);
                        if q == '\'' {
                            break;
                        }
                    }
                }
                '\\' => {
                    if self.pos < self.input.len() {
                        text.push(self.advance());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // here-documents
    // -------------------------------------------------------------------------

    /// Read bodies for every pending here-doc, in registration order, and
    /// emit one HeredocBody token per body.
    fn collect_heredoc_bodies(&mut self) -> Result<(), ParseError> {
        let pending = std::mem::take(&mut self.pending_heredocs);
        for heredoc in pending {
            let start = self.pos;
            let line = self.line;
            let column = self.column;
            let mut body = String::new();
            let mut found = false;
            while self.pos < self.input.len() {
                let mut line_text = String::new();
                while self.pos < self.input.len() && self.current() != '\n' {
                    line_text.push(self.advance());
                }
                if self.pos < self.input.len() {
                    self.advance(); // the newline
                }
                let compare = if heredoc.strip_tabs {
                    line_text.trim_start_matches('\t')
                } else {
                    line_text.as_str()
                };
                if compare == heredoc.delimiter {
                    found = true;
                    break;
                }
                if heredoc.strip_tabs {
                    body.push_str(line_text.trim_start_matches('\t'));
                } else {
                    body.push_str(&line_text);
                }
                body.push('\n');
            }
            if !found {
                return Err(ParseError::incomplete(
                    format!(
                        "here-document delimited by end-of-file (wanted `{}')",
                        heredoc.delimiter
                    ),
                    line,
                    column,
                ));
            }
            self.tokens.push(Token::new(
                TokenKind::HeredocBody,
                body,
                start,
                self.pos,
                line,
                column,
            ));
        }
        Ok(())
    }
}

/// Convenience entry: tokenize a source string.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_command() {
        assert_eq!(
            kinds("echo hello world"),
            vec![TokenKind::Word, TokenKind::Word, TokenKind::Word, TokenKind::Eof]
        );
    }

    #[test]
    fn operators_max_munch() {
        assert_eq!(
            kinds("a && b || c"),
            vec![
                TokenKind::Word,
                TokenKind::AndAnd,
                TokenKind::Word,
                TokenKind::OrOr,
                TokenKind::Word,
                TokenKind::Eof
            ]
        );
        assert_eq!(kinds("a 2>&1")[1], TokenKind::Number);
        assert_eq!(kinds("a 2>&1")[2], TokenKind::GreatAnd);
    }

    #[test]
    fn case_terminators() {
        let k = kinds("case x in a) y ;; b) z ;& c) w ;;& esac");
        assert!(k.contains(&TokenKind::DSemi));
        assert!(k.contains(&TokenKind::SemiAnd));
        assert!(k.contains(&TokenKind::SemiSemiAnd));
    }

    #[test]
    fn reserved_words_only_in_command_position() {
        let toks = tokenize("if true; then echo if; fi").unwrap();
        assert_eq!(toks[0].kind, TokenKind::If);
        // The argument `if` stays a word.
        let word_if: Vec<_> = toks.iter().filter(|t| t.text == "if").collect();
        assert_eq!(word_if.len(), 2);
        assert_eq!(word_if[1].kind, TokenKind::Word);
    }

    #[test]
    fn assignment_words() {
        let toks = tokenize("FOO=bar cmd A[1]=x B+=y").unwrap();
        assert_eq!(toks[0].kind, TokenKind::AssignmentWord);
        assert_eq!(toks[1].kind, TokenKind::Word);
        assert_eq!(toks[2].kind, TokenKind::AssignmentWord);
        assert_eq!(toks[3].kind, TokenKind::AssignmentWord);
    }

    #[test]
    fn array_literal_stays_one_word() {
        let toks = tokenize("a=(1 2 3)").unwrap();
        assert_eq!(toks[0].kind, TokenKind::AssignmentWord);
        assert_eq!(toks[0].text, "a=(1 2 3)");
    }

    #[test]
    fn quotes_preserved_in_raw_text() {
        let toks = tokenize("echo 'a b' \"c d\"").unwrap();
        assert_eq!(toks[1].text, "'a b'");
        assert!(toks[1].single_quoted);
        assert_eq!(toks[2].text, "\"c d\"");
        assert!(toks[2].quoted);
    }

    #[test]
    fn command_substitution_kept_whole() {
        let toks = tokenize("echo $(ls -l | wc)").unwrap();
        assert_eq!(toks[1].text, "$(ls -l | wc)");
    }

    #[test]
    fn unterminated_quote_is_incomplete() {
        let err = tokenize("echo 'abc").unwrap_err();
        assert!(err.incomplete);
    }

    #[test]
    fn heredoc_body_collected() {
        let toks = tokenize("cat <<EOF\nline1\nline2\nEOF\n").unwrap();
        let body = toks.iter().find(|t| t.kind == TokenKind::HeredocBody).unwrap();
        assert_eq!(body.text, "line1\nline2\n");
    }

    #[test]
    fn heredoc_dash_strips_tabs() {
        let toks = tokenize("cat <<-EOF\n\tindented\n\tEOF\n").unwrap();
        let body = toks.iter().find(|t| t.kind == TokenKind::HeredocBody).unwrap();
        assert_eq!(body.text, "indented\n");
    }

    #[test]
    fn quoted_heredoc_delimiter() {
        let toks = tokenize("cat <<'EOF'\n$HOME\nEOF\n").unwrap();
        let delim = toks.iter().find(|t| t.text == "'EOF'").unwrap();
        assert!(delim.single_quoted);
        let body = toks.iter().find(|t| t.kind == TokenKind::HeredocBody).unwrap();
        assert_eq!(body.text, "$HOME\n");
    }

    #[test]
    fn arith_command_lexes_as_unit() {
        let toks = tokenize("((x = 1 + 2))").unwrap();
        assert_eq!(toks[0].kind, TokenKind::DParenStart);
        assert_eq!(toks[1].text, "x = 1 + 2");
        assert_eq!(toks[2].kind, TokenKind::DParenEnd);
    }

    #[test]
    fn dbrack_tokens() {
        let k = kinds("[[ -f x && $a == y ]]");
        assert_eq!(k[0], TokenKind::DBrackStart);
        assert!(k.contains(&TokenKind::AndAnd));
        assert_eq!(k[k.len() - 2], TokenKind::DBrackEnd);
    }

    #[test]
    fn line_continuation_removed() {
        let toks = tokenize("echo a\\\nb").unwrap();
        assert_eq!(toks[1].text, "ab");
    }

    #[test]
    fn process_substitution_is_word() {
        let toks = tokenize("diff <(ls) <(ls -a)").unwrap();
        assert_eq!(toks[1].kind, TokenKind::Word);
        assert_eq!(toks[1].text, "<(ls)");
        assert_eq!(toks[2].text, "<(ls -a)");
    }

    #[test]
    fn comment_skipped() {
        assert_eq!(
            kinds("echo a # comment\necho b"),
            vec![
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Newline,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Eof
            ]
        );
    }
}
