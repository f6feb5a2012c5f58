//! Abstract Syntax Tree Types
//!
//! The complete AST for shell scripts. Word parts keep their quote types so
//! the expansion engine knows what to split and glob; case items keep their
//! terminators; redirections attach to simple and compound commands alike.

use std::fmt;

// =============================================================================
// SCRIPT & STATEMENTS
// =============================================================================

/// Root node: a complete script.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptNode {
    pub statements: Vec<StatementNode>,
}

/// Pipelines joined by `&&` / `||` / `;`, optionally backgrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementNode {
    pub pipelines: Vec<PipelineNode>,
    /// Operators between pipelines; `operators.len() == pipelines.len() - 1`.
    pub operators: Vec<AndOrOperator>,
    pub background: bool,
    /// Source line for $LINENO and job listings.
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndOrOperator {
    And, // &&
    Or,  // ||
}

// =============================================================================
// PIPELINES & COMMANDS
// =============================================================================

/// `! cmd1 | cmd2 | cmd3`
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineNode {
    pub commands: Vec<CommandNode>,
    /// Negate the final exit status with `!`.
    pub negated: bool,
    /// Prefixed with the `time` keyword.
    pub timed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandNode {
    Simple(SimpleCommandNode),
    Compound(CompoundCommandNode),
    FunctionDef(FunctionDefNode),
}

/// `VAR=v name args... < redirects`
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCommandNode {
    pub assignments: Vec<AssignmentNode>,
    pub name: Option<WordNode>,
    pub args: Vec<WordNode>,
    pub redirections: Vec<RedirectionNode>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompoundCommandNode {
    If(IfNode),
    For(ForNode),
    CStyleFor(CStyleForNode),
    While(WhileNode),
    Until(UntilNode),
    Case(CaseNode),
    Select(SelectNode),
    Subshell(SubshellNode),
    Group(GroupNode),
    Arithmetic(ArithmeticCommandNode),
    Conditional(ConditionalCommandNode),
}

impl CompoundCommandNode {
    pub fn redirections(&self) -> &[RedirectionNode] {
        match self {
            Self::If(n) => &n.redirections,
            Self::For(n) => &n.redirections,
            Self::CStyleFor(n) => &n.redirections,
            Self::While(n) => &n.redirections,
            Self::Until(n) => &n.redirections,
            Self::Case(n) => &n.redirections,
            Self::Select(n) => &n.redirections,
            Self::Subshell(n) => &n.redirections,
            Self::Group(n) => &n.redirections,
            Self::Arithmetic(n) => &n.redirections,
            Self::Conditional(n) => &n.redirections,
        }
    }

    pub fn redirections_mut(&mut self) -> &mut Vec<RedirectionNode> {
        match self {
            Self::If(n) => &mut n.redirections,
            Self::For(n) => &mut n.redirections,
            Self::CStyleFor(n) => &mut n.redirections,
            Self::While(n) => &mut n.redirections,
            Self::Until(n) => &mut n.redirections,
            Self::Case(n) => &mut n.redirections,
            Self::Select(n) => &mut n.redirections,
            Self::Subshell(n) => &mut n.redirections,
            Self::Group(n) => &mut n.redirections,
            Self::Arithmetic(n) => &mut n.redirections,
            Self::Conditional(n) => &mut n.redirections,
        }
    }
}

// =============================================================================
// CONTROL FLOW
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub clauses: Vec<IfClause>,
    pub else_body: Option<Vec<StatementNode>>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Vec<StatementNode>,
    pub body: Vec<StatementNode>,
}

/// `for VAR [in words]; do body; done` (no `in` clause means `"$@"`)
#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    pub variable: String,
    pub words: Option<Vec<WordNode>>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// `for ((init; cond; update)); do body; done`
#[derive(Debug, Clone, PartialEq)]
pub struct CStyleForNode {
    pub init: Option<ArithExpr>,
    pub condition: Option<ArithExpr>,
    pub update: Option<ArithExpr>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileNode {
    pub condition: Vec<StatementNode>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UntilNode {
    pub condition: Vec<StatementNode>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseNode {
    pub word: WordNode,
    pub items: Vec<CaseItemNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseItemNode {
    pub patterns: Vec<WordNode>,
    pub body: Vec<StatementNode>,
    pub terminator: CaseTerminator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    /// `;;` stop matching
    Break,
    /// `;&` fall through to the next body without re-matching
    FallThrough,
    /// `;;&` keep testing subsequent patterns
    Continue,
}

/// `select VAR [in words]; do body; done`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectNode {
    pub variable: String,
    pub words: Option<Vec<WordNode>>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubshellNode {
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// `(( expr ))`
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticCommandNode {
    pub expression: ArithExpr,
    pub redirections: Vec<RedirectionNode>,
}

/// `[[ expr ]]`
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalCommandNode {
    pub expression: CondExpr,
    pub redirections: Vec<RedirectionNode>,
}

// =============================================================================
// FUNCTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefNode {
    pub name: String,
    pub body: Box<CompoundCommandNode>,
    pub redirections: Vec<RedirectionNode>,
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

/// `NAME=value`, `NAME+=value`, `NAME[sub]=value`, `NAME=(a b c)`
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentNode {
    pub name: String,
    /// Array subscript, expanded then evaluated at assignment time.
    pub subscript: Option<WordNode>,
    pub value: Option<WordNode>,
    pub append: bool,
    /// `NAME=(...)` initialization elements.
    pub array: Option<Vec<ArrayElementNode>>,
}

/// One element of an array initialization; `[k]=v` carries the key.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayElementNode {
    pub key: Option<WordNode>,
    pub value: WordNode,
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RedirectionNode {
    /// Explicit fd; defaults depend on the operator.
    pub fd: Option<i32>,
    pub operator: RedirectionOperator,
    pub target: RedirectionTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedirectionTarget {
    Word(WordNode),
    HereDoc(HereDocNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionOperator {
    Less,        // <
    Great,       // >
    DGreat,      // >>
    LessAnd,     // <&
    GreatAnd,    // >&
    LessGreat,   // <>
    Clobber,     // >|
    AndGreat,    // &>
    AndDGreat,   // &>>
    HereString,  // <<<
    HereDoc,     // <<
    HereDocDash, // <<-
}

impl fmt::Display for RedirectionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Less => "<",
            Self::Great => ">",
            Self::DGreat => ">>",
            Self::LessAnd => "<&",
            Self::GreatAnd => ">&",
            Self::LessGreat => "<>",
            Self::Clobber => ">|",
            Self::AndGreat => "&>",
            Self::AndDGreat => "&>>",
            Self::HereString => "<<<",
            Self::HereDoc => "<<",
            Self::HereDocDash => "<<-",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HereDocNode {
    pub delimiter: String,
    /// Raw body text; expanded at execution unless `quoted`.
    pub body: String,
    pub strip_tabs: bool,
    pub quoted: bool,
}

// =============================================================================
// WORDS
// =============================================================================

/// A single shell word: a run of typed parts joined without separators.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WordNode {
    pub parts: Vec<WordPart>,
}

impl WordNode {
    pub fn literal(text: impl Into<String>) -> Self {
        WordNode {
            parts: vec![WordPart::Literal(text.into())],
        }
    }

    /// The word's text when it is a plain literal (no expansions, quotes
    /// collapsed). Used for function names, for-loop variables, delimiters.
    pub fn as_literal(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                WordPart::Literal(s) | WordPart::SingleQuoted(s) | WordPart::Escaped(s) => {
                    out.push_str(s)
                }
                WordPart::DoubleQuoted(parts) => {
                    for p in parts {
                        match p {
                            WordPart::Literal(s) | WordPart::Escaped(s) => out.push_str(s),
                            _ => return None,
                        }
                    }
                }
                _ => return None,
            }
        }
        Some(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    /// Bare text.
    Literal(String),
    /// 'single quoted'
    SingleQuoted(String),
    /// "double quoted" — inner parts expand but never split.
    DoubleQuoted(Vec<WordPart>),
    /// Backslash-escaped character(s), always literal.
    Escaped(String),
    /// `$name`, `${name}`, `${name<op>...}`
    Parameter(ParameterPart),
    /// `$(script)` or `` `script` ``
    CommandSub(CommandSubPart),
    /// `$((expr))`
    ArithSub(ArithExpr),
    /// `<(script)` / `>(script)`
    ProcessSub(ProcessSubPart),
    /// `{a,b}` / `{1..9}` — expanded as the first phase.
    Brace(BracePart),
    /// Leading `~` or `~user`.
    Tilde(Option<String>),
}

// =============================================================================
// PARAMETER EXPANSION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPart {
    /// Identifier, digit string, or one of `? $ ! # @ * 0 - _`.
    pub name: String,
    /// Array subscript: `@`, `*`, or an index expression word.
    pub subscript: Option<Subscript>,
    pub operation: Option<ParameterOperation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Subscript {
    All,  // [@]
    Star, // [*]
    Index(WordNode),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterOperation {
    /// `${#v}` string length / element count
    Length,
    /// `${!v}` indirect through the value of v
    Indirect,
    /// `${!arr[@]}` / `${!arr[*]}` list of keys
    Keys { star: bool },
    /// `${!prefix@}` / `${!prefix*}` variable names with prefix
    NamePrefix { star: bool },
    /// `${v:-w}` / `${v-w}`
    Default { word: WordNode, check_empty: bool },
    /// `${v:=w}` / `${v=w}`
    AssignDefault { word: WordNode, check_empty: bool },
    /// `${v:?w}` / `${v?w}`
    ErrorIfUnset {
        word: Option<WordNode>,
        check_empty: bool,
    },
    /// `${v:+w}` / `${v+w}`
    Alternative { word: WordNode, check_empty: bool },
    /// `${v#p}` / `${v##p}`
    RemovePrefix { pattern: WordNode, greedy: bool },
    /// `${v%p}` / `${v%%p}`
    RemoveSuffix { pattern: WordNode, greedy: bool },
    /// `${v/p/r}` / `${v//p/r}` / `${v/#p/r}` / `${v/%p/r}`
    Replace {
        pattern: WordNode,
        replacement: Option<WordNode>,
        all: bool,
        anchor: Option<ReplaceAnchor>,
    },
    /// `${v:off}` / `${v:off:len}` — operands arithmetic-evaluated.
    Substring {
        offset: WordNode,
        length: Option<WordNode>,
    },
    /// `${v^p}` / `${v^^p}` / `${v,p}` / `${v,,p}`
    CaseMod {
        upper: bool,
        all: bool,
        pattern: Option<WordNode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceAnchor {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandSubPart {
    pub body: ScriptNode,
    /// Backtick form.
    pub legacy: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSubPart {
    pub body: ScriptNode,
    pub direction: ProcessSubDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSubDirection {
    /// `<(...)` the command writes, the consumer reads
    Read,
    /// `>(...)` the command reads, the consumer writes
    Write,
}

// =============================================================================
// BRACE EXPANSION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BracePart {
    pub items: Vec<BraceItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BraceItem {
    Word(WordNode),
    NumberRange {
        start: i64,
        end: i64,
        step: i64,
        /// Zero-pad width when the endpoints carried leading zeros.
        width: usize,
    },
    CharRange {
        start: char,
        end: char,
        step: i64,
    },
}

// =============================================================================
// ARITHMETIC
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ArithExpr {
    Number(i64),
    Var(String),
    /// `arr[expr]` read
    Element {
        name: String,
        index: Box<ArithExpr>,
    },
    /// `arr[key]` read where the key is a plain word (associative arrays)
    AssocElement { name: String, key: String },
    Unary {
        op: ArithUnaryOp,
        operand: Box<ArithExpr>,
    },
    /// `++x` / `x--` and friends
    IncrDecr {
        target: ArithTarget,
        increment: bool,
        prefix: bool,
    },
    Binary {
        op: ArithBinaryOp,
        left: Box<ArithExpr>,
        right: Box<ArithExpr>,
    },
    Ternary {
        condition: Box<ArithExpr>,
        consequent: Box<ArithExpr>,
        alternate: Box<ArithExpr>,
    },
    Assign {
        op: ArithAssignOp,
        target: ArithTarget,
        value: Box<ArithExpr>,
    },
}

/// The left side of an arithmetic assignment or increment.
#[derive(Debug, Clone, PartialEq)]
pub enum ArithTarget {
    Var(String),
    Element {
        name: String,
        index: Box<ArithExpr>,
    },
    AssocElement { name: String, key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithUnaryOp {
    Negate,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    ShiftLeft,
    ShiftRight,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithAssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    ShiftLeft,
    ShiftRight,
    And,
    Or,
    Xor,
}

// =============================================================================
// CONDITIONAL EXPRESSIONS ([[ ]])
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CondExpr {
    Binary {
        op: CondBinaryOp,
        left: WordNode,
        right: WordNode,
    },
    Unary {
        op: CondUnaryOp,
        operand: WordNode,
    },
    Not(Box<CondExpr>),
    And(Box<CondExpr>, Box<CondExpr>),
    Or(Box<CondExpr>, Box<CondExpr>),
    /// Bare word: true when non-empty.
    Word(WordNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondBinaryOp {
    StrEq,     // = / ==  (pattern match)
    StrNe,     // !=      (pattern mismatch)
    Regex,     // =~
    StrLt,     // <
    StrGt,     // >
    NumEq,     // -eq
    NumNe,     // -ne
    NumLt,     // -lt
    NumLe,     // -le
    NumGt,     // -gt
    NumGe,     // -ge
    NewerThan, // -nt
    OlderThan, // -ot
    SameFile,  // -ef
}

impl CondBinaryOp {
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "=" | "==" => Self::StrEq,
            "!=" => Self::StrNe,
            "=~" => Self::Regex,
            "<" => Self::StrLt,
            ">" => Self::StrGt,
            "-eq" => Self::NumEq,
            "-ne" => Self::NumNe,
            "-lt" => Self::NumLt,
            "-le" => Self::NumLe,
            "-gt" => Self::NumGt,
            "-ge" => Self::NumGe,
            "-nt" => Self::NewerThan,
            "-ot" => Self::OlderThan,
            "-ef" => Self::SameFile,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondUnaryOp {
    BlockSpecial,  // -b
    CharSpecial,   // -c
    Directory,     // -d
    Exists,        // -e
    RegularFile,   // -f
    SetGid,        // -g
    Symlink,       // -h / -L
    Sticky,        // -k
    NamedPipe,     // -p
    Readable,      // -r
    NonEmptyFile,  // -s
    Terminal,      // -t
    SetUid,        // -u
    Writable,      // -w
    Executable,    // -x
    OwnedByEuid,   // -O
    OwnedByEgid,   // -G
    Socket,        // -S
    ZeroLength,    // -z
    NonZeroLength, // -n
    OptionEnabled, // -o
    VarSet,        // -v
}

impl CondUnaryOp {
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "-b" => Self::BlockSpecial,
            "-c" => Self::CharSpecial,
            "-d" => Self::Directory,
            "-e" => Self::Exists,
            "-f" => Self::RegularFile,
            "-g" => Self::SetGid,
            "-h" | "-L" => Self::Symlink,
            "-k" => Self::Sticky,
            "-p" => Self::NamedPipe,
            "-r" => Self::Readable,
            "-s" => Self::NonEmptyFile,
            "-t" => Self::Terminal,
            "-u" => Self::SetUid,
            "-w" => Self::Writable,
            "-x" => Self::Executable,
            "-O" => Self::OwnedByEuid,
            "-G" => Self::OwnedByEgid,
            "-S" => Self::Socket,
            "-z" => Self::ZeroLength,
            "-n" => Self::NonZeroLength,
            "-o" => Self::OptionEnabled,
            "-v" => Self::VarSet,
            _ => return None,
        })
    }
}

// =============================================================================
// FACTORY
// =============================================================================

/// Small builder façade used by the parser and tests.
pub struct Ast;

impl Ast {
    pub fn script(statements: Vec<StatementNode>) -> ScriptNode {
        ScriptNode { statements }
    }

    pub fn statement(pipelines: Vec<PipelineNode>, operators: Vec<AndOrOperator>) -> StatementNode {
        StatementNode {
            pipelines,
            operators,
            background: false,
            line: 0,
        }
    }

    pub fn pipeline(commands: Vec<CommandNode>) -> PipelineNode {
        PipelineNode {
            commands,
            negated: false,
            timed: false,
        }
    }

    pub fn simple(
        name: Option<WordNode>,
        args: Vec<WordNode>,
        assignments: Vec<AssignmentNode>,
        redirections: Vec<RedirectionNode>,
    ) -> SimpleCommandNode {
        SimpleCommandNode {
            assignments,
            name,
            args,
            redirections,
            line: 0,
        }
    }

    pub fn word(parts: Vec<WordPart>) -> WordNode {
        WordNode { parts }
    }

    pub fn param(name: impl Into<String>) -> WordPart {
        WordPart::Parameter(ParameterPart {
            name: name.into(),
            subscript: None,
            operation: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_as_literal_collapses_quotes() {
        let word = Ast::word(vec![
            WordPart::Literal("a".into()),
            WordPart::SingleQuoted("b c".into()),
            WordPart::DoubleQuoted(vec![WordPart::Literal("d".into())]),
        ]);
        assert_eq!(word.as_literal(), Some("ab cd".to_string()));
    }

    #[test]
    fn word_as_literal_rejects_expansions() {
        let word = Ast::word(vec![Ast::param("HOME")]);
        assert_eq!(word.as_literal(), None);
    }

    #[test]
    fn cond_op_lookup() {
        assert_eq!(CondBinaryOp::from_str("-eq"), Some(CondBinaryOp::NumEq));
        assert_eq!(CondBinaryOp::from_str("=~"), Some(CondBinaryOp::Regex));
        assert_eq!(CondUnaryOp::from_str("-f"), Some(CondUnaryOp::RegularFile));
        assert_eq!(CondBinaryOp::from_str("-zz"), None);
    }
}
