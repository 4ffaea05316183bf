//! Abstract Syntax Tree (AST) Types for Bash
//!
//! This module defines the AST structure the layout engine works on.
//! Every node that a line-break decision can hinge on carries its source
//! position; comments are kept out of the tree in a position-ordered list.

use std::fmt;

// =============================================================================
// BASE TYPES
// =============================================================================

/// Position in the original source, 1-based.
///
/// A line of 0 means the position is unknown, e.g. a `;;` the parser
/// synthesized for a case arm that had none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Position { line, col }
    }

    /// Position at the start of a line, when the column is not relevant.
    pub fn at_line(line: usize) -> Self {
        Position { line, col: 0 }
    }

    pub fn is_set(&self) -> bool {
        self.line > 0
    }

    /// Strictly after `other` in source order.
    pub fn after(&self, other: Position) -> bool {
        self.line > other.line || (self.line == other.line && self.col > other.col)
    }
}

/// A comment detached from the tree: the position of its `#` and the text
/// following it, excluding the newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub hash: Position,
    pub text: String,
}

// =============================================================================
// SCRIPT & STATEMENTS
// =============================================================================

/// Root node: a complete script plus its comment channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub stmts: Vec<Stmt>,
    /// Comments ordered by source position; empty when the parser was told
    /// to drop them.
    pub comments: Vec<Comment>,
}

/// A statement: optional assignments and redirections around one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub pos: Position,
    /// Negate exit status with !
    pub negated: bool,
    /// Variable assignments before the command: VAR=value cmd
    pub assigns: Vec<Assign>,
    /// The command itself; None for assignment- or redirection-only lines
    pub cmd: Option<Command>,
    pub redirs: Vec<Redirect>,
    /// Run in background with &
    pub background: bool,
}

/// Variable assignment: VAR=value or VAR+=value.
///
/// A missing name means a positional assignment, as found inside `declare`
/// option lists; only the value is printed then.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub name: Option<String>,
    pub append: bool,
    pub value: Word,
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

/// I/O redirection
#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    pub pos: Position,
    /// File descriptor before the operator, e.g. the 2 in 2>&1
    pub n: Option<String>,
    pub op: RedirOp,
    pub word: Word,
    /// Body of a heredoc, terminated by `word` with its quoting removed
    pub hdoc: Option<Word>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirOp {
    Less,      // <
    Great,     // >
    DGreat,    // >>
    GreatAnd,  // >&
    LessAnd,   // <&
    LessGreat, // <>
    Clobber,   // >|
    AndGreat,  // &>
    AndDGreat, // &>>
    TLess,     // <<<
    DLess,     // <<
    DLessDash, // <<-
}

impl RedirOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::Great => ">",
            Self::DGreat => ">>",
            Self::GreatAnd => ">&",
            Self::LessAnd => "<&",
            Self::LessGreat => "<>",
            Self::Clobber => ">|",
            Self::AndGreat => "&>",
            Self::AndDGreat => "&>>",
            Self::TLess => "<<<",
            Self::DLess => "<<",
            Self::DLessDash => "<<-",
        }
    }

    /// Whether the operator introduces a heredoc body.
    pub fn is_heredoc(&self) -> bool {
        matches!(self, Self::DLess | Self::DLessDash)
    }
}

impl fmt::Display for RedirOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Union of all command types
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Simple(SimpleCmd),
    Binary(Box<BinaryCmd>),
    Subshell(Subshell),
    Block(Block),
    If(IfClause),
    While(WhileClause),
    Until(WhileClause),
    For(ForClause),
    Case(CaseClause),
    FuncDecl(FuncDecl),
    Decl(DeclClause),
    Eval(EvalClause),
    Let(LetClause),
    Arithm(ArithmCmd),
}

/// Simple command: a list of argument words, the first being the name
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCmd {
    pub args: Vec<Word>,
}

/// Two statements joined by a shell binary operator.
///
/// Chains like `a && b && c` nest to the right, each operand wrapped in its
/// own `Stmt`, so the printer can tell the head of a chain from its tail.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryCmd {
    pub op: BinCmdOp,
    pub x: Stmt,
    pub y: Stmt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinCmdOp {
    And,     // &&
    Or,      // ||
    Pipe,    // |
    PipeAll, // |&
}

impl BinCmdOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::Pipe => "|",
            Self::PipeAll => "|&",
        }
    }
}

impl fmt::Display for BinCmdOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subshell: ( ... )
#[derive(Debug, Clone, PartialEq)]
pub struct Subshell {
    pub stmts: Vec<Stmt>,
    pub rparen: Position,
}

/// Command group: { ...; }
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub rbrace: Position,
}

// =============================================================================
// CONTROL FLOW
// =============================================================================

/// if statement, with any number of elif branches
#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub cond: Cond,
    pub then_pos: Position,
    pub then_stmts: Vec<Stmt>,
    pub elifs: Vec<Elif>,
    pub else_branch: Option<ElseClause>,
    pub fi: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Elif {
    pub pos: Position,
    pub cond: Cond,
    pub then_pos: Position,
    pub then_stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseClause {
    pub pos: Position,
    pub stmts: Vec<Stmt>,
}

/// Condition of an if, while or until: either a statement list or a
/// C-style arithmetic condition (( expr )).
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    Stmts(Vec<Stmt>),
    CStyle(ArithmExpr),
}

/// while or until loop; the two only differ in their keyword
#[derive(Debug, Clone, PartialEq)]
pub struct WhileClause {
    pub cond: Cond,
    pub do_pos: Position,
    pub do_stmts: Vec<Stmt>,
    pub done_pos: Position,
}

/// for loop, in either of its two header forms
#[derive(Debug, Clone, PartialEq)]
pub struct ForClause {
    pub cond: ForCond,
    pub do_pos: Position,
    pub do_stmts: Vec<Stmt>,
    pub done_pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForCond {
    Words(WordIter),
    CStyle(CStyleLoop),
}

/// for VAR in WORDS; an empty list means iterating "$@"
#[derive(Debug, Clone, PartialEq)]
pub struct WordIter {
    pub name: String,
    pub list: Vec<Word>,
}

/// for ((init; cond; post))
#[derive(Debug, Clone, PartialEq)]
pub struct CStyleLoop {
    pub init: ArithmExpr,
    pub cond: ArithmExpr,
    pub post: ArithmExpr,
}

/// Standalone arithmetic command: (( expr ))
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmCmd {
    pub x: ArithmExpr,
}

/// case statement
#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    pub word: Word,
    pub items: Vec<CaseItem>,
    pub esac: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseItem {
    pub patterns: Vec<Word>,
    pub stmts: Vec<Stmt>,
    /// Position of the closing ;; — unset when the source omitted it
    pub dsemi: Position,
}

// =============================================================================
// FUNCTIONS & DECLARATIONS
// =============================================================================

/// Function definition, in POSIX `name()` or bash `function name` style
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub bash_style: bool,
    pub body: Box<Stmt>,
}

/// declare/local with options and assignments
#[derive(Debug, Clone, PartialEq)]
pub struct DeclClause {
    pub local: bool,
    pub opts: Vec<Word>,
    pub assigns: Vec<Assign>,
}

/// eval with its single statement argument
#[derive(Debug, Clone, PartialEq)]
pub struct EvalClause {
    pub stmt: Box<Stmt>,
}

/// let with one or more arithmetic expressions
#[derive(Debug, Clone, PartialEq)]
pub struct LetClause {
    pub exprs: Vec<ArithmExpr>,
}

// =============================================================================
// WORDS
// =============================================================================

/// A word: a run of parts that the shell would treat as one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub pos: Position,
    pub parts: Vec<WordPart>,
}

/// Parts that can make up a word
#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    Lit(String),
    SglQuoted(SglQuoted),
    DblQuoted(DblQuoted),
    ParamExp(ParamExp),
    CmdSubst(CmdSubst),
    ArithmExpand(ArithmExpand),
    CmdInput(CmdInput),
    Array(ArrayExpr),
}

/// Single-quoted string: 'literal' or $'ansi-c'
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SglQuoted {
    pub dollar: bool,
    pub value: String,
}

/// Double-quoted string: "with $expansion" or $"localized"
#[derive(Debug, Clone, PartialEq)]
pub struct DblQuoted {
    pub dollar: bool,
    pub parts: Vec<WordPart>,
}

/// Command substitution: $(cmd) or `cmd`
#[derive(Debug, Clone, PartialEq)]
pub struct CmdSubst {
    pub stmts: Vec<Stmt>,
    pub backquotes: bool,
    pub right: Position,
}

/// Arithmetic expansion: $((expr))
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmExpand {
    pub x: ArithmExpr,
}

/// Input process substitution: <(cmd)
#[derive(Debug, Clone, PartialEq)]
pub struct CmdInput {
    pub stmts: Vec<Stmt>,
}

/// Array literal: (a b c)
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpr {
    pub list: Vec<Word>,
}

// =============================================================================
// PARAMETER EXPANSION
// =============================================================================

/// Parameter expansion: $VAR in short form, ${VAR...} otherwise
#[derive(Debug, Clone, PartialEq)]
pub struct ParamExp {
    pub short: bool,
    /// ${#VAR}
    pub length: bool,
    pub param: String,
    /// ${VAR[index]}
    pub ind: Option<Word>,
    /// ${VAR/pattern/replacement}
    pub repl: Option<Replace>,
    /// ${VAR<op>word} for every other operator
    pub exp: Option<Expansion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Replace {
    pub all: bool,
    pub orig: Word,
    pub with: Word,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub op: ParamOp,
    pub word: Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamOp {
    DefaultValue,   // :-
    DefaultUnset,   // -
    AssignDefault,  // :=
    AssignUnset,    // =
    ErrorIfUnset,   // :?
    ErrorUnset,     // ?
    AltValue,       // :+
    AltUnset,       // +
    RemSmallPrefix, // #
    RemLargePrefix, // ##
    RemSmallSuffix, // %
    RemLargeSuffix, // %%
}

impl ParamOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultValue => ":-",
            Self::DefaultUnset => "-",
            Self::AssignDefault => ":=",
            Self::AssignUnset => "=",
            Self::ErrorIfUnset => ":?",
            Self::ErrorUnset => "?",
            Self::AltValue => ":+",
            Self::AltUnset => "+",
            Self::RemSmallPrefix => "#",
            Self::RemLargePrefix => "##",
            Self::RemSmallSuffix => "%",
            Self::RemLargeSuffix => "%%",
        }
    }
}

impl fmt::Display for ParamOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ARITHMETIC
// =============================================================================

/// Arithmetic expression, as found in $(( )), (( )), let and C-style loops
#[derive(Debug, Clone, PartialEq)]
pub enum ArithmExpr {
    Word(Word),
    Unary(Box<UnaryArithm>),
    Binary(Box<BinaryArithm>),
    Paren(Box<ParenArithm>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryArithm {
    pub op: ArithUnaryOp,
    pub post: bool,
    pub x: ArithmExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryArithm {
    pub op: ArithBinOp,
    pub x: ArithmExpr,
    pub y: ArithmExpr,
}

/// Parenthesized sub-expression
#[derive(Debug, Clone, PartialEq)]
pub struct ParenArithm {
    pub x: ArithmExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithUnaryOp {
    Inc,    // ++
    Dec,    // --
    Not,    // !
    BitNot, // ~
    Plus,   // +
    Minus,  // -
}

impl ArithUnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inc => "++",
            Self::Dec => "--",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Plus => "+",
            Self::Minus => "-",
        }
    }
}

impl fmt::Display for ArithUnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    LShift,
    RShift,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitOr,
    BitXor,
    LogAnd,
    LogOr,
    Comma,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    LShiftAssign,
    RShiftAssign,
    AndAssign,
    OrAssign,
    XorAssign,
}

impl ArithBinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::LogAnd => "&&",
            Self::LogOr => "||",
            Self::Comma => ",",
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::ModAssign => "%=",
            Self::LShiftAssign => "<<=",
            Self::RShiftAssign => ">>=",
            Self::AndAssign => "&=",
            Self::OrAssign => "|=",
            Self::XorAssign => "^=",
        }
    }
}

impl fmt::Display for ArithBinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// FACTORY FUNCTIONS (AST builders)
// =============================================================================

/// AST factory for building nodes
pub struct Ast;

impl Ast {
    pub fn script(stmts: Vec<Stmt>) -> Script {
        Script {
            stmts,
            comments: Vec::new(),
        }
    }

    pub fn script_with_comments(stmts: Vec<Stmt>, comments: Vec<Comment>) -> Script {
        Script { stmts, comments }
    }

    pub fn comment(line: usize, text: impl Into<String>) -> Comment {
        Comment {
            hash: Position::at_line(line),
            text: text.into(),
        }
    }

    pub fn stmt(pos: Position, cmd: Command) -> Stmt {
        Stmt {
            pos,
            negated: false,
            assigns: Vec::new(),
            cmd: Some(cmd),
            redirs: Vec::new(),
            background: false,
        }
    }

    /// Statement carrying only assignments and/or redirections.
    pub fn stmt_bare(pos: Position) -> Stmt {
        Stmt {
            pos,
            negated: false,
            assigns: Vec::new(),
            cmd: None,
            redirs: Vec::new(),
            background: false,
        }
    }

    pub fn word(pos: Position, parts: Vec<WordPart>) -> Word {
        Word { pos, parts }
    }

    pub fn lit(value: impl Into<String>) -> WordPart {
        WordPart::Lit(value.into())
    }

    pub fn lit_word(pos: Position, value: impl Into<String>) -> Word {
        Word {
            pos,
            parts: vec![WordPart::Lit(value.into())],
        }
    }

    pub fn sgl_quoted(dollar: bool, value: impl Into<String>) -> WordPart {
        WordPart::SglQuoted(SglQuoted {
            dollar,
            value: value.into(),
        })
    }

    pub fn dbl_quoted(dollar: bool, parts: Vec<WordPart>) -> WordPart {
        WordPart::DblQuoted(DblQuoted { dollar, parts })
    }

    pub fn param_short(param: impl Into<String>) -> WordPart {
        WordPart::ParamExp(ParamExp {
            short: true,
            length: false,
            param: param.into(),
            ind: None,
            repl: None,
            exp: None,
        })
    }

    pub fn param(param: impl Into<String>) -> ParamExp {
        ParamExp {
            short: false,
            length: false,
            param: param.into(),
            ind: None,
            repl: None,
            exp: None,
        }
    }

    pub fn cmd_subst(stmts: Vec<Stmt>, backquotes: bool, right: Position) -> WordPart {
        WordPart::CmdSubst(CmdSubst {
            stmts,
            backquotes,
            right,
        })
    }

    pub fn arithm_expand(x: ArithmExpr) -> WordPart {
        WordPart::ArithmExpand(ArithmExpand { x })
    }

    pub fn assign(name: impl Into<String>, append: bool, value: Word) -> Assign {
        Assign {
            name: Some(name.into()),
            append,
            value,
        }
    }

    pub fn redirect(pos: Position, op: RedirOp, word: Word) -> Redirect {
        Redirect {
            pos,
            n: None,
            op,
            word,
            hdoc: None,
        }
    }

    pub fn heredoc(pos: Position, op: RedirOp, delim: Word, body: Word) -> Redirect {
        Redirect {
            pos,
            n: None,
            op,
            word: delim,
            hdoc: Some(body),
        }
    }

    pub fn simple(args: Vec<Word>) -> Command {
        Command::Simple(SimpleCmd { args })
    }

    pub fn binary(op: BinCmdOp, x: Stmt, y: Stmt) -> Command {
        Command::Binary(Box::new(BinaryCmd { op, x, y }))
    }

    pub fn subshell(stmts: Vec<Stmt>, rparen: Position) -> Command {
        Command::Subshell(Subshell { stmts, rparen })
    }

    pub fn block(stmts: Vec<Stmt>, rbrace: Position) -> Command {
        Command::Block(Block { stmts, rbrace })
    }

    pub fn case_item(patterns: Vec<Word>, stmts: Vec<Stmt>, dsemi: Position) -> CaseItem {
        CaseItem {
            patterns,
            stmts,
            dsemi,
        }
    }

    pub fn func_decl(name: impl Into<String>, bash_style: bool, body: Stmt) -> Command {
        Command::FuncDecl(FuncDecl {
            name: name.into(),
            bash_style,
            body: Box::new(body),
        })
    }

    pub fn arith_word(pos: Position, value: impl Into<String>) -> ArithmExpr {
        ArithmExpr::Word(Self::lit_word(pos, value))
    }

    pub fn arith_unary(op: ArithUnaryOp, post: bool, x: ArithmExpr) -> ArithmExpr {
        ArithmExpr::Unary(Box::new(UnaryArithm { op, post, x }))
    }

    pub fn arith_binary(op: ArithBinOp, x: ArithmExpr, y: ArithmExpr) -> ArithmExpr {
        ArithmExpr::Binary(Box::new(BinaryArithm { op, x, y }))
    }

    pub fn arith_paren(x: ArithmExpr) -> ArithmExpr {
        ArithmExpr::Paren(Box::new(ParenArithm { x }))
    }
}
