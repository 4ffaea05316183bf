//! The layout engine
//!
//! A single pass over the AST, emitting canonical source text. Layout
//! state is a handful of scalars: whether the next emission wants a space
//! before it, the source line caught up to so far, and the indent level.
//! Comments arrive as a position-ordered queue and are interleaved back by
//! flushing every comment that precedes the node about to be printed.
//! Heredoc bodies are queued on the side and flushed by the next newline.

use std::io::{self, Write};

use thiserror::Error;

use crate::ast::types::*;

use super::config::{Config, Indentation};
use super::tokens::Token;
use super::writer::LineWriter;

/// Errors the printer can produce. Malformed ASTs are not detected; the
/// only failure source is the output sink.
#[derive(Debug, Error)]
pub enum PrintError {
    #[error("write to output sink failed: {0}")]
    Io(#[from] io::Error),
}

/// Print `script` to `w` with the default configuration.
pub fn print(w: &mut dyn Write, script: &Script) -> Result<(), PrintError> {
    Printer::new().print(w, script)
}

/// A configured printer, reusable across scripts.
#[derive(Debug, Default)]
pub struct Printer {
    config: Config,
}

impl Printer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Printer { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn print(&self, w: &mut dyn Write, script: &Script) -> Result<(), PrintError> {
        let mut job = Job {
            w: LineWriter::new(w),
            config: self.config,
            want_space: false,
            cur_line: 0,
            level: 0,
            level_incs: Vec::new(),
            last_level: 0,
            comments: &script.comments,
            next_comment: 0,
            stack: Vec::new(),
            pending_hdocs: Vec::new(),
        };
        job.file(script);
        job.w.finish()?;
        Ok(())
    }
}

/// Ancestor kinds the context predicates care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Stmt,
    Binary,
    Arithm,
    Let,
    Paren,
}

/// Per-call printing state; borrows the script and the sink.
struct Job<'a, 'w> {
    w: LineWriter<'w>,
    config: Config,
    want_space: bool,
    /// Source line caught up to; 0 until the first emission
    cur_line: usize,
    level: usize,
    /// Which enclosing scopes really raised the level; nested scopes that
    /// open without an intervening line break share one indent step
    level_incs: Vec<bool>,
    /// The level the last emitted indent actually used
    last_level: usize,
    comments: &'a [Comment],
    next_comment: usize,
    stack: Vec<Frame>,
    pending_hdocs: Vec<&'a Redirect>,
}

impl<'a> Job<'a, '_> {
    // -------------------------------------------------------------------------
    // CONTEXT PREDICATES
    // -------------------------------------------------------------------------

    /// The grandparent is a binary command: only the head of a chain of
    /// binary operators introduces an indent level.
    fn nested_binary(&self) -> bool {
        self.stack.len() >= 3 && self.stack[self.stack.len() - 3] == Frame::Binary
    }

    fn in_binary(&self) -> bool {
        for f in self.stack.iter().rev() {
            match f {
                Frame::Binary => return true,
                Frame::Stmt => return false,
                _ => {}
            }
        }
        false
    }

    fn in_arithm(&self) -> bool {
        for f in self.stack.iter().rev() {
            match f {
                Frame::Arithm | Frame::Let => return true,
                Frame::Stmt => return false,
                _ => {}
            }
        }
        false
    }

    /// Inside `let`, operators lose their surrounding spaces; explicit
    /// parentheses switch back to spaced form.
    fn compact_arithm(&self) -> bool {
        for f in self.stack.iter().rev() {
            match f {
                Frame::Let => return true,
                Frame::Paren => return false,
                _ => {}
            }
        }
        false
    }

    fn inc_level(&mut self) {
        let mut inc = false;
        if self.level <= self.last_level || self.level_incs.is_empty() {
            self.level += 1;
            inc = true;
        } else if let Some(last) = self.level_incs.last_mut() {
            if *last {
                *last = false;
                inc = true;
            }
        }
        self.level_incs.push(inc);
    }

    fn dec_level(&mut self) {
        if self.level_incs.pop().unwrap_or(false) {
            self.level -= 1;
        }
    }

    // -------------------------------------------------------------------------
    // SPACING PRIMITIVES
    // -------------------------------------------------------------------------

    fn space(&mut self, b: u8) {
        self.w.write_byte(b);
        self.want_space = false;
    }

    /// Emit text as-is, tracking embedded newlines against the source line
    /// cursor so multi-line literals keep it in sync.
    fn verbatim(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.w.write_str(s);
        self.cur_line += newline_count(s);
        self.want_space = !matches!(self.w.last_byte(), b' ' | b'\t' | b'\n');
    }

    fn spaced_str(&mut self, s: &str) {
        if self.want_space {
            self.space(b' ');
        }
        self.verbatim(s);
    }

    fn token(&mut self, t: Token) {
        self.w.write_str(t.as_str());
        self.want_space = !t.contiguous_right();
    }

    fn spaced_token(&mut self, t: Token) {
        if !t.contiguous_left() && self.want_space {
            self.space(b' ');
        }
        self.token(t);
    }

    fn indent(&mut self) {
        self.last_level = self.level;
        match self.config.indent {
            Indentation::Tabs => {
                for _ in 0..self.level {
                    self.space(b'\t');
                }
            }
            Indentation::Spaces(n) => {
                for _ in 0..self.level * n {
                    self.space(b' ');
                }
            }
            Indentation::Keep => {}
        }
    }

    /// End the current output line, flushing any heredoc bodies that were
    /// waiting for it.
    fn newline(&mut self) {
        self.space(b'\n');
        if self.pending_hdocs.is_empty() {
            return;
        }
        let hdocs = std::mem::take(&mut self.pending_hdocs);
        for r in hdocs {
            self.cur_line += 1;
            if let Some(body) = &r.hdoc {
                self.word(body);
            }
            self.unquoted_word(&r.word);
            self.space(b'\n');
        }
    }

    // -------------------------------------------------------------------------
    // COMMENT QUEUE
    // -------------------------------------------------------------------------

    fn peek_comment(&self) -> Option<&'a Comment> {
        let comments: &'a [Comment] = self.comments;
        comments.get(self.next_comment)
    }

    /// Flush every queued comment strictly before `line`; 0 drains all.
    fn comments_up_to(&mut self, line: usize) {
        while let Some(c) = self.peek_comment() {
            if line > 0 && c.hash.line >= line {
                break;
            }
            self.next_comment += 1;
            self.separate(c.hash, false);
            self.comment(c);
        }
    }

    fn comment(&mut self, c: &Comment) {
        self.w.mark_comment(self.level);
        if self.want_space {
            self.space(b' ');
        }
        self.w.write_str("#");
        self.w.write_str(&c.text);
        self.want_space = true;
    }

    // -------------------------------------------------------------------------
    // SEPARATORS
    // -------------------------------------------------------------------------

    /// Bridge the gap to a node at `pos`: a newline when it sat on a later
    /// source line, keeping at most one blank line, or a `;` when the
    /// caller allows joining on the same line.
    fn separate(&mut self, pos: Position, fallback: bool) {
        self.comments_up_to(pos.line);
        if self.cur_line > 0 && pos.line > self.cur_line {
            self.newline();
            if pos.line > self.cur_line + 1 {
                self.space(b'\n');
            }
            self.indent();
        } else if fallback {
            self.token(Token::Semicolon);
        }
        if pos.line > 0 {
            self.cur_line = pos.line;
        }
    }

    /// Like `separate`, but breaks the line even when the source did not.
    fn separate_forced(&mut self, pos: Position) {
        if self.cur_line == 0 || pos.line > self.cur_line {
            self.separate(pos, false);
            return;
        }
        self.comments_up_to(pos.line);
        self.newline();
        self.indent();
        if pos.line > 0 {
            self.cur_line = self.cur_line.max(pos.line);
        }
    }

    /// Closing keyword that may join its construct with a `;`, e.g. `fi`,
    /// `done`, `}`. Once the body has broken onto multiple output lines the
    /// closer gets its own line instead. Comments still pending before it
    /// belong to the body, so they indent one deeper.
    fn sep_semicolon(&mut self, t: Token, pos: Position, opened: usize) {
        self.level += 1;
        self.comments_up_to(pos.line);
        self.level -= 1;
        if self.w.lines() > opened {
            self.separate_forced(pos);
        } else {
            self.separate(pos, true);
        }
        self.spaced_token(t);
    }

    /// Closing token where a `;` would be illegal, e.g. the `)` of a
    /// subshell. Multi-statement bodies push it onto its own line.
    fn sep_newline(&mut self, t: Token, pos: Position, force: bool) {
        if force {
            self.separate_forced(pos);
        } else {
            self.separate(pos, false);
        }
        self.spaced_token(t);
    }

    // -------------------------------------------------------------------------
    // STATEMENT LISTS
    // -------------------------------------------------------------------------

    /// Print a statement list. Statements never share an output line; the
    /// one exception is a list of exactly one statement that started on the
    /// current line, with the closing token (when known) on that same line.
    fn stmt_list(&mut self, stmts: &'a [Stmt], closing: Position) {
        let inline = stmts.len() == 1
            && stmts[0].pos.line > 0
            && stmts[0].pos.line <= self.cur_line
            && (closing.line == 0 || closing.line <= stmt_end_line(&stmts[0]));
        if inline {
            self.separate(stmts[0].pos, false);
            self.stmt(&stmts[0]);
            return;
        }
        for s in stmts {
            self.separate_forced(s.pos);
            self.stmt(s);
        }
    }

    /// A statement list nested one indent level deeper.
    fn stmt_join(&mut self, stmts: &'a [Stmt], closing: Position) {
        self.inc_level();
        self.stmt_list(stmts, closing);
        self.dec_level();
    }

    // -------------------------------------------------------------------------
    // NODES
    // -------------------------------------------------------------------------

    fn file(&mut self, f: &'a Script) {
        self.comments = &f.comments;
        self.stmt_list(&f.stmts, Position::default());
        self.comments_up_to(0);
        self.newline();
    }

    fn stmt(&mut self, s: &'a Stmt) {
        self.stack.push(Frame::Stmt);
        if s.negated {
            self.spaced_token(Token::Not);
        }
        for a in &s.assigns {
            self.assign(a);
        }
        let start_redirs = self.command(s);
        for r in s.redirs.iter().skip(start_redirs) {
            self.redirect(r);
        }
        if s.background {
            self.spaced_token(Token::Amp);
        }
        self.stack.pop();
    }

    /// Print the statement's command. For a simple command with several
    /// arguments, redirections that sat before the second argument stay
    /// there; the count of those already printed is returned.
    fn command(&mut self, s: &'a Stmt) -> usize {
        match &s.cmd {
            None => 0,
            Some(Command::Simple(c)) if c.args.len() > 1 => {
                self.word_join(&c.args[..1], true);
                let mut start = 0;
                for r in &s.redirs {
                    if r.pos.after(c.args[1].pos) || r.op.is_heredoc() {
                        break;
                    }
                    self.redirect(r);
                    start += 1;
                }
                self.word_join(&c.args[1..], true);
                start
            }
            Some(cmd) => {
                self.compound(cmd);
                0
            }
        }
    }

    fn compound(&mut self, cmd: &'a Command) {
        match cmd {
            Command::Simple(c) => self.word_join(&c.args, true),
            Command::Binary(b) => self.binary(b),
            Command::Subshell(x) => {
                self.spaced_token(Token::LParen);
                if x.stmts.is_empty() {
                    // avoid conflict with ()
                    self.space(b' ');
                } else {
                    if starts_with_lparen(&x.stmts[0]) {
                        self.want_space = true;
                    }
                    self.stmt_join(&x.stmts, x.rparen);
                }
                self.sep_newline(Token::RParen, x.rparen, x.stmts.len() > 1);
            }
            Command::Block(x) => {
                let opened = self.w.lines();
                self.spaced_token(Token::LBrace);
                self.stmt_join(&x.stmts, x.rbrace);
                self.sep_semicolon(Token::RBrace, x.rbrace, opened);
            }
            Command::If(x) => self.if_clause(x),
            Command::While(x) => self.while_clause(x, false),
            Command::Until(x) => self.while_clause(x, true),
            Command::For(x) => self.for_clause(x),
            Command::Case(x) => self.case_clause(x),
            Command::FuncDecl(x) => {
                if x.bash_style {
                    self.spaced_token(Token::Function);
                }
                self.spaced_str(&x.name);
                if !x.bash_style {
                    self.token(Token::LParen);
                    self.token(Token::RParen);
                }
                self.stmt(&x.body);
            }
            Command::Decl(x) => {
                self.spaced_token(if x.local { Token::Local } else { Token::Declare });
                for w in &x.opts {
                    self.spaced_word(w);
                }
                for a in &x.assigns {
                    self.assign(a);
                }
            }
            Command::Eval(x) => {
                self.spaced_token(Token::Eval);
                self.stmt(&x.stmt);
            }
            Command::Let(x) => {
                self.spaced_token(Token::Let);
                self.stack.push(Frame::Let);
                for e in &x.exprs {
                    self.spaced_arithm(e);
                }
                self.stack.pop();
            }
            Command::Arithm(x) => {
                self.stack.push(Frame::Arithm);
                self.spaced_token(Token::DLParen);
                self.arithm(&x.x);
                self.spaced_token(Token::DRParen);
                self.stack.pop();
            }
        }
    }

    fn binary(&mut self, b: &'a BinaryCmd) {
        self.stack.push(Frame::Binary);
        self.stmt(&b.x);
        let y_line = b.y.pos.line;
        let hdoc_pending = !self.pending_hdocs.is_empty();
        if y_line <= self.cur_line || (self.config.binary_next_line && hdoc_pending) {
            // no break: either the source kept y on the same line, or a
            // pending heredoc body forbids the \ continuation
            self.spaced_str(b.op.as_str());
            if y_line > 0 {
                self.cur_line = self.cur_line.max(y_line);
            }
            self.stmt(&b.y);
        } else {
            let nested = self.nested_binary();
            if !nested {
                self.inc_level();
            }
            if self.config.binary_next_line {
                self.spaced_str("\\");
                self.space(b'\n');
                self.indent();
                self.spaced_str(b.op.as_str());
                let mut had_comments = false;
                while let Some(c) = self.peek_comment() {
                    if c.hash.line >= y_line {
                        break;
                    }
                    self.next_comment += 1;
                    self.space(b'\n');
                    self.indent();
                    self.comment(c);
                    self.cur_line = c.hash.line;
                    had_comments = true;
                }
                if had_comments {
                    self.space(b'\n');
                    self.indent();
                }
                self.cur_line = y_line;
                self.stmt(&b.y);
            } else {
                self.spaced_str(b.op.as_str());
                self.separate(b.y.pos, false);
                self.stmt(&b.y);
            }
            if !nested {
                self.dec_level();
            }
        }
        self.stack.pop();
    }

    /// `; then` / `; do` after a condition that stayed on the keyword's
    /// opening line; a condition that moved below it takes the keyword
    /// down with it instead.
    fn semi_or_newline(&mut self, t: Token, pos: Position, cond_below: bool) {
        if cond_below {
            if pos.line > 0 {
                self.separate_forced(pos);
            } else {
                self.newline();
                self.indent();
            }
        } else {
            self.spaced_token(Token::Semicolon);
        }
        self.spaced_token(t);
        if pos.line > 0 {
            self.cur_line = pos.line;
        }
    }

    fn if_clause(&mut self, x: &'a IfClause) {
        let opened = self.w.lines();
        self.spaced_token(Token::If);
        let kw_line = self.cur_line;
        self.cond(&x.cond);
        self.semi_or_newline(Token::Then, x.then_pos, cond_on_next_line(&x.cond, kw_line));
        let close = self.if_closing(x, 0);
        self.stmt_join(&x.then_stmts, close);
        for (i, el) in x.elifs.iter().enumerate() {
            self.sep_semicolon(Token::Elif, el.pos, opened);
            let kw_line = self.cur_line;
            self.cond(&el.cond);
            self.semi_or_newline(Token::Then, el.then_pos, cond_on_next_line(&el.cond, kw_line));
            let close = self.if_closing(x, i + 1);
            self.stmt_join(&el.then_stmts, close);
        }
        if let Some(e) = &x.else_branch {
            self.sep_semicolon(Token::Else, e.pos, opened);
            self.stmt_join(&e.stmts, x.fi);
        }
        self.sep_semicolon(Token::Fi, x.fi, opened);
    }

    /// The keyword position closing the branch that starts after elif
    /// number `branch` (0 being the `then` branch).
    fn if_closing(&self, x: &IfClause, branch: usize) -> Position {
        x.elifs
            .get(branch)
            .map(|e| e.pos)
            .or_else(|| x.else_branch.as_ref().map(|e| e.pos))
            .unwrap_or(x.fi)
    }

    fn while_clause(&mut self, x: &'a WhileClause, until: bool) {
        let opened = self.w.lines();
        self.spaced_token(if until { Token::Until } else { Token::While });
        let kw_line = self.cur_line;
        self.cond(&x.cond);
        self.semi_or_newline(Token::Do, x.do_pos, cond_on_next_line(&x.cond, kw_line));
        self.stmt_join(&x.do_stmts, x.done_pos);
        self.sep_semicolon(Token::Done, x.done_pos, opened);
    }

    fn for_clause(&mut self, x: &'a ForClause) {
        let opened = self.w.lines();
        self.spaced_token(Token::For);
        match &x.cond {
            ForCond::Words(it) => {
                self.spaced_str(&it.name);
                if !it.list.is_empty() {
                    self.spaced_token(Token::In);
                    self.word_join(&it.list, false);
                }
            }
            ForCond::CStyle(l) => {
                self.stack.push(Frame::Arithm);
                self.spaced_token(Token::DLParen);
                self.arithm(&l.init);
                self.spaced_token(Token::Semicolon);
                self.spaced_arithm(&l.cond);
                self.spaced_token(Token::Semicolon);
                self.spaced_arithm(&l.post);
                self.spaced_token(Token::DRParen);
                self.stack.pop();
            }
        }
        // both header forms begin on the for line, so do can always join
        self.semi_or_newline(Token::Do, x.do_pos, false);
        self.stmt_join(&x.do_stmts, x.done_pos);
        self.sep_semicolon(Token::Done, x.done_pos, opened);
    }

    fn cond(&mut self, c: &'a Cond) {
        match c {
            Cond::Stmts(stmts) => self.stmt_join(stmts, Position::default()),
            Cond::CStyle(x) => {
                self.stack.push(Frame::Arithm);
                self.spaced_token(Token::DLParen);
                self.arithm(x);
                self.spaced_token(Token::DRParen);
                self.stack.pop();
            }
        }
    }

    fn case_clause(&mut self, x: &'a CaseClause) {
        let opened_case = self.w.lines();
        self.spaced_token(Token::Case);
        self.spaced_word(&x.word);
        self.spaced_token(Token::In);
        for item in &x.items {
            if let Some(first) = item.patterns.first() {
                self.separate(first.pos, false);
            }
            for (i, pat) in item.patterns.iter().enumerate() {
                if i > 0 {
                    self.spaced_token(Token::Pipe);
                }
                self.spaced_word(pat);
            }
            self.token(Token::RParen);
            if let Some(c) = self.empty_arm_comment(item) {
                // an otherwise empty arm collapses around its lone comment
                self.next_comment += 1;
                self.space(b' ');
                self.token(Token::DSemi);
                self.comment(c);
                self.cur_line = item.dsemi.line;
                continue;
            }
            let opened = self.w.lines();
            self.stmt_join(&item.stmts, item.dsemi);
            self.inc_level();
            let broke = self.w.lines() > opened;
            if broke || item.dsemi.line > self.cur_line {
                if item.dsemi.line == 0 {
                    self.newline();
                    self.indent();
                } else {
                    self.separate_forced(item.dsemi);
                }
                self.spaced_token(Token::DSemi);
            } else {
                // a one-line arm keeps its terminator inline
                self.space(b' ');
                self.token(Token::DSemi);
            }
            self.dec_level();
        }
        if x.items.is_empty() {
            self.sep_semicolon(Token::Esac, x.esac, opened_case);
        } else {
            self.sep_newline(Token::Esac, x.esac, false);
        }
    }

    /// The single queued comment sitting inside an empty case arm, if that
    /// is all the arm holds before its `;;`.
    fn empty_arm_comment(&self, item: &CaseItem) -> Option<&'a Comment> {
        if !item.stmts.is_empty() || item.dsemi.line == 0 {
            return None;
        }
        let c = self.peek_comment()?;
        if c.hash.line >= item.dsemi.line {
            return None;
        }
        let comments: &'a [Comment] = self.comments;
        if let Some(next) = comments.get(self.next_comment + 1) {
            if next.hash.line < item.dsemi.line {
                return None;
            }
        }
        Some(c)
    }

    fn assign(&mut self, a: &'a Assign) {
        if self.want_space {
            self.space(b' ');
        }
        if let Some(name) = &a.name {
            self.verbatim(name);
            self.verbatim(if a.append { "+=" } else { "=" });
        }
        self.word(&a.value);
    }

    fn redirect(&mut self, r: &'a Redirect) {
        if let Some(n) = &r.n {
            self.spaced_str(n);
        } else if self.want_space {
            self.space(b' ');
        }
        self.w.write_str(r.op.as_str());
        self.want_space = true;
        self.word(&r.word);
        if r.op.is_heredoc() {
            self.pending_hdocs.push(r);
        }
    }

    // -------------------------------------------------------------------------
    // WORDS
    // -------------------------------------------------------------------------

    /// Print words separated by spaces. With `keep_newlines`, a word that
    /// sat on a later source line keeps its break, continued with `\` and
    /// one extra indent level for the rest of the join.
    fn word_join(&mut self, words: &'a [Word], keep_newlines: bool) {
        let mut any_newline = false;
        for w in words {
            if keep_newlines && w.pos.line > self.cur_line {
                if !self.in_binary() && !self.in_arithm() {
                    self.spaced_str("\\");
                }
                self.space(b'\n');
                if !any_newline {
                    self.inc_level();
                    any_newline = true;
                }
                self.indent();
                self.cur_line = w.pos.line;
            }
            self.spaced_word(w);
        }
        if any_newline {
            self.dec_level();
        }
    }

    fn spaced_word(&mut self, w: &'a Word) {
        if self.want_space {
            self.space(b' ');
        }
        self.word(w);
    }

    fn word(&mut self, w: &'a Word) {
        for p in &w.parts {
            self.word_part(p);
        }
    }

    fn word_part(&mut self, p: &'a WordPart) {
        match p {
            WordPart::Lit(s) => self.verbatim(s),
            WordPart::SglQuoted(q) => {
                self.verbatim(if q.dollar { "$'" } else { "'" });
                self.verbatim(&q.value);
                self.verbatim("'");
            }
            WordPart::DblQuoted(q) => {
                self.verbatim(if q.dollar { "$\"" } else { "\"" });
                for inner in &q.parts {
                    self.word_part(inner);
                }
                self.verbatim("\"");
            }
            WordPart::ParamExp(x) => self.param_exp(x),
            WordPart::CmdSubst(x) => {
                if x.backquotes {
                    self.token(Token::Backquote);
                } else {
                    self.token(Token::DollParen);
                    if let Some(first) = x.stmts.first() {
                        if starts_with_lparen(first) {
                            self.want_space = true;
                        }
                    }
                }
                self.stmt_join(&x.stmts, x.right);
                let closer = if x.backquotes {
                    Token::Backquote
                } else {
                    Token::RParen
                };
                self.sep_newline(closer, x.right, x.stmts.len() > 1);
            }
            WordPart::ArithmExpand(x) => {
                self.stack.push(Frame::Arithm);
                self.token(Token::DollDParen);
                self.arithm(&x.x);
                self.spaced_token(Token::DRParen);
                self.stack.pop();
            }
            WordPart::CmdInput(x) => {
                self.token(Token::CmdIn);
                self.stmt_join(&x.stmts, Position::default());
                self.token(Token::RParen);
            }
            WordPart::Array(x) => {
                self.token(Token::LParen);
                self.word_join(&x.list, false);
                self.token(Token::RParen);
            }
        }
    }

    fn param_exp(&mut self, x: &'a ParamExp) {
        if x.short {
            self.verbatim("$");
            self.verbatim(&x.param);
            return;
        }
        self.verbatim("${");
        if x.length {
            self.verbatim("#");
        }
        self.verbatim(&x.param);
        if let Some(ind) = &x.ind {
            self.verbatim("[");
            self.word(ind);
            self.verbatim("]");
        }
        if let Some(r) = &x.repl {
            if r.all {
                self.verbatim("/");
            }
            self.verbatim("/");
            self.word(&r.orig);
            self.verbatim("/");
            self.word(&r.with);
        } else if let Some(e) = &x.exp {
            self.verbatim(e.op.as_str());
            self.word(&e.word);
        }
        self.verbatim("}");
    }

    /// The heredoc terminator: the delimiter word with its outer quoting
    /// removed.
    fn unquoted_word(&mut self, w: &'a Word) {
        for p in &w.parts {
            match p {
                WordPart::SglQuoted(q) => self.verbatim(&q.value),
                WordPart::DblQuoted(q) => {
                    for inner in &q.parts {
                        self.word_part(inner);
                    }
                }
                other => self.word_part(other),
            }
        }
    }

    // -------------------------------------------------------------------------
    // ARITHMETIC
    // -------------------------------------------------------------------------

    fn spaced_arithm(&mut self, x: &'a ArithmExpr) {
        if self.want_space {
            self.space(b' ');
        }
        self.arithm(x);
    }

    fn arithm(&mut self, x: &'a ArithmExpr) {
        match x {
            ArithmExpr::Word(w) => self.word(w),
            ArithmExpr::Unary(u) => {
                if u.post {
                    self.arithm(&u.x);
                    self.verbatim(u.op.as_str());
                } else {
                    self.verbatim(u.op.as_str());
                    self.want_space = false;
                    self.arithm(&u.x);
                }
            }
            ArithmExpr::Binary(b) => {
                if self.compact_arithm() {
                    self.arithm(&b.x);
                    self.verbatim(b.op.as_str());
                    self.want_space = false;
                    self.arithm(&b.y);
                } else {
                    self.arithm(&b.x);
                    self.spaced_str(b.op.as_str());
                    self.spaced_arithm(&b.y);
                }
            }
            ArithmExpr::Paren(p) => {
                self.stack.push(Frame::Paren);
                self.token(Token::LParen);
                self.arithm(&p.x);
                self.token(Token::RParen);
                self.stack.pop();
            }
        }
    }
}

// =============================================================================
// SOURCE EXTENT HELPERS
// =============================================================================

/// Whether the condition of an if/while/until begins below its keyword's
/// line, pulling `then`/`do` onto a fresh line. Arithmetic conditions
/// never move down.
fn cond_on_next_line(c: &Cond, kw_line: usize) -> bool {
    match c {
        Cond::Stmts(stmts) => stmts.first().map_or(false, |s| s.pos.line > kw_line),
        Cond::CStyle(_) => false,
    }
}

/// Whether the statement's first emitted byte will be a `(`, which needs a
/// space after an enclosing `(` or `$(` to avoid forming `((`.
fn starts_with_lparen(s: &Stmt) -> bool {
    match &s.cmd {
        Some(Command::Subshell(_)) | Some(Command::Arithm(_)) => true,
        Some(Command::Binary(b)) => starts_with_lparen(&b.x),
        _ => false,
    }
}

fn stmts_end_line(stmts: &[Stmt]) -> usize {
    stmts.iter().map(stmt_end_line).max().unwrap_or(0)
}

/// Last source line a statement touches, judged from node positions and
/// the newlines embedded in its literals.
fn stmt_end_line(s: &Stmt) -> usize {
    let mut end = s.pos.line;
    for a in &s.assigns {
        end = end.max(word_end_line(&a.value));
    }
    for r in &s.redirs {
        end = end.max(r.pos.line).max(word_end_line(&r.word));
    }
    if let Some(cmd) = &s.cmd {
        end = end.max(cmd_end_line(cmd, end));
    }
    end
}

fn cmd_end_line(cmd: &Command, start: usize) -> usize {
    match cmd {
        Command::Simple(c) => c.args.iter().map(word_end_line).max().unwrap_or(start),
        Command::Binary(b) => stmt_end_line(&b.x).max(stmt_end_line(&b.y)),
        Command::Subshell(x) => x.rparen.line.max(stmts_end_line(&x.stmts)),
        Command::Block(x) => x.rbrace.line.max(stmts_end_line(&x.stmts)),
        Command::If(x) => x.fi.line,
        Command::While(x) | Command::Until(x) => x.done_pos.line,
        Command::For(x) => x.done_pos.line,
        Command::Case(x) => x.esac.line,
        Command::FuncDecl(x) => stmt_end_line(&x.body),
        Command::Decl(x) => {
            let mut end = start;
            for w in &x.opts {
                end = end.max(word_end_line(w));
            }
            for a in &x.assigns {
                end = end.max(word_end_line(&a.value));
            }
            end
        }
        Command::Eval(x) => stmt_end_line(&x.stmt),
        Command::Let(_) | Command::Arithm(_) => start,
    }
}

fn word_end_line(w: &Word) -> usize {
    let mut end = w.pos.line;
    let mut extra = 0;
    for p in &w.parts {
        match p {
            WordPart::Lit(s) => extra += newline_count(s),
            WordPart::SglQuoted(q) => extra += newline_count(&q.value),
            WordPart::DblQuoted(q) => extra += parts_newline_count(&q.parts),
            WordPart::CmdSubst(x) => end = end.max(x.right.line),
            _ => {}
        }
    }
    end.max(w.pos.line + extra)
}

fn parts_newline_count(parts: &[WordPart]) -> usize {
    let mut n = 0;
    for p in parts {
        match p {
            WordPart::Lit(s) => n += newline_count(s),
            WordPart::SglQuoted(q) => n += newline_count(&q.value),
            WordPart::DblQuoted(q) => n += parts_newline_count(&q.parts),
            _ => {}
        }
    }
    n
}

fn newline_count(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'\n').count()
}
