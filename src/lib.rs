//! bashfmt - canonical layout for bash scripts
//!
//! This library turns a parsed bash AST and its detached comment list back
//! into canonical source text. Parsing is left to the caller.

pub mod ast;
pub mod printer;

pub use ast::types::*;
pub use printer::{print, Config, Indentation, PrintError, Printer};
