//! Abstract Syntax Tree (AST) Types for Bash
//!
//! This module defines the syntax tree the printer consumes, along with
//! the detached comment channel delivered next to it.

pub mod types;

pub use types::*;
