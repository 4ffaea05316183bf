//! Printer module for bash scripts
//!
//! This module contains the layout engine: configuration, the token
//! tables, the counting output sink, and the tree walker itself.

pub mod config;
pub mod printer;
pub mod tokens;
mod writer;

// Re-exports
pub use config::{Config, Indentation};
pub use printer::{print, PrintError, Printer};
pub use tokens::Token;
