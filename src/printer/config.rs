//! Printer configuration

use std::fmt;

/// Configuration for the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// How nesting levels are indented
    pub indent: Indentation,
    /// Break lines before binary operators instead of after them
    pub binary_next_line: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            indent: Indentation::Tabs,
            binary_next_line: false,
        }
    }
}

/// The indentation to use per nesting level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indentation {
    /// One tab per level
    #[default]
    Tabs,
    /// This number of spaces per level
    Spaces(usize),
    /// No reindentation: broken lines keep whatever column they land on
    Keep,
}

impl From<i32> for Indentation {
    /// The conventional integer encoding: 0 for tabs, a positive count for
    /// spaces, negative to disable reindentation.
    fn from(n: i32) -> Self {
        match n {
            0 => Self::Tabs,
            n if n > 0 => Self::Spaces(n as usize),
            _ => Self::Keep,
        }
    }
}

impl fmt::Display for Indentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tabs => write!(f, "\t"),
            Self::Spaces(n) => (0..*n).try_for_each(|_| write!(f, " ")),
            Self::Keep => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation_from_int() {
        assert_eq!(Indentation::from(0), Indentation::Tabs);
        assert_eq!(Indentation::from(2), Indentation::Spaces(2));
        assert_eq!(Indentation::from(8), Indentation::Spaces(8));
        assert_eq!(Indentation::from(-1), Indentation::Keep);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.indent, Indentation::Tabs);
        assert!(!config.binary_next_line);
    }
}
