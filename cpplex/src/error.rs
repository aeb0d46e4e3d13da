//! Error and diagnostic types.

use std::fmt;

use thiserror::Error;

/// Fatal preprocessing failures.
///
/// With error recovery enabled (the default) most trouble is downgraded to
/// a [`Diagnostic`]; these variants are what still aborts a run, or what
/// the recoverable cases escalate to in strict mode.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// A conditional block was opened or closed without its counterpart.
    #[error("{file}:{line}: unbalanced conditional directives: {detail}")]
    UnbalancedConditional {
        /// File containing the offending directive.
        file: String,
        /// Line of the offending directive, or of the end of file.
        line: u32,
        /// What was missing or stray.
        detail: String,
    },

    /// An `#include` target could not be resolved or read.
    #[error("{file}:{line}: cannot resolve include '{target}'")]
    IncludeNotFound {
        /// The include target as written, without delimiters.
        target: String,
        /// File containing the directive.
        file: String,
        /// Line of the directive.
        line: u32,
    },

    /// Macro expansion recursed past the configured limit.
    #[error("{file}:{line}: macro expansion exceeded the depth limit of {limit}")]
    ExpansionDepthExceeded {
        /// The configured limit.
        limit: usize,
        /// File being expanded.
        file: String,
        /// Line being expanded.
        line: u32,
    },

    /// Includes nested past the configured limit.
    #[error("{file}:{line}: includes nested deeper than the limit of {limit}")]
    IncludeDepthExceeded {
        /// The configured limit.
        limit: usize,
        /// File containing the directive.
        file: String,
        /// Line of the directive.
        line: u32,
    },

    /// The input file itself could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A recoverable problem noted during preprocessing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// File the problem was found in.
    pub file: String,
    /// 1-based line.
    pub line: u32,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}
