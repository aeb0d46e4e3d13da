#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! A C/C++ lexer and preprocessor producing the expanded token stream a
//! static analyzer sees.
//!
//! The pipeline follows the phases of translation: line splicing, comment
//! removal, per-line tokenization, directive handling with macro expansion
//! and conditional compilation, and finally adjacent string-literal
//! joining. The result is a flat token list ending in a single
//! [`TokenKind::Eof`] token, with every token carrying the source position
//! of its origin (the invocation site for macro-produced tokens).
//!
//! ```
//! use cpplex::{Config, preprocess, tokens_to_string};
//!
//! let tokens = preprocess("#define GREETING \"hi\"\nGREETING there", &Config::default())?;
//! assert_eq!(tokens_to_string(&tokens), "\"hi\" there");
//! # Ok::<(), cpplex::PreprocessError>(())
//! ```
//!
//! Preprocessing is tolerant by default: unresolvable includes and
//! unbalanced conditionals are recorded as diagnostics, conditions that
//! cannot be evaluated count as true, and lexically broken input degrades
//! to [`TokenKind::Unknown`] tokens instead of failing the run. Strict
//! behavior is a [`Config::with_error_recovery`] call away.

mod conditional;
mod config;
mod date_time;
mod error;
mod expand;
mod expr;
mod include;
mod lexer;
mod macro_def;
mod macro_table;
mod preprocessor;
mod token;

use std::path::Path;

pub use config::{Charset, Config};
pub use error::{Diagnostic, PreprocessError};
pub use include::{IncludeResolver, IncludeSpec};
pub use macro_def::MacroDef;
pub use macro_table::MacroTable;
pub use preprocessor::Preprocessor;
pub use token::{Token, TokenKind};

/// Preprocess a source string with the given configuration.
///
/// Convenience wrapper over [`Preprocessor`] for callers that do not need
/// the recovered diagnostics.
pub fn preprocess(source: &str, config: &Config) -> Result<Vec<Token>, PreprocessError> {
    Preprocessor::new(config.clone()).preprocess(source)
}

/// Preprocess a file with the given configuration.
pub fn preprocess_file(
    path: impl AsRef<Path>,
    config: &Config,
) -> Result<Vec<Token>, PreprocessError> {
    Preprocessor::new(config.clone()).preprocess_file(path.as_ref())
}

/// Render a token stream back to text, separating tokens that had
/// whitespace between them with a single space.
pub fn tokens_to_string(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        if token.kind == TokenKind::Eof {
            continue;
        }
        if !out.is_empty() && token.has_space_before {
            out.push(' ');
        }
        out.push_str(&token.value);
    }
    out
}
