//! Preprocessor configuration.

use std::path::PathBuf;

/// Encoding used to decode source and header bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Charset {
    /// UTF-8, invalid sequences replaced.
    #[default]
    Utf8,
    /// ISO-8859-1, every byte maps to the code point of the same value.
    Latin1,
}

impl Charset {
    /// Decode raw file bytes to text.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Settings for a preprocessing run, built with chained `with_` calls.
///
/// ```
/// use cpplex::Config;
///
/// let config = Config::default()
///     .with_include_dir("include")
///     .with_define("VERSION 2")
///     .with_global_define("NDEBUG");
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Encoding of all read files.
    pub charset: Charset,
    /// Search path for include resolution, in order.
    pub include_dirs: Vec<PathBuf>,
    /// Defines seeded before unit defines, `#define` grammar without the
    /// directive keyword.
    pub global_defines: Vec<String>,
    /// Per-unit defines, seeded after [`Config::global_defines`] so they
    /// win on conflict.
    pub defines: Vec<String>,
    /// Files preprocessed before the main input, in order.
    pub force_includes: Vec<PathBuf>,
    /// When `true` (the default), unresolvable includes and unbalanced
    /// conditionals become diagnostics instead of errors.
    pub error_recovery: bool,
    /// Recursion bound for macro rescanning.
    pub max_expansion_depth: usize,
    /// Nesting bound for `#include`.
    pub max_include_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            charset: Charset::default(),
            include_dirs: Vec::new(),
            global_defines: Vec::new(),
            defines: Vec::new(),
            force_includes: Vec::new(),
            error_recovery: true,
            max_expansion_depth: 128,
            max_include_depth: 64,
        }
    }
}

impl Config {
    /// Append a directory to the include search path.
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    /// Append several directories to the include search path.
    pub fn with_include_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Append a unit define (`NAME`, `NAME value` or `NAME(params) value`).
    pub fn with_define(mut self, define: impl Into<String>) -> Self {
        self.defines.push(define.into());
        self
    }

    /// Append a global define, overridable by unit defines.
    pub fn with_global_define(mut self, define: impl Into<String>) -> Self {
        self.global_defines.push(define.into());
        self
    }

    /// Append a file to preprocess before the main input.
    pub fn with_force_include(mut self, path: impl Into<PathBuf>) -> Self {
        self.force_includes.push(path.into());
        self
    }

    /// Select the source encoding.
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Enable or disable error recovery.
    pub fn with_error_recovery(mut self, recovery: bool) -> Self {
        self.error_recovery = recovery;
        self
    }

    /// Set the macro expansion recursion bound.
    pub fn with_max_expansion_depth(mut self, depth: usize) -> Self {
        self.max_expansion_depth = depth;
        self
    }

    /// Set the include nesting bound.
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates() {
        let config = Config::default()
            .with_include_dir("a")
            .with_include_dir("b")
            .with_define("X 1")
            .with_global_define("Y 2")
            .with_error_recovery(false);
        assert_eq!(config.include_dirs.len(), 2);
        assert_eq!(config.defines, ["X 1"]);
        assert_eq!(config.global_defines, ["Y 2"]);
        assert!(!config.error_recovery);
    }

    #[test]
    fn latin1_decoding() {
        let bytes = [b'a', 0xE9, b'b'];
        assert_eq!(Charset::Latin1.decode(&bytes), "a\u{e9}b");
        assert_eq!(Charset::Utf8.decode(b"abc"), "abc");
    }
}
