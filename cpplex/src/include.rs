//! `#include` target parsing and file resolution.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Charset;
use crate::token::{Token, TokenKind};

/// A parsed include target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncludeSpec {
    /// `"file.h"`: searched next to the including file, then on the path.
    Quoted(String),
    /// `<file.h>`: searched on the path only.
    Angle(String),
}

impl IncludeSpec {
    /// Read a target from the (macro-expanded) tokens after `#include`.
    pub fn from_tokens(tokens: &[Token]) -> Option<IncludeSpec> {
        let first = tokens.first()?;
        if first.kind == TokenKind::String && first.value.len() >= 2 {
            let inner = &first.value[1..first.value.len() - 1];
            return Some(IncludeSpec::Quoted(inner.to_string()));
        }
        if first.is_punct("<") {
            let mut target = String::new();
            for t in &tokens[1..] {
                if t.is_punct(">") {
                    return Some(IncludeSpec::Angle(target));
                }
                target.push_str(&t.value);
            }
        }
        None
    }

    /// The target path as written, without delimiters.
    pub fn target(&self) -> &str {
        match self {
            IncludeSpec::Quoted(t) | IncludeSpec::Angle(t) => t,
        }
    }
}

/// Maps include targets to files on disk.
#[derive(Debug)]
pub struct IncludeResolver {
    include_dirs: Vec<PathBuf>,
}

impl IncludeResolver {
    /// Resolver over the given search path.
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        IncludeResolver { include_dirs }
    }

    /// Find the file a spec refers to. Quoted targets try the directory of
    /// `including_file` first; both forms then walk the search path in
    /// order. Returns the first existing candidate.
    pub fn resolve(&self, spec: &IncludeSpec, including_file: &Path) -> Option<PathBuf> {
        if let IncludeSpec::Quoted(target) = spec
            && let Some(dir) = including_file.parent()
        {
            let candidate = dir.join(target);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        for dir in &self.include_dirs {
            let candidate = dir.join(spec.target());
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        log::debug!("include '{}' not found", spec.target());
        None
    }

    /// Read and decode a file.
    pub fn read(&self, path: &Path, charset: Charset) -> io::Result<String> {
        let bytes = fs::read(path)?;
        Ok(charset.decode(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn spec_of(text: &str) -> Option<IncludeSpec> {
        IncludeSpec::from_tokens(&lexer::tokenize(text, 1))
    }

    #[test]
    fn quoted_form() {
        assert_eq!(
            spec_of("\"stdio.h\""),
            Some(IncludeSpec::Quoted("stdio.h".into()))
        );
    }

    #[test]
    fn angle_form_reassembles_tokens() {
        assert_eq!(
            spec_of("<sys/stat.h>"),
            Some(IncludeSpec::Angle("sys/stat.h".into()))
        );
        assert_eq!(
            spec_of("<vector>"),
            Some(IncludeSpec::Angle("vector".into()))
        );
    }

    #[test]
    fn malformed_targets() {
        assert_eq!(spec_of(""), None);
        assert_eq!(spec_of("<unclosed"), None);
        assert_eq!(spec_of("bare_name"), None);
    }

    #[test]
    fn resolution_prefers_sibling_for_quoted() {
        let dir = std::env::temp_dir().join("cpplex_inc_test");
        let sub = dir.join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("a.h"), "int x;").unwrap();
        fs::write(dir.join("a.h"), "int y;").unwrap();

        let resolver = IncludeResolver::new(vec![dir.clone()]);
        let including = sub.join("main.cc");

        let quoted = IncludeSpec::Quoted("a.h".into());
        assert_eq!(resolver.resolve(&quoted, &including), Some(sub.join("a.h")));

        let angle = IncludeSpec::Angle("a.h".into());
        assert_eq!(resolver.resolve(&angle, &including), Some(dir.join("a.h")));

        let missing = IncludeSpec::Quoted("missing.h".into());
        assert_eq!(resolver.resolve(&missing, &including), None);

        fs::remove_dir_all(&dir).ok();
    }
}
