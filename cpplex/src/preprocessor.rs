//! The preprocessing driver: directive dispatch, include processing, and
//! assembly of the final token stream.

use std::path::Path;

use crate::conditional::ConditionalStack;
use crate::config::Config;
use crate::error::{Diagnostic, PreprocessError};
use crate::expand::Expander;
use crate::expr;
use crate::include::{IncludeResolver, IncludeSpec};
use crate::lexer;
use crate::macro_table::MacroTable;
use crate::token::{Token, TokenKind, is_identifier_continue};

/// A recognized directive line, with the text after the keyword.
#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    Define(&'a str),
    Undef(&'a str),
    Include(&'a str),
    If(&'a str),
    Ifdef(&'a str),
    Ifndef(&'a str),
    Elif(&'a str),
    Elifdef(&'a str),
    Elifndef(&'a str),
    Else,
    Endif,
    /// `#pragma`, `#error`, `#line`, a bare `#`, or any unknown keyword.
    /// Consumed without effect.
    Other,
}

impl Directive<'_> {
    /// Classify a logical line. `None` when the line is not a directive.
    fn parse(line: &str) -> Option<Directive<'_>> {
        let rest = line.trim_start().strip_prefix('#')?;
        let rest = rest.trim_start();
        let word_end = rest
            .find(|c: char| !is_identifier_continue(c))
            .unwrap_or(rest.len());
        let (word, tail) = rest.split_at(word_end);
        let tail = tail.trim();
        Some(match word {
            "define" => Directive::Define(tail),
            "undef" => Directive::Undef(tail),
            "include" => Directive::Include(tail),
            "if" => Directive::If(tail),
            "ifdef" => Directive::Ifdef(tail),
            "ifndef" => Directive::Ifndef(tail),
            "elif" => Directive::Elif(tail),
            "elifdef" => Directive::Elifdef(tail),
            "elifndef" => Directive::Elifndef(tail),
            "else" => Directive::Else,
            "endif" => Directive::Endif,
            _ => Directive::Other,
        })
    }
}

/// One preprocessing run over a translation unit.
///
/// Construction seeds the macro table from the configuration; a single
/// instance then preprocesses one main input (plus whatever it includes).
#[derive(Debug)]
pub struct Preprocessor {
    config: Config,
    table: MacroTable,
    conditionals: ConditionalStack,
    resolver: IncludeResolver,
    diagnostics: Vec<Diagnostic>,
    counter: u32,
    current_file: String,
    current_line: u32,
    include_depth: usize,
}

impl Preprocessor {
    /// Build a preprocessor and seed the configured defines. Global
    /// defines go in first, so unit defines override them.
    pub fn new(config: Config) -> Self {
        let resolver = IncludeResolver::new(config.include_dirs.clone());
        let mut pp = Preprocessor {
            table: MacroTable::new(),
            conditionals: ConditionalStack::new(),
            resolver,
            diagnostics: Vec::new(),
            counter: 0,
            current_file: "<stdin>".to_string(),
            current_line: 1,
            include_depth: 0,
            config,
        };
        let seeds: Vec<String> = pp
            .config
            .global_defines
            .iter()
            .chain(pp.config.defines.iter())
            .cloned()
            .collect();
        for define in &seeds {
            if !pp.table.add_definition_line(define, 0) {
                log::warn!("ignoring malformed configured define '{define}'");
            }
        }
        pp
    }

    /// Set the name reported by `__FILE__` and diagnostics for the main
    /// input.
    pub fn set_file(&mut self, name: impl Into<String>) {
        self.current_file = name.into();
    }

    /// Problems recovered from so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The macro table in its current state.
    pub fn macros(&self) -> &MacroTable {
        &self.table
    }

    /// Preprocess a source string into its final token stream. Force
    /// includes run first; the stream ends with exactly one
    /// [`TokenKind::Eof`] token.
    pub fn preprocess(&mut self, source: &str) -> Result<Vec<Token>, PreprocessError> {
        let mut out: Vec<Token> = Vec::new();

        let force = self.config.force_includes.clone();
        for path in &force {
            let name = path.display().to_string();
            match self.resolver.read(path, self.config.charset) {
                Ok(content) => {
                    self.include_depth += 1;
                    let result = self.process_source(&content, &name, &mut out);
                    self.include_depth -= 1;
                    result?;
                }
                Err(err) => {
                    log::warn!("cannot read forced include '{name}': {err}");
                    self.include_failure(&name)?;
                }
            }
        }

        let main_file = self.current_file.clone();
        self.process_source(source, &main_file, &mut out)?;

        join_adjacent_strings(&mut out);
        out.push(Token::eof(self.current_line));
        Ok(out)
    }

    /// Read, decode and preprocess a file.
    pub fn preprocess_file(&mut self, path: &Path) -> Result<Vec<Token>, PreprocessError> {
        let content = self.resolver.read(path, self.config.charset)?;
        self.set_file(path.display().to_string());
        self.preprocess(&content)
    }

    fn process_source(
        &mut self,
        source: &str,
        file: &str,
        out: &mut Vec<Token>,
    ) -> Result<(), PreprocessError> {
        let saved_file = std::mem::replace(&mut self.current_file, file.to_string());
        let saved_line = self.current_line;
        let entry_depth = self.conditionals.depth();

        // comment stripping keeps newlines, so the splice line map still
        // applies to the stripped text
        let (spliced, line_starts) = lexer::splice_with_lines(source);
        let text = lexer::strip_comments(&spliced);
        let mut result = Ok(());
        for (idx, line) in text.lines().enumerate() {
            self.current_line = line_starts.get(idx).copied().unwrap_or(idx as u32 + 1);
            let step = if let Some(directive) = Directive::parse(line) {
                self.handle_directive(directive, out)
            } else {
                self.emit_line(line, out)
            };
            if let Err(err) = step {
                result = Err(err);
                break;
            }
        }

        // a #if left open does not leak into the including file
        if result.is_ok() && self.conditionals.depth() != entry_depth {
            self.conditionals.truncate(entry_depth);
            result = self.structural_violation("conditional block still open at end of file");
        }

        self.current_file = saved_file;
        self.current_line = saved_line;
        result
    }

    /// Expand one non-directive line into the output stream.
    fn emit_line(&mut self, line: &str, out: &mut Vec<Token>) -> Result<(), PreprocessError> {
        if !self.conditionals.is_active() {
            return Ok(());
        }
        let tokens = lexer::tokenize(line, self.current_line);
        if tokens.is_empty() {
            return Ok(());
        }
        let mut expanded = self.expand_tokens(&tokens)?;
        // the line break counts as whitespace before the first token
        if let Some(first) = expanded.first_mut() {
            first.has_space_before = true;
        }
        out.extend(expanded);
        Ok(())
    }

    fn handle_directive(
        &mut self,
        directive: Directive<'_>,
        out: &mut Vec<Token>,
    ) -> Result<(), PreprocessError> {
        let active = self.conditionals.is_active();
        match directive {
            Directive::Define(rest) => {
                if active && !self.table.add_definition_line(rest, self.current_line) {
                    log::debug!(
                        "{}:{}: skipping malformed #define '{rest}'",
                        self.current_file,
                        self.current_line
                    );
                }
            }
            Directive::Undef(rest) => {
                if active && let Some(name) = rest.split_whitespace().next() {
                    self.table.undefine(name);
                }
            }
            Directive::Include(rest) => {
                if active {
                    self.handle_include(rest, out)?;
                }
            }
            Directive::If(rest) => {
                let cond = active && self.eval_condition(rest)?;
                self.conditionals.push(cond);
            }
            Directive::Ifdef(rest) => {
                let cond = active && self.named_macro_defined(rest);
                self.conditionals.push(cond);
            }
            Directive::Ifndef(rest) => {
                let cond = active && !self.named_macro_defined(rest);
                self.conditionals.push(cond);
            }
            Directive::Elif(rest) => {
                let cond = self.conditionals.needs_branch_eval() && self.eval_condition(rest)?;
                if !self.conditionals.branch(cond) {
                    self.structural_violation("#elif without #if")?;
                }
            }
            Directive::Elifdef(rest) => {
                let cond = self.conditionals.needs_branch_eval() && self.named_macro_defined(rest);
                if !self.conditionals.branch(cond) {
                    self.structural_violation("#elifdef without #if")?;
                }
            }
            Directive::Elifndef(rest) => {
                let cond = self.conditionals.needs_branch_eval() && !self.named_macro_defined(rest);
                if !self.conditionals.branch(cond) {
                    self.structural_violation("#elifndef without #if")?;
                }
            }
            Directive::Else => {
                if !self.conditionals.else_branch() {
                    self.structural_violation("#else without #if")?;
                }
            }
            Directive::Endif => {
                if !self.conditionals.pop() {
                    self.structural_violation("#endif without #if")?;
                }
            }
            Directive::Other => {}
        }
        Ok(())
    }

    fn handle_include(&mut self, rest: &str, out: &mut Vec<Token>) -> Result<(), PreprocessError> {
        let tokens = lexer::tokenize(rest, self.current_line);
        let expanded = self.expand_tokens(&tokens)?;
        let Some(spec) = IncludeSpec::from_tokens(&expanded) else {
            return self.include_failure(rest);
        };
        let Some(path) = self
            .resolver
            .resolve(&spec, Path::new(&self.current_file))
        else {
            return self.include_failure(spec.target());
        };

        if self.include_depth >= self.config.max_include_depth {
            return Err(PreprocessError::IncludeDepthExceeded {
                limit: self.config.max_include_depth,
                file: self.current_file.clone(),
                line: self.current_line,
            });
        }

        let name = path.display().to_string();
        let content = match self.resolver.read(&path, self.config.charset) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("cannot read include '{name}': {err}");
                return self.include_failure(spec.target());
            }
        };
        log::trace!("entering include '{name}'");
        self.include_depth += 1;
        let result = self.process_source(&content, &name, out);
        self.include_depth -= 1;
        result
    }

    /// Evaluate a `#if`/`#elif` condition. `defined` is resolved before
    /// macro expansion; an expression that cannot be parsed or valued
    /// counts as true.
    fn eval_condition(&mut self, rest: &str) -> Result<bool, PreprocessError> {
        let tokens = lexer::tokenize(rest, self.current_line);
        let tokens = self.resolve_defined(tokens);
        let expanded = self.expand_tokens(&tokens)?;
        match expr::evaluate(&expanded) {
            Ok(Some(value)) => Ok(value != 0),
            _ => {
                log::debug!(
                    "{}:{}: cannot evaluate '#if {rest}', assuming true",
                    self.current_file,
                    self.current_line
                );
                Ok(true)
            }
        }
    }

    /// Replace `defined X` and `defined(X)` with `1` or `0`.
    fn resolve_defined(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let t = &tokens[i];
            if t.is_name() && t.value == "defined" {
                let (name, consumed) = if tokens.get(i + 1).is_some_and(|t| t.is_punct("("))
                    && tokens.get(i + 2).is_some_and(Token::is_name)
                    && tokens.get(i + 3).is_some_and(|t| t.is_punct(")"))
                {
                    (Some(&tokens[i + 2].value), 4)
                } else if tokens.get(i + 1).is_some_and(Token::is_name) {
                    (Some(&tokens[i + 1].value), 2)
                } else {
                    (None, 1)
                };
                if let Some(name) = name {
                    let value = if self.table.is_defined(name) { "1" } else { "0" };
                    out.push(Token::new(
                        value,
                        TokenKind::Number,
                        t.line,
                        t.column,
                        t.has_space_before,
                    ));
                    i += consumed;
                    continue;
                }
            }
            out.push(t.clone());
            i += 1;
        }
        out
    }

    fn named_macro_defined(&self, rest: &str) -> bool {
        rest.split_whitespace()
            .next()
            .is_some_and(|name| self.table.is_defined(name))
    }

    fn expand_tokens(&mut self, tokens: &[Token]) -> Result<Vec<Token>, PreprocessError> {
        let mut expander = Expander::new(
            &self.table,
            &self.current_file,
            self.current_line,
            &mut self.counter,
            self.config.max_expansion_depth,
        );
        expander.expand(tokens)
    }

    /// Record an unresolvable include: a diagnostic under error recovery,
    /// an error in strict mode.
    fn include_failure(&mut self, target: &str) -> Result<(), PreprocessError> {
        if self.config.error_recovery {
            self.report(format!("cannot resolve include '{target}'"));
            Ok(())
        } else {
            Err(PreprocessError::IncludeNotFound {
                target: target.to_string(),
                file: self.current_file.clone(),
                line: self.current_line,
            })
        }
    }

    /// Record a conditional-nesting problem, same policy as includes.
    fn structural_violation(&mut self, detail: &str) -> Result<(), PreprocessError> {
        if self.config.error_recovery {
            self.report(detail.to_string());
            Ok(())
        } else {
            Err(PreprocessError::UnbalancedConditional {
                file: self.current_file.clone(),
                line: self.current_line,
                detail: detail.to_string(),
            })
        }
    }

    fn report(&mut self, message: String) {
        log::warn!("{}:{}: {message}", self.current_file, self.current_line);
        self.diagnostics.push(Diagnostic {
            file: self.current_file.clone(),
            line: self.current_line,
            message,
        });
    }
}

/// Merge adjacent string literals, dropping the inner quote pair.
fn join_adjacent_strings(tokens: &mut Vec<Token>) {
    let mut joined: Vec<Token> = Vec::with_capacity(tokens.len());
    for t in std::mem::take(tokens) {
        if t.kind == TokenKind::String
            && let Some(prev) = joined.last_mut()
            && prev.kind == TokenKind::String
        {
            prev.value.truncate(prev.value.len() - 1);
            prev.value.push_str(&t.value[1..]);
        } else {
            joined.push(t);
        }
    }
    *tokens = joined;
}
