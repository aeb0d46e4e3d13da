//! Macro expansion: substitution, stringizing, pasting, and rescanning.

use rustc_hash::FxHashSet;

use crate::date_time;
use crate::error::PreprocessError;
use crate::lexer;
use crate::macro_def::MacroDef;
use crate::macro_table::MacroTable;
use crate::token::{Token, TokenKind};

/// One expansion pass over a token run.
///
/// The expander is short-lived: the driver builds one per token line so
/// `__LINE__`/`__FILE__` reflect the current position. `painted` holds the
/// names of macros currently being rescanned; a painted name encountered
/// during its own rescan stays a plain identifier forever, but the paint
/// is scoped to the frame, so a sibling use of the same macro expands
/// again.
pub(crate) struct Expander<'a> {
    table: &'a MacroTable,
    file: &'a str,
    line: u32,
    counter: &'a mut u32,
    max_depth: usize,
    painted: FxHashSet<String>,
}

impl<'a> Expander<'a> {
    pub fn new(
        table: &'a MacroTable,
        file: &'a str,
        line: u32,
        counter: &'a mut u32,
        max_depth: usize,
    ) -> Self {
        Expander {
            table,
            file,
            line,
            counter,
            max_depth,
            painted: FxHashSet::default(),
        }
    }

    /// Fully expand a token run.
    pub fn expand(&mut self, tokens: &[Token]) -> Result<Vec<Token>, PreprocessError> {
        self.expand_at(tokens, 0)
    }

    fn expand_at(&mut self, tokens: &[Token], depth: usize) -> Result<Vec<Token>, PreprocessError> {
        if depth > self.max_depth {
            return Err(PreprocessError::ExpansionDepthExceeded {
                limit: self.max_depth,
                file: self.file.to_string(),
                line: self.line,
            });
        }
        let table = self.table;
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if !token.is_name() {
                out.push(token.clone());
                i += 1;
                continue;
            }
            let Some(def) = table.lookup(&token.value) else {
                match self.dynamic_token(token) {
                    Some(builtin) => out.push(builtin),
                    None => out.push(token.clone()),
                }
                i += 1;
                continue;
            };
            if self.painted.contains(&token.value) {
                out.push(token.clone());
                i += 1;
                continue;
            }

            if def.is_function_like() {
                // an invocation needs the ( to hug the name
                let invoked = tokens
                    .get(i + 1)
                    .is_some_and(|t| t.is_punct("(") && !t.has_space_before);
                if !invoked {
                    out.push(token.clone());
                    i += 1;
                    continue;
                }
                let Some((args, next)) = collect_arguments(tokens, i + 1) else {
                    log::debug!(
                        "{}:{}: unterminated argument list for '{}'",
                        self.file,
                        token.line,
                        token.value
                    );
                    out.push(token.clone());
                    i += 1;
                    continue;
                };
                let args = normalize_arguments(args, def);
                if !arity_matches(def, &args) {
                    log::debug!(
                        "{}:{}: '{}' called with {} argument(s), expected {}",
                        self.file,
                        token.line,
                        token.value,
                        args.len(),
                        def.arity()
                    );
                    out.push(token.clone());
                    i += 1;
                    continue;
                }
                let substituted = self.substitute(def, &args, token, depth)?;
                let pasted = paste(&substituted);
                let rescanned = self.rescan(&token.value, &pasted, depth)?;
                out.extend(rescanned);
                i = next;
            } else {
                let body = retarget(&def.body, token);
                let pasted = paste(&body);
                // Rescanning covers the replacement only; tokens after
                // the invocation are out of scope. A replacement ending
                // in a function-like macro name does not pick up an
                // argument list from the source that follows it.
                let mut rescanned = self.rescan(&token.value, &pasted, depth)?;
                set_leading_space(&mut rescanned, token.has_space_before);
                out.extend(rescanned);
                i += 1;
            }
        }
        Ok(out)
    }

    /// Rescan a replacement with the macro's own name painted.
    fn rescan(
        &mut self,
        name: &str,
        tokens: &[Token],
        depth: usize,
    ) -> Result<Vec<Token>, PreprocessError> {
        self.painted.insert(name.to_string());
        let result = self.expand_at(tokens, depth + 1);
        self.painted.remove(name);
        result
    }

    /// Produce the value of a dynamic built-in, unless a stored definition
    /// shadows it (the stored one already won at lookup).
    fn dynamic_token(&mut self, token: &Token) -> Option<Token> {
        let (value, kind) = match token.value.as_str() {
            "__LINE__" => (self.line.to_string(), TokenKind::Number),
            "__FILE__" => (format!("\"{}\"", self.file), TokenKind::String),
            "__DATE__" => (format!("\"{}\"", date_time::current_date()), TokenKind::String),
            "__TIME__" => (format!("\"{}\"", date_time::current_time()), TokenKind::String),
            "__COUNTER__" => {
                let n = *self.counter;
                *self.counter += 1;
                (n.to_string(), TokenKind::Number)
            }
            _ => return None,
        };
        Some(Token::new(
            value,
            kind,
            token.line,
            token.column,
            token.has_space_before,
        ))
    }

    /// Replace parameters in the body: raw arguments next to `#`/`##`,
    /// pre-expanded arguments everywhere else.
    fn substitute(
        &mut self,
        def: &MacroDef,
        args: &[Vec<Token>],
        site: &Token,
        depth: usize,
    ) -> Result<Vec<Token>, PreprocessError> {
        let body = &def.body;
        let mut out: Vec<Token> = Vec::with_capacity(body.len());
        let mut j = 0;
        while j < body.len() {
            let tok = &body[j];

            if tok.is_punct("#") {
                if let Some(next) = body.get(j + 1)
                    && let Some(raw) = self.argument_tokens(next, def, args)
                {
                    out.push(stringize(&raw, site, tok.has_space_before));
                    j += 2;
                    continue;
                }
                // a # without a following parameter disappears
                j += 1;
                continue;
            }

            if tok.is_name()
                && let Some(raw) = self.argument_tokens(tok, def, args)
            {
                let next_to_paste = body.get(j + 1).is_some_and(|t| t.is_punct("##"))
                    || (j > 0 && body[j - 1].is_punct("##"));
                let mut replacement = if next_to_paste {
                    retarget(&raw, site)
                } else {
                    self.expand_at(&retarget(&raw, site), depth + 1)?
                };
                set_leading_space(&mut replacement, tok.has_space_before);
                out.extend(replacement);
                j += 1;
                continue;
            }

            out.push(tok.at(site.line, site.column));
            j += 1;
        }
        Ok(out)
    }

    /// The raw tokens a body name stands for: a named parameter's argument,
    /// or the comma-joined variadic tail.
    fn argument_tokens(
        &self,
        body_tok: &Token,
        def: &MacroDef,
        args: &[Vec<Token>],
    ) -> Option<Vec<Token>> {
        if !body_tok.is_name() {
            return None;
        }
        if let Some(idx) = def.param_index(&body_tok.value) {
            return Some(args[idx].clone());
        }
        if def.is_variadic && body_tok.value == def.va_param() {
            let mut tail: Vec<Token> = Vec::new();
            for (n, arg) in args[def.arity()..].iter().enumerate() {
                if n > 0 {
                    tail.push(Token::new(
                        ",",
                        TokenKind::Punctuator,
                        body_tok.line,
                        body_tok.column,
                        false,
                    ));
                }
                let mut arg = arg.clone();
                set_leading_space(&mut arg, n > 0);
                tail.extend(arg);
            }
            return Some(tail);
        }
        None
    }
}

/// Split the tokens of an argument list. `open` indexes the `(`. Returns
/// the arguments and the index just past the closing `)`, or `None` when
/// the list never closes.
fn collect_arguments(tokens: &[Token], open: usize) -> Option<(Vec<Vec<Token>>, usize)> {
    let mut args: Vec<Vec<Token>> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut depth = 1usize;
    let mut k = open + 1;
    while k < tokens.len() {
        let t = &tokens[k];
        if t.is_punct("(") {
            depth += 1;
            current.push(t.clone());
        } else if t.is_punct(")") {
            depth -= 1;
            if depth == 0 {
                args.push(current);
                return Some((args, k + 1));
            }
            current.push(t.clone());
        } else if t.is_punct(",") && depth == 1 {
            args.push(std::mem::take(&mut current));
        } else {
            current.push(t.clone());
        }
        k += 1;
    }
    None
}

/// `m()` collects one empty argument; for a macro with no named
/// parameters that means "no arguments".
fn normalize_arguments(mut args: Vec<Vec<Token>>, def: &MacroDef) -> Vec<Vec<Token>> {
    if def.arity() == 0 && args.len() == 1 && args[0].is_empty() {
        args.clear();
    }
    args
}

fn arity_matches(def: &MacroDef, args: &[Vec<Token>]) -> bool {
    if def.is_variadic {
        args.len() >= def.arity()
    } else {
        args.len() == def.arity()
    }
}

/// Clone tokens with their origin rewritten to the invocation site.
fn retarget(tokens: &[Token], site: &Token) -> Vec<Token> {
    tokens.iter().map(|t| t.at(site.line, site.column)).collect()
}

fn set_leading_space(tokens: &mut [Token], space: bool) {
    if let Some(first) = tokens.first_mut() {
        first.has_space_before = space;
    }
}

/// Build the string literal for `#arg`: spellings joined with a single
/// space wherever the argument had whitespace, quotes and backslashes
/// escaped.
fn stringize(tokens: &[Token], site: &Token, space: bool) -> Token {
    let mut text = String::new();
    for (n, t) in tokens.iter().enumerate() {
        if n > 0 && t.has_space_before {
            text.push(' ');
        }
        text.push_str(&t.value);
    }
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    Token::new(
        format!("\"{escaped}\""),
        TokenKind::String,
        site.line,
        site.column,
        space,
    )
}

/// Apply `##` operators. A run of consecutive `##` collapses into one
/// paste; an operator missing an operand (an operand that substituted to
/// nothing included) is dropped. Pasted spellings are re-lexed, so gluing
/// `0x` to `cf` yields one number and gluing junk yields whatever tokens
/// the pieces make.
fn paste(tokens: &[Token]) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if !tokens[i].is_punct("##") {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }
        let mut j = i;
        while j < tokens.len() && tokens[j].is_punct("##") {
            j += 1;
        }
        let Some(left) = out.pop() else {
            // nothing on the left: the operator vanishes
            i = j;
            continue;
        };
        if j >= tokens.len() {
            // nothing on the right
            out.push(left);
            break;
        }
        let right = &tokens[j];
        let glued = format!("{}{}", left.value, right.value);
        let mut relexed = lexer::tokenize(&glued, left.line);
        for t in &mut relexed {
            t.line = left.line;
            t.column = left.column;
        }
        set_leading_space(&mut relexed, left.has_space_before);
        out.extend(relexed);
        i = j + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macro_table::MacroTable;

    fn table(defs: &[&str]) -> MacroTable {
        let mut table = MacroTable::new();
        for (n, d) in defs.iter().enumerate() {
            assert!(table.add_definition_line(d, n as u32 + 1));
        }
        table
    }

    fn expand_str(table: &MacroTable, text: &str) -> Vec<String> {
        let mut counter = 0;
        let mut expander = Expander::new(table, "test.cc", 1, &mut counter, 64);
        let tokens = lexer::tokenize(text, 1);
        expander
            .expand(&tokens)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn object_like_replacement() {
        let t = table(&["lala \"haha\""]);
        assert_eq!(expand_str(&t, "lala"), ["\"haha\""]);
    }

    #[test]
    fn self_reference_stops() {
        let t = table(&["RECURSIVE RECURSIVE"]);
        assert_eq!(expand_str(&t, "RECURSIVE"), ["RECURSIVE"]);
    }

    #[test]
    fn mutual_recursion_stops() {
        let t = table(&["X Y", "Y X"]);
        assert_eq!(expand_str(&t, "X"), ["X"]);
    }

    #[test]
    fn sibling_uses_expand_independently() {
        let t = table(&["A B"]);
        assert_eq!(expand_str(&t, "A A"), ["B", "B"]);
    }

    #[test]
    fn function_like_replacement() {
        let t = table(&["plus(a, b) a + b"]);
        assert_eq!(expand_str(&t, "plus(1, 2)"), ["1", "+", "2"]);
    }

    #[test]
    fn recursive_function_like() {
        let t = table(&["F(x) F(x)"]);
        assert_eq!(expand_str(&t, "F(1)"), ["F", "(", "1", ")"]);
    }

    #[test]
    fn replacement_does_not_capture_following_arguments() {
        let t = table(&["f(a) a", "g f"]);
        assert_eq!(expand_str(&t, "g(1)"), ["f", "(", "1", ")"]);
    }

    #[test]
    fn name_without_parentheses_stays() {
        let t = table(&["plus(a, b) a + b"]);
        assert_eq!(expand_str(&t, "plus"), ["plus"]);
    }

    #[test]
    fn space_before_parenthesis_blocks_invocation() {
        let t = table(&["m(a) a"]);
        assert_eq!(expand_str(&t, "m ()"), ["m", "(", ")"]);
        assert_eq!(expand_str(&t, "m(x)"), ["x"]);
    }

    #[test]
    fn nested_parentheses_in_arguments() {
        let t = table(&["neg(a) -(a)"]);
        assert_eq!(expand_str(&t, "neg((1))"), ["-", "(", "(", "1", ")", ")"]);
    }

    #[test]
    fn stringize_collapses_whitespace() {
        let t = table(&["str(x) #x"]);
        assert_eq!(expand_str(&t, "str(a   b)"), ["\"a b\""]);
        assert_eq!(expand_str(&t, "str(\"quoted\")"), ["\"\\\"quoted\\\"\""]);
    }

    #[test]
    fn pasting_identifiers() {
        let t = table(&["concat(a, b) a##b"]);
        assert_eq!(expand_str(&t, "concat(x, y)"), ["xy"]);
    }

    #[test]
    fn pasting_without_parameters() {
        let t = table(&["cat c##c"]);
        assert_eq!(expand_str(&t, "cat"), ["cc"]);
    }

    #[test]
    fn paste_runs_collapse() {
        let t = table(&["glue(a, b) a ## ## ## b"]);
        assert_eq!(expand_str(&t, "glue(x, y)"), ["xy"]);
    }

    #[test]
    fn pasting_numbers_relexes() {
        let t = table(&["hexify(n) 0x##n"]);
        assert_eq!(expand_str(&t, "hexify(cf)"), ["0xcf"]);
    }

    #[test]
    fn chained_pastes() {
        let t = table(&["quad(a) a##a##a##a"]);
        assert_eq!(expand_str(&t, "quad(c)"), ["cccc"]);
    }

    #[test]
    fn standard_hash_hash_sample() {
        // the famous [C11 6.10.3.3] example, with the documented deviation:
        // hash_hash produces nothing, so mkstr sees the raw "x y"
        let t = table(&[
            "hash_hash(x) # ## #",
            "mkstr(a) # a",
            "in_between(a) mkstr(a)",
            "join(c, d) in_between(c hash_hash(x) d)",
        ]);
        assert_eq!(expand_str(&t, "join(x, y)"), ["\"x y\""]);
    }

    #[test]
    fn arguments_are_preexpanded() {
        let t = table(&["ONE 1", "id(x) x"]);
        assert_eq!(expand_str(&t, "id(ONE)"), ["1"]);
    }

    #[test]
    fn paste_operands_are_not_preexpanded() {
        let t = table(&["ONE 1", "tag(x) pre_##x"]);
        assert_eq!(expand_str(&t, "tag(ONE)"), ["pre_ONE"]);
    }

    #[test]
    fn stringize_operand_is_not_preexpanded() {
        let t = table(&["ONE 1", "str(x) #x"]);
        assert_eq!(expand_str(&t, "str(ONE)"), ["\"ONE\""]);
    }

    #[test]
    fn variadic_tail() {
        let t = table(&["fmt(f, ...) f __VA_ARGS__"]);
        assert_eq!(expand_str(&t, "fmt(a, b, c)"), ["a", "b", ",", "c"]);
    }

    #[test]
    fn named_variadic_tail() {
        let t = table(&["w(args...) args"]);
        assert_eq!(expand_str(&t, "w(1, 2)"), ["1", ",", "2"]);
        assert_eq!(expand_str(&t, "w()"), Vec::<String>::new());
    }

    #[test]
    fn empty_invocation_of_nullary_macro() {
        let t = table(&["M() 0"]);
        assert_eq!(expand_str(&t, "M()"), ["0"]);
    }

    #[test]
    fn arity_mismatch_leaves_name() {
        let t = table(&["plus(a, b) a + b"]);
        assert_eq!(expand_str(&t, "plus(1)"), ["plus", "(", "1", ")"]);
    }

    #[test]
    fn unterminated_invocation_leaves_name() {
        let t = table(&["m(a) a"]);
        assert_eq!(expand_str(&t, "m(1"), ["m", "(", "1"]);
    }

    #[test]
    fn line_builtin() {
        let t = MacroTable::new();
        let mut counter = 0;
        let mut expander = Expander::new(&t, "f.cc", 7, &mut counter, 64);
        let out = expander
            .expand(&lexer::tokenize("__LINE__ __FILE__", 7))
            .unwrap();
        assert_eq!(out[0].value, "7");
        assert_eq!(out[0].kind, TokenKind::Number);
        assert_eq!(out[1].value, "\"f.cc\"");
        assert_eq!(out[1].kind, TokenKind::String);
    }

    #[test]
    fn counter_increments() {
        let t = MacroTable::new();
        let mut counter = 0;
        let mut expander = Expander::new(&t, "f.cc", 1, &mut counter, 64);
        let out = expander
            .expand(&lexer::tokenize("__COUNTER__ __COUNTER__", 1))
            .unwrap();
        assert_eq!(out[0].value, "0");
        assert_eq!(out[1].value, "1");
        assert_eq!(counter, 2);
    }

    #[test]
    fn stored_definition_shadows_builtin() {
        let t = table(&["__LINE__ 123"]);
        let mut counter = 0;
        let mut expander = Expander::new(&t, "f.cc", 7, &mut counter, 64);
        let out = expander.expand(&lexer::tokenize("__LINE__", 7)).unwrap();
        assert_eq!(out[0].value, "123");
    }

    #[test]
    fn expansion_tokens_carry_invocation_site() {
        let t = table(&["M x"]);
        let mut counter = 0;
        let mut expander = Expander::new(&t, "f.cc", 2, &mut counter, 64);
        let out = expander.expand(&lexer::tokenize("  M", 2)).unwrap();
        assert_eq!(out[0].line, 2);
        assert_eq!(out[0].column, 3);
    }

    #[test]
    fn depth_limit_is_enforced() {
        let t = table(&["D0 1", "D1 D0", "D2 D1", "D3 D2"]);
        let mut counter = 0;
        let mut expander = Expander::new(&t, "f.cc", 1, &mut counter, 2);
        let result = expander.expand(&lexer::tokenize("D3", 1));
        assert!(matches!(
            result,
            Err(PreprocessError::ExpansionDepthExceeded { limit: 2, .. })
        ));
    }
}
