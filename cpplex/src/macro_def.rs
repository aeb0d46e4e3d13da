//! Macro definitions and the `#define` line grammar.

use crate::lexer;
use crate::token::Token;

/// A preprocessor macro definition.
///
/// `params` is `None` for object-like macros. Whether a macro is
/// function-like is decided once, at definition time, by the `(` directly
/// following the name; the distinction never changes afterwards.
#[derive(Clone, Debug)]
pub struct MacroDef {
    /// Named parameters, in declaration order. `None` for object-like macros.
    pub params: Option<Vec<String>>,
    /// Replacement list.
    pub body: Vec<Token>,
    /// Whether the parameter list ends in `...` (or a named `args...`).
    pub is_variadic: bool,
    /// Name of the variadic parameter for the `args...` GNU form.
    /// `None` means the standard `__VA_ARGS__` spelling.
    pub va_name: Option<String>,
}

impl MacroDef {
    /// Object-like macro with the given replacement list.
    pub fn object_like(body: Vec<Token>) -> Self {
        MacroDef {
            params: None,
            body,
            is_variadic: false,
            va_name: None,
        }
    }

    /// True if the macro takes an argument list.
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    /// Number of named parameters.
    pub fn arity(&self) -> usize {
        self.params.as_ref().map_or(0, Vec::len)
    }

    /// The spelling that refers to the variadic tail inside the body.
    pub fn va_param(&self) -> &str {
        self.va_name.as_deref().unwrap_or("__VA_ARGS__")
    }

    /// Index of a named parameter, if `name` is one.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.as_ref()?.iter().position(|p| p == name)
    }
}

/// Parse the text following `#define` (also the grammar of configured
/// defines: `NAME value` or `NAME(params) value`).
///
/// Returns `None` for lines without a leading macro name or with an
/// unterminated parameter list.
pub fn parse_definition(text: &str, line: u32) -> Option<(String, MacroDef)> {
    let tokens = lexer::tokenize(&lexer::strip_comments(text), line);
    let name_tok = tokens.first()?;
    if !name_tok.is_name() {
        return None;
    }
    let name = name_tok.value.clone();

    // Function-like only when the `(` hugs the name. `#define macro ()`
    // defines an object-like macro whose body is the parentheses.
    let function_like = tokens
        .get(1)
        .is_some_and(|t| t.is_punct("(") && !t.has_space_before);

    let (params, is_variadic, va_name, body_start) = if function_like {
        let mut params: Vec<String> = Vec::new();
        let mut variadic = false;
        let mut va_name = None;
        let mut i = 2;
        let mut closed = false;
        while let Some(t) = tokens.get(i) {
            if t.is_punct(")") {
                closed = true;
                i += 1;
                break;
            } else if t.is_punct(",") {
                // separator
            } else if t.is_punct("...") {
                variadic = true;
                // `args...` names the tail after the preceding parameter
                if i >= 1 && tokens[i - 1].is_name() {
                    va_name = params.pop();
                }
            } else if t.is_name() {
                params.push(t.value.clone());
            }
            i += 1;
        }
        if !closed {
            return None;
        }
        (Some(params), variadic, va_name, i)
    } else {
        (None, false, None, 1)
    };

    let mut body: Vec<Token> = tokens[body_start..].to_vec();
    if let Some(first) = body.first_mut() {
        first.has_space_before = false;
    }

    Some((
        name,
        MacroDef {
            params,
            body,
            is_variadic,
            va_name,
        },
    ))
}
