//! Token representation shared by the lexer and the preprocessor.

use std::fmt;

/// Check if a character can start an identifier (letter or underscore)
pub const fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Check if a character can continue an identifier (letter, digit, or underscore)
pub const fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Semantic class of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// A name: `foo`, `_bar`, `x1`
    Identifier,
    /// An identifier matching the C++ keyword set: `new`, `if`, `const`, ...
    Keyword,
    /// A preprocessing number: `42`, `0xcf`, `3.14f`, `1e+3`
    Number,
    /// A string literal including quotes: `"abc"`
    String,
    /// A character literal including quotes: `'a'`
    CharLiteral,
    /// An operator or separator: `+`, `##`, `<<=`, ...
    Punctuator,
    /// A character the lexer could not classify, or an unterminated literal
    Unknown,
    /// End of the token stream; appears exactly once, last
    Eof,
}

/// A single token with its spelling and origin.
///
/// Tokens are immutable once created. Macro expansion produces fresh tokens
/// carrying the location of the invocation site, never the definition site.
/// Whitespace is not represented as tokens; the adjacency information the
/// preprocessor needs rides on [`Token::has_space_before`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Raw text of the token.
    pub value: String,
    /// Semantic class.
    pub kind: TokenKind,
    /// 1-based logical line of the token's origin.
    pub line: u32,
    /// 1-based column of the token's origin.
    pub column: u32,
    /// Whether whitespace (or a comment) separated this token from the
    /// previous one on the same line.
    pub has_space_before: bool,
}

impl Token {
    /// Create a token.
    pub fn new(
        value: impl Into<String>,
        kind: TokenKind,
        line: u32,
        column: u32,
        has_space_before: bool,
    ) -> Self {
        Token {
            value: value.into(),
            kind,
            line,
            column,
            has_space_before,
        }
    }

    /// The end-of-stream marker.
    pub fn eof(line: u32) -> Self {
        Token::new("", TokenKind::Eof, line, 1, false)
    }

    /// True for identifier-shaped tokens, keywords included. Macro names may
    /// shadow keywords, so macro lookup goes through this predicate.
    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword)
    }

    /// True if this is a punctuator with the given spelling.
    pub fn is_punct(&self, value: &str) -> bool {
        self.kind == TokenKind::Punctuator && self.value == value
    }

    /// Clone this token, rewriting its origin to the given invocation site.
    pub(crate) fn at(&self, line: u32, column: u32) -> Token {
        Token {
            value: self.value.clone(),
            kind: self.kind,
            line,
            column,
            has_space_before: self.has_space_before,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// The C++ keyword set. Sorted, so membership is a binary search.
const KEYWORDS: &[&str] = &[
    "alignas",
    "alignof",
    "asm",
    "auto",
    "bool",
    "break",
    "case",
    "catch",
    "char",
    "char16_t",
    "char32_t",
    "char8_t",
    "class",
    "co_await",
    "co_return",
    "co_yield",
    "concept",
    "const",
    "const_cast",
    "consteval",
    "constexpr",
    "constinit",
    "continue",
    "decltype",
    "default",
    "delete",
    "do",
    "double",
    "dynamic_cast",
    "else",
    "enum",
    "explicit",
    "export",
    "extern",
    "false",
    "float",
    "for",
    "friend",
    "goto",
    "if",
    "inline",
    "int",
    "long",
    "mutable",
    "namespace",
    "new",
    "noexcept",
    "nullptr",
    "operator",
    "private",
    "protected",
    "public",
    "register",
    "reinterpret_cast",
    "requires",
    "return",
    "short",
    "signed",
    "sizeof",
    "static",
    "static_assert",
    "static_cast",
    "struct",
    "switch",
    "template",
    "this",
    "thread_local",
    "throw",
    "true",
    "try",
    "typedef",
    "typeid",
    "typename",
    "union",
    "unsigned",
    "using",
    "virtual",
    "void",
    "volatile",
    "wchar_t",
    "while",
];

/// Check whether an identifier spelling is a reserved C++ keyword.
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.binary_search(&name).is_ok()
}
