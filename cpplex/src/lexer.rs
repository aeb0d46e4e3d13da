//! Character-level lexing: line splicing, comment stripping, and per-line
//! tokenization with maximal-munch punctuators.
//!
//! The pipeline runs in the order mandated by the phases of translation:
//! splices first (so a `\`-newline inside a token or comment works), then
//! comment removal, then tokenization of each logical line.

use crate::token::{Token, TokenKind, is_identifier_continue, is_identifier_start, is_keyword};

/// Remove backslash-newline splices and normalize line terminators to `\n`.
///
/// A `\` immediately followed by `\r\n`, `\r` or `\n` disappears together
/// with exactly one line terminator, so a splice masks only one succeeding
/// newline.
pub fn splice(input: &str) -> String {
    splice_with_lines(input).0
}

/// [`splice`], plus a map from logical lines to physical lines: the n-th
/// entry is the 1-based physical line the n-th logical line starts on.
/// Splices advance the physical count without opening a new logical line,
/// so tokens after a continuation keep their pre-splice line numbers.
pub fn splice_with_lines(input: &str) -> (String, Vec<u32>) {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut starts: Vec<u32> = Vec::new();
    let mut physical: u32 = 1;
    let mut at_line_start = true;
    let mut i = 0;
    while i < chars.len() {
        if at_line_start {
            starts.push(physical);
            at_line_start = false;
        }
        if chars[i] == '\\' && matches!(chars.get(i + 1), Some('\n' | '\r')) {
            let term = chars[i + 1];
            i += 2;
            if term == '\r' && chars.get(i) == Some(&'\n') {
                i += 1;
            }
            physical += 1;
            continue;
        }
        if chars[i] == '\r' || chars[i] == '\n' {
            if chars[i] == '\r' && chars.get(i + 1) == Some(&'\n') {
                i += 1;
            }
            out.push('\n');
            physical += 1;
            at_line_start = true;
            i += 1;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    (out, starts)
}

/// Replace comments with a single space, outside of string and character
/// literals. Newlines inside block comments are preserved so line numbers
/// stay stable. An unterminated literal stops masking at the end of its
/// line, matching the lexer's per-line resynchronization.
pub fn strip_comments(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_literal: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if let Some(quote) = in_literal {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == quote || c == '\n' {
                in_literal = None;
            }
            i += 1;
        } else if c == '"' && raw_prefix_ends_at(&chars, i) {
            // raw string: copied verbatim, comment markers and quotes
            // inside are not markers
            match raw_string_end(&chars, i) {
                Some(end) => {
                    out.extend(chars[i..end].iter());
                    i = end;
                }
                None => {
                    in_literal = Some('"');
                    out.push(c);
                    i += 1;
                }
            }
        } else if c == '"' || c == '\'' {
            in_literal = Some(c);
            out.push(c);
            i += 1;
        } else if c == '/' && chars.get(i + 1) == Some(&'/') {
            out.push(' ');
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            out.push(' ');
            i += 2;
            while i < chars.len() {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    i += 2;
                    break;
                }
                if chars[i] == '\n' {
                    out.push('\n');
                }
                i += 1;
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// Identifier spellings that open a raw string when a `"` follows.
fn is_raw_string_prefix(text: &str) -> bool {
    matches!(text, "R" | "LR" | "uR" | "UR" | "u8R")
}

/// True if the `"` at `quote` is preceded by a raw string prefix that is
/// not the tail of a longer identifier.
fn raw_prefix_ends_at(chars: &[char], quote: usize) -> bool {
    if quote == 0 || chars[quote - 1] != 'R' {
        return false;
    }
    let r = quote - 1;
    let start = if r >= 2 && chars[r - 2] == 'u' && chars[r - 1] == '8' {
        r - 2
    } else if r >= 1 && matches!(chars[r - 1], 'u' | 'U' | 'L') {
        r - 1
    } else {
        r
    };
    start == 0 || !is_identifier_continue(chars[start - 1])
}

/// End (exclusive) of the raw string whose opening `"` is at `quote`:
/// `R"delim( ... )delim"` closes at the first `)delim"`. `None` when the
/// delimiter is malformed or the literal never closes in `chars`.
fn raw_string_end(chars: &[char], quote: usize) -> Option<usize> {
    let mut open = quote + 1;
    while open < chars.len() && chars[open] != '(' {
        if chars[open] == '"' || chars[open] == '\\' || chars[open] == '\n' {
            return None;
        }
        open += 1;
    }
    if open >= chars.len() {
        return None;
    }
    let mut closer = vec![')'];
    closer.extend_from_slice(&chars[quote + 1..open]);
    closer.push('"');
    let mut k = open + 1;
    while k + closer.len() <= chars.len() {
        if chars[k..k + closer.len()] == closer[..] {
            return Some(k + closer.len());
        }
        k += 1;
    }
    None
}

/// The C++ punctuator set, longest spellings first for maximal munch.
const PUNCTUATORS: &[&str] = &[
    "%:%:", // digraph ##
    "...", "<<=", ">>=", "->*", "<=>", "##", "::", "->", "++", "--", "<<", ">>", "<=", ">=", "==",
    "!=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", ".*", "<%", "%>", "<:", ":>",
    "%:", "{", "}", "[", "]", "(", ")", ";", ":", "?", ".", "~", "!", "+", "-", "*", "/", "%", "^",
    "&", "|", "=", "<", ">", ",", "#",
];

fn match_punctuator(chars: &[char], at: usize) -> Option<&'static str> {
    PUNCTUATORS
        .iter()
        .find(|p| {
            p.chars()
                .enumerate()
                .all(|(k, pc)| chars.get(at + k) == Some(&pc))
        })
        .copied()
}

/// Tokenize one logical line.
///
/// Comments must already be stripped. Unterminated string/char literals do
/// not abort lexing: the partial text is emitted as an [`TokenKind::Unknown`]
/// token and scanning resumes at the line end.
pub fn tokenize(line: &str, line_no: u32) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut space = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            space = true;
            i += 1;
            continue;
        }
        let column = (i + 1) as u32;

        if is_identifier_start(c) {
            let start = i;
            while i < chars.len() && is_identifier_continue(chars[i]) {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            // a raw string literal, prefix included, is one String token
            // with no escape processing
            if is_raw_string_prefix(&text)
                && chars.get(i) == Some(&'"')
                && let Some(end) = raw_string_end(&chars, i)
            {
                let full: String = chars[start..end].iter().collect();
                tokens.push(Token::new(full, TokenKind::String, line_no, column, space));
                i = end;
                space = false;
                continue;
            }
            let kind = if is_keyword(&text) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token::new(text, kind, line_no, column, space));
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit))
        {
            // pp-number: digits, identifier characters, '.', and exponent
            // signs after e/E/p/P. This keeps "0x" together so pasting
            // 0x##cf can form a single literal again.
            let start = i;
            i += 1;
            while i < chars.len() {
                let d = chars[i];
                if is_identifier_continue(d) || d == '.' {
                    i += 1;
                    if matches!(d, 'e' | 'E' | 'p' | 'P')
                        && matches!(chars.get(i), Some(&('+' | '-')))
                    {
                        i += 1;
                    }
                } else {
                    break;
                }
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token::new(text, TokenKind::Number, line_no, column, space));
        } else if c == '"' || c == '\'' {
            let quote = c;
            let start = i;
            i += 1;
            let mut terminated = false;
            while i < chars.len() {
                let d = chars[i];
                if d == '\\' && i + 1 < chars.len() {
                    i += 2;
                    continue;
                }
                i += 1;
                if d == quote {
                    terminated = true;
                    break;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let kind = if !terminated {
                TokenKind::Unknown
            } else if quote == '"' {
                TokenKind::String
            } else {
                TokenKind::CharLiteral
            };
            tokens.push(Token::new(text, kind, line_no, column, space));
        } else if let Some(punct) = match_punctuator(&chars, i) {
            i += punct.chars().count();
            tokens.push(Token::new(
                punct,
                TokenKind::Punctuator,
                line_no,
                column,
                space,
            ));
        } else {
            i += 1;
            tokens.push(Token::new(
                c.to_string(),
                TokenKind::Unknown,
                line_no,
                column,
                space,
            ));
        }
        space = false;
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.value.as_str()).collect()
    }

    #[test]
    fn splice_masks_one_terminator_per_style() {
        assert_eq!(splice("line\\\r\nline"), "lineline");
        assert_eq!(splice("line\\\rline"), "lineline");
        assert_eq!(splice("line\\\nline"), "lineline");
        assert_eq!(splice("line\\\n    line"), "line    line");
        // only one newline is masked
        assert_eq!(splice("a\\\n\nb"), "a\nb");
    }

    #[test]
    fn splice_normalizes_terminators() {
        assert_eq!(splice("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn stray_backslash_is_kept() {
        assert_eq!(splice("a\\b"), "a\\b");
    }

    #[test]
    fn splice_tracks_physical_line_starts() {
        let (text, starts) = splice_with_lines("a\\\nb\nc");
        assert_eq!(text, "ab\nc");
        assert_eq!(starts, [1, 3]);

        let (_, starts) = splice_with_lines("x\ny\nz");
        assert_eq!(starts, [1, 2, 3]);

        let (text, starts) = splice_with_lines("a\\\r\nb\\\rc\nd");
        assert_eq!(text, "abc\nd");
        assert_eq!(starts, [1, 4]);
    }

    #[test]
    fn comments_become_a_space() {
        assert_eq!(strip_comments("a// tail"), "a ");
        assert_eq!(strip_comments("a/* x */b"), "a b");
        assert_eq!(strip_comments("a/* 1\n2 */b"), "a \nb");
    }

    #[test]
    fn comment_markers_inside_strings_survive() {
        assert_eq!(strip_comments("\" /a/path/*\""), "\" /a/path/*\"");
        assert_eq!(strip_comments("'/' // x"), "'/' ");
    }

    #[test]
    fn unterminated_string_stops_at_line_end() {
        assert_eq!(strip_comments("\"open\n// real comment"), "\"open\n ");
    }

    #[test]
    fn maximal_munch_punctuators() {
        assert_eq!(values(&tokenize("a<<=b", 1)), ["a", "<<=", "b"]);
        assert_eq!(values(&tokenize("a##b", 1)), ["a", "##", "b"]);
        assert_eq!(values(&tokenize("x...y", 1)), ["x", "...", "y"]);
        assert_eq!(values(&tokenize("a<b", 1)), ["a", "<", "b"]);
    }

    #[test]
    fn pp_numbers_stay_whole() {
        assert_eq!(values(&tokenize("0x 0xcf 3.14f 1e+3", 1)), [
            "0x", "0xcf", "3.14f", "1e+3"
        ]);
        let tokens = tokenize("1+2", 1);
        assert_eq!(values(&tokens), ["1", "+", "2"]);
    }

    #[test]
    fn adjacency_flag() {
        let tokens = tokenize("m ()", 1);
        assert_eq!(values(&tokens), ["m", "(", ")"]);
        assert!(tokens[1].has_space_before);
        assert!(!tokens[2].has_space_before);

        let tokens = tokenize("m()", 1);
        assert!(!tokens[1].has_space_before);
    }

    #[test]
    fn string_and_char_literals() {
        let tokens = tokenize(r#""he\"llo" 'a'"#, 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].value, r#""he\"llo""#);
        assert_eq!(tokens[1].kind, TokenKind::CharLiteral);
    }

    #[test]
    fn raw_string_literals() {
        let tokens = tokenize(r#"auto s = R"(say "hi)"; int keep;"#, 1);
        assert_eq!(values(&tokens), [
            "auto",
            "s",
            "=",
            r#"R"(say "hi)""#,
            ";",
            "int",
            "keep",
            ";"
        ]);
        assert_eq!(tokens[3].kind, TokenKind::String);
    }

    #[test]
    fn raw_string_delimiters_and_prefixes() {
        let tokens = tokenize(r#"R"x(a)" b)x" u8R"(c)""#, 1);
        assert_eq!(values(&tokens), [r#"R"x(a)" b)x""#, r#"u8R"(c)""#]);

        // an identifier merely ending in R is not a raw string prefix
        let tokens = tokenize(r#"BIGR"s""#, 1);
        assert_eq!(values(&tokens), ["BIGR", "\"s\""]);
        assert_eq!(tokens[1].kind, TokenKind::String);
    }

    #[test]
    fn unclosed_raw_string_resynchronizes() {
        let tokens = tokenize(r#"R"(open"#, 1);
        assert_eq!(tokens[0].value, "R");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Unknown));
    }

    #[test]
    fn raw_strings_shield_comment_stripping() {
        assert_eq!(
            strip_comments(r#"R"(keep /* this */)" // drop"#),
            r#"R"(keep /* this */)"  "#
        );
        assert_eq!(
            strip_comments(r#"R"(quote " inside)" /*x*/"#),
            r#"R"(quote " inside)" "#
        );
    }

    #[test]
    fn unterminated_literal_is_unknown() {
        let tokens = tokenize("\"open", 1);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
    }

    #[test]
    fn keywords_are_tagged() {
        let tokens = tokenize("new B()", 1);
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn columns_are_one_based() {
        let tokens = tokenize("  ab cd", 3);
        assert_eq!(tokens[0].line, 3);
        assert_eq!(tokens[0].column, 3);
        assert_eq!(tokens[1].column, 6);
    }
}
