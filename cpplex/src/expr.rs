//! Constant-expression evaluation for `#if` and `#elif`.
//!
//! The parser is a recursive descent over the already macro-expanded token
//! list, with C operator precedence. Two failure channels are kept apart:
//! a malformed expression is a parse error (`Err`), while an expression
//! that parses but cannot be valued (division by zero, overflow, a float
//! literal) yields `Ok(None)`. The caller treats both as "assume true",
//! but `&&` and `||` can still short-circuit around an unvaluable operand.

use crate::token::{Token, TokenKind};

type Value = Option<i64>;
type ParseResult = Result<Value, ()>;

/// Evaluate a condition's token list. `Ok(Some(v))` is a definite value;
/// anything else means the condition could not be decided.
pub(crate) fn evaluate(tokens: &[Token]) -> ParseResult {
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.or_expr()?;
    if parser.pos != tokens.len() {
        return Err(());
    }
    Ok(value)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_punct(&mut self, spelling: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(spelling)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> ParseResult {
        let mut left = self.and_expr()?;
        while self.eat_punct("||") {
            let right = self.and_expr()?;
            left = match (left, right) {
                (Some(l), _) if l != 0 => Some(1),
                (_, Some(r)) if r != 0 => Some(1),
                (Some(_), Some(_)) => Some(0),
                _ => None,
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> ParseResult {
        let mut left = self.bit_or()?;
        while self.eat_punct("&&") {
            let right = self.bit_or()?;
            left = match (left, right) {
                (Some(0), _) | (_, Some(0)) => Some(0),
                (Some(_), Some(_)) => Some(1),
                _ => None,
            };
        }
        Ok(left)
    }

    fn bit_or(&mut self) -> ParseResult {
        let mut left = self.bit_xor()?;
        while self.eat_punct("|") {
            let right = self.bit_xor()?;
            left = left.zip(right).map(|(l, r)| l | r);
        }
        Ok(left)
    }

    fn bit_xor(&mut self) -> ParseResult {
        let mut left = self.bit_and()?;
        while self.eat_punct("^") {
            let right = self.bit_and()?;
            left = left.zip(right).map(|(l, r)| l ^ r);
        }
        Ok(left)
    }

    fn bit_and(&mut self) -> ParseResult {
        let mut left = self.equality()?;
        while self.eat_punct("&") {
            let right = self.equality()?;
            left = left.zip(right).map(|(l, r)| l & r);
        }
        Ok(left)
    }

    fn equality(&mut self) -> ParseResult {
        let mut left = self.relational()?;
        loop {
            let eq = if self.eat_punct("==") {
                true
            } else if self.eat_punct("!=") {
                false
            } else {
                return Ok(left);
            };
            let right = self.relational()?;
            left = left.zip(right).map(|(l, r)| ((l == r) == eq) as i64);
        }
    }

    fn relational(&mut self) -> ParseResult {
        let mut left = self.shift()?;
        loop {
            let op = if self.eat_punct("<=") {
                |l: i64, r: i64| (l <= r) as i64
            } else if self.eat_punct(">=") {
                |l: i64, r: i64| (l >= r) as i64
            } else if self.eat_punct("<") {
                |l: i64, r: i64| (l < r) as i64
            } else if self.eat_punct(">") {
                |l: i64, r: i64| (l > r) as i64
            } else {
                return Ok(left);
            };
            let right = self.shift()?;
            left = left.zip(right).map(|(l, r)| op(l, r));
        }
    }

    fn shift(&mut self) -> ParseResult {
        let mut left = self.additive()?;
        loop {
            let shl = if self.eat_punct("<<") {
                true
            } else if self.eat_punct(">>") {
                false
            } else {
                return Ok(left);
            };
            let right = self.additive()?;
            left = left.zip(right).and_then(|(l, r)| {
                let amount = u32::try_from(r).ok()?;
                if shl {
                    l.checked_shl(amount)
                } else {
                    l.checked_shr(amount)
                }
            });
        }
    }

    fn additive(&mut self) -> ParseResult {
        let mut left = self.multiplicative()?;
        loop {
            let add = if self.eat_punct("+") {
                true
            } else if self.eat_punct("-") {
                false
            } else {
                return Ok(left);
            };
            let right = self.multiplicative()?;
            left = left.zip(right).and_then(|(l, r)| {
                if add {
                    l.checked_add(r)
                } else {
                    l.checked_sub(r)
                }
            });
        }
    }

    fn multiplicative(&mut self) -> ParseResult {
        let mut left = self.unary()?;
        loop {
            let op: fn(i64, i64) -> Option<i64> = if self.eat_punct("*") {
                i64::checked_mul
            } else if self.eat_punct("/") {
                i64::checked_div
            } else if self.eat_punct("%") {
                i64::checked_rem
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = left.zip(right).and_then(|(l, r)| op(l, r));
        }
    }

    fn unary(&mut self) -> ParseResult {
        if self.eat_punct("!") {
            Ok(self.unary()?.map(|v| (v == 0) as i64))
        } else if self.eat_punct("-") {
            Ok(self.unary()?.and_then(i64::checked_neg))
        } else if self.eat_punct("+") {
            self.unary()
        } else if self.eat_punct("~") {
            Ok(self.unary()?.map(|v| !v))
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> ParseResult {
        let Some(token) = self.peek() else {
            return Err(());
        };
        match token.kind {
            TokenKind::Number => {
                let value = parse_int(&token.value);
                self.pos += 1;
                Ok(value)
            }
            TokenKind::CharLiteral => {
                let value = char_value(&token.value);
                self.pos += 1;
                Ok(value)
            }
            // surviving identifiers are undefined macros and count as 0
            TokenKind::Identifier | TokenKind::Keyword => {
                self.pos += 1;
                Ok(Some(0))
            }
            TokenKind::Punctuator if token.value == "(" => {
                self.pos += 1;
                let value = self.or_expr()?;
                if !self.eat_punct(")") {
                    return Err(());
                }
                Ok(value)
            }
            _ => Err(()),
        }
    }
}

/// Parse an integer preprocessing literal: decimal, `0x`/`0b` prefixed or
/// octal, with any `u`/`l`/`z` suffix combination. Floats and other
/// non-integers value as `None`.
fn parse_int(text: &str) -> Value {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L', 'z', 'Z']);
    let digits = digits.replace('\'', "");
    let (radix, digits) = if let Some(hex) = digits.strip_prefix("0x").or(digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if let Some(bin) = digits.strip_prefix("0b").or(digits.strip_prefix("0B")) {
        (2, bin)
    } else if digits.len() > 1 && digits.starts_with('0') && !digits.contains('.') {
        (8, &digits[1..])
    } else {
        (10, digits.as_str())
    };
    i64::from_str_radix(digits, radix).ok()
}

/// Value of a character literal; multi-character and exotic escapes are
/// left unvalued.
fn char_value(text: &str) -> Value {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let value = match chars.next()? {
        '\\' => match chars.next()? {
            'n' => '\n' as i64,
            't' => '\t' as i64,
            'r' => '\r' as i64,
            '0' => 0,
            '\\' => '\\' as i64,
            '\'' => '\'' as i64,
            '"' => '"' as i64,
            _ => return None,
        },
        c => c as i64,
    };
    if chars.next().is_some() {
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn eval(text: &str) -> ParseResult {
        evaluate(&lexer::tokenize(text, 1))
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Ok(Some(7)));
        assert_eq!(eval("(1 + 2) * 3"), Ok(Some(9)));
        assert_eq!(eval("7 / 2"), Ok(Some(3)));
        assert_eq!(eval("7 % 2"), Ok(Some(1)));
        assert_eq!(eval("10 - 4 - 3"), Ok(Some(3)));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(eval("1 + 1 == 2"), Ok(Some(1)));
        assert_eq!(eval("1 < 2 && 2 <= 2"), Ok(Some(1)));
        assert_eq!(eval("1 > 2 || 0"), Ok(Some(0)));
        assert_eq!(eval("3 != 3"), Ok(Some(0)));
    }

    #[test]
    fn bitwise_and_shift() {
        assert_eq!(eval("1 << 4"), Ok(Some(16)));
        assert_eq!(eval("6 & 3"), Ok(Some(2)));
        assert_eq!(eval("6 | 1"), Ok(Some(7)));
        assert_eq!(eval("6 ^ 3"), Ok(Some(5)));
    }

    #[test]
    fn unary_operators() {
        assert_eq!(eval("!0"), Ok(Some(1)));
        assert_eq!(eval("!5"), Ok(Some(0)));
        assert_eq!(eval("-3 + 5"), Ok(Some(2)));
        assert_eq!(eval("~0"), Ok(Some(-1)));
    }

    #[test]
    fn literal_radixes() {
        assert_eq!(eval("0x10"), Ok(Some(16)));
        assert_eq!(eval("0b101"), Ok(Some(5)));
        assert_eq!(eval("010"), Ok(Some(8)));
        assert_eq!(eval("42u"), Ok(Some(42)));
        assert_eq!(eval("1UL"), Ok(Some(1)));
    }

    #[test]
    fn character_literals() {
        assert_eq!(eval("'a'"), Ok(Some(97)));
        assert_eq!(eval("'\\n' == 10"), Ok(Some(1)));
    }

    #[test]
    fn undefined_identifiers_are_zero() {
        assert_eq!(eval("LALA"), Ok(Some(0)));
        assert_eq!(eval("LALA + 1"), Ok(Some(1)));
    }

    #[test]
    fn unvaluable_operands() {
        assert_eq!(eval("1 / 0"), Ok(None));
        assert_eq!(eval("3.14"), Ok(None));
        // short-circuit rescues a poisoned side
        assert_eq!(eval("1 || 1 / 0"), Ok(Some(1)));
        assert_eq!(eval("0 && 1 / 0"), Ok(Some(0)));
        assert_eq!(eval("0 || 1 / 0"), Ok(None));
    }

    #[test]
    fn malformed_expressions() {
        assert_eq!(eval(""), Err(()));
        assert_eq!(eval("(1"), Err(()));
        assert_eq!(eval("1 +"), Err(()));
        assert_eq!(eval("\"\""), Err(()));
    }
}
