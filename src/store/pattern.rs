//! Glob Pattern Matching for Key Enumeration
//!
//! Keys are raw byte sequences, so matching works on bytes rather than
//! UTF-8 text. The supported dialect:
//!
//! - `*` matches any run of bytes (including an empty run)
//! - `?` matches exactly one byte
//! - `[abc]` matches one byte out of a set, `[a-z]` matches a range,
//!   `[^abc]` negates the set
//! - `\x` matches the byte `x` literally
//! - any other byte matches itself
//!
//! Patterns are compiled once and validated up front: an unclosed character
//! class or a trailing backslash is rejected with [`PatternError`] instead
//! of silently matching nothing.

use thiserror::Error;

/// Errors produced when compiling a malformed glob pattern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// A `[` was opened but the pattern ended before the matching `]`.
    #[error("unclosed character class in pattern")]
    UnclosedClass,

    /// The pattern ends with a bare `\`.
    #[error("dangling escape at end of pattern")]
    DanglingEscape,
}

/// One compiled element of a glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// A single literal byte.
    Literal(u8),
    /// `?` - exactly one byte, any value.
    AnyByte,
    /// `*` - zero or more bytes.
    AnyRun,
    /// `[...]` - one byte drawn from (or excluded from) a set of ranges.
    Class { negate: bool, ranges: Vec<(u8, u8)> },
}

/// A compiled glob pattern.
///
/// # Example
///
/// ```
/// use emberkv::store::Pattern;
///
/// let pattern = Pattern::compile(b"session:*").unwrap();
/// assert!(pattern.matches(b"session:42"));
/// assert!(!pattern.matches(b"user:42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    tokens: Vec<Token>,
}

impl Pattern {
    /// Compiles a pattern, validating its syntax.
    pub fn compile(pattern: &[u8]) -> Result<Self, PatternError> {
        let mut tokens = Vec::with_capacity(pattern.len());
        let mut i = 0;

        while i < pattern.len() {
            match pattern[i] {
                b'*' => {
                    // Runs of consecutive stars collapse into one.
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                    i += 1;
                }
                b'?' => {
                    tokens.push(Token::AnyByte);
                    i += 1;
                }
                b'\\' => {
                    if i + 1 >= pattern.len() {
                        return Err(PatternError::DanglingEscape);
                    }
                    tokens.push(Token::Literal(pattern[i + 1]));
                    i += 2;
                }
                b'[' => {
                    let (token, consumed) = Self::compile_class(&pattern[i..])?;
                    tokens.push(token);
                    i += consumed;
                }
                b => {
                    tokens.push(Token::Literal(b));
                    i += 1;
                }
            }
        }

        Ok(Self { tokens })
    }

    /// Parses a `[...]` class starting at `input[0] == b'['`.
    ///
    /// Returns the compiled token and the number of bytes consumed.
    fn compile_class(input: &[u8]) -> Result<(Token, usize), PatternError> {
        let mut i = 1;
        let negate = input.get(i) == Some(&b'^');
        if negate {
            i += 1;
        }

        let mut ranges = Vec::new();
        let mut first = true;

        while i < input.len() {
            let b = input[i];

            // A `]` in the very first position is a literal member, not the
            // closing bracket.
            if b == b']' && !first {
                return Ok((Token::Class { negate, ranges }, i + 1));
            }
            first = false;

            // Range like `a-z`, as long as `-` is not the last byte before `]`.
            if i + 2 < input.len() && input[i + 1] == b'-' && input[i + 2] != b']' {
                let (lo, hi) = (b, input[i + 2]);
                ranges.push(if lo <= hi { (lo, hi) } else { (hi, lo) });
                i += 3;
            } else {
                ranges.push((b, b));
                i += 1;
            }
        }

        Err(PatternError::UnclosedClass)
    }

    /// Returns true iff the whole key matches the pattern.
    pub fn matches(&self, key: &[u8]) -> bool {
        Self::match_from(&self.tokens, key)
    }

    fn match_from(tokens: &[Token], text: &[u8]) -> bool {
        let token = match tokens.first() {
            Some(t) => t,
            None => return text.is_empty(),
        };

        match token {
            Token::AnyRun => {
                // Try every possible run length, shortest first.
                (0..=text.len()).any(|i| Self::match_from(&tokens[1..], &text[i..]))
            }
            Token::AnyByte => !text.is_empty() && Self::match_from(&tokens[1..], &text[1..]),
            Token::Literal(b) => {
                text.first() == Some(b) && Self::match_from(&tokens[1..], &text[1..])
            }
            Token::Class { negate, ranges } => match text.first() {
                Some(&c) => {
                    let hit = ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
                    hit != *negate && Self::match_from(&tokens[1..], &text[1..])
                }
                None => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let pattern = Pattern::compile(b"hello").unwrap();
        assert!(pattern.matches(b"hello"));
        assert!(!pattern.matches(b"hello!"));
        assert!(!pattern.matches(b"hell"));
    }

    #[test]
    fn test_star() {
        let pattern = Pattern::compile(b"h*llo").unwrap();
        assert!(pattern.matches(b"hello"));
        assert!(pattern.matches(b"hallo"));
        assert!(pattern.matches(b"hllo"));
        assert!(pattern.matches(b"heeeello"));
        assert!(!pattern.matches(b"world"));

        let all = Pattern::compile(b"*").unwrap();
        assert!(all.matches(b""));
        assert!(all.matches(b"anything"));
    }

    #[test]
    fn test_prefix_scan_pattern() {
        let pattern = Pattern::compile(b"prefix*").unwrap();
        assert!(pattern.matches(b"prefix-1-abc"));
        assert!(pattern.matches(b"prefix"));
        assert!(!pattern.matches(b"other-key"));
    }

    #[test]
    fn test_question_mark() {
        let pattern = Pattern::compile(b"h?llo").unwrap();
        assert!(pattern.matches(b"hello"));
        assert!(pattern.matches(b"hallo"));
        assert!(!pattern.matches(b"hllo"));
        assert!(!pattern.matches(b"heello"));
    }

    #[test]
    fn test_character_class() {
        let pattern = Pattern::compile(b"h[ae]llo").unwrap();
        assert!(pattern.matches(b"hello"));
        assert!(pattern.matches(b"hallo"));
        assert!(!pattern.matches(b"hillo"));

        let range = Pattern::compile(b"key:[0-9]").unwrap();
        assert!(range.matches(b"key:7"));
        assert!(!range.matches(b"key:x"));

        let negated = Pattern::compile(b"h[^ae]llo").unwrap();
        assert!(negated.matches(b"hxllo"));
        assert!(!negated.matches(b"hello"));
    }

    #[test]
    fn test_escape() {
        let pattern = Pattern::compile(b"literal\\*star").unwrap();
        assert!(pattern.matches(b"literal*star"));
        assert!(!pattern.matches(b"literalXstar"));
    }

    #[test]
    fn test_non_utf8_keys() {
        let pattern = Pattern::compile(b"*").unwrap();
        assert!(pattern.matches(&[0xff, 0xfe, 0x00]));

        let exact = Pattern::compile(&[0xff, b'?']).unwrap();
        assert!(exact.matches(&[0xff, 0x01]));
        assert!(!exact.matches(&[0xfe, 0x01]));
    }

    #[test]
    fn test_consecutive_stars_collapse() {
        let pattern = Pattern::compile(b"a***b").unwrap();
        assert!(pattern.matches(b"ab"));
        assert!(pattern.matches(b"axxxb"));
    }

    #[test]
    fn test_unclosed_class_rejected() {
        assert_eq!(
            Pattern::compile(b"h[allo"),
            Err(PatternError::UnclosedClass)
        );
    }

    #[test]
    fn test_dangling_escape_rejected() {
        assert_eq!(
            Pattern::compile(b"hello\\"),
            Err(PatternError::DanglingEscape)
        );
    }

    #[test]
    fn test_leading_bracket_member() {
        // `]` right after `[` is a member, not the closer.
        let pattern = Pattern::compile(b"[]a]x").unwrap();
        assert!(pattern.matches(b"]x"));
        assert!(pattern.matches(b"ax"));
        assert!(!pattern.matches(b"bx"));
    }
}
