use log::trace;
use thiserror::Error;

use crate::ast::Re;
use crate::class::CharClass;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unclosed group opened at offset {0}")]
    UnclosedGroup(usize),
    #[error("unmatched ')' at offset {0}")]
    UnmatchedParen(usize),
    #[error("unclosed character class opened at offset {0}")]
    UnclosedClass(usize),
    #[error("trailing backslash at offset {0}")]
    DanglingEscape(usize),
    #[error("'{op}' at offset {at} has nothing to repeat")]
    NothingToRepeat { op: char, at: usize },
    #[error("range {lo}-{hi} at offset {at} is out of order")]
    ReversedRange { lo: char, hi: char, at: usize },
    #[error("group at offset {0} is nested too deeply")]
    TooDeep(usize),
    #[error("repetition at offset {0} makes the tree too large")]
    TooLarge(usize),
}

/// Groups may be nested at most this deep.
pub const MAX_NESTING: usize = 100;

/// `x+` copies `x`; a copy that would push the tree past this many nodes is
/// refused.
pub const MAX_NODES: usize = 1 << 16;

/// The net effect of a run of postfix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    Star,
    Plus,
    Optional,
}

impl Repeat {
    fn of(op: char) -> Self {
        match op {
            '*' => Repeat::Star,
            '+' => Repeat::Plus,
            _ => Repeat::Optional,
        }
    }

    /// `x+?`, `x?*` and every other mixed run collapse to `x*`.
    fn then(self, next: Repeat) -> Self {
        if self == next {
            self
        } else {
            Repeat::Star
        }
    }
}

/// Parse `pattern` into a tree.
pub fn parse(pattern: &str) -> Result<Re, ParseError> {
    Parser::new(pattern).parse()
}

/// Recursive-descent parser for regular expressions.
///
/// The `Parser` struct holds the pattern and the current byte position.
/// Trees are assembled with [`Re::or`], [`Re::then`] and [`Re::star`], so
/// the result is always in flattened form.
pub struct Parser<'a> {
    pub pattern: &'a str,
    pub pos: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given pattern.
    pub fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            pos: 0,
            nesting: 0,
        }
    }

    /// Peek at the next character in the pattern without advancing.
    fn peek(&self) -> Option<char> {
        self.pattern[self.pos..].chars().next()
    }

    /// Advance the parser by one character and return it.
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Expect a specific character and advance if it matches.
    fn expect(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Entry point: parse the whole pattern.
    ///
    /// The empty pattern is the empty string, not the empty language.
    pub fn parse(&mut self) -> Result<Re, ParseError> {
        let re = self.parse_alt()?;
        if self.peek() == Some(')') {
            return Err(ParseError::UnmatchedParen(self.pos));
        }
        Ok(re)
    }

    /// Parse alternation (`|`).
    ///
    /// Example:
    /// - Pattern: `a|b|c` → Alternation([a, b, c])
    /// - Pattern: `a|`    → Alternation([a, Concatenation([])])
    fn parse_alt(&mut self) -> Result<Re, ParseError> {
        let mut re = self.parse_seq()?;
        while self.expect('|') {
            re = re.or(self.parse_seq()?);
        }
        Ok(re)
    }

    /// Parse a sequence of atoms (concatenation).
    ///
    /// Example:
    /// - Pattern: `abc`    → Concatenation([a, b, c])
    /// - Pattern: `a(b|c)` → Concatenation([a, Alternation([b, c])])
    fn parse_seq(&mut self) -> Result<Re, ParseError> {
        let mut re = Re::epsilon();
        while let Some(ch) = self.peek() {
            if ch == ')' || ch == '|' {
                break;
            }
            re = re.then(self.parse_repeat()?);
        }
        Ok(re)
    }

    /// Parse postfix operators after an atom.
    ///
    /// `x+` is desugared to `xx*` and `x?` to `x|ε`. A run of operators is
    /// folded first and applied once, so `x++++` copies `x` a single time.
    fn parse_repeat(&mut self) -> Result<Re, ParseError> {
        let atom = self.parse_atom()?;
        let mut repeat: Option<Repeat> = None;
        let mut at = self.pos;
        while let Some(op @ ('*' | '+' | '?')) = self.peek() {
            at = self.pos;
            self.advance();
            trace!("repeat {op} at {at}");
            let next = Repeat::of(op);
            repeat = Some(repeat.map_or(next, |current| current.then(next)));
        }
        Ok(match repeat {
            None => atom,
            Some(Repeat::Star) => atom.star(),
            Some(Repeat::Optional) => atom.or(Re::epsilon()),
            Some(Repeat::Plus) => {
                if atom.node_count() > MAX_NODES / 2 {
                    return Err(ParseError::TooLarge(at));
                }
                atom.clone().then(atom.star())
            }
        })
    }

    /// Parse a single atom: group, class, escape, wildcard or literal.
    ///
    /// Examples:
    /// - Pattern: `(ab)`  → Concatenation([a, b])
    /// - Pattern: `[a-c]` → CharClass([a-c])
    /// - Pattern: `\d`    → CharClass([0-9])
    /// - Pattern: `\w`    → CharClass([0-9A-Z_a-z])
    /// - Pattern: `.`     → CharClass([^])
    /// - Pattern: `\*`    → Literal('*')
    fn parse_atom(&mut self) -> Result<Re, ParseError> {
        let start = self.pos;
        let Some(ch) = self.advance() else {
            return Ok(Re::epsilon());
        };
        match ch {
            '(' => {
                if self.nesting >= MAX_NESTING {
                    return Err(ParseError::TooDeep(start));
                }
                self.nesting += 1;
                let inner = self.parse_alt();
                self.nesting -= 1;
                let inner = inner?;
                if !self.expect(')') {
                    return Err(ParseError::UnclosedGroup(start));
                }
                Ok(inner)
            }
            '[' => self.parse_char_class(start).map(Re::CharClass),
            '\\' => match self.advance() {
                Some('d') => Ok(Re::CharClass(CharClass::digit())),
                Some('w') => Ok(Re::CharClass(CharClass::word())),
                Some(c) => Ok(Re::Literal(c)),
                None => Err(ParseError::DanglingEscape(start)),
            },
            '.' => Ok(Re::CharClass(CharClass::any())),
            '*' | '+' | '?' => Err(ParseError::NothingToRepeat { op: ch, at: start }),
            c => Ok(Re::Literal(c)),
        }
    }

    /// Parse the body of a character class; `[` is already consumed.
    ///
    /// Examples:
    /// - Pattern: `[abc]`  → ranges a-c
    /// - Pattern: `[^xyz]` → ranges x-z, negated
    /// - Pattern: `[]`     → the empty class
    fn parse_char_class(&mut self, start: usize) -> Result<CharClass, ParseError> {
        let negated = self.expect('^');
        let mut class = CharClass::new();

        loop {
            let at = self.pos;
            let lo = match self.advance() {
                None => return Err(ParseError::UnclosedClass(start)),
                Some(']') => break,
                Some('\\') => self.advance().ok_or(ParseError::UnclosedClass(start))?,
                Some(c) => c,
            };

            // `a-` followed by `]` keeps the dash as a member
            let rest = &self.pattern[self.pos..];
            if rest.starts_with('-') && !rest.starts_with("-]") && rest.len() > 1 {
                self.advance();
                let hi = match self.advance() {
                    None => return Err(ParseError::UnclosedClass(start)),
                    Some('\\') => self.advance().ok_or(ParseError::UnclosedClass(start))?,
                    Some(c) => c,
                };
                if hi < lo {
                    return Err(ParseError::ReversedRange { lo, hi, at });
                }
                class.push(lo, hi);
            } else {
                class.push(lo, lo);
            }
        }

        Ok(if negated { class.negate() } else { class })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(c: char) -> Re {
        Re::Literal(c)
    }

    #[test]
    fn sequence_and_alternation() {
        assert_eq!(
            parse("ab|c").unwrap(),
            Re::Alternation(vec![Re::Concatenation(vec![lit('a'), lit('b')]), lit('c')])
        );
    }

    #[test]
    fn groups_flatten() {
        assert_eq!(parse("(ab)c").unwrap(), parse("abc").unwrap());
        assert_eq!(parse("((a))").unwrap(), lit('a'));
    }

    #[test]
    fn star_binds_tighter_than_concatenation() {
        assert_eq!(parse("ab*").unwrap(), lit('a').then(lit('b').star()));
        assert_eq!(parse("(ab)*").unwrap(), lit('a').then(lit('b')).star());
        assert_eq!(parse("a**").unwrap(), lit('a').star());
    }

    #[test]
    fn plus_and_question_desugar() {
        assert_eq!(parse("a+").unwrap(), lit('a').then(lit('a').star()));
        assert_eq!(
            parse("a?").unwrap(),
            Re::Alternation(vec![lit('a'), Re::epsilon()])
        );
    }

    #[test]
    fn operator_runs_apply_once() {
        let a = lit('a');
        let plus = a.clone().then(a.clone().star());
        assert_eq!(parse(&format!("a{}", "+".repeat(64))).unwrap(), plus);
        assert_eq!(parse("a??").unwrap(), a.clone().or(Re::epsilon()));
        for mixed in ["a*+", "a+*", "a+?", "a?+", "a?*", "a*?", "a+*+?"] {
            assert_eq!(parse(mixed).unwrap(), a.clone().star(), "{mixed}");
        }
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = |n: usize| format!("{}a{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(parse(&deep(MAX_NESTING)).unwrap(), lit('a'));
        assert_eq!(parse(&deep(MAX_NESTING + 1)), Err(ParseError::TooDeep(MAX_NESTING)));
        assert_eq!(parse(&deep(100_000)), Err(ParseError::TooDeep(MAX_NESTING)));
    }

    #[test]
    fn doubling_plus_is_bounded() {
        let pattern = format!("{}a{}", "(".repeat(40), "+)".repeat(40));
        assert!(matches!(parse(&pattern), Err(ParseError::TooLarge(_))));

        let pattern = format!("{}a{}", "(".repeat(4), "+)".repeat(4));
        let re = parse(&pattern).unwrap();
        assert!(re.node_count() <= MAX_NODES);
    }

    #[test]
    fn empty_pattern_and_branches() {
        assert_eq!(parse("").unwrap(), Re::epsilon());
        assert_eq!(parse("a|").unwrap(), Re::Alternation(vec![lit('a'), Re::epsilon()]));
        assert_eq!(parse("()").unwrap(), Re::epsilon());
    }

    #[test]
    fn classes() {
        assert_eq!(
            parse("[a-cx]").unwrap(),
            Re::CharClass(CharClass::from_ranges([('a', 'c'), ('x', 'x')], false))
        );
        assert_eq!(parse("[^0-9]").unwrap(), Re::CharClass(CharClass::digit().negate()));
        assert_eq!(parse("[]").unwrap(), Re::CharClass(CharClass::new()));
        assert_eq!(
            parse(r"[\]\-a-]").unwrap(),
            Re::CharClass(CharClass::from_ranges([(']', ']'), ('-', '-'), ('a', 'a')], false))
        );
        assert_eq!(parse(".").unwrap(), Re::CharClass(CharClass::any()));
        assert_eq!(parse(r"\d").unwrap(), Re::CharClass(CharClass::digit()));
    }

    #[test]
    fn escapes() {
        assert_eq!(parse(r"\*\\").unwrap(), lit('*').then(lit('\\')));
    }

    #[test]
    fn errors() {
        assert_eq!(parse("(a"), Err(ParseError::UnclosedGroup(0)));
        assert_eq!(parse("a)"), Err(ParseError::UnmatchedParen(1)));
        assert_eq!(parse("[ab"), Err(ParseError::UnclosedClass(0)));
        assert_eq!(parse("ab\\"), Err(ParseError::DanglingEscape(2)));
        assert_eq!(parse("*a"), Err(ParseError::NothingToRepeat { op: '*', at: 0 }));
        assert_eq!(parse("a|+"), Err(ParseError::NothingToRepeat { op: '+', at: 2 }));
        assert_eq!(
            parse("[z-a]"),
            Err(ParseError::ReversedRange { lo: 'z', hi: 'a', at: 1 })
        );
    }

    #[test]
    fn pattern_printer_output_parses_back() {
        for pattern in ["a(b|c)*", r"\*x|[^a-z]", "(ab)*c", "x*[0-9]"] {
            let re = parse(pattern).unwrap();
            assert_eq!(parse(&re.to_pattern()).unwrap(), re, "{pattern}");
        }
    }
}
