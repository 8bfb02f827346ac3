use std::collections::BTreeSet;
use std::fmt;
use std::ops::BitOr;

use crate::class::CharClass;

/// A parsed regular expression.
///
/// Children of `Concatenation` and `Alternation` are owned by their `Vec`,
/// the child of `Star` by a `Box`. Cloning copies the whole subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Re {
    /// The empty language. Matches nothing, not even the empty string.
    #[default]
    Empty,
    /// Children in sequence. Zero children is the empty string.
    Concatenation(Vec<Re>),
    /// Any one of the children.
    Alternation(Vec<Re>),
    Literal(char),
    /// Zero or more repetitions of the child.
    Star(Box<Re>),
    CharClass(CharClass),
}

/// Which of the six shapes a node has.
///
/// The discriminant values are stable; snapshots store them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReKind {
    Empty = 0,
    Concatenation = 1,
    Alternation = 2,
    Literal = 3,
    Star = 4,
    CharClass = 5,
}

impl ReKind {
    /// Lookup table indexed by discriminant.
    pub const ALL: [ReKind; 6] = [
        ReKind::Empty,
        ReKind::Concatenation,
        ReKind::Alternation,
        ReKind::Literal,
        ReKind::Star,
        ReKind::CharClass,
    ];

    /// Map a raw tag to its variant. `None` means the tag is not one we know.
    pub fn from_discriminant(discriminant: usize) -> Option<ReKind> {
        Self::ALL.get(discriminant).copied()
    }

    pub fn discriminant(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ReKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReKind::Empty => "empty",
            ReKind::Concatenation => "concatenation",
            ReKind::Alternation => "alternation",
            ReKind::Literal => "literal",
            ReKind::Star => "star",
            ReKind::CharClass => "char class",
        };
        f.write_str(name)
    }
}

impl Re {
    pub fn empty() -> Self {
        Re::Empty
    }

    /// The empty string: a concatenation of nothing.
    pub fn epsilon() -> Self {
        Re::Concatenation(Vec::new())
    }

    pub fn literal(c: char) -> Self {
        Re::Literal(c)
    }

    /// A concatenation of one literal per character of `s`.
    pub fn literal_str(s: &str) -> Self {
        s.chars().map(Re::Literal).fold(Re::epsilon(), Re::then)
    }

    pub fn class(class: CharClass) -> Self {
        Re::CharClass(class)
    }

    pub fn kind(&self) -> ReKind {
        match self {
            Re::Empty => ReKind::Empty,
            Re::Concatenation(_) => ReKind::Concatenation,
            Re::Alternation(_) => ReKind::Alternation,
            Re::Literal(_) => ReKind::Literal,
            Re::Star(_) => ReKind::Star,
            Re::CharClass(_) => ReKind::CharClass,
        }
    }

    pub fn discriminant(&self) -> usize {
        self.kind().discriminant()
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self, Re::Concatenation(pieces) if pieces.is_empty())
    }

    /// Alternation of `self` and `rhs`.
    ///
    /// `Empty` is the identity, and nested alternations are flattened so that
    /// `a | b | c` is one node with three children.
    pub fn or(self, rhs: Re) -> Re {
        match (self, rhs) {
            (Re::Empty, rhs) => rhs,
            (lhs, Re::Empty) => lhs,
            (Re::Alternation(mut lhs), Re::Alternation(rhs)) => {
                lhs.extend(rhs);
                Re::Alternation(lhs)
            }
            (Re::Alternation(mut lhs), rhs) => {
                lhs.push(rhs);
                Re::Alternation(lhs)
            }
            (lhs, Re::Alternation(mut rhs)) => {
                rhs.insert(0, lhs);
                Re::Alternation(rhs)
            }
            (lhs, rhs) => Re::Alternation(vec![lhs, rhs]),
        }
    }

    /// Concatenation of `self` followed by `rhs`.
    ///
    /// `Empty` annihilates, epsilon operands vanish, nested concatenations are
    /// flattened and a single surviving piece is returned unwrapped.
    pub fn then(self, rhs: Re) -> Re {
        let mut pieces = match (self, rhs) {
            (Re::Empty, _) | (_, Re::Empty) => return Re::Empty,
            (Re::Concatenation(mut lhs), Re::Concatenation(rhs)) => {
                lhs.extend(rhs);
                lhs
            }
            (Re::Concatenation(mut lhs), rhs) => {
                lhs.push(rhs);
                lhs
            }
            (lhs, Re::Concatenation(mut rhs)) => {
                rhs.insert(0, lhs);
                rhs
            }
            (lhs, rhs) => vec![lhs, rhs],
        };

        if pieces.len() == 1 {
            return pieces.remove(0);
        }
        Re::Concatenation(pieces)
    }

    /// Kleene star. Starring a star is a no-op; `Empty` and epsilon give epsilon.
    pub fn star(self) -> Re {
        match self {
            Re::Star(_) => self,
            Re::Empty => Re::epsilon(),
            re if re.is_epsilon() => re,
            re => Re::Star(Box::new(re)),
        }
    }

    /// Whether the expression accepts the empty string.
    pub fn is_vanishable(&self) -> bool {
        match self {
            Re::Empty => false,
            Re::Star(_) => true,
            Re::Literal(_) | Re::CharClass(_) => false,
            Re::Concatenation(pieces) => pieces.iter().all(Re::is_vanishable),
            Re::Alternation(pieces) => pieces.iter().any(Re::is_vanishable),
        }
    }

    /// Every literal character in the tree. Char classes are not expanded.
    pub fn literals(&self) -> BTreeSet<char> {
        let mut out = BTreeSet::new();
        self.collect_literals(&mut out);
        out
    }

    fn collect_literals(&self, out: &mut BTreeSet<char>) {
        match self {
            Re::Empty | Re::CharClass(_) => {}
            Re::Literal(c) => {
                out.insert(*c);
            }
            Re::Star(inner) => inner.collect_literals(out),
            Re::Concatenation(pieces) | Re::Alternation(pieces) => {
                for piece in pieces {
                    piece.collect_literals(out);
                }
            }
        }
    }

    /// Longest root-to-leaf path, counting nodes. A leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Re::Empty | Re::Literal(_) | Re::CharClass(_) => 1,
            Re::Star(inner) => 1 + inner.depth(),
            Re::Concatenation(pieces) | Re::Alternation(pieces) => {
                1 + pieces.iter().map(Re::depth).max().unwrap_or(0)
            }
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            Re::Empty | Re::Literal(_) | Re::CharClass(_) => 1,
            Re::Star(inner) => 1 + inner.node_count(),
            Re::Concatenation(pieces) | Re::Alternation(pieces) => {
                1 + pieces.iter().map(Re::node_count).sum::<usize>()
            }
        }
    }

    /// Minimal-parenthesis pattern syntax.
    ///
    /// Unlike [`Display`](fmt::Display), which is meant for inspection, this
    /// escapes metacharacters so that the output parses back to the same tree.
    /// `Empty` has no pattern syntax and prints as `<EMPTY>`.
    pub fn to_pattern(&self) -> String {
        let mut out = String::new();
        self.write_pattern(&mut out);
        out
    }

    fn write_pattern(&self, out: &mut String) {
        match self {
            Re::Empty => out.push_str("<EMPTY>"),
            Re::Literal(c) => {
                if is_meta(*c) {
                    out.push('\\');
                }
                out.push(*c);
            }
            Re::CharClass(class) => out.push_str(&class.to_string()),
            Re::Alternation(pieces) => {
                for (i, piece) in pieces.iter().enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    piece.write_pattern(out);
                }
            }
            Re::Concatenation(pieces) => {
                for piece in pieces {
                    let parens = matches!(piece, Re::Alternation(_));
                    if parens {
                        out.push('(');
                    }
                    piece.write_pattern(out);
                    if parens {
                        out.push(')');
                    }
                }
            }
            Re::Star(inner) => {
                let parens = !matches!(**inner, Re::Literal(_) | Re::CharClass(_));
                if parens {
                    out.push('(');
                }
                inner.write_pattern(out);
                if parens {
                    out.push(')');
                }
                out.push('*');
            }
        }
    }
}

/// Characters with a meaning of their own in pattern syntax.
pub(crate) fn is_meta(c: char) -> bool {
    matches!(c, '\\' | '|' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '.')
}

impl BitOr for Re {
    type Output = Re;

    fn bitor(self, rhs: Re) -> Re {
        self.or(rhs)
    }
}

impl From<char> for Re {
    fn from(c: char) -> Self {
        Re::Literal(c)
    }
}

impl From<CharClass> for Re {
    fn from(class: CharClass) -> Self {
        Re::CharClass(class)
    }
}

/// The inspection rendering, see [`render`](crate::render::render).
impl fmt::Display for Re {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::render::render(self))
    }
}
