use std::fmt;

/// A set of characters stored as sorted, non-overlapping inclusive ranges.
///
/// Adjacent and overlapping ranges are merged on insertion, so two classes
/// covering the same characters compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CharClass {
    ranges: Vec<(char, char)>,
    negated: bool,
}

impl CharClass {
    /// Create an empty, non-negated class. Matches nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a class from arbitrary ranges. Reversed ranges are swapped.
    pub fn from_ranges(ranges: impl IntoIterator<Item = (char, char)>, negated: bool) -> Self {
        let mut class = Self {
            ranges: Vec::new(),
            negated,
        };
        for (lo, hi) in ranges {
            class.push(lo, hi);
        }
        class
    }

    pub fn single(c: char) -> Self {
        Self::from_ranges([(c, c)], false)
    }

    pub fn range(lo: char, hi: char) -> Self {
        Self::from_ranges([(lo, hi)], false)
    }

    /// `\d`
    pub fn digit() -> Self {
        Self::range('0', '9')
    }

    /// `\w`
    pub fn word() -> Self {
        Self::from_ranges([('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')], false)
    }

    /// `.`, the negation of the empty set.
    pub fn any() -> Self {
        Self::new().negate()
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Insert the inclusive range between `a` and `b`, merging with any range
    /// it touches. The bounds may be given in either order.
    pub fn push(&mut self, a: char, b: char) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (lo_u, hi_u) = (lo as u32, hi as u32);

        // first range that ends at or after lo - 1
        let start = self
            .ranges
            .partition_point(|&(_, h)| (h as u32).saturating_add(1) < lo_u);
        // first range that starts after hi + 1
        let end = self
            .ranges
            .partition_point(|&(l, _)| l as u32 <= hi_u.saturating_add(1));

        if start >= end {
            self.ranges.insert(start, (lo, hi));
            return;
        }

        let merged_lo = lo.min(self.ranges[start].0);
        let merged_hi = hi.max(self.ranges[end - 1].1);
        self.ranges[start] = (merged_lo, merged_hi);
        self.ranges.drain(start + 1..end);
    }

    pub fn contains(&self, c: char) -> bool {
        let found = self
            .ranges
            .binary_search_by(|&(lo, hi)| {
                if hi < c {
                    std::cmp::Ordering::Less
                } else if lo > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok();
        found != self.negated
    }

    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// True when no ranges are stored. A negated empty class is still "empty" here.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Characters that must be escaped inside brackets.
fn needs_escape(c: char) -> bool {
    matches!(c, '\\' | ']' | '[' | '^' | '-')
}

fn write_member(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    if needs_escape(c) {
        write!(f, "\\{c}")
    } else {
        write!(f, "{c}")
    }
}

/// Bracketed form, e.g. `[0-9_a-z]` or `[^\]]`.
impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        if self.negated {
            f.write_str("^")?;
        }
        for &(lo, hi) in &self.ranges {
            write_member(f, lo)?;
            if lo != hi {
                f.write_str("-")?;
                write_member(f, hi)?;
            }
        }
        f.write_str("]")
    }
}
