//! Variant classification.
//!
//! The renderer never looks at a node type directly. It asks a [`Classify`]
//! implementation for the raw discriminant first, and only when that names a
//! known [`ReKind`] does it ask for the payload. This keeps nodes coming from
//! outside the process (see [`crate::snapshot`]) on the same code path as
//! in-process trees.

use std::borrow::Cow;
use std::iter::Map;
use std::slice;

use crate::ast::{Re, ReKind};
use crate::class::CharClass;

/// The payload of a node whose variant is known.
///
/// `I` yields the children of a sequence; a child is `None` when its
/// indirection is null. Payloads borrow from the node where they can.
#[derive(Debug, Clone)]
pub enum Shape<'a, C, I> {
    Empty,
    Concatenation(I),
    Alternation(I),
    Literal(char),
    Star(Option<C>),
    CharClass(Cow<'a, CharClass>),
}

impl<C, I> Shape<'_, C, I> {
    pub fn kind(&self) -> ReKind {
        match self {
            Shape::Empty => ReKind::Empty,
            Shape::Concatenation(_) => ReKind::Concatenation,
            Shape::Alternation(_) => ReKind::Alternation,
            Shape::Literal(_) => ReKind::Literal,
            Shape::Star(_) => ReKind::Star,
            Shape::CharClass(_) => ReKind::CharClass,
        }
    }
}

/// Payload of a node of type `N`.
pub type ShapeOf<'a, N> = Shape<'a, <N as Classify>::Child, <N as Classify>::Children<'a>>;

pub trait Classify: Sized {
    type Child: Classify;
    type Children<'a>: Iterator<Item = Option<Self::Child>>
    where
        Self: 'a;

    /// The raw tag. Values outside [`ReKind::ALL`] mean the node is corrupt.
    fn discriminant(&self) -> usize;

    /// Read the payload as `kind`.
    ///
    /// Only called with the kind that [`discriminant`](Classify::discriminant)
    /// maps to. Returns `None` when the payload cannot be read.
    fn payload(&self, kind: ReKind) -> Option<ShapeOf<'_, Self>>;

    fn kind(&self) -> Option<ReKind> {
        ReKind::from_discriminant(self.discriminant())
    }
}

type Link<'r> = fn(&'r Re) -> Option<&'r Re>;

impl<'r> Classify for &'r Re {
    type Child = &'r Re;
    type Children<'a> = Map<slice::Iter<'r, Re>, Link<'r>>
    where
        Self: 'a;

    fn discriminant(&self) -> usize {
        Re::discriminant(self)
    }

    fn payload(&self, kind: ReKind) -> Option<ShapeOf<'_, Self>> {
        let re: &'r Re = *self;
        let shape = match re {
            Re::Empty => Shape::Empty,
            Re::Concatenation(pieces) => Shape::Concatenation(pieces.iter().map(Some as Link<'r>)),
            Re::Alternation(pieces) => Shape::Alternation(pieces.iter().map(Some as Link<'r>)),
            Re::Literal(c) => Shape::Literal(*c),
            Re::Star(inner) => Shape::Star(Some(&**inner)),
            Re::CharClass(class) => Shape::CharClass(Cow::Borrowed(class)),
        };
        (shape.kind() == kind).then_some(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_in_process_nodes() {
        let re = Re::Literal('a').then(Re::Literal('b').star());
        let node = &re;
        assert_eq!(Classify::kind(&node), Some(ReKind::Concatenation));

        let Some(Shape::Concatenation(pieces)) = node.payload(ReKind::Concatenation) else {
            panic!("expected a concatenation payload");
        };
        let pieces: Vec<_> = pieces.collect();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], Some(&Re::Literal('a')));
        assert_eq!(pieces[1].map(|p| p.kind()), Some(ReKind::Star));
    }

    #[test]
    fn class_payload_is_borrowed() {
        let re = Re::class(CharClass::digit());
        let node = &re;
        let Some(Shape::CharClass(class)) = node.payload(ReKind::CharClass) else {
            panic!("expected a char class payload");
        };
        assert!(matches!(class, Cow::Borrowed(_)));
    }

    #[test]
    fn mismatched_kind_has_no_payload() {
        let re = Re::Literal('a');
        assert!((&re).payload(ReKind::Star).is_none());
    }
}
