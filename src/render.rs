//! Inspection rendering.
//!
//! Every node is printed fully parenthesized so the tree structure can be read
//! back off the text:
//!
//! | node                   | output              |
//! |------------------------|---------------------|
//! | `Empty`                | `<EMPTY>`           |
//! | `Literal(c)`           | `c`                 |
//! | `CharClass`            | `[a-z]`, `[^0-9]`   |
//! | `Concatenation[a, b]`  | `(a)(b)`            |
//! | `Alternation[a, b]`    | `(a)|(b)`           |
//! | `Star(a)`              | `(a)*`              |
//!
//! A star inside a concatenation is not wrapped again, so
//! `a` followed by `(b|c)*` renders as `(a)((b)|(c))*`.
//!
//! Rendering never fails. A node with an unknown discriminant, an unreadable
//! payload or nesting deeper than [`MAX_DEPTH`] renders as [`BAD_RE`], a null
//! link as [`NULLPTR`], and the rest of the tree is rendered as usual. Apart
//! from the output string, nothing is allocated for in-process trees.

use std::fmt::Write;

use log::debug;

use crate::ast::ReKind;
use crate::inspect::{Classify, Shape, ShapeOf};

pub const EMPTY: &str = "<EMPTY>";
pub const BAD_RE: &str = "{{BAD-RE}}";
pub const NULLPTR: &str = "nullptr";
pub const POINTER_PREFIX: &str = "pointer to re ";

/// Nodes nested deeper than this are not read.
pub const MAX_DEPTH: usize = 512;

/// Render the subtree rooted at `node`.
pub fn render<N: Classify>(node: N) -> String {
    let mut out = String::new();
    write_node(&node, &mut out, 0);
    out
}

/// Render through an owning indirection that may be null.
pub fn render_pointer<N: Classify>(link: Option<N>) -> String {
    match link {
        None => NULLPTR.to_string(),
        Some(node) => {
            let mut out = String::from(POINTER_PREFIX);
            write_node(&node, &mut out, 0);
            out
        }
    }
}

/// The payload of `node`, or `None` if it must be rendered as corrupt.
fn read<N: Classify>(node: &N, depth: usize) -> Option<ShapeOf<'_, N>> {
    if depth > MAX_DEPTH {
        debug!("nesting deeper than {MAX_DEPTH}");
        return None;
    }
    let Some(kind) = node.kind() else {
        debug!("unknown discriminant {}", node.discriminant());
        return None;
    };
    let shape = node.payload(kind);
    if shape.is_none() {
        debug!("unreadable {kind} payload");
    }
    shape
}

fn write_node<N: Classify>(node: &N, out: &mut String, depth: usize) {
    match read(node, depth) {
        Some(shape) => write_shape(shape, out, depth),
        None => out.push_str(BAD_RE),
    }
}

fn write_shape<C, I>(shape: Shape<'_, C, I>, out: &mut String, depth: usize)
where
    C: Classify,
    I: Iterator<Item = Option<C>>,
{
    match shape {
        Shape::Empty => out.push_str(EMPTY),
        Shape::Literal(c) => out.push(c),
        Shape::CharClass(class) => {
            // writing to a String cannot fail
            let _ = write!(out, "{class}");
        }
        Shape::Concatenation(pieces) => {
            for piece in pieces {
                // only a star that reads cleanly goes unwrapped
                let star = match &piece {
                    Some(node) if node.kind() == Some(ReKind::Star) => read(node, depth + 1),
                    _ => None,
                };
                match star {
                    Some(star) => write_shape(star, out, depth + 1),
                    None => write_wrapped(piece.as_ref(), out, depth + 1),
                }
            }
        }
        Shape::Alternation(pieces) => {
            for (i, piece) in pieces.enumerate() {
                if i > 0 {
                    out.push('|');
                }
                write_wrapped(piece.as_ref(), out, depth + 1);
            }
        }
        Shape::Star(inner) => {
            write_wrapped(inner.as_ref(), out, depth + 1);
            out.push('*');
        }
    }
}

fn write_wrapped<N: Classify>(link: Option<&N>, out: &mut String, depth: usize) {
    out.push('(');
    match link {
        Some(node) => write_node(node, out, depth),
        None => {
            debug!("null link");
            out.push_str(NULLPTR);
        }
    }
    out.push(')');
}
