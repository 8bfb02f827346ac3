//! Byte images of trees, as an inspector copies them out of another process.
//!
//! Layout (little-endian):
//!
//! ```text
//! file  := "RESN" version:u8 link
//! link  := 0x00                        null
//!        | 0x01 len:u32 node[len]
//! node  := tag:u8 payload
//!   0 empty
//!   1 concatenation   count:u32 link*count
//!   2 alternation     count:u32 link*count
//!   3 literal         scalar:u32
//!   4 star            link
//!   5 char class      negated:u8 count:u32 (lo:u32 hi:u32)*count
//! ```
//!
//! Only the header is checked up front. Nodes are decoded one at a time while
//! rendering, and every link carries its length, so a damaged node does not
//! stop its siblings from being read. Sequence children are walked in place
//! through [`Links`]; only char classes are decoded into a fresh value.

use std::borrow::Cow;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::ast::{Re, ReKind};
use crate::class::CharClass;
use crate::inspect::{Classify, Shape, ShapeOf};
use crate::render::render_pointer;

const MAGIC: &[u8; 4] = b"RESN";
const VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1;

const NULL_LINK: u8 = 0;
const LIVE_LINK: u8 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot is {0} bytes, shorter than its header")]
    TooShort(usize),
    #[error("not a snapshot: bad magic {0:02x?}")]
    BadMagic([u8; 4]),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    bytes: Bytes,
}

impl Snapshot {
    /// Encode `re` as a snapshot whose root link points at it.
    pub fn capture(re: &Re) -> Self {
        let mut buf = BytesMut::new();
        buf.put_slice(MAGIC);
        buf.put_u8(VERSION);
        put_link(&mut buf, Some(re));
        Self {
            bytes: buf.freeze(),
        }
    }

    /// A snapshot of a null root pointer.
    pub fn null() -> Self {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + 1);
        buf.put_slice(MAGIC);
        buf.put_u8(VERSION);
        buf.put_u8(NULL_LINK);
        Self {
            bytes: buf.freeze(),
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, SnapshotError> {
        let bytes = bytes.into();
        if bytes.len() < HEADER_LEN {
            return Err(SnapshotError::TooShort(bytes.len()));
        }
        let mut magic = [0; 4];
        magic.copy_from_slice(&bytes[..MAGIC.len()]);
        if &magic != MAGIC {
            return Err(SnapshotError::BadMagic(magic));
        }
        let version = bytes[MAGIC.len()];
        if version != VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }
        Ok(Self { bytes })
    }

    /// The root node, or `None` for a null root.
    ///
    /// A root link that cannot be read yields a node that renders as corrupt.
    pub fn root(&self) -> Option<SnapshotNode> {
        let mut buf = self.bytes.slice(HEADER_LEN..);
        read_link(&mut buf).unwrap_or(Some(SnapshotNode::default()))
    }

    /// Render the root pointer, see [`render_pointer`].
    pub fn render(&self) -> String {
        render_pointer(self.root())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// One node inside a snapshot: its tag byte followed by its payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotNode {
    bytes: Bytes,
}

impl SnapshotNode {
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

impl Classify for SnapshotNode {
    type Child = SnapshotNode;
    type Children<'a> = Links
    where
        Self: 'a;

    /// An empty node has no tag; it reports `usize::MAX`.
    fn discriminant(&self) -> usize {
        self.bytes.first().map_or(usize::MAX, |&tag| usize::from(tag))
    }

    fn payload(&self, kind: ReKind) -> Option<ShapeOf<'_, Self>> {
        if self.bytes.is_empty() {
            return None;
        }
        let mut buf = self.bytes.slice(1..);
        let shape = match kind {
            ReKind::Empty => Shape::Empty,
            ReKind::Concatenation => Shape::Concatenation(read_links(buf)?),
            ReKind::Alternation => Shape::Alternation(read_links(buf)?),
            ReKind::Literal => Shape::Literal(read_char(&mut buf)?),
            ReKind::Star => Shape::Star(read_link(&mut buf)?),
            ReKind::CharClass => Shape::CharClass(Cow::Owned(read_class(&mut buf)?)),
        };
        Some(shape)
    }
}

/// The child links of a sequence node.
///
/// A link that cannot be read is yielded as a corrupt node, and the links
/// after it are dropped since their position is unknown.
#[derive(Debug, Clone)]
pub struct Links {
    buf: Bytes,
    remaining: u32,
}

impl Iterator for Links {
    type Item = Option<SnapshotNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let link = read_link(&mut self.buf);
        if link.is_none() {
            self.remaining = 0;
        }
        Some(link.unwrap_or(Some(SnapshotNode::default())))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

fn put_link(buf: &mut BytesMut, re: Option<&Re>) {
    let Some(re) = re else {
        buf.put_u8(NULL_LINK);
        return;
    };
    buf.put_u8(LIVE_LINK);
    let len_at = buf.len();
    buf.put_u32_le(0);
    put_node(buf, re);
    let len = (buf.len() - len_at - 4) as u32;
    buf[len_at..len_at + 4].copy_from_slice(&len.to_le_bytes());
}

fn put_node(buf: &mut BytesMut, re: &Re) {
    buf.put_u8(re.discriminant() as u8);
    match re {
        Re::Empty => {}
        Re::Concatenation(pieces) | Re::Alternation(pieces) => {
            buf.put_u32_le(pieces.len() as u32);
            for piece in pieces {
                put_link(buf, Some(piece));
            }
        }
        Re::Literal(c) => buf.put_u32_le(u32::from(*c)),
        Re::Star(inner) => put_link(buf, Some(&**inner)),
        Re::CharClass(class) => {
            buf.put_u8(u8::from(class.is_negated()));
            buf.put_u32_le(class.ranges().len() as u32);
            for &(lo, hi) in class.ranges() {
                buf.put_u32_le(u32::from(lo));
                buf.put_u32_le(u32::from(hi));
            }
        }
    }
}

fn get_u8(buf: &mut Bytes) -> Option<u8> {
    (buf.remaining() >= 1).then(|| buf.get_u8())
}

fn get_u32(buf: &mut Bytes) -> Option<u32> {
    (buf.remaining() >= 4).then(|| buf.get_u32_le())
}

fn read_char(buf: &mut Bytes) -> Option<char> {
    char::from_u32(get_u32(buf)?)
}

/// Outer `None`: the link itself is damaged. Inner `None`: a null link.
fn read_link(buf: &mut Bytes) -> Option<Option<SnapshotNode>> {
    match get_u8(buf)? {
        NULL_LINK => Some(None),
        LIVE_LINK => {
            let len = get_u32(buf)? as usize;
            if buf.remaining() < len {
                return None;
            }
            Some(Some(SnapshotNode::new(buf.split_to(len))))
        }
        _ => None,
    }
}

fn read_links(mut buf: Bytes) -> Option<Links> {
    let count = get_u32(&mut buf)?;
    // each link is at least one byte
    if buf.remaining() < count as usize {
        return None;
    }
    Some(Links {
        buf,
        remaining: count,
    })
}

fn read_class(buf: &mut Bytes) -> Option<CharClass> {
    let negated = match get_u8(buf)? {
        0 => false,
        1 => true,
        _ => return None,
    };
    let count = get_u32(buf)?;
    let mut ranges = Vec::new();
    for _ in 0..count {
        let lo = read_char(buf)?;
        let hi = read_char(buf)?;
        ranges.push((lo, hi));
    }
    Some(CharClass::from_ranges(ranges, negated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{render, BAD_RE, MAX_DEPTH};

    fn node(tag: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend_from_slice(payload);
        out
    }

    fn link(node: &[u8]) -> Vec<u8> {
        let mut out = vec![LIVE_LINK];
        out.extend_from_slice(&(node.len() as u32).to_le_bytes());
        out.extend_from_slice(node);
        out
    }

    fn literal(c: char) -> Vec<u8> {
        node(3, &u32::from(c).to_le_bytes())
    }

    fn concatenation(links: &[Vec<u8>]) -> Vec<u8> {
        let mut payload = (links.len() as u32).to_le_bytes().to_vec();
        for l in links {
            payload.extend_from_slice(l);
        }
        node(1, &payload)
    }

    fn file(root: &[u8]) -> Snapshot {
        let mut bytes = MAGIC.to_vec();
        bytes.push(VERSION);
        bytes.extend_from_slice(root);
        Snapshot::from_bytes(bytes).unwrap()
    }

    #[test]
    fn captured_tree_renders_like_the_live_tree() {
        let re = Re::Literal('a').then((Re::Literal('b') | Re::class(CharClass::digit())).star());
        let snapshot = Snapshot::capture(&re);
        assert_eq!(snapshot.render(), format!("pointer to re {}", render(&re)));
    }

    #[test]
    fn null_root() {
        assert_eq!(Snapshot::null().root(), None);
        assert_eq!(Snapshot::null().render(), "nullptr");
    }

    #[test]
    fn unknown_tag_only_poisons_its_own_node() {
        let root = concatenation(&[
            link(&literal('a')),
            link(&node(9, b"garbage")),
            link(&literal('b')),
        ]);
        let snapshot = file(&link(&root));
        assert_eq!(snapshot.render(), "pointer to re (a)({{BAD-RE}})(b)");
    }

    #[test]
    fn null_child_renders_as_marker() {
        let root = concatenation(&[link(&literal('a')), vec![NULL_LINK]]);
        let snapshot = file(&link(&root));
        assert_eq!(snapshot.render(), "pointer to re (a)(nullptr)");
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let root = concatenation(&[link(&node(3, &[0x61, 0x00]))]);
        let snapshot = file(&link(&root));
        assert_eq!(snapshot.render(), "pointer to re ({{BAD-RE}})");
    }

    #[test]
    fn invalid_scalar_is_corrupt() {
        let root = node(3, &0xD800u32.to_le_bytes());
        assert_eq!(render(SnapshotNode::new(Bytes::from(root))), BAD_RE);
    }

    #[test]
    fn damaged_root_link() {
        let snapshot = file(&[LIVE_LINK, 0xff, 0xff]);
        assert_eq!(snapshot.render(), format!("pointer to re {BAD_RE}"));
    }

    #[test]
    fn huge_count_is_rejected_without_allocating() {
        let root = node(1, &u32::MAX.to_le_bytes());
        assert_eq!(render(SnapshotNode::new(Bytes::from(root))), BAD_RE);
    }

    #[test]
    fn damaged_link_ends_its_sequence() {
        let mut root = concatenation(&[link(&literal('a')), link(&literal('b'))]);
        // corrupt the second link's flag
        let second = root.len() - link(&literal('b')).len();
        root[second] = 0x07;
        let snapshot = file(&link(&root));
        assert_eq!(snapshot.render(), "pointer to re (a)({{BAD-RE}})");
    }

    #[test]
    fn truncated_star_in_sequence_is_wrapped() {
        let root = concatenation(&[link(&literal('a')), link(&node(4, &[LIVE_LINK, 0xff]))]);
        let snapshot = file(&link(&root));
        assert_eq!(snapshot.render(), "pointer to re (a)({{BAD-RE}})");
    }

    #[test]
    fn deep_nesting_is_cut_off() {
        const LEVELS: usize = 100_000;
        let inner = literal('a');

        // star nodes from the outside in; each one is tag, flag, len, child
        let mut bytes = Vec::with_capacity(5 + 6 * (LEVELS + 1));
        let size = |level: usize| inner.len() + 6 * level;
        bytes.push(LIVE_LINK);
        bytes.extend_from_slice(&(size(LEVELS) as u32).to_le_bytes());
        for level in (1..=LEVELS).rev() {
            bytes.push(ReKind::Star.discriminant() as u8);
            bytes.push(LIVE_LINK);
            bytes.extend_from_slice(&(size(level - 1) as u32).to_le_bytes());
        }
        bytes.extend_from_slice(&inner);

        let rendered = file(&bytes).render();
        let kept = MAX_DEPTH + 1;
        let expected = format!(
            "pointer to re {}{BAD_RE}{}",
            "(".repeat(kept),
            ")*".repeat(kept)
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn header_errors() {
        assert_eq!(Snapshot::from_bytes(&b"RE"[..]), Err(SnapshotError::TooShort(2)));
        assert_eq!(
            Snapshot::from_bytes(&b"NOPE\x01\x00"[..]),
            Err(SnapshotError::BadMagic(*b"NOPE"))
        );
        assert_eq!(
            Snapshot::from_bytes(&b"RESN\x07\x00"[..]),
            Err(SnapshotError::UnsupportedVersion(7))
        );
    }
}
