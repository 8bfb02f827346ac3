pub mod ast;
pub mod class;
pub mod inspect;
pub mod parser;
pub mod render;
pub mod snapshot;

pub use ast::{Re, ReKind};
pub use class::CharClass;
pub use inspect::{Classify, Shape, ShapeOf};
pub use parser::{parse, ParseError};
pub use render::{render, render_pointer};
pub use snapshot::{Snapshot, SnapshotError, SnapshotNode};

/// Parse `pattern` and return its inspection rendering.
pub fn render_pattern(pattern: &str) -> Result<String, ParseError> {
    let re = parse(pattern)?;
    Ok(render(&re))
}
