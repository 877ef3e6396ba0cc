//! Rich-text document model: blocks, snapshots, selections, the raw wire
//! form and HTML export.

pub mod block;
pub mod html;
pub mod raw;
pub mod selection;
pub mod snapshot;

pub use block::{Block, BlockType, InlineStyle, StyleSet};
pub use raw::{RawBlock, RawDocument, RawStyleRange};
pub use selection::{Point, ResolvedRange, SelectionRange};
pub use snapshot::DocumentSnapshot;
