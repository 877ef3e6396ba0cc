use serde::{Deserialize, Serialize};

use super::snapshot::DocumentSnapshot;

/// Caret or selection, as block key + char offset pairs.
///
/// Only meaningful against the snapshot it was computed for. Serializes with
/// the `anchorKey`/`anchorOffset`/`focusKey`/`focusOffset` field names used
/// on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRange {
    pub anchor_key: String,
    pub anchor_offset: usize,
    pub focus_key: String,
    pub focus_offset: usize,
}

/// A position inside a snapshot, by block index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Point {
    pub block: usize,
    pub offset: usize,
}

/// A selection resolved against a snapshot, ordered start to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: Point,
    pub end: Point,
}

impl ResolvedRange {
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

impl SelectionRange {
    pub fn new(
        anchor_key: impl Into<String>,
        anchor_offset: usize,
        focus_key: impl Into<String>,
        focus_offset: usize,
    ) -> Self {
        Self {
            anchor_key: anchor_key.into(),
            anchor_offset,
            focus_key: focus_key.into(),
            focus_offset,
        }
    }

    pub fn collapsed(key: impl Into<String>, offset: usize) -> Self {
        let key = key.into();
        Self {
            anchor_key: key.clone(),
            anchor_offset: offset,
            focus_key: key,
            focus_offset: offset,
        }
    }

    /// Caret at the start of the first block
    pub fn at_start(doc: &DocumentSnapshot) -> Self {
        Self::collapsed(doc.first_block().key(), 0)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key && self.anchor_offset == self.focus_offset
    }

    /// Resolve against `doc`; `None` when a key is missing or an offset lies
    /// past the end of its block.
    pub fn resolve(&self, doc: &DocumentSnapshot) -> Option<ResolvedRange> {
        let anchor = point(doc, &self.anchor_key, self.anchor_offset)?;
        let focus = point(doc, &self.focus_key, self.focus_offset)?;
        let (start, end) = if focus < anchor {
            (focus, anchor)
        } else {
            (anchor, focus)
        };
        Some(ResolvedRange { start, end })
    }
}

fn point(doc: &DocumentSnapshot, key: &str, offset: usize) -> Option<Point> {
    let block = doc.index_of(key)?;
    if offset > doc.blocks()[block].len() {
        return None;
    }
    Some(Point { block, offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, BlockType, StyleSet};

    fn doc() -> DocumentSnapshot {
        DocumentSnapshot::from_blocks(vec![
            Block::with_text("a", BlockType::Unstyled, "hello", StyleSet::empty()),
            Block::with_text("b", BlockType::Unstyled, "world", StyleSet::empty()),
        ])
        .unwrap()
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let sel = SelectionRange::new("a", 1, "b", 2);
        let json = serde_json::to_value(&sel).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"anchorKey": "a", "anchorOffset": 1, "focusKey": "b", "focusOffset": 2})
        );
    }

    #[test]
    fn backward_selection_resolves_in_document_order() {
        let range = SelectionRange::new("b", 2, "a", 1).resolve(&doc()).unwrap();
        assert_eq!(range.start, Point { block: 0, offset: 1 });
        assert_eq!(range.end, Point { block: 1, offset: 2 });
    }

    #[test]
    fn unresolvable_selections() {
        assert!(SelectionRange::collapsed("zzz", 0).resolve(&doc()).is_none());
        assert!(SelectionRange::collapsed("a", 6).resolve(&doc()).is_none());
        assert!(SelectionRange::collapsed("a", 5).resolve(&doc()).is_some());
    }
}
