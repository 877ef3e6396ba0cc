use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use super::block::{Block, BlockType};
use crate::error::DocumentError;

/// Immutable rich-text content at one point in time.
///
/// Cloning is cheap; edits build a new snapshot. A snapshot always holds at
/// least one block and block keys are unique within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    blocks: Arc<[Block]>,
}

impl DocumentSnapshot {
    /// A single empty unstyled block
    pub fn empty() -> Self {
        Self {
            blocks: vec![Block::new(new_key(), BlockType::Unstyled)].into(),
        }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, DocumentError> {
        if blocks.is_empty() {
            return Err(DocumentError::NoBlocks);
        }
        let mut seen = HashSet::with_capacity(blocks.len());
        for block in &blocks {
            if !seen.insert(block.key()) {
                return Err(DocumentError::DuplicateKey(block.key().to_string()));
            }
            let chars = block.text().chars().count();
            if chars != block.styles().len() {
                return Err(DocumentError::StyleLengthMismatch {
                    key: block.key().to_string(),
                    styles: block.styles().len(),
                    chars,
                });
            }
        }
        Ok(Self {
            blocks: blocks.into(),
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn first_block(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn last_block(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.blocks.iter().position(|block| block.key() == key)
    }

    pub fn block_for_key(&self, key: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.key() == key)
    }

    /// Whether any block carries text
    pub fn has_text(&self) -> bool {
        self.blocks.len() > 1 || !self.blocks[0].is_empty()
    }

    /// Block texts joined with newlines
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A key not used by any block of this snapshot
    pub fn generate_key(&self) -> String {
        loop {
            let key = new_key();
            if self.index_of(&key).is_none() {
                return key;
            }
        }
    }

    /// New snapshot with blocks `start..=end` replaced by `replacement`.
    /// Callers keep keys unique and `replacement` non-empty when it would
    /// otherwise leave the document without blocks.
    pub(crate) fn replace_blocks(&self, start: usize, end: usize, replacement: Vec<Block>) -> Self {
        let mut blocks = Vec::with_capacity(self.blocks.len() + replacement.len());
        blocks.extend_from_slice(&self.blocks[..start]);
        blocks.extend(replacement);
        blocks.extend_from_slice(&self.blocks[end + 1..]);
        debug_assert!(!blocks.is_empty());
        Self {
            blocks: blocks.into(),
        }
    }
}

fn new_key() -> String {
    Uuid::new_v4().simple().to_string()[..5].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StyleSet;

    #[test]
    fn empty_snapshot_has_one_block() {
        let doc = DocumentSnapshot::empty();
        assert_eq!(doc.block_count(), 1);
        assert!(!doc.has_text());
        assert_eq!(doc.first_block().key().len(), 5);
    }

    #[test]
    fn rejects_duplicate_keys_and_empty_documents() {
        assert_eq!(
            DocumentSnapshot::from_blocks(Vec::new()),
            Err(DocumentError::NoBlocks)
        );
        let blocks = vec![
            Block::new("same", BlockType::Unstyled),
            Block::new("same", BlockType::Blockquote),
        ];
        assert_eq!(
            DocumentSnapshot::from_blocks(blocks),
            Err(DocumentError::DuplicateKey("same".into()))
        );
    }

    #[test]
    fn generated_keys_are_unique() {
        let doc = DocumentSnapshot::empty();
        let key = doc.generate_key();
        assert_ne!(key, doc.first_block().key());
    }

    #[test]
    fn plain_text_joins_blocks() {
        let doc = DocumentSnapshot::from_blocks(vec![
            Block::with_text("a", BlockType::Unstyled, "one", StyleSet::empty()),
            Block::with_text("b", BlockType::Unstyled, "two", StyleSet::empty()),
        ])
        .unwrap();
        assert_eq!(doc.plain_text(), "one\ntwo");
        assert!(doc.has_text());
        assert_eq!(doc.index_of("b"), Some(1));
    }
}
