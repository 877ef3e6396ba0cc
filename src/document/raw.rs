//! Serialized (raw) form of a document, as exchanged with peers.
//!
//! The layout follows the Draft raw format: a list of blocks with inline
//! style ranges, plus an entity map this crate carries but never populates.
//! Offsets and lengths count chars.

use serde::{Deserialize, Serialize};

use super::block::{Block, BlockType, InlineStyle, StyleSet, MAX_DEPTH};
use super::snapshot::DocumentSnapshot;
use crate::error::DocumentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub blocks: Vec<RawBlock>,
    #[serde(default)]
    pub entity_map: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub key: String,
    pub text: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub depth: u8,
    #[serde(default)]
    pub inline_style_ranges: Vec<RawStyleRange>,
    #[serde(default)]
    pub entity_ranges: Vec<serde_json::Value>,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: String,
}

impl DocumentSnapshot {
    /// Serialize to the raw form
    pub fn to_raw(&self) -> RawDocument {
        RawDocument {
            blocks: self.blocks().iter().map(raw_block).collect(),
            entity_map: serde_json::Map::new(),
        }
    }

    /// Rebuild a snapshot from the raw form. Any invalid block fails the
    /// whole reconstruction.
    pub fn from_raw(raw: &RawDocument) -> Result<Self, DocumentError> {
        let blocks = raw
            .blocks
            .iter()
            .map(block_from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_blocks(blocks)
    }
}

fn raw_block(block: &Block) -> RawBlock {
    let mut ranges = Vec::new();
    for style in InlineStyle::ALL {
        let mut run_start: Option<usize> = None;
        for (idx, set) in block.styles().iter().enumerate() {
            match (set.contains(style), run_start) {
                (true, None) => run_start = Some(idx),
                (false, Some(start)) => {
                    ranges.push(RawStyleRange {
                        offset: start,
                        length: idx - start,
                        style: style.as_str().to_string(),
                    });
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            ranges.push(RawStyleRange {
                offset: start,
                length: block.len() - start,
                style: style.as_str().to_string(),
            });
        }
    }

    RawBlock {
        key: block.key().to_string(),
        text: block.text().to_string(),
        block_type: block.block_type().as_str().to_string(),
        depth: block.depth(),
        inline_style_ranges: ranges,
        entity_ranges: Vec::new(),
        data: serde_json::Map::new(),
    }
}

fn block_from_raw(raw: &RawBlock) -> Result<Block, DocumentError> {
    let block_type =
        BlockType::parse(&raw.block_type).ok_or_else(|| DocumentError::UnknownBlockType {
            key: raw.key.clone(),
            block_type: raw.block_type.clone(),
        })?;

    let len = raw.text.chars().count();
    let mut styles = vec![StyleSet::empty(); len];
    for range in &raw.inline_style_ranges {
        let style = InlineStyle::parse(&range.style).ok_or_else(|| DocumentError::UnknownStyle {
            key: raw.key.clone(),
            style: range.style.clone(),
        })?;
        let end = range
            .offset
            .checked_add(range.length)
            .filter(|end| *end <= len)
            .ok_or_else(|| DocumentError::StyleRangeOutOfBounds {
                key: raw.key.clone(),
                offset: range.offset,
                length: range.length,
                len,
            })?;
        for set in &mut styles[range.offset..end] {
            *set = set.with(style);
        }
    }

    Ok(Block::from_parts(
        raw.key.clone(),
        block_type,
        raw.depth.min(MAX_DEPTH),
        raw.text.clone(),
        styles,
    ))
}
