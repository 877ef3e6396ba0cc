//! Editing transitions.
//!
//! Every function takes the current state and returns the next one, or
//! `None` when the action does not apply (unknown command, tab outside a
//! list, a selection that does not resolve against the content). None of
//! them mutate their input.

use super::intent::EditIntent;
use super::state::EditorState;
use crate::document::{
    Block, BlockType, DocumentSnapshot, InlineStyle, Point, ResolvedRange, SelectionRange,
    StyleSet,
};

/// Deepest nesting reachable with tab
pub const MAX_LIST_DEPTH: u8 = crate::document::block::MAX_DEPTH;

pub fn apply(state: &EditorState, intent: &EditIntent) -> Option<EditorState> {
    match intent {
        EditIntent::InsertText(text) => insert_text(state, text),
        EditIntent::DeleteBackward => backspace(state),
        EditIntent::DeleteForward => delete_forward(state),
        EditIntent::SplitBlock => split_block(state),
        EditIntent::Select(selection) => select(state, selection),
        EditIntent::ToggleBlockType(block_type) => toggle_block_type(state, *block_type),
        EditIntent::ToggleInlineStyle(style) => toggle_inline_style(state, *style),
        EditIntent::Tab { shift } => on_tab(state, *shift, MAX_LIST_DEPTH),
        EditIntent::KeyCommand(command) => handle_key_command(state, command),
    }
}

pub fn handle_key_command(state: &EditorState, command: &str) -> Option<EditorState> {
    match command {
        "bold" => toggle_inline_style(state, InlineStyle::Bold),
        "italic" => toggle_inline_style(state, InlineStyle::Italic),
        "underline" => toggle_inline_style(state, InlineStyle::Underline),
        "code" => toggle_inline_style(state, InlineStyle::Code),
        "strikethrough" => toggle_inline_style(state, InlineStyle::Strikethrough),
        "backspace" => backspace(state),
        "backspace-word" => backspace_word(state),
        "delete" => delete_forward(state),
        "delete-word" => delete_word(state),
        "split-block" => split_block(state),
        _ => None,
    }
}

pub fn select(state: &EditorState, selection: &SelectionRange) -> Option<EditorState> {
    selection.resolve(state.content())?;
    Some(state.clone().force_selection(selection.clone()))
}

pub fn insert_text(state: &EditorState, text: &str) -> Option<EditorState> {
    if text.is_empty() {
        return None;
    }
    let range = resolve(state)?;
    let style = state
        .style_override()
        .unwrap_or_else(|| style_at_caret(state.content(), range.start));

    let doc = without_range(state.content(), range);
    let idx = range.start.block;
    let block = &doc.blocks()[idx];
    let edited = block.splice(range.start.offset, range.start.offset, text, style);
    let caret = SelectionRange::collapsed(block.key(), range.start.offset + text.chars().count());

    Some(state.push(doc.replace_blocks(idx, idx, vec![edited]), caret))
}

pub fn backspace(state: &EditorState) -> Option<EditorState> {
    let range = resolve(state)?;
    if !range.is_collapsed() {
        return Some(delete_range(state, range));
    }

    let doc = state.content();
    let Point { block: idx, offset } = range.start;
    let block = &doc.blocks()[idx];

    if offset > 0 {
        return Some(remove_chars(state, idx, offset - 1, offset));
    }

    // At the start of a styled block the first backspace only drops the style
    let before = idx.checked_sub(1).map(|prev| &doc.blocks()[prev]);
    let joins_code = block.block_type() == BlockType::CodeBlock
        && before.is_some_and(|prev| prev.block_type() == BlockType::CodeBlock && !prev.is_empty());
    if block.block_type() != BlockType::Unstyled && !joins_code {
        let unstyled = block.with_type(BlockType::Unstyled);
        return Some(state.push(
            doc.replace_blocks(idx, idx, vec![unstyled]),
            state.selection().clone(),
        ));
    }

    let prev = before?;
    let joined = prev.join(prev.len(), block, 0);
    let caret = SelectionRange::collapsed(prev.key(), prev.len());
    Some(state.push(doc.replace_blocks(idx - 1, idx, vec![joined]), caret))
}

pub fn backspace_word(state: &EditorState) -> Option<EditorState> {
    let range = resolve(state)?;
    if range.is_collapsed() && range.start.offset > 0 {
        let block = &state.content().blocks()[range.start.block];
        let from = block.word_start_before(range.start.offset);
        return Some(remove_chars(state, range.start.block, from, range.start.offset));
    }
    backspace(state)
}

pub fn delete_forward(state: &EditorState) -> Option<EditorState> {
    let range = resolve(state)?;
    if !range.is_collapsed() {
        return Some(delete_range(state, range));
    }

    let doc = state.content();
    let Point { block: idx, offset } = range.start;
    let block = &doc.blocks()[idx];

    if offset < block.len() {
        return Some(remove_chars(state, idx, offset, offset + 1));
    }

    let next = doc.blocks().get(idx + 1)?;
    let joined = block.join(block.len(), next, 0);
    Some(state.push(
        doc.replace_blocks(idx, idx + 1, vec![joined]),
        state.selection().clone(),
    ))
}

pub fn delete_word(state: &EditorState) -> Option<EditorState> {
    let range = resolve(state)?;
    let block = &state.content().blocks()[range.start.block];
    if range.is_collapsed() && range.start.offset < block.len() {
        let to = block.word_end_after(range.start.offset);
        return Some(remove_chars(state, range.start.block, range.start.offset, to));
    }
    delete_forward(state)
}

pub fn split_block(state: &EditorState) -> Option<EditorState> {
    let range = resolve(state)?;
    let doc = without_range(state.content(), range);
    let idx = range.start.block;

    let new_key = doc.generate_key();
    let (head, tail) = doc.blocks()[idx].split_at(range.start.offset, new_key.clone());
    let caret = SelectionRange::collapsed(new_key, 0);

    Some(state.push(doc.replace_blocks(idx, idx, vec![head, tail]), caret))
}

/// Toggle `block_type` on every selected block: if the first one already
/// has it, all of them go back to unstyled.
pub fn toggle_block_type(state: &EditorState, block_type: BlockType) -> Option<EditorState> {
    let range = resolve(state)?;
    let doc = state.content();

    let start = range.start.block;
    // A selection ending at the very start of a block does not cover it
    let end = if range.end.block > start && range.end.offset == 0 {
        range.end.block - 1
    } else {
        range.end.block
    };

    let target = if doc.blocks()[start].block_type() == block_type {
        BlockType::Unstyled
    } else {
        block_type
    };
    let blocks = doc.blocks()[start..=end]
        .iter()
        .map(|block| block.with_type(target))
        .collect();

    Some(state.push(
        doc.replace_blocks(start, end, blocks),
        state.selection().clone(),
    ))
}

/// On a caret, flip the style for the next insertion; on a range, remove
/// the style if every selected char has it, otherwise add it.
pub fn toggle_inline_style(state: &EditorState, style: InlineStyle) -> Option<EditorState> {
    let range = resolve(state)?;
    let doc = state.content();

    if range.is_collapsed() {
        let current = state
            .style_override()
            .unwrap_or_else(|| style_at_caret(doc, range.start));
        return Some(state.with_style_override(current.toggled(style)));
    }

    let spans: Vec<(usize, usize, usize)> = (range.start.block..=range.end.block)
        .map(|idx| {
            let from = if idx == range.start.block { range.start.offset } else { 0 };
            let to = if idx == range.end.block {
                range.end.offset
            } else {
                doc.blocks()[idx].len()
            };
            (idx, from, to)
        })
        .collect();

    let fully_styled = spans.iter().all(|&(idx, from, to)| {
        doc.blocks()[idx].styles()[from..to]
            .iter()
            .all(|set| set.contains(style))
    });

    let blocks: Vec<Block> = spans
        .iter()
        .map(|&(idx, from, to)| {
            doc.blocks()[idx].restyle(from, to, |set| {
                if fully_styled {
                    set.without(style)
                } else {
                    set.with(style)
                }
            })
        })
        .collect();

    Some(state.push(
        doc.replace_blocks(range.start.block, range.end.block, blocks),
        state.selection().clone(),
    ))
}

/// Indent (or with `shift`, outdent) the list item under the selection.
/// Depth stays within `0..=max_depth`.
pub fn on_tab(state: &EditorState, shift: bool, max_depth: u8) -> Option<EditorState> {
    let selection = state.selection();
    if selection.anchor_key != selection.focus_key {
        return None;
    }
    let range = resolve(state)?;
    let doc = state.content();
    let idx = range.start.block;
    let block = &doc.blocks()[idx];

    if !block.block_type().is_list_item() {
        return None;
    }
    let depth = block.depth();
    let next = if shift {
        depth.saturating_sub(1)
    } else {
        depth.saturating_add(1).min(max_depth)
    };
    if next == depth {
        return None;
    }

    Some(state.push(
        doc.replace_blocks(idx, idx, vec![block.with_depth(next)]),
        selection.clone(),
    ))
}

fn resolve(state: &EditorState) -> Option<ResolvedRange> {
    state.selection().resolve(state.content())
}

/// Style new text inherits at `point`
fn style_at_caret(doc: &DocumentSnapshot, point: Point) -> StyleSet {
    let block = &doc.blocks()[point.block];
    let at = point.offset.saturating_sub(1);
    block.style_at(at).unwrap_or_default()
}

/// Content with the chars of `range` removed; the start block keeps its key
fn without_range(doc: &DocumentSnapshot, range: ResolvedRange) -> DocumentSnapshot {
    if range.is_collapsed() {
        return doc.clone();
    }
    let first = &doc.blocks()[range.start.block];
    let last = &doc.blocks()[range.end.block];
    let merged = first.join(range.start.offset, last, range.end.offset);
    doc.replace_blocks(range.start.block, range.end.block, vec![merged])
}

fn delete_range(state: &EditorState, range: ResolvedRange) -> EditorState {
    let doc = without_range(state.content(), range);
    let key = doc.blocks()[range.start.block].key();
    let caret = SelectionRange::collapsed(key, range.start.offset);
    state.push(doc.clone(), caret)
}

fn remove_chars(state: &EditorState, idx: usize, from: usize, to: usize) -> EditorState {
    let doc = state.content();
    let block = &doc.blocks()[idx];
    let edited = block.splice(from, to, "", StyleSet::empty());
    let caret = SelectionRange::collapsed(block.key(), from);
    state.push(doc.replace_blocks(idx, idx, vec![edited]), caret)
}
