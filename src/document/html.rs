//! HTML export of a snapshot.
//!
//! Rendering is a pure function of the snapshot: the same blocks always give
//! the same markup. Consecutive list items are grouped into `<ul>`/`<ol>`
//! and nested by depth; blocks are separated by newlines.

use super::block::{Block, BlockType, InlineStyle, StyleSet};
use super::snapshot::DocumentSnapshot;

pub fn render(doc: &DocumentSnapshot) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(doc.block_count());
    // Open list elements, outermost first
    let mut lists: Vec<&'static str> = Vec::new();

    for block in doc.blocks() {
        let ty = block.block_type();
        if let Some(tag) = list_tag(ty) {
            let level = block.depth() as usize + 1;
            while lists.len() > level {
                close_list(&mut lines, &mut lists);
            }
            if lists.len() == level && lists.last() != Some(&tag) {
                close_list(&mut lines, &mut lists);
            }
            while lists.len() < level {
                lines.push(format!("{}<{tag}>", indent(lists.len())));
                lists.push(tag);
            }
            lines.push(format!(
                "{}<li>{}</li>",
                indent(lists.len()),
                render_inline(block)
            ));
            continue;
        }

        while !lists.is_empty() {
            close_list(&mut lines, &mut lists);
        }
        lines.push(render_block(block));
    }
    while !lists.is_empty() {
        close_list(&mut lines, &mut lists);
    }

    lines.join("\n")
}

/// Escape text for use in element content or a quoted attribute
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_block(block: &Block) -> String {
    let inner = render_inline(block);
    match block.block_type() {
        BlockType::CodeBlock => format!("<pre><code>{inner}</code></pre>"),
        ty => {
            let tag = block_tag(ty);
            format!("<{tag}>{inner}</{tag}>")
        }
    }
}

fn render_inline(block: &Block) -> String {
    if block.is_empty() {
        return "<br>".to_string();
    }

    let mut out = String::new();
    let mut run = String::new();
    let mut run_style: Option<StyleSet> = None;

    for (ch, style) in block.text().chars().zip(block.styles().iter().copied()) {
        if run_style.is_some_and(|current| current != style) {
            out.push_str(&wrap(&run, run_style.unwrap_or_default()));
            run.clear();
        }
        run_style = Some(style);
        run.push(ch);
    }
    if let Some(style) = run_style {
        out.push_str(&wrap(&run, style));
    }
    out
}

fn wrap(text: &str, style: StyleSet) -> String {
    let mut html = escape(text).replace('\n', "<br>\n");
    // Innermost first
    for inline in [
        InlineStyle::Code,
        InlineStyle::Strikethrough,
        InlineStyle::Underline,
        InlineStyle::Italic,
        InlineStyle::Bold,
    ] {
        if style.contains(inline) {
            let tag = inline_tag(inline);
            html = format!("<{tag}>{html}</{tag}>");
        }
    }
    html
}

fn close_list(lines: &mut Vec<String>, lists: &mut Vec<&'static str>) {
    if let Some(tag) = lists.pop() {
        lines.push(format!("{}</{tag}>", indent(lists.len())));
    }
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

fn list_tag(ty: BlockType) -> Option<&'static str> {
    match ty {
        BlockType::UnorderedListItem => Some("ul"),
        BlockType::OrderedListItem => Some("ol"),
        _ => None,
    }
}

pub(crate) fn block_tag(ty: BlockType) -> &'static str {
    match ty {
        BlockType::Unstyled => "p",
        BlockType::HeaderOne => "h1",
        BlockType::HeaderTwo => "h2",
        BlockType::HeaderThree => "h3",
        BlockType::HeaderFour => "h4",
        BlockType::HeaderFive => "h5",
        BlockType::HeaderSix => "h6",
        BlockType::Blockquote => "blockquote",
        BlockType::UnorderedListItem | BlockType::OrderedListItem => "li",
        BlockType::CodeBlock => "pre",
    }
}

pub(crate) fn inline_tag(style: InlineStyle) -> &'static str {
    match style {
        InlineStyle::Bold => "strong",
        InlineStyle::Italic => "em",
        InlineStyle::Underline => "u",
        InlineStyle::Code => "code",
        InlineStyle::Strikethrough => "del",
    }
}
