use serde::{Deserialize, Serialize};

/// Structural type of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    #[default]
    Unstyled,
    HeaderOne,
    HeaderTwo,
    HeaderThree,
    HeaderFour,
    HeaderFive,
    HeaderSix,
    Blockquote,
    UnorderedListItem,
    OrderedListItem,
    CodeBlock,
}

impl BlockType {
    pub const ALL: [BlockType; 11] = [
        BlockType::Unstyled,
        BlockType::HeaderOne,
        BlockType::HeaderTwo,
        BlockType::HeaderThree,
        BlockType::HeaderFour,
        BlockType::HeaderFive,
        BlockType::HeaderSix,
        BlockType::Blockquote,
        BlockType::UnorderedListItem,
        BlockType::OrderedListItem,
        BlockType::CodeBlock,
    ];

    /// Name used in the raw form
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Unstyled => "unstyled",
            BlockType::HeaderOne => "header-one",
            BlockType::HeaderTwo => "header-two",
            BlockType::HeaderThree => "header-three",
            BlockType::HeaderFour => "header-four",
            BlockType::HeaderFive => "header-five",
            BlockType::HeaderSix => "header-six",
            BlockType::Blockquote => "blockquote",
            BlockType::UnorderedListItem => "unordered-list-item",
            BlockType::OrderedListItem => "ordered-list-item",
            BlockType::CodeBlock => "code-block",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == name)
    }

    pub fn is_list_item(self) -> bool {
        matches!(self, BlockType::UnorderedListItem | BlockType::OrderedListItem)
    }
}

/// Character-level formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Code,
    Strikethrough,
}

impl InlineStyle {
    pub const ALL: [InlineStyle; 5] = [
        InlineStyle::Bold,
        InlineStyle::Italic,
        InlineStyle::Underline,
        InlineStyle::Code,
        InlineStyle::Strikethrough,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InlineStyle::Bold => "BOLD",
            InlineStyle::Italic => "ITALIC",
            InlineStyle::Underline => "UNDERLINE",
            InlineStyle::Code => "CODE",
            InlineStyle::Strikethrough => "STRIKETHROUGH",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.as_str() == name)
    }

    fn bit(self) -> u8 {
        match self {
            InlineStyle::Bold => 1,
            InlineStyle::Italic => 1 << 1,
            InlineStyle::Underline => 1 << 2,
            InlineStyle::Code => 1 << 3,
            InlineStyle::Strikethrough => 1 << 4,
        }
    }
}

/// Set of inline styles applied to a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleSet(u8);

impl StyleSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, style: InlineStyle) -> bool {
        self.0 & style.bit() != 0
    }

    pub fn with(self, style: InlineStyle) -> Self {
        Self(self.0 | style.bit())
    }

    pub fn without(self, style: InlineStyle) -> Self {
        Self(self.0 & !style.bit())
    }

    pub fn toggled(self, style: InlineStyle) -> Self {
        Self(self.0 ^ style.bit())
    }

    pub fn iter(self) -> impl Iterator<Item = InlineStyle> {
        InlineStyle::ALL
            .into_iter()
            .filter(move |style| self.contains(*style))
    }
}

impl FromIterator<InlineStyle> for StyleSet {
    fn from_iter<I: IntoIterator<Item = InlineStyle>>(iter: I) -> Self {
        iter.into_iter().fold(StyleSet::empty(), StyleSet::with)
    }
}

/// Deepest list nesting a block may carry
pub const MAX_DEPTH: u8 = 4;

/// One paragraph-level unit of a document.
///
/// Blocks are values: every edit builds a new block instead of mutating the
/// one held by a snapshot. `styles` carries one entry per char of `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    key: String,
    block_type: BlockType,
    depth: u8,
    text: String,
    styles: Vec<StyleSet>,
}

impl Block {
    pub fn new(key: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            key: key.into(),
            block_type,
            depth: 0,
            text: String::new(),
            styles: Vec::new(),
        }
    }

    /// Block whose whole text carries one style set
    pub fn with_text(key: impl Into<String>, block_type: BlockType, text: &str, style: StyleSet) -> Self {
        let styles = vec![style; text.chars().count()];
        Self {
            key: key.into(),
            block_type,
            depth: 0,
            text: text.to_string(),
            styles,
        }
    }

    pub(crate) fn from_parts(
        key: String,
        block_type: BlockType,
        depth: u8,
        text: String,
        styles: Vec<StyleSet>,
    ) -> Self {
        debug_assert_eq!(text.chars().count(), styles.len());
        Self {
            key,
            block_type,
            depth,
            text,
            styles,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn styles(&self) -> &[StyleSet] {
        &self.styles
    }

    /// Length in chars
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Style of the char at `offset`, if any
    pub fn style_at(&self, offset: usize) -> Option<StyleSet> {
        self.styles.get(offset).copied()
    }

    pub fn with_type(&self, block_type: BlockType) -> Self {
        Self {
            block_type,
            ..self.clone()
        }
    }

    pub fn with_depth(&self, depth: u8) -> Self {
        Self {
            depth,
            ..self.clone()
        }
    }

    /// Replace chars `start..end` with `insert`, every inserted char styled
    /// with `style`.
    pub fn splice(&self, start: usize, end: usize, insert: &str, style: StyleSet) -> Self {
        let start = start.min(self.len());
        let end = end.clamp(start, self.len());

        let mut text = String::with_capacity(self.text.len() + insert.len());
        text.push_str(&self.text[..byte_index(&self.text, start)]);
        text.push_str(insert);
        text.push_str(&self.text[byte_index(&self.text, end)..]);

        let mut styles = Vec::with_capacity(self.styles.len() + insert.len());
        styles.extend_from_slice(&self.styles[..start]);
        styles.extend(std::iter::repeat(style).take(insert.chars().count()));
        styles.extend_from_slice(&self.styles[end..]);

        Self {
            text,
            styles,
            ..self.clone()
        }
    }

    /// Keep chars `..offset` under this key; chars `offset..` move to a new
    /// block with `new_key` and the same type and depth.
    pub fn split_at(&self, offset: usize, new_key: String) -> (Self, Self) {
        let offset = offset.min(self.len());
        let at = byte_index(&self.text, offset);
        let head = Self {
            text: self.text[..at].to_string(),
            styles: self.styles[..offset].to_vec(),
            ..self.clone()
        };
        let tail = Self {
            key: new_key,
            text: self.text[at..].to_string(),
            styles: self.styles[offset..].to_vec(),
            ..self.clone()
        };
        (head, tail)
    }

    /// Chars `..offset` of this block followed by chars `from..` of `other`.
    /// Key, type and depth come from `self`.
    pub fn join(&self, offset: usize, other: &Block, from: usize) -> Self {
        let offset = offset.min(self.len());
        let from = from.min(other.len());

        let mut text = self.text[..byte_index(&self.text, offset)].to_string();
        text.push_str(&other.text[byte_index(&other.text, from)..]);

        let mut styles = self.styles[..offset].to_vec();
        styles.extend_from_slice(&other.styles[from..]);

        Self {
            text,
            styles,
            ..self.clone()
        }
    }

    /// Apply `f` to the style of every char in `start..end`
    pub fn restyle(&self, start: usize, end: usize, f: impl Fn(StyleSet) -> StyleSet) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);
        let mut styles = self.styles.clone();
        for style in &mut styles[start..end] {
            *style = f(*style);
        }
        Self {
            styles,
            ..self.clone()
        }
    }

    /// Offset of the start of the word ending at `offset`, skipping
    /// whitespace directly before it.
    pub fn word_start_before(&self, offset: usize) -> usize {
        let chars: Vec<char> = self.text.chars().collect();
        let mut at = offset.min(chars.len());
        while at > 0 && chars[at - 1].is_whitespace() {
            at -= 1;
        }
        while at > 0 && !chars[at - 1].is_whitespace() {
            at -= 1;
        }
        at
    }

    /// Offset of the end of the word starting at `offset`, skipping
    /// whitespace directly after it.
    pub fn word_end_after(&self, offset: usize) -> usize {
        let chars: Vec<char> = self.text.chars().collect();
        let mut at = offset.min(chars.len());
        while at < chars.len() && chars[at].is_whitespace() {
            at += 1;
        }
        while at < chars.len() && !chars[at].is_whitespace() {
            at += 1;
        }
        at
    }
}

/// Byte index of char offset `offset` in `text` (clamped to the end)
pub(crate) fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}
