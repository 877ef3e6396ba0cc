use crate::document::{DocumentSnapshot, SelectionRange, StyleSet};

/// Content plus selection, replaced as a unit on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    content: DocumentSnapshot,
    selection: SelectionRange,
    style_override: Option<StyleSet>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::create_empty()
    }
}

impl EditorState {
    pub fn create_empty() -> Self {
        Self::create_with_content(DocumentSnapshot::empty())
    }

    /// Caret at the start of the first block
    pub fn create_with_content(content: DocumentSnapshot) -> Self {
        let selection = SelectionRange::at_start(&content);
        Self {
            content,
            selection,
            style_override: None,
        }
    }

    /// Same content with `selection` imposed as-is, without validating it
    /// against the content.
    pub fn force_selection(self, selection: SelectionRange) -> Self {
        Self {
            selection,
            style_override: None,
            ..self
        }
    }

    pub fn content(&self) -> &DocumentSnapshot {
        &self.content
    }

    pub fn selection(&self) -> &SelectionRange {
        &self.selection
    }

    /// Styles the next insertion uses instead of the ones at the caret
    pub fn style_override(&self) -> Option<StyleSet> {
        self.style_override
    }

    /// Next state after a content change
    pub(crate) fn push(&self, content: DocumentSnapshot, selection: SelectionRange) -> Self {
        Self {
            content,
            selection,
            style_override: None,
        }
    }

    pub(crate) fn with_style_override(&self, style: StyleSet) -> Self {
        Self {
            style_override: Some(style),
            ..self.clone()
        }
    }
}
