use tracing::{debug, trace};

use super::intent::EditIntent;
use super::rich_utils;
use super::state::EditorState;
use crate::document::{html, RawDocument, SelectionRange};
use crate::sanitize;

/// Outbound side of a local change.
///
/// Implementations are fire-and-forget: they must not block and report
/// nothing back to the controller.
pub trait ChangePublisher: Send + Sync {
    /// Rendered markup of the new content
    fn publish_html(&self, html: &str);

    /// Structural form of the new content together with its selection
    fn publish_editor(&self, content: &RawDocument, selection: &SelectionRange);
}

impl<P: ChangePublisher + ?Sized> ChangePublisher for std::sync::Arc<P> {
    fn publish_html(&self, html: &str) {
        (**self).publish_html(html)
    }

    fn publish_editor(&self, content: &RawDocument, selection: &SelectionRange) {
        (**self).publish_editor(content, selection)
    }
}

/// Publisher for read-only sessions that never edit locally
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl ChangePublisher for NullPublisher {
    fn publish_html(&self, _html: &str) {}

    fn publish_editor(&self, _content: &RawDocument, _selection: &SelectionRange) {}
}

/// Owns the editing state of one session.
pub struct EditorController<P> {
    state: EditorState,
    preview_html: String,
    publisher: P,
}

impl<P: ChangePublisher> EditorController<P> {
    pub fn new(publisher: P) -> Self {
        Self::with_state(EditorState::create_empty(), publisher)
    }

    /// Start from `state`; the preview stays empty until the first change
    pub fn with_state(state: EditorState, publisher: P) -> Self {
        Self {
            state,
            preview_html: String::new(),
            publisher,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Preview markup exactly as last accepted
    pub fn preview_html(&self) -> &str {
        &self.preview_html
    }

    /// Preview markup safe to inject into a page
    pub fn sanitized_preview(&self) -> String {
        sanitize::sanitize_html(&self.preview_html)
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Apply a user intent. Returns whether the state changed; only a change
    /// re-renders the preview and notifies the publisher.
    pub fn apply_intent(&mut self, intent: &EditIntent) -> bool {
        let Some(next) = rich_utils::apply(&self.state, intent) else {
            trace!(?intent, "intent does not apply");
            return false;
        };
        if next == self.state {
            trace!(?intent, "intent left state unchanged");
            return false;
        }
        self.on_change(next);
        true
    }

    fn on_change(&mut self, next: EditorState) {
        self.state = next;
        self.preview_html = html::render(self.state.content());

        self.publisher.publish_html(&self.preview_html);
        self.publisher
            .publish_editor(&self.state.content().to_raw(), self.state.selection());
        debug!(
            blocks = self.state.content().block_count(),
            preview_len = self.preview_html.len(),
            "local change published"
        );
    }

    /// Overwrite the preview verbatim; content and selection are untouched
    pub fn replace_preview(&mut self, html: String) {
        self.preview_html = html;
    }

    /// Replace content and selection wholesale without notifying the
    /// publisher.
    pub fn replace_state(&mut self, state: EditorState) {
        self.state = state;
    }

    /// Re-render the preview from the current content without publishing
    pub fn refresh_preview(&mut self) {
        self.preview_html = html::render(self.state.content());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::document::{BlockType, DocumentSnapshot, InlineStyle};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Published {
        Html(String),
        Editor(RawDocument, SelectionRange),
    }

    /// Records every notification for assertions
    #[derive(Default, Clone)]
    pub(crate) struct RecordingPublisher {
        pub(crate) sent: Arc<Mutex<Vec<Published>>>,
    }

    impl RecordingPublisher {
        pub(crate) fn take(&self) -> Vec<Published> {
            std::mem::take(&mut *self.sent.lock())
        }
    }

    impl ChangePublisher for RecordingPublisher {
        fn publish_html(&self, html: &str) {
            self.sent.lock().push(Published::Html(html.to_string()));
        }

        fn publish_editor(&self, content: &RawDocument, selection: &SelectionRange) {
            self.sent
                .lock()
                .push(Published::Editor(content.clone(), selection.clone()));
        }
    }

    #[test]
    fn typing_hello_renders_and_publishes_both_projections() {
        let publisher = RecordingPublisher::default();
        let mut controller = EditorController::new(publisher.clone());

        assert!(controller.apply_intent(&EditIntent::InsertText("Hello".into())));
        assert_eq!(controller.state().content().plain_text(), "Hello");
        assert_eq!(controller.preview_html(), "<p>Hello</p>");

        let sent = publisher.take();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], Published::Html("<p>Hello</p>".into()));
        match &sent[1] {
            Published::Editor(raw, selection) => {
                assert_eq!(raw.blocks[0].text, "Hello");
                assert_eq!(selection, controller.state().selection());
            }
            other => panic!("unexpected notification {other:?}"),
        }
    }

    #[test]
    fn preview_is_always_the_render_of_the_current_content() {
        let mut controller = EditorController::new(NullPublisher);
        let intents = [
            EditIntent::InsertText("Title".into()),
            EditIntent::ToggleBlockType(BlockType::HeaderOne),
            EditIntent::SplitBlock,
            EditIntent::ToggleBlockType(BlockType::UnorderedListItem),
            EditIntent::InsertText("item".into()),
            EditIntent::Tab { shift: false },
            EditIntent::KeyCommand("backspace-word".into()),
            EditIntent::ToggleInlineStyle(InlineStyle::Bold),
            EditIntent::InsertText("bold".into()),
        ];
        for intent in &intents {
            controller.apply_intent(intent);
            assert_eq!(
                controller.preview_html(),
                html::render(controller.state().content())
            );
        }
    }

    #[test]
    fn no_op_intents_do_not_publish() {
        let publisher = RecordingPublisher::default();
        let mut controller = EditorController::new(publisher.clone());

        assert!(!controller.apply_intent(&EditIntent::KeyCommand("not-a-command".into())));
        assert!(!controller.apply_intent(&EditIntent::Tab { shift: false }));
        assert!(!controller.apply_intent(&EditIntent::DeleteBackward));
        assert!(publisher.take().is_empty());
        assert_eq!(controller.preview_html(), "");
    }

    #[test]
    fn remote_replacement_does_not_publish() {
        let publisher = RecordingPublisher::default();
        let mut controller = EditorController::new(publisher.clone());
        controller.replace_state(EditorState::create_with_content(DocumentSnapshot::empty()));
        controller.replace_preview("<p>x</p>".into());
        assert!(publisher.take().is_empty());
        assert_eq!(controller.preview_html(), "<p>x</p>");
    }
}
