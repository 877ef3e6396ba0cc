//! Folds relay signals into the local editor.

use std::fmt;

use tracing::{debug, info, warn};

use super::protocol::RemoteEvent;
use crate::document::DocumentSnapshot;
use crate::editor::{ChangePublisher, EditorController, EditorState};

/// Subscription state of one channel connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Subscribing,
    Subscribed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Subscribing => "subscribing",
            ConnectionState::Subscribed => "subscribed",
        })
    }
}

/// What the subscriber task reports, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteSignal {
    Connecting,
    Subscribed,
    Disconnected,
    Event(RemoteEvent),
}

/// Effect a signal had on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// Connection state moved
    Transition(ConnectionState),
    /// Preview replaced; content untouched
    PreviewReplaced,
    /// Content and selection replaced
    StateReplaced,
    /// Event arrived while not subscribed
    Ignored,
    /// Event payload could not be reconstructed
    Rejected,
}

#[derive(Debug, Clone, Default)]
pub struct BridgeOptions {
    /// Re-render the preview from content received in `editor-update`
    pub refresh_preview_on_editor_update: bool,
}

pub struct RemoteSyncBridge {
    channel: String,
    state: ConnectionState,
    options: BridgeOptions,
}

impl RemoteSyncBridge {
    pub fn new(channel: impl Into<String>, options: BridgeOptions) -> Self {
        Self {
            channel: channel.into(),
            state: ConnectionState::Disconnected,
            options,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn handle_signal<P: ChangePublisher>(
        &mut self,
        controller: &mut EditorController<P>,
        signal: RemoteSignal,
    ) -> FoldOutcome {
        match signal {
            RemoteSignal::Connecting => self.transition(ConnectionState::Subscribing),
            RemoteSignal::Subscribed => {
                if self.state == ConnectionState::Disconnected {
                    warn!(channel = %self.channel, "subscription confirmed without a connection attempt");
                }
                self.transition(ConnectionState::Subscribed)
            }
            RemoteSignal::Disconnected => self.transition(ConnectionState::Disconnected),
            RemoteSignal::Event(event) => {
                if self.state != ConnectionState::Subscribed {
                    debug!(
                        channel = %self.channel,
                        event = event.event_name(),
                        state = %self.state,
                        "event outside subscription ignored"
                    );
                    return FoldOutcome::Ignored;
                }
                self.fold(controller, event)
            }
        }
    }

    /// Apply one channel event to the controller, last writer wins.
    pub fn fold<P: ChangePublisher>(
        &self,
        controller: &mut EditorController<P>,
        event: RemoteEvent,
    ) -> FoldOutcome {
        match event {
            RemoteEvent::TextUpdate { html } => {
                controller.replace_preview(html);
                FoldOutcome::PreviewReplaced
            }
            RemoteEvent::EditorUpdate { content, selection } => {
                let snapshot = match DocumentSnapshot::from_raw(&content) {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!(channel = %self.channel, error = %err, "dropping editor-update");
                        return FoldOutcome::Rejected;
                    }
                };
                let state = EditorState::create_with_content(snapshot).force_selection(selection);
                controller.replace_state(state);
                if self.options.refresh_preview_on_editor_update {
                    controller.refresh_preview();
                }
                FoldOutcome::StateReplaced
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) -> FoldOutcome {
        if self.state != next {
            info!(channel = %self.channel, from = %self.state, to = %next, "channel state");
            self.state = next;
        }
        FoldOutcome::Transition(next)
    }
}
