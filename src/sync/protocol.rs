// Relay wire protocol and the in-process channel hub.
//
// Every frame on the socket is a JSON object `{event, channel?, data}`.
// Events prefixed with `relay:` are control frames; everything else is a
// channel event fanned out to subscribers.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::document::{RawDocument, SelectionRange};
use crate::error::RelayError;

pub const TEXT_UPDATE: &str = "text-update";
pub const EDITOR_UPDATE: &str = "editor-update";

pub const SUBSCRIBE: &str = "relay:subscribe";
pub const SUBSCRIPTION_SUCCEEDED: &str = "relay:subscription_succeeded";
pub const ERROR: &str = "relay:error";
pub const PING: &str = "relay:ping";
pub const PONG: &str = "relay:pong";

/// Close code sent when the app key is unknown
pub const CLOSE_UNKNOWN_KEY: u16 = 4001;
/// Close code sent when the client asks for another cluster
pub const CLOSE_WRONG_CLUSTER: u16 = 4003;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl ChannelFrame {
    pub fn new(event: impl Into<String>, channel: Option<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            channel,
            data,
        }
    }

    pub fn subscribe(channel: &str) -> Self {
        Self::new(SUBSCRIBE, None, serde_json::json!({ "channel": channel }))
    }

    pub fn subscription_succeeded(channel: &str) -> Self {
        Self::new(SUBSCRIPTION_SUCCEEDED, Some(channel.to_string()), Value::Null)
    }

    pub fn error(code: u16, message: &str) -> Self {
        Self::new(
            ERROR,
            None,
            serde_json::json!({ "code": code, "message": message }),
        )
    }

    pub fn is_control(&self) -> bool {
        self.event.starts_with("relay:")
    }

    /// Channel named in the `data` of a subscribe frame
    pub fn requested_channel(&self) -> Option<&str> {
        self.data.get("channel").and_then(Value::as_str)
    }
}

/// Body of `POST /save-text` and data of `text-update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
}

/// Body of `POST /editor-text` and data of `editor-update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorPayload {
    pub text: RawDocument,
    pub selection: SelectionRange,
}

/// A channel event as seen by a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    TextUpdate {
        html: String,
    },
    EditorUpdate {
        content: RawDocument,
        selection: SelectionRange,
    },
}

impl RemoteEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            RemoteEvent::TextUpdate { .. } => TEXT_UPDATE,
            RemoteEvent::EditorUpdate { .. } => EDITOR_UPDATE,
        }
    }

    /// Decode a channel frame. `Ok(None)` for events this crate does not
    /// handle; an error when a known event carries a malformed payload.
    pub fn from_frame(frame: &ChannelFrame) -> Result<Option<Self>, RelayError> {
        let malformed = |source: serde_json::Error| RelayError::MalformedPayload {
            event: frame.event.clone(),
            source,
        };
        match frame.event.as_str() {
            TEXT_UPDATE => {
                let payload: TextPayload =
                    serde_json::from_value(frame.data.clone()).map_err(malformed)?;
                Ok(Some(RemoteEvent::TextUpdate { html: payload.text }))
            }
            EDITOR_UPDATE => {
                let payload: EditorPayload =
                    serde_json::from_value(frame.data.clone()).map_err(malformed)?;
                Ok(Some(RemoteEvent::EditorUpdate {
                    content: payload.text,
                    selection: payload.selection,
                }))
            }
            _ => Ok(None),
        }
    }

    pub fn to_frame(&self, channel: &str) -> ChannelFrame {
        let data = match self {
            RemoteEvent::TextUpdate { html } => serde_json::json!({ "text": html }),
            RemoteEvent::EditorUpdate { content, selection } => {
                serde_json::json!({ "text": content, "selection": selection })
            }
        };
        ChannelFrame::new(self.event_name(), Some(channel.to_string()), data)
    }
}

/// Per-channel broadcast fan-out.
///
/// Channels are created on first use. Subscribers that fall behind lose the
/// oldest frames; delivery is best effort.
#[derive(Clone)]
pub struct ChannelHub {
    channels: Arc<DashMap<String, broadcast::Sender<Arc<ChannelFrame>>>>,
    capacity: usize,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity,
        }
    }

    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Arc<ChannelFrame>> {
        // Subscribe under the entry lock so `release` cannot drop the sender
        // in between.
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Send to every current subscriber of `channel`; returns how many
    /// received it.
    pub fn publish(&self, channel: &str, frame: ChannelFrame) -> usize {
        let Some(tx) = self.channels.get(channel).map(|tx| tx.clone()) else {
            return 0;
        };
        tx.send(Arc::new(frame)).unwrap_or(0)
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Forget `channel` once nobody listens on it any more.
    pub fn release(&self, channel: &str) -> bool {
        self.channels
            .remove_if(channel, |_, tx| tx.receiver_count() == 0)
            .is_some()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentSnapshot;

    #[test]
    fn decodes_both_event_kinds() {
        let frame: ChannelFrame = serde_json::from_str(
            r#"{"event":"text-update","channel":"editor","data":{"text":"<p>Remote</p>"}}"#,
        )
        .unwrap();
        assert_eq!(
            RemoteEvent::from_frame(&frame).unwrap(),
            Some(RemoteEvent::TextUpdate {
                html: "<p>Remote</p>".into()
            })
        );

        let doc = DocumentSnapshot::empty();
        let event = RemoteEvent::EditorUpdate {
            content: doc.to_raw(),
            selection: SelectionRange::at_start(&doc),
        };
        let frame = event.to_frame("editor");
        assert_eq!(frame.event, EDITOR_UPDATE);
        assert_eq!(RemoteEvent::from_frame(&frame).unwrap(), Some(event));
    }

    #[test]
    fn selection_fields_use_wire_names() {
        let frame: ChannelFrame = serde_json::from_value(serde_json::json!({
            "event": "editor-update",
            "data": {
                "text": {"blocks": [{"key": "k", "text": "", "type": "unstyled"}], "entityMap": {}},
                "selection": {"anchorKey": "k", "anchorOffset": 0, "focusKey": "k", "focusOffset": 0, "isBackward": false}
            }
        }))
        .unwrap();
        match RemoteEvent::from_frame(&frame).unwrap() {
            Some(RemoteEvent::EditorUpdate { selection, .. }) => {
                assert_eq!(selection, SelectionRange::collapsed("k", 0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_payloads_are_errors_and_unknown_events_are_skipped() {
        let bad = ChannelFrame::new(TEXT_UPDATE, None, serde_json::json!({"html": 1}));
        assert!(matches!(
            RemoteEvent::from_frame(&bad),
            Err(RelayError::MalformedPayload { .. })
        ));

        let other = ChannelFrame::new("cursor-moved", None, Value::Null);
        assert!(RemoteEvent::from_frame(&other).unwrap().is_none());
    }

    #[tokio::test]
    async fn hub_fans_out_per_channel() {
        let hub = ChannelHub::new();
        let mut a = hub.subscribe("editor");
        let mut b = hub.subscribe("editor");
        let mut other = hub.subscribe("elsewhere");

        let frame = RemoteEvent::TextUpdate { html: "x".into() }.to_frame("editor");
        assert_eq!(hub.publish("editor", frame.clone()), 2);

        assert_eq!(*a.recv().await.unwrap(), frame);
        assert_eq!(*b.recv().await.unwrap(), frame);
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_not_an_error() {
        let hub = ChannelHub::new();
        assert_eq!(hub.publish("editor", ChannelFrame::subscribe("editor")), 0);
        assert_eq!(hub.subscriber_count("editor"), 0);
    }

    #[test]
    fn released_channels_are_forgotten_only_when_idle() {
        let hub = ChannelHub::new();
        let first = hub.subscribe("a");
        let second = hub.subscribe("b");
        assert_eq!(hub.channel_count(), 2);

        assert!(!hub.release("a"));
        drop(first);
        assert!(hub.release("a"));
        assert_eq!(hub.channel_count(), 1);

        drop(second);
        assert!(hub.release("b"));
        assert_eq!(hub.channel_count(), 0);
        assert!(!hub.release("never-seen"));
    }
}
