//! Error types and reconnect backoff.
//!
//! Library-level failures are typed so callers can tell a malformed remote
//! document apart from a relay that refused the connection. Application
//! boundaries (`main`, server start-up, config loading) wrap these in
//! `anyhow::Error`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reconstructing a document from its raw form failed.
///
/// Any of these aborts the whole remote update; partial documents are never
/// accepted into editor state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document has no blocks")]
    NoBlocks,

    #[error("duplicate block key `{0}`")]
    DuplicateKey(String),

    #[error("block `{key}` has unknown type `{block_type}`")]
    UnknownBlockType { key: String, block_type: String },

    #[error("block `{key}` has unknown inline style `{style}`")]
    UnknownStyle { key: String, style: String },

    #[error("style range {offset}+{length} is outside block `{key}` ({len} chars)")]
    StyleRangeOutOfBounds {
        key: String,
        offset: usize,
        length: usize,
        len: usize,
    },

    #[error("block `{key}` has {styles} style entries for {chars} chars")]
    StyleLengthMismatch {
        key: String,
        styles: usize,
        chars: usize,
    },
}

/// Failures on the subscriber side of the relay connection.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("websocket transport failed: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("relay rejected the connection: {0}")]
    Rejected(String),

    #[error("malformed relay frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    #[error("malformed `{event}` payload: {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("editor session is gone")]
    SessionClosed,
}

/// Backoff between reconnect attempts of a channel subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Maximum number of consecutive failed attempts; `None` retries forever
    pub max_attempts: Option<u32>,

    /// Delay before the first reconnect
    pub initial_delay_ms: u64,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,

    /// Upper bound for a single delay
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_delay_ms: 250,
            backoff_multiplier: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

impl ReconnectPolicy {
    /// Give up after the first disconnect
    pub fn no_retry() -> Self {
        Self {
            max_attempts: Some(0),
            ..Default::default()
        }
    }

    /// Delay to wait before reconnect attempt number `attempt` (1-based), or
    /// `None` once the policy is exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return Some(Duration::ZERO);
        }
        if let Some(max) = self.max_attempts {
            if attempt > max {
                return None;
            }
        }

        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis = (self.initial_delay_ms as f64) * self.backoff_multiplier.max(1.0).powi(exponent);
        let capped = millis.min(self.max_delay_ms as f64);
        Some(Duration::from_millis(capped as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = ReconnectPolicy {
            max_attempts: None,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 500,
        };
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for(40), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_max_attempts() {
        let policy = ReconnectPolicy {
            max_attempts: Some(2),
            ..Default::default()
        };
        assert!(policy.delay_for(2).is_some());
        assert!(policy.delay_for(3).is_none());

        assert!(ReconnectPolicy::no_retry().delay_for(1).is_none());
    }

    #[test]
    fn test_document_error_messages() {
        let err = DocumentError::UnknownBlockType {
            key: "a1b2c".into(),
            block_type: "atomic".into(),
        };
        assert_eq!(err.to_string(), "block `a1b2c` has unknown type `atomic`");
    }
}
