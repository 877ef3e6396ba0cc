//! # Quillcast - collaborative rich-text editing over a pub/sub relay
//!
//! A block-structured rich-text editor whose every change is rendered to
//! HTML and broadcast through a channel relay, plus the relay itself.
//!
//! ## Pieces
//!
//! - **document**: immutable block snapshots, selections, the raw wire form
//!   and the HTML renderer
//! - **editor**: editor state, rich-text transitions and the change
//!   controller that publishes every edit
//! - **sync**: relay protocol, outbound publisher, supervised subscriber and
//!   the bridge that folds remote events into local state
//! - **server**: the relay (REST ingress, WebSocket fan-out, static pages)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quillcast::editor::{EditIntent, EditorController, NullPublisher};
//!
//! let mut controller = EditorController::new(NullPublisher);
//! controller.apply_intent(&EditIntent::InsertText("Hello".into()));
//! assert_eq!(controller.preview_html(), "<p>Hello</p>");
//! ```

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod logging;
pub mod sanitize;
pub mod server;
pub mod session;
pub mod sync;

// Re-export main types for library consumers
pub use config::Config;
pub use document::{DocumentSnapshot, SelectionRange};
pub use editor::{ChangePublisher, EditIntent, EditorController, EditorState};
pub use error::{DocumentError, ReconnectPolicy, RelayError};
pub use session::{EditorSession, SessionView};
pub use sync::{RemoteEvent, RemoteSyncBridge};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
