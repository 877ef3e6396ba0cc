//! Local editing: state, intents, transitions and the controller that ties
//! them to outbound notifications.

pub mod controller;
pub mod intent;
pub mod rich_utils;
pub mod state;

pub use controller::{ChangePublisher, EditorController, NullPublisher};
pub use intent::{EditIntent, IntentParseError};
pub use state::EditorState;
