//! One editing session: a single task owns the controller and the bridge,
//! so local intents and remote signals are applied one at a time in
//! arrival order.

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::editor::{ChangePublisher, EditIntent, EditorController, EditorState};
use crate::sync::{ConnectionState, FoldOutcome, RemoteSignal, RemoteSyncBridge};

/// What observers of a session see after each processed input.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub state: EditorState,
    pub preview_html: String,
    pub connection: ConnectionState,
    /// Bumped on every visible change
    pub revision: u64,
}

pub struct EditorSession<P> {
    controller: EditorController<P>,
    bridge: RemoteSyncBridge,
    revision: u64,
}

impl<P: ChangePublisher> EditorSession<P> {
    pub fn new(controller: EditorController<P>, bridge: RemoteSyncBridge) -> Self {
        Self {
            controller,
            bridge,
            revision: 0,
        }
    }

    pub fn controller(&self) -> &EditorController<P> {
        &self.controller
    }

    pub fn bridge(&self) -> &RemoteSyncBridge {
        &self.bridge
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.controller.state().clone(),
            preview_html: self.controller.preview_html().to_string(),
            connection: self.bridge.connection_state(),
            revision: self.revision,
        }
    }

    pub fn apply_intent(&mut self, intent: &EditIntent) -> bool {
        let changed = self.controller.apply_intent(intent);
        if changed {
            self.revision += 1;
        }
        changed
    }

    pub fn handle_signal(&mut self, signal: RemoteSignal) -> FoldOutcome {
        let before = self.bridge.connection_state();
        let outcome = self.bridge.handle_signal(&mut self.controller, signal);
        let visible = match outcome {
            FoldOutcome::Transition(state) => state != before,
            FoldOutcome::PreviewReplaced | FoldOutcome::StateReplaced => true,
            FoldOutcome::Ignored | FoldOutcome::Rejected => false,
        };
        if visible {
            self.revision += 1;
        }
        outcome
    }

    /// Process inputs until both channels close, publishing the view after
    /// every visible change. Returns the session for inspection.
    pub async fn run(
        mut self,
        mut intents: mpsc::Receiver<EditIntent>,
        mut signals: mpsc::Receiver<RemoteSignal>,
        view: watch::Sender<SessionView>,
    ) -> Self {
        let mut intents_open = true;
        let mut signals_open = true;
        view.send_replace(self.view());

        while intents_open || signals_open {
            let revision = self.revision;
            tokio::select! {
                intent = intents.recv(), if intents_open => match intent {
                    Some(intent) => {
                        self.apply_intent(&intent);
                    }
                    None => {
                        debug!("local input closed");
                        intents_open = false;
                    }
                },
                signal = signals.recv(), if signals_open => match signal {
                    Some(signal) => {
                        self.handle_signal(signal);
                    }
                    None => {
                        debug!("remote input closed");
                        signals_open = false;
                    }
                },
            }
            if self.revision != revision {
                view.send_replace(self.view());
            }
        }

        self
    }
}
