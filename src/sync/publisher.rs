use anyhow::{Context as _, Result};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use crate::document::{RawDocument, SelectionRange};
use crate::editor::ChangePublisher;

/// Posts local changes to the relay's REST ingress.
///
/// Notifications are queued to one background task that sends them in the
/// order they were published. Callers never wait for a response and
/// failures are only logged.
#[derive(Clone)]
pub struct HttpPublisher {
    save_text: Url,
    editor_text: Url,
    queue: mpsc::UnboundedSender<(Url, Value)>,
}

impl HttpPublisher {
    /// `base` is the relay's HTTP root, e.g. `http://127.0.0.1:8000/`.
    /// Must be called inside a tokio runtime.
    pub fn new(base: &Url) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: &Url) -> Result<Self> {
        let save_text = base.join("save-text").context("invalid relay url")?;
        let editor_text = base.join("editor-text").context("invalid relay url")?;
        let runtime = tokio::runtime::Handle::try_current()
            .context("the publisher needs a running tokio runtime")?;

        let (queue, rx) = mpsc::unbounded_channel();
        runtime.spawn(deliver(client, rx));
        Ok(Self {
            save_text,
            editor_text,
            queue,
        })
    }

    fn fire(&self, url: &Url, body: Value) {
        if self.queue.send((url.clone(), body)).is_err() {
            warn!(%url, "publisher task gone; notification dropped");
        }
    }
}

/// Runs until every publisher handle is dropped.
async fn deliver(client: reqwest::Client, mut rx: mpsc::UnboundedReceiver<(Url, Value)>) {
    while let Some((url, body)) = rx.recv().await {
        match client.post(url.clone()).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(%url, status = %response.status(), "notification delivered");
            }
            Ok(response) => {
                debug!(%url, status = %response.status(), "relay refused notification");
            }
            Err(err) => {
                debug!(%url, error = %err, "notification dropped");
            }
        }
    }
}

impl ChangePublisher for HttpPublisher {
    fn publish_html(&self, html: &str) {
        self.fire(&self.save_text, json!({ "text": html }));
    }

    fn publish_editor(&self, content: &RawDocument, selection: &SelectionRange) {
        self.fire(
            &self.editor_text,
            json!({ "text": content, "selection": selection }),
        );
    }
}
