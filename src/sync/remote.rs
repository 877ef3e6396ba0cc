use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use super::bridge::RemoteSignal;
use super::protocol::{ChannelFrame, RemoteEvent, ERROR, PING, PONG, SUBSCRIPTION_SUCCEEDED};
use crate::error::{ReconnectPolicy, RelayError};

#[derive(Debug, Clone)]
pub struct SubscriberOptions {
    /// Socket endpoint, e.g. `ws://127.0.0.1:8000/app/<key>?cluster=local`
    pub url: Url,
    pub channel: String,
    pub policy: ReconnectPolicy,
}

/// Subscribe to a relay channel in a background task and report every
/// connection change and channel event on `signals`.
///
/// The task reconnects and resubscribes after every disconnect until the
/// reconnect policy is exhausted or the receiving session goes away.
pub fn spawn_subscriber(
    options: SubscriberOptions,
    signals: mpsc::Sender<RemoteSignal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut attempt: u32 = 0;
        loop {
            if signals.send(RemoteSignal::Connecting).await.is_err() {
                return;
            }

            match run_connection(&options, &signals, &mut attempt).await {
                Ok(()) => info!(channel = %options.channel, "relay closed the connection"),
                Err(RelayError::SessionClosed) => return,
                Err(err) => warn!(channel = %options.channel, error = %err, "relay connection lost"),
            }

            if signals.send(RemoteSignal::Disconnected).await.is_err() {
                return;
            }

            attempt += 1;
            let Some(delay) = options.policy.delay_for(attempt) else {
                warn!(channel = %options.channel, attempts = attempt, "giving up on relay");
                return;
            };
            debug!(channel = %options.channel, ?delay, attempt, "reconnecting");
            tokio::time::sleep(delay).await;
        }
    })
}

/// One connection lifetime: connect, subscribe, forward events until the
/// socket closes.
async fn run_connection(
    options: &SubscriberOptions,
    signals: &mpsc::Sender<RemoteSignal>,
    attempt: &mut u32,
) -> Result<(), RelayError> {
    let (socket, _) = tokio_tungstenite::connect_async(options.url.as_str()).await?;
    let (mut tx, mut rx) = socket.split();

    let subscribe = serde_json::to_string(&ChannelFrame::subscribe(&options.channel))?;
    tx.send(Message::Text(subscribe.into())).await?;

    while let Some(message) = rx.next().await {
        let text = match message? {
            Message::Text(text) => text.to_string(),
            Message::Close(_) => return Ok(()),
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                continue;
            }
        };

        let frame: ChannelFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "skipping malformed relay frame");
                continue;
            }
        };

        match frame.event.as_str() {
            SUBSCRIPTION_SUCCEEDED if frame.channel.as_deref() == Some(options.channel.as_str()) => {
                *attempt = 0;
                forward(signals, RemoteSignal::Subscribed).await?;
            }
            ERROR => {
                let message = frame
                    .data
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unspecified")
                    .to_string();
                return Err(RelayError::Rejected(message));
            }
            PING => {
                let pong = serde_json::to_string(&ChannelFrame::new(PONG, None, serde_json::Value::Null))?;
                tx.send(Message::Text(pong.into())).await?;
            }
            _ if frame.is_control() => {}
            _ if frame.channel.as_deref() != Some(options.channel.as_str()) => {}
            _ => match RemoteEvent::from_frame(&frame) {
                Ok(Some(event)) => forward(signals, RemoteSignal::Event(event)).await?,
                Ok(None) => debug!(event = %frame.event, "unhandled channel event"),
                Err(err) => warn!(error = %err, "dropping channel event"),
            },
        }
    }

    Ok(())
}

async fn forward(signals: &mpsc::Sender<RemoteSignal>, signal: RemoteSignal) -> Result<(), RelayError> {
    signals
        .send(signal)
        .await
        .map_err(|_| RelayError::SessionClosed)
}
