use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use futures::{SinkExt, StreamExt};
use quillcast::config::Config;
use quillcast::editor::{ChangePublisher, EditIntent, EditorController, NullPublisher};
use quillcast::error::ReconnectPolicy;
use quillcast::server::{self, RelayState};
use quillcast::session::{EditorSession, SessionView};
use quillcast::sync::{
    BridgeOptions, ChannelFrame, ConnectionState, HttpPublisher, RemoteEvent, RemoteSignal,
    RemoteSyncBridge, SubscriberOptions, spawn_subscriber,
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

fn reserve_port() -> std::io::Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

async fn spawn_relay() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = RelayState::from_config(&Config::default());
    tokio::spawn(async move {
        let _ = server::serve(listener, state).await;
    });
    Ok(addr)
}

fn socket_url(addr: SocketAddr) -> Result<Url> {
    Ok(Url::parse(&format!("ws://{addr}/app/quillcast?cluster=local"))?)
}

struct Peer {
    intents: mpsc::Sender<EditIntent>,
    views: watch::Receiver<SessionView>,
}

fn start_peer<P: ChangePublisher + 'static>(
    addr: SocketAddr,
    publisher: P,
    options: BridgeOptions,
) -> Result<Peer> {
    let (signal_tx, signal_rx) = mpsc::channel(64);
    spawn_subscriber(
        SubscriberOptions {
            url: socket_url(addr)?,
            channel: "editor".into(),
            policy: ReconnectPolicy::default(),
        },
        signal_tx,
    );

    let session = EditorSession::new(
        EditorController::new(publisher),
        RemoteSyncBridge::new("editor", options),
    );
    let (intent_tx, intent_rx) = mpsc::channel(16);
    let (view_tx, views) = watch::channel(session.view());
    tokio::spawn(session.run(intent_rx, signal_rx, view_tx));
    Ok(Peer {
        intents: intent_tx,
        views,
    })
}

async fn wait_for(
    views: &mut watch::Receiver<SessionView>,
    what: &str,
    predicate: impl Fn(&SessionView) -> bool,
) -> Result<SessionView> {
    timeout(Duration::from_secs(5), async {
        loop {
            {
                let view = views.borrow_and_update();
                if predicate(&view) {
                    return Ok(view.clone());
                }
            }
            views
                .changed()
                .await
                .map_err(|_| anyhow!("session ended while waiting for {what}"))?;
        }
    })
    .await
    .map_err(|_| anyhow!("timed out waiting for {what}"))?
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn edits_reach_a_following_peer() -> Result<()> {
    let addr = spawn_relay().await?;
    let base = Url::parse(&format!("http://{addr}/"))?;

    let mut follower = start_peer(addr, NullPublisher, BridgeOptions::default())?;
    let mut writer = start_peer(addr, HttpPublisher::new(&base)?, BridgeOptions::default())?;

    wait_for(&mut follower.views, "follower subscription", |v| {
        v.connection == ConnectionState::Subscribed
    })
    .await?;
    wait_for(&mut writer.views, "writer subscription", |v| {
        v.connection == ConnectionState::Subscribed
    })
    .await?;

    writer
        .intents
        .send(EditIntent::InsertText("Hello relay".into()))
        .await?;
    let written = wait_for(&mut writer.views, "local edit", |v| {
        v.state.content().plain_text() == "Hello relay"
    })
    .await?;
    assert_eq!(written.preview_html, "<p>Hello relay</p>");

    let seen = wait_for(&mut follower.views, "remote edit", |v| {
        v.preview_html == "<p>Hello relay</p>" && v.state.content().plain_text() == "Hello relay"
    })
    .await?;
    assert_eq!(
        seen.state.content().to_raw(),
        written.state.content().to_raw()
    );
    assert_eq!(seen.state.selection(), written.state.selection());

    // Followers never publish, so nothing echoes back to the writer.
    follower
        .intents
        .send(EditIntent::InsertText("local only".into()))
        .await?;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(
        writer.views.borrow().state.content().plain_text(),
        "Hello relay"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn structural_updates_can_refresh_the_preview() -> Result<()> {
    let addr = spawn_relay().await?;
    let mut follower = start_peer(
        addr,
        NullPublisher,
        BridgeOptions {
            refresh_preview_on_editor_update: true,
        },
    )?;
    wait_for(&mut follower.views, "subscription", |v| {
        v.connection == ConnectionState::Subscribed
    })
    .await?;

    // Publish only the structural half, straight to the relay.
    let body = serde_json::json!({
        "text": {
            "blocks": [{"key": "abcde", "text": "Title", "type": "header-one", "depth": 0,
                        "inlineStyleRanges": [], "entityRanges": [], "data": {}}],
            "entityMap": {}
        },
        "selection": {"anchorKey": "abcde", "anchorOffset": 5, "focusKey": "abcde", "focusOffset": 5}
    });
    reqwest::Client::new()
        .post(format!("http://{addr}/editor-text"))
        .json(&body)
        .send()
        .await?
        .error_for_status()?;

    let view = wait_for(&mut follower.views, "structural update", |v| {
        v.state.content().plain_text() == "Title"
    })
    .await?;
    assert_eq!(view.preview_html, "<h1>Title</h1>");
    assert_eq!(view.state.selection().focus_offset, 5);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subscriber_gives_up_after_the_policy_is_spent() -> Result<()> {
    let port = reserve_port()?;
    let (signal_tx, mut signal_rx) = mpsc::channel(16);
    let handle = spawn_subscriber(
        SubscriberOptions {
            url: Url::parse(&format!("ws://127.0.0.1:{port}/app/quillcast"))?,
            channel: "editor".into(),
            policy: ReconnectPolicy {
                max_attempts: Some(1),
                initial_delay_ms: 10,
                ..ReconnectPolicy::default()
            },
        },
        signal_tx,
    );

    let mut signals = Vec::new();
    while let Some(signal) = timeout(Duration::from_secs(5), signal_rx.recv()).await? {
        signals.push(signal);
    }
    handle.await?;

    assert_eq!(
        signals,
        vec![
            RemoteSignal::Connecting,
            RemoteSignal::Disconnected,
            RemoteSignal::Connecting,
            RemoteSignal::Disconnected,
        ]
    );
    Ok(())
}

/// Accept one socket, wait for its subscribe frame and acknowledge it.
async fn accept_subscriber(
    listener: &TcpListener,
    subscribes: &AtomicUsize,
) -> Result<tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>> {
    let (stream, _) = listener.accept().await?;
    let mut socket = tokio_tungstenite::accept_async(stream).await?;
    while let Some(message) = socket.next().await {
        if let Message::Text(text) = message? {
            let frame: ChannelFrame = serde_json::from_str(text.as_str())?;
            if let Some(channel) = frame.requested_channel() {
                subscribes.fetch_add(1, Ordering::SeqCst);
                let ack = serde_json::to_string(&ChannelFrame::subscription_succeeded(channel))?;
                socket.send(Message::Text(ack.into())).await?;
                return Ok(socket);
            }
        }
    }
    Err(anyhow!("socket closed before subscribing"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subscriber_resubscribes_after_the_relay_drops_it() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let subscribes = Arc::new(AtomicUsize::new(0));

    let relay = tokio::spawn({
        let subscribes = subscribes.clone();
        async move {
            let mut first = accept_subscriber(&listener, &subscribes).await?;
            first.close(None).await?;

            let mut second = accept_subscriber(&listener, &subscribes).await?;
            let update = RemoteEvent::TextUpdate {
                html: "<p>after</p>".into(),
            }
            .to_frame("editor");
            second
                .send(Message::Text(serde_json::to_string(&update)?.into()))
                .await?;
            // Hold the connection until the client goes away.
            while let Some(Ok(_)) = second.next().await {}
            Ok::<_, anyhow::Error>(())
        }
    });

    let (signal_tx, mut signal_rx) = mpsc::channel(16);
    let subscriber = spawn_subscriber(
        SubscriberOptions {
            url: Url::parse(&format!("ws://127.0.0.1:{port}/app/quillcast"))?,
            channel: "editor".into(),
            policy: ReconnectPolicy {
                initial_delay_ms: 10,
                ..ReconnectPolicy::default()
            },
        },
        signal_tx,
    );

    let mut signals = Vec::new();
    while signals.len() < 6 {
        match timeout(Duration::from_secs(5), signal_rx.recv()).await? {
            Some(signal) => signals.push(signal),
            None => break,
        }
    }
    subscriber.abort();
    relay.abort();

    assert_eq!(
        signals,
        vec![
            RemoteSignal::Connecting,
            RemoteSignal::Subscribed,
            RemoteSignal::Disconnected,
            RemoteSignal::Connecting,
            RemoteSignal::Subscribed,
            RemoteSignal::Event(RemoteEvent::TextUpdate {
                html: "<p>after</p>".into()
            }),
        ]
    );
    assert_eq!(subscribes.load(Ordering::SeqCst), 2);
    Ok(())
}
