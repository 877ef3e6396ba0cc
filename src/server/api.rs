use std::sync::Arc;

use axum::{
    Json, Router,
    extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::pages::PageRegistry;
use crate::config::Config;
use crate::sync::protocol::{
    self, CLOSE_UNKNOWN_KEY, CLOSE_WRONG_CLUSTER, ChannelFrame, ChannelHub, EDITOR_UPDATE,
    TEXT_UPDATE, TextPayload,
};

#[derive(Clone)]
pub struct RelayState {
    pub hub: ChannelHub,
    /// Channel the REST ingress publishes to
    pub channel: String,
    pub app_key: String,
    pub cluster: String,
    pub pages: Arc<PageRegistry>,
    /// Last `text-update` HTML per channel, for the editor page
    pub last_preview: Arc<DashMap<String, String>>,
}

impl RelayState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            hub: ChannelHub::new(),
            channel: config.channel.clone(),
            app_key: config.relay.app_key.clone(),
            cluster: config.relay.cluster.clone(),
            pages: Arc::new(PageRegistry::new(config.site.clone())),
            last_preview: Arc::new(DashMap::new()),
        }
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/save-text", post(save_text))
        .route("/editor-text", post(editor_text))
        .route("/app/{key}", get(ws_handler))
        .route("/health", get(|| async { Json("OK") }))
        .route("/chunk-map.json", get(chunk_map))
        .fallback(page)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn save_text(State(state): State<RelayState>, Json(body): Json<TextPayload>) -> Json<Value> {
    state
        .last_preview
        .insert(state.channel.clone(), body.text.clone());
    let frame = ChannelFrame::new(
        TEXT_UPDATE,
        Some(state.channel.clone()),
        json!({ "text": body.text }),
    );
    let delivered = state.hub.publish(&state.channel, frame);
    debug!(channel = %state.channel, delivered, "text-update");
    Json(json!({ "ok": true, "delivered": delivered }))
}

/// Relays the body untouched; subscribers validate it.
async fn editor_text(
    State(state): State<RelayState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !body.is_object() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": "expected a JSON object" })),
        ));
    }
    let frame = ChannelFrame::new(EDITOR_UPDATE, Some(state.channel.clone()), body);
    let delivered = state.hub.publish(&state.channel, frame);
    debug!(channel = %state.channel, delivered, "editor-update");
    Ok(Json(json!({ "ok": true, "delivered": delivered })))
}

async fn chunk_map(State(state): State<RelayState>) -> impl IntoResponse {
    Json(state.pages.chunk_map())
}

async fn page(State(state): State<RelayState>, uri: Uri) -> Response {
    let preview = state.last_preview.get(&state.channel).map(|p| p.clone());
    let rendered = state.pages.render(uri.path(), preview.as_deref());
    let status = if rendered.found {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (status, Html(rendered.html)).into_response()
}

#[derive(Debug, Deserialize)]
struct SocketQuery {
    cluster: Option<String>,
}

async fn ws_handler(
    State(state): State<RelayState>,
    Path(key): Path<String>,
    Query(query): Query<SocketQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, key, query.cluster, socket))
}

async fn handle_socket(state: RelayState, key: String, cluster: Option<String>, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();

    let refusal = if key != state.app_key {
        Some((CLOSE_UNKNOWN_KEY, format!("unknown app key `{key}`")))
    } else if cluster.as_deref().is_some_and(|c| c != state.cluster) {
        Some((CLOSE_WRONG_CLUSTER, format!("this relay serves cluster `{}`", state.cluster)))
    } else {
        None
    };
    if let Some((code, message)) = refusal {
        warn!(%key, code, "refusing socket");
        if let Ok(text) = serde_json::to_string(&ChannelFrame::error(code, &message)) {
            let _ = sink.send(Message::Text(text.into())).await;
        }
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: message.into(),
            })))
            .await;
        return;
    }

    // All writes go through one task so forwarders and control replies
    // never interleave on the sink.
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(256);
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut subscribed: Vec<String> = Vec::new();
    let mut forwarders = Vec::new();

    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        let frame: ChannelFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(error = %err, "ignoring malformed client frame");
                continue;
            }
        };

        match frame.event.as_str() {
            protocol::SUBSCRIBE => {
                let Some(channel) = frame.requested_channel().map(str::to_string) else {
                    send_frame(&out_tx, &ChannelFrame::error(4000, "subscribe needs a channel")).await;
                    continue;
                };
                if !subscribed.contains(&channel) {
                    let rx = state.hub.subscribe(&channel);
                    forwarders.push(tokio::spawn(forward(channel.clone(), rx, out_tx.clone())));
                    subscribed.push(channel.clone());
                    info!(%channel, "subscriber joined");
                }
                send_frame(&out_tx, &ChannelFrame::subscription_succeeded(&channel)).await;
            }
            protocol::PING => {
                send_frame(&out_tx, &ChannelFrame::new(protocol::PONG, None, Value::Null)).await;
            }
            other => debug!(event = other, "ignoring client event"),
        }
    }

    for forwarder in forwarders {
        forwarder.abort();
        // Wait for the receiver to drop before pruning the channel.
        let _ = forwarder.await;
    }
    for channel in &subscribed {
        if state.hub.release(channel) {
            debug!(%channel, "channel released");
        }
    }
    drop(out_tx);
    let _ = writer.await;
    debug!(channels = ?subscribed, "subscriber left");
}

async fn forward(
    channel: String,
    mut rx: broadcast::Receiver<Arc<ChannelFrame>>,
    out: mpsc::Sender<Message>,
) {
    loop {
        match rx.recv().await {
            Ok(frame) => {
                let Ok(text) = serde_json::to_string(&*frame) else {
                    continue;
                };
                if out.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(%channel, skipped, "subscriber lagging; events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn send_frame(out: &mpsc::Sender<Message>, frame: &ChannelFrame) {
    if let Ok(text) = serde_json::to_string(frame) {
        let _ = out.send(Message::Text(text.into())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> RelayState {
        RelayState::from_config(&Config::default())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn save_text_fans_out_and_remembers_the_preview() {
        let state = state();
        let mut rx = state.hub.subscribe("editor");

        let response = router(state.clone())
            .oneshot(
                Request::post("/save-text")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text":"<p>Hi</p>"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"ok": true, "delivered": 1}));

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, TEXT_UPDATE);
        assert_eq!(frame.channel.as_deref(), Some("editor"));
        assert_eq!(frame.data, json!({"text": "<p>Hi</p>"}));
        assert_eq!(state.last_preview.get("editor").unwrap().as_str(), "<p>Hi</p>");
    }

    #[tokio::test]
    async fn editor_text_is_relayed_verbatim() {
        let state = state();
        let mut rx = state.hub.subscribe("editor");
        let body = json!({"text": {"blocks": [], "entityMap": {}}, "selection": {"extra": 1}});

        let response = router(state)
            .oneshot(
                Request::post("/editor-text")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(rx.recv().await.unwrap().data, body);
    }

    #[tokio::test]
    async fn editor_text_rejects_non_objects() {
        let response = router(state())
            .oneshot(
                Request::post("/editor-text")
                    .header("content-type", "application/json")
                    .body(Body::from("[1,2]"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pages_and_fallback() {
        let response = router(state())
            .oneshot(Request::get("/page-2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router(state())
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router(state())
            .oneshot(Request::get("/chunk-map.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let map = body_json(response).await;
        assert_eq!(map["/page-2"], "component---src-pages-page-2-js");
    }

    #[tokio::test]
    async fn editor_page_shows_the_last_preview() {
        let state = state();
        state
            .last_preview
            .insert("editor".into(), "<p>Shared <strong>text</strong></p>".into());
        let response = router(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("<p>Shared <strong>text</strong></p>"));
    }
}
