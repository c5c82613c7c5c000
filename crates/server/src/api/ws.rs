//! WebSocket support for live feed updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use photofeed_core::PhotoFeed;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::types::PhotoResponse;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Interval between heartbeats sent to idle clients.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients for live updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// The ordered photo list changed.
    FeedSnapshot {
        revision: u64,
        photos: Vec<PhotoResponse>,
    },
    /// Page loading signal changed ("ready" or "loading").
    LoadingStatus { status: String },
    /// A page fetch failed.
    FeedError {
        query: String,
        page: u32,
        message: String,
    },
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    fn type_label(&self) -> &'static str {
        match self {
            WsMessage::FeedSnapshot { .. } => "feed_snapshot",
            WsMessage::LoadingStatus { .. } => "loading_status",
            WsMessage::FeedError { .. } => "feed_error",
            WsMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// Broadcaster for WebSocket messages using tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<WsMessage>,
}

impl WsBroadcaster {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast a message to all connected clients.
    pub fn broadcast(&self, msg: WsMessage) {
        // Ignore send errors - they just mean no one is listening
        let _ = self.sender.send(msg);
    }

    /// Subscribe to receive messages.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.sender.subscribe()
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Forward feed snapshots, loading status and errors to the broadcaster.
///
/// Snapshots and status are read from watch channels, so a slow bridge only
/// ever skips intermediate states, never the latest one.
pub fn spawn_feed_bridge(feed: &PhotoFeed, broadcaster: WsBroadcaster) -> JoinHandle<()> {
    let mut photos = feed.watch_photos();
    let mut status = feed.watch_status();
    let mut errors = feed.subscribe_errors();

    tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                changed = photos.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let update = photos.borrow_and_update().clone();
                    broadcaster.broadcast(WsMessage::FeedSnapshot {
                        revision: update.revision,
                        photos: PhotoResponse::list(&update.photos),
                    });
                }
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *status.borrow_and_update();
                    broadcaster.broadcast(WsMessage::LoadingStatus {
                        status: current.as_str().to_string(),
                    });
                }
                event = errors.recv() => match event {
                    Ok(event) => broadcaster.broadcast(WsMessage::FeedError {
                        query: event.query,
                        page: event.page,
                        message: event.message,
                    }),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Feed bridge lagged, skipped {} error events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = heartbeat.tick() => {
                    broadcaster.broadcast(WsMessage::Heartbeat {
                        timestamp: chrono::Utc::now().timestamp(),
                    });
                }
            }
        }

        debug!("Feed bridge stopped");
    })
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.ws_broadcaster().subscribe();

    // New clients start from the current list rather than waiting for a change
    let current = state.feed().watch_photos().borrow().clone();
    let initial = WsMessage::FeedSnapshot {
        revision: current.revision,
        photos: PhotoResponse::list(&current.photos),
    };

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        if send_message(&mut sender, &initial).await.is_err() {
            return;
        }

        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if send_message(&mut sender, &msg).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged, skipped {} messages", n);
                    WS_LAG_EVENTS.inc();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Broadcast channel closed");
                    break;
                }
            }
        }
    });

    // Client messages are not part of the protocol; only watch for close
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Received text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

async fn send_message<S>(sender: &mut S, msg: &WsMessage) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
{
    WS_MESSAGES_SENT.with_label_values(&[msg.type_label()]).inc();

    match serde_json::to_string(msg) {
        Ok(json) => sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| ()),
        Err(e) => {
            error!("Failed to serialize WsMessage: {}", e);
            Ok(())
        }
    }
}
