//! WebSocket transport: story commands in, story snapshots out.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storyline_core::{StoreError, StoryEvents, StoryFilter, StoryStore};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::stories::{snapshot, StoryResponse};
use crate::metrics::{
    WS_COMMANDS_RECEIVED, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS,
    WS_MESSAGES_SENT,
};
use crate::state::AppState;

/// WebSocket message sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Full story list. Sent on request and after every status change.
    Stories { stories: Vec<StoryResponse> },
    /// A command from this client could not be applied.
    Error { message: String },
}

impl WsMessage {
    fn kind(&self) -> &'static str {
        match self {
            WsMessage::Stories { .. } => "stories",
            WsMessage::Error { .. } => "error",
        }
    }
}

/// Command sent by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsCommand {
    Download { story_id: String },
    Cancel { story_id: String },
    Clean { story_id: String },
    GetStories,
}

impl WsCommand {
    fn kind(&self) -> &'static str {
        match self {
            WsCommand::Download { .. } => "download",
            WsCommand::Cancel { .. } => "cancel",
            WsCommand::Clean { .. } => "clean",
            WsCommand::GetStories => "get_stories",
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

    /// Push a fresh story snapshot to every client whenever a story changes.
    pub fn forward_story_changes(
        &self,
        events: &StoryEvents,
        stories: Arc<dyn StoryStore>,
    ) -> JoinHandle<()> {
        let broadcaster = self.clone();
        let mut changes = events.subscribe();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        debug!("Story {} is now {}", change.story_id, change.status);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // One snapshot covers everything skipped
                        debug!("Story change forwarder skipped {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                match stories.list(&StoryFilter::new()) {
                    Ok(list) => broadcaster.broadcast(WsMessage::Stories {
                        stories: list.into_iter().map(StoryResponse::from).collect(),
                    }),
                    Err(e) => warn!("Failed to build story snapshot: {}", e),
                }
            }
            debug!("Story change forwarder stopped");
        })
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Apply one client command. Returns the reply for this client only.
fn handle_command(state: &AppState, command: WsCommand) -> WsMessage {
    WS_COMMANDS_RECEIVED
        .with_label_values(&[command.kind()])
        .inc();

    let result = match &command {
        WsCommand::Download { story_id } => state.commands().schedule_download(story_id).map(|_| ()),
        WsCommand::Cancel { story_id } => state.commands().cancel_download(story_id).map(|_| ()),
        WsCommand::Clean { story_id } => state.commands().schedule_clean(story_id).map(|_| ()),
        WsCommand::GetStories => Ok(()),
    };

    let snapshot_result = result.and_then(|_| snapshot(state));
    match snapshot_result {
        Ok(stories) => WsMessage::Stories { stories },
        Err(e @ StoreError::TransientFault(_)) => {
            warn!("WebSocket {} hit a transient fault: {}", command.kind(), e);
            WsMessage::Error {
                message: e.to_string(),
            }
        }
        Err(e) => {
            error!("WebSocket {} failed: {}", command.kind(), e);
            WsMessage::Error {
                message: e.to_string(),
            }
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe to broadcast messages
    let mut rx = state.ws_broadcaster().subscribe();
    // Replies addressed to this client only
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<WsMessage>();

    // Track connection metrics
    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                result = rx.recv() => match result {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, skipped {} messages", n);
                        WS_LAG_EVENTS.inc();
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                },
                reply = reply_rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
            };

            WS_MESSAGES_SENT.with_label_values(&[msg.kind()]).inc();

            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize WsMessage: {}", e);
                }
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<WsCommand>(text.as_str()) {
                    Ok(command) => handle_command(&state, command),
                    Err(e) => {
                        debug!("Ignoring malformed WebSocket message: {}", e);
                        WsMessage::Error {
                            message: format!("invalid command: {}", e),
                        }
                    }
                };
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
            Ok(_) => {
                // Pong is handled automatically by axum
            }
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // Clean up
    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        let cmd: WsCommand =
            serde_json::from_str(r#"{"type":"download","story_id":"story-1"}"#).unwrap();
        assert!(matches!(cmd, WsCommand::Download { ref story_id } if story_id == "story-1"));

        let cmd: WsCommand = serde_json::from_str(r#"{"type":"get_stories"}"#).unwrap();
        assert!(matches!(cmd, WsCommand::GetStories));

        assert!(serde_json::from_str::<WsCommand>(r#"{"type":"explode"}"#).is_err());
    }

    #[test]
    fn test_stories_message_shape() {
        let msg = WsMessage::Stories { stories: vec![] };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "stories");
        assert!(json["stories"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_forwarder_pushes_snapshot_on_change() {
        use storyline_core::{InMemoryStoryStore, Story, StoryStatus};

        let events = StoryEvents::default();
        let stories = Arc::new(InMemoryStoryStore::new().with_events(events.clone()));
        stories
            .insert(Story::new("story-1", "Story 1", vec!["asset-1".into()]))
            .unwrap();

        let broadcaster = WsBroadcaster::default();
        let mut rx = broadcaster.subscribe();
        let _forwarder = broadcaster.forward_story_changes(&events, stories.clone());

        stories
            .update_status("story-1", StoryStatus::Scheduled)
            .unwrap();

        let msg = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match msg {
            WsMessage::Stories { stories } => {
                assert_eq!(stories.len(), 1);
                assert_eq!(stories[0].status, StoryStatus::Scheduled);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
