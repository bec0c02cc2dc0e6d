pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::sync::Arc;
use tokio::sync::watch;

use crate::app::AppState;
use crate::protocol::{SessionStatus, Snapshot, UiCommand, UiEvent};
use crate::session::Session;

pub const PROTOCOL_VERSION: &str = "1.0";

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &UiEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to encode event: {}", e);
            true
        }
    }
}

/// Events for one published snapshot. The host-lost notice goes out once.
fn snapshot_events(snapshot: Snapshot, host_lost_sent: &mut bool) -> Vec<UiEvent> {
    let mut events = Vec::with_capacity(2);
    let lost = match &snapshot.status {
        SessionStatus::HostLost { reason } if !*host_lost_sent => Some(reason.clone()),
        _ => None,
    };
    events.push(UiEvent::Snapshot { snapshot });
    if let Some(reason) = lost {
        *host_lost_sent = true;
        events.push(UiEvent::HostLost { reason });
    }
    events
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let welcome = UiEvent::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_event(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    let mut session_rx = state.subscribe_session();
    let mut snapshots: Option<watch::Receiver<Snapshot>> =
        session_rx.borrow_and_update().as_ref().map(Session::subscribe);
    let mut host_lost_sent = false;

    if let Some(rx) = snapshots.as_mut() {
        let snapshot = rx.borrow_and_update().clone();
        for event in snapshot_events(snapshot, &mut host_lost_sent) {
            if !send_event(&mut sender, &event).await {
                return;
            }
        }
    }

    loop {
        tokio::select! {
            // This process entered another room
            changed = session_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                snapshots = session_rx.borrow_and_update().as_ref().map(Session::subscribe);
                host_lost_sent = false;
                let current = snapshots.as_mut().map(|rx| rx.borrow_and_update().clone());
                if let Some(snapshot) = current {
                    let mut ok = true;
                    for event in snapshot_events(snapshot, &mut host_lost_sent) {
                        ok = ok && send_event(&mut sender, &event).await;
                    }
                    if !ok {
                        break;
                    }
                }
            }

            // State changes of the current room
            snapshot = async {
                match snapshots.as_mut() {
                    Some(rx) => match rx.changed().await {
                        Ok(()) => Some(rx.borrow_and_update().clone()),
                        Err(_) => None,
                    },
                    None => std::future::pending::<Option<Snapshot>>().await,
                }
            } => {
                match snapshot {
                    Some(snapshot) => {
                        let mut ok = true;
                        for event in snapshot_events(snapshot, &mut host_lost_sent) {
                            ok = ok && send_event(&mut sender, &event).await;
                        }
                        if !ok {
                            break;
                        }
                    }
                    // Session loop is gone, wait for the next room
                    None => snapshots = None,
                }
            }

            // Handle presentation commands
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received command: {}", text);

                        let response = match serde_json::from_str::<UiCommand>(&text) {
                            Ok(cmd) => handlers::handle_command(cmd, &state).await,
                            Err(e) => {
                                tracing::warn!("Failed to parse command: {}", e);
                                Some(UiEvent::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };
                        if let Some(event) = response {
                            if !send_event(&mut sender, &event).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!("WebSocket connection closed");
}
