use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use schoolhub_types::events::{GatewayCommand, GatewayEvent};

use crate::hub::Hub;
use crate::session::Session;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one WebSocket connection until either side goes away.
///
/// The connection starts unauthenticated; the client must send `authenticate`
/// before anything else is accepted, and may retry after an `auth_error`.
pub async fn handle_connection(socket: WebSocket, hub: Hub) {
    let (mut sender, mut receiver) = socket.split();

    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<GatewayEvent>();
    let mut session = Session::new(hub.clone(), outbox);
    let conn_id = session.id();
    info!("Connection {} opened", conn_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward queued events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = outbox_rx.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode gateway event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Commands are handled in arrival order, each to completion.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => session.handle(cmd).await,
                    Err(e) => {
                        warn!(
                            "Connection {} bad command: {} -- raw: {}",
                            session.id(),
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                        session.emit(GatewayEvent::MessageError("Malformed command".into()));
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        let registry = session.hub().registry().clone();
        if let Some(bound) = session.close().await {
            let remaining = registry.connection_count(bound.user_id).await;
            info!(
                "{} {} ({}) disconnected from gateway, {} connection(s) left",
                bound.role, bound.display_name, bound.user_id, remaining
            );
            if !registry.is_online(bound.user_id).await {
                info!("{} is now offline", bound.display_name);
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // recv_task may have been aborted before it could close the session.
    hub.registry().unbind(conn_id).await;
    info!("Connection {} closed", conn_id);
}
