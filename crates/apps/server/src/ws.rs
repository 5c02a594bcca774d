//! WebSocket bridge between a client and its session actor.
//!
//! - Client messages are parsed and forwarded to the actor in arrival order
//! - Session events come back through an mpsc channel and a sender task
//! - Pings are answered here without touching the session
//! - With the mock walker on, client positions are dropped so only one
//!   sample feed reaches the tracker

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use territory::protocol::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::actor::{spawn_session, SessionCommand};
use crate::config::ServerConfig;
use crate::mock_walk;

const OUTBOUND_BUFFER: usize = 1024;

/// Where a parsed client message goes.
#[derive(Debug, PartialEq)]
enum Inbound {
    Command(SessionCommand),
    Reply(ServerMessage),
    Ignore,
}

fn route(msg: ClientMessage, mock_walk: bool) -> Inbound {
    match msg {
        ClientMessage::Ping { seq } => Inbound::Reply(ServerMessage::Pong { seq }),
        ClientMessage::Viewport(bounds) => Inbound::Command(SessionCommand::Viewport(bounds)),
        ClientMessage::Position(sample) if mock_walk => {
            debug!(
                timestamp_ms = sample.timestamp.millis(),
                "client position ignored while mock walk is enabled"
            );
            Inbound::Ignore
        }
        ClientMessage::Position(sample) => Inbound::Command(SessionCommand::Sample(sample)),
        ClientMessage::Tap(coordinate) => Inbound::Command(SessionCommand::Tap(coordinate)),
        ClientMessage::TapPolygon { points } => {
            Inbound::Command(SessionCommand::TapPolygon(points))
        }
    }
}

/// Handle one WebSocket connection for the lifetime of its game session.
pub async fn handle_ws_connection(socket: WebSocket, config: Arc<ServerConfig>) {
    let session_id = Uuid::new_v4().to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let hello = ServerMessage::hello(session_id.clone(), &config.game);
    let hello = match serde_json::to_string(&hello) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to serialize hello: {e}");
            return;
        }
    };
    if let Err(e) = ws_tx.send(Message::Text(hello)).await {
        error!("Failed to send hello: {e}");
        return;
    }

    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
    let session = match spawn_session(config.game.clone(), out_tx.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            error!("WS session {session_id} has invalid configuration: {e}");
            return;
        }
    };

    info!("WS session {session_id} connected");

    // Spawn outbound sender task
    let sender_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(t) => t,
                Err(e) => {
                    error!("Failed to serialize message: {e}");
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::Text(text)).await {
                warn!("Failed to send message: {e}");
                break;
            }
        }
    });

    let walker = config
        .mock_walk
        .clone()
        .map(|walk| tokio::spawn(mock_walk::run(walk, session.commands.clone())));

    // Main message loop
    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!("WS receive error: {e}");
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => {
                info!("WS session {session_id} closed by client");
                break;
            }
            // axum answers protocol-level pings itself
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => continue,
        };

        let inbound = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(msg) => route(msg, walker.is_some()),
            Err(e) => Inbound::Reply(ServerMessage::error("parse_error", e)),
        };
        let command = match inbound {
            Inbound::Command(command) => command,
            Inbound::Reply(reply) => {
                let _ = out_tx.send(reply).await;
                continue;
            }
            Inbound::Ignore => continue,
        };

        if session.commands.send(command).await.is_err() {
            warn!("WS session {session_id} actor stopped");
            break;
        }
    }

    if let Some(walker) = walker {
        walker.abort();
    }
    drop(session.commands);
    match session.task.await {
        Ok(stats) => info!(
            cells = stats.cells,
            captured = stats.states.captured,
            samples = stats.accepted_samples,
            rejected = stats.rejected_samples,
            "WS session {session_id} finished"
        ),
        Err(e) => error!("WS session {session_id} actor failed: {e}"),
    }

    drop(out_tx);
    let _ = sender_task.await;
    info!("WS session {session_id} disconnected");
}

#[cfg(test)]
mod tests {
    use super::{route, Inbound};
    use crate::actor::SessionCommand;
    use foundation::coord::Coordinate;
    use foundation::time::Timestamp;
    use territory::protocol::{ClientMessage, ServerMessage};
    use territory::sample::PositionSample;

    fn position() -> ClientMessage {
        ClientMessage::Position(PositionSample::new(10.0005, 20.0005, Timestamp::from_millis(5)))
    }

    #[test]
    fn client_positions_feed_the_session_without_mock_walk() {
        assert_eq!(
            route(position(), false),
            Inbound::Command(SessionCommand::Sample(PositionSample::new(
                10.0005,
                20.0005,
                Timestamp::from_millis(5)
            )))
        );
    }

    #[test]
    fn mock_walk_owns_the_sample_feed() {
        assert_eq!(route(position(), true), Inbound::Ignore);
        // Everything else still reaches the session.
        let tap = Coordinate::new(10.0005, 20.0005);
        assert_eq!(
            route(ClientMessage::Tap(tap), true),
            Inbound::Command(SessionCommand::Tap(tap))
        );
        assert_eq!(
            route(ClientMessage::Ping { seq: 7 }, true),
            Inbound::Reply(ServerMessage::Pong { seq: 7 })
        );
    }
}
