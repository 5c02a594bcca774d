//! Wire format between a game session host and its client.
//!
//! The client is both the location provider and the renderer: it reports
//! camera moves, position fixes and taps, and receives cell changes and path
//! points back. Messages are JSON objects tagged by `type`.

use foundation::bounds::ViewportBounds;
use foundation::coord::Coordinate;
use serde::{Deserialize, Serialize};

use crate::cell::CellSnapshot;
use crate::config::{GameConfig, LocationRequest};
use crate::events::GameEvent;
use crate::sample::PositionSample;
use crate::tracker::PathPoint;

pub type SessionId = String;

/// Message from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The visible map rectangle changed.
    Viewport(ViewportBounds),

    /// A location fix.
    Position(PositionSample),

    /// Tap on the map at a coordinate.
    Tap(Coordinate),

    /// Tap on a rendered cell polygon; points may arrive in any order.
    TapPolygon { points: Vec<Coordinate> },

    /// Keepalive.
    Ping { seq: u64 },
}

/// Message from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Session established; tells the client how to configure its location
    /// provider and how large cells are.
    Hello {
        session_id: SessionId,
        location_request: LocationRequest,
        cell_width_deg: f64,
        cell_height_deg: f64,
    },

    CellChanged(CellSnapshot),

    PathPoint(PathPoint),

    Pong { seq: u64 },

    /// A client message was refused.
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn hello(session_id: SessionId, config: &GameConfig) -> Self {
        ServerMessage::Hello {
            session_id,
            location_request: config.location,
            cell_width_deg: config.grid.cell_width_deg,
            cell_height_deg: config.grid.cell_height_deg,
        }
    }

    pub fn error(code: impl Into<String>, message: impl ToString) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.to_string(),
        }
    }
}

impl From<GameEvent> for ServerMessage {
    fn from(event: GameEvent) -> Self {
        match event {
            GameEvent::CellChanged(snapshot) => ServerMessage::CellChanged(snapshot),
            GameEvent::PathPoint(point) => ServerMessage::PathPoint(point),
        }
    }
}
