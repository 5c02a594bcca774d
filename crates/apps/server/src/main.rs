use std::process::ExitCode;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod actor;
mod config;
mod mock_walk;
mod ws;

use config::ServerConfig;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env();
    if let Err(err) = config.game.validate() {
        error!("invalid game configuration: {err}");
        return ExitCode::FAILURE;
    }
    let addr = config.addr;
    if let Some(walk) = &config.mock_walk {
        info!(
            lat = walk.start.latitude,
            lon = walk.start.longitude,
            "mock walk enabled"
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/config", get(get_config))
        .route("/ws", get(ws_upgrade))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(config));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!("territory server listening on ws://{addr}/ws");
    if let Err(err) = axum::serve(listener, app).await {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

async fn get_config(State(config): State<Arc<ServerConfig>>) -> Response {
    Json(config.game).into_response()
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(config): State<Arc<ServerConfig>>) -> Response {
    ws.on_upgrade(move |socket| ws::handle_ws_connection(socket, config))
}
