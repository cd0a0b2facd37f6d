//! HTTP surface for the gateway: health checks, the lobby listing, and the
//! websocket upgrade. A small axum router: CORS layer, shared `AppState`,
//! and the request-id middleware wrap a handful of routes.

pub mod request_id;

use std::sync::Arc;

use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::{Router, extract::State};
use liap_core::room::RoomManager;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::gateway::{self, ConnectionRegistry};

/// Shared application state, cloned (cheaply, via `Arc`) into every handler.
#[derive(Clone)]
pub struct AppState {
    pub room_manager: Arc<RoomManager>,
    pub config: Arc<ServerConfig>,
    pub registry: ConnectionRegistry,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/rooms", get(list_rooms))
        .route("/ws", get(gateway::websocket_handler))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "active_connections": state.registry.active_count(),
    }))
}

/// Lobby listing: every live room's joinable summary.
async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = state.room_manager.list_rooms().await;
    Json(json!({ "rooms": rooms }))
}
