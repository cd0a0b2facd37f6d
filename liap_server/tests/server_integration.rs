//! Integration tests for the HTTP surface: health check, lobby listing, and
//! the overall router composition (CORS, request-id middleware).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use liap_core::archival::NoopArchivalSink;
use liap_core::events::EventLogConfig;
use liap_core::room::{RoomConfig, RoomManager};
use liap_server::api::{self, AppState};
use liap_server::config::{RateLimitConfig, ServerConfig};
use liap_server::gateway::ConnectionRegistry;
use tower::ServiceExt;

fn test_state() -> AppState {
    let room_manager = Arc::new(RoomManager::new(
        RoomConfig::default(),
        EventLogConfig::default(),
        Arc::new(NoopArchivalSink),
    ));
    let config = ServerConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
        room: RoomConfig::default(),
        event_log: EventLogConfig::default(),
        rate_limit: RateLimitConfig { capacity: 20, refill_per_sec: 10 },
        heartbeat_interval: std::time::Duration::from_secs(15),
        idle_disconnect: std::time::Duration::from_secs(30),
        outbound_queue_size: 1024,
        bot_timing: liap_core::bot::BotTiming::default(),
    };
    AppState {
        room_manager,
        config: Arc::new(config),
        registry: ConnectionRegistry::new(),
    }
}

#[tokio::test]
async fn healthz_reports_status_and_connection_count() {
    let app = api::create_router(test_state());

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["active_connections"], 0);
}

#[tokio::test]
async fn rooms_listing_starts_empty() {
    let state = test_state();
    let room_manager = state.room_manager.clone();
    let app = api::create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/rooms").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["rooms"].as_array().unwrap().len(), 0);
    assert_eq!(room_manager.list_rooms().await.len(), 0);
}

#[tokio::test]
async fn rooms_listing_reflects_created_rooms() {
    let state = test_state();
    let room_manager = state.room_manager.clone();
    room_manager.create_room("Alice".into()).await;
    let app = api::create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/rooms").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["rooms"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = api::create_router(test_state());

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_id_header_is_attached_by_middleware() {
    let app = api::create_router(test_state());

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().get("x-request-id").is_some());
}
