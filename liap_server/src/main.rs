//! Realtime game server process for Liap Tui: bootstraps configuration,
//! logging, metrics, and the room manager, then serves the gateway's HTTP/
//! WebSocket router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use ctrlc::set_handler;
use liap_core::archival::{LoggingArchivalSink, NoopArchivalSink};
use liap_core::room::RoomManager;
use pico_args::Arguments;

use liap_server::api::{self, AppState};
use liap_server::config::ServerConfig;
use liap_server::gateway::ConnectionRegistry;
use liap_server::{logging, metrics};

const HELP: &str = "\
Run the Liap Tui realtime game server

USAGE:
  liap_server [OPTIONS]

OPTIONS:
  --bind           IP:PORT   Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --metrics-bind   IP:PORT   Prometheus exporter bind address  [default: env METRICS_BIND or 127.0.0.1:9090]

FLAGS:
  -h, --help                 Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8080)
  ROOM_WIN_THRESHOLD           Cumulative score needed to end the game
  ROOM_REDEAL_CAP               Max redeals allowed per round
  EVENT_RING_CAPACITY           Per-room resync ring buffer size
  RATE_LIMIT_CAPACITY           Per-connection token bucket capacity
  HEARTBEAT_INTERVAL_MS         Websocket heartbeat interval
  (See .env.example for the complete list.)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.value_from_str("--bind").ok();
    let metrics_bind: SocketAddr = pargs
        .value_from_str("--metrics-bind")
        .ok()
        .or_else(|| std::env::var("METRICS_BIND").ok().and_then(|s| s.parse().ok()))
        .unwrap_or_else(|| "127.0.0.1:9090".parse().expect("default metrics address is valid"));

    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(bind_override).map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(bind = %config.bind, "starting liap_server");

    metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(metrics_bind = %metrics_bind, "prometheus exporter installed");

    let archival: Arc<dyn liap_core::archival::ArchivalSink> = if std::env::var("ARCHIVAL_LOG").is_ok() {
        Arc::new(LoggingArchivalSink)
    } else {
        Arc::new(NoopArchivalSink)
    };

    let room_manager = Arc::new(RoomManager::with_bot_timing(config.room, config.event_log, archival, config.bot_timing));
    spawn_reaper(room_manager.clone());

    let state = AppState {
        room_manager,
        config: Arc::new(config.clone()),
        registry: ConnectionRegistry::new(),
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}: {}", config.bind, e))?;

    tracing::info!(bind = %config.bind, "server is running; press Ctrl+C to stop");
    axum::serve(listener, app).await.map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    Ok(())
}

/// Periodically evicts empty rooms so abandoned lobbies don't accumulate.
fn spawn_reaper(room_manager: Arc<RoomManager>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            ticker.tick().await;
            room_manager.reap_empty_rooms().await;
        }
    });
}
