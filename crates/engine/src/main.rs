//! Chibi Bot Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chibibot_engine::api;
use chibibot_engine::app::App;
use chibibot_engine::infrastructure::{
    catalog::AssetCatalog,
    chat::LocalChatHub,
    clock::{SystemClock, SystemRandom},
    directory::StaticChannelDirectory,
    metrics::AtomicMetrics,
    ports::{ClockPort, MetricsSink},
    settings::Settings,
    sqlite::SqliteStateStore,
};
use chibibot_engine::rooms::{RoomDeps, RoomRegistry, RoomSettings};

/// Outer cap on the whole shutdown sequence.
const PROCESS_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine is usually run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chibibot_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Chibi Bot Engine");

    let settings = Settings::from_env();

    tracing::info!(path = %settings.asset_index.display(), "Loading operator catalog");
    let catalog = Arc::new(AssetCatalog::load(&settings.asset_index).await?);

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);
    let store = Arc::new(SqliteStateStore::new(&settings.database_url, clock.clone()).await?);
    let chat = Arc::new(LocalChatHub::new());
    let metrics: Arc<dyn MetricsSink> = Arc::new(AtomicMetrics::new());

    let deps = RoomDeps {
        catalog,
        chat: chat.clone(),
        directory: Arc::new(StaticChannelDirectory::new(&settings.channels)),
        snapshots: store.clone(),
        preferences: store,
        metrics: metrics.clone(),
        clock,
        random: Arc::new(SystemRandom),
    };
    let rooms = RoomRegistry::new(deps, RoomSettings::from(&settings));
    let app = Arc::new(App::new(rooms.clone(), chat, metrics));

    for channel in &settings.channels {
        if let Err(e) = rooms.create_room_or_noop(channel).await {
            tracing::error!(channel = %channel, error = %e, "Failed to open configured room");
        }
    }

    let stop_gc = CancellationToken::new();
    let gc_task = rooms.spawn_gc(stop_gc.clone());

    let mut router = api::router(app).layer(TraceLayer::new_for_http());
    if let Some(cors) = build_cors_layer_from_env() {
        router = router.layer(cors);
    }

    // Start server
    let addr: SocketAddr = format!("{}:{}", settings.server_host, settings.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, shutting down rooms");
    stop_gc.cancel();
    if let Some(gc_task) = gc_task {
        gc_task.abort();
    }

    let shutdown = async {
        rooms.shutdown().await;
        rooms.wait_for_shutdown_with_timeout().await
    };
    match tokio::time::timeout(PROCESS_SHUTDOWN_TIMEOUT, shutdown).await {
        Ok(true) => tracing::info!("Shutdown complete"),
        Ok(false) | Err(_) => tracing::warn!("Forcing shutdown"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer_from_env() -> Option<CorsLayer> {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
