use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hospital_api::create_router;
use notification_cell::NotificationRelay;
use shared_config::AppConfig;
use shared_database::{InMemoryStore, SharedStore, SupabaseStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hospital Management API server");

    // Load configuration
    let config = AppConfig::from_env();

    let store: SharedStore = if config.uses_remote_store() {
        info!("Using Supabase entity store at {}", config.supabase_url);
        Arc::new(SupabaseStore::new(&config))
    } else {
        warn!("Supabase is not configured; records are kept in memory and lost on restart");
        Arc::new(InMemoryStore::new())
    };
    let relay = NotificationRelay::with_buffer(config.notification_buffer);

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let port = config.server_port;
    let state = Arc::new(config);

    // Build the application router
    let app = create_router(state, store, relay)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .await
        .context("server terminated unexpectedly")?;

    Ok(())
}
