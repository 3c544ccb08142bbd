use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    http::HeaderValue,
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use banter_api::{AppState, AppStateInner, health, messages, presence};
use banter_gateway::connection;
use banter_gateway::dispatcher::Dispatcher;
use banter_gateway::presence::PresenceRegistry;
use banter_gateway::relay::Relay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banter=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("BANTER_DB_PATH").unwrap_or_else(|_| "banter.db".into());
    let host = std::env::var("BANTER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("BANTER_PORT")
        .unwrap_or_else(|_| "5000".into())
        .parse()?;
    let cors_origin = std::env::var("BANTER_CORS_ORIGIN").unwrap_or_else(|_| "*".into());

    // Init message store
    let db = Arc::new(banter_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state: the relay and the HTTP handlers see the same store and
    // the same presence registry
    let registry = PresenceRegistry::new();
    let relay = Relay::new(db.clone(), registry.clone(), Dispatcher::new());
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        presence: registry,
    });

    // Routes
    let api_routes = Router::new()
        .route("/health", get(health))
        .route(
            "/messages/private/{user_a}/{user_b}",
            get(messages::private_history),
        )
        .route("/messages/room/{room}", get(messages::room_history))
        .route("/last-seen/{username}", get(presence::last_seen))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(relay);

    let app = Router::new()
        .merge(api_routes)
        .merge(ws_route)
        .layer(cors_layer(&cors_origin)?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("banter relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(relay): State<Relay>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_socket(socket, relay))
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    if origin == "*" {
        return Ok(CorsLayer::permissive());
    }
    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods(Any)
        .allow_headers(Any))
}
