use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use foreman_core::events::TaskEvent;
use foreman_engine::TaskOrchestrator;

use crate::handlers;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 9292 }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: TaskOrchestrator,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/tasks", post(handlers::launch))
        .route("/v1/tasks/cancel", post(handlers::cancel))
        .route("/v1/tasks/{id}", get(handlers::get_task))
        .route("/v1/tasks/{id}/wait", post(handlers::wait_for_task))
        .route(
            "/v1/sessions/{session_id}/subagents",
            get(handlers::allowed_subagents),
        )
        .route(
            "/v1/sessions/{session_id}/allowed/{role}",
            get(handlers::is_allowed),
        )
        .route("/v1/events", post(handlers::ingest_status_event))
        .route("/v1/events/ws", get(ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(
    config: ServerConfig,
    orchestrator: TaskOrchestrator,
) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(AppState { orchestrator });
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "foreman server started");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server,
    })
}

/// Handle returned by `start()` — dropping it does not stop the server,
/// but it exposes the bound port (useful with port 0 in tests).
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

/// WebSocket upgrade for the task lifecycle feed.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let events = state.orchestrator.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, events))
}

/// Forward lifecycle events to one client until it hangs up.
async fn stream_events(mut socket: WebSocket, mut events: broadcast::Receiver<TaskEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let Ok(json) = serde_json::to_string(&event) else {
                    continue;
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event stream lagged, client missed events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
