pub mod auth;
pub mod chat;
pub mod middleware;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};

use schoolhub_gateway::connection;

pub use auth::{AppState, AppStateInner};

/// All HTTP routes plus the `/gateway` WebSocket endpoint.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/messages", get(chat::get_history))
        .route("/unread", get(chat::get_unread))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    let ws_route = Router::new().route("/gateway", get(ws_upgrade));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .with_state(state)
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, hub))
}
