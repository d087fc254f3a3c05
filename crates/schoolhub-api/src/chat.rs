use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use schoolhub_types::api::{Claims, HistoryResponse, UnreadResponse};
use schoolhub_types::models::{ChatMessage, Role};

use crate::auth::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub with: String,
}

/// Conversation between the caller and `?with=<userId>`, oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let other: Uuid = query.with.trim().parse().map_err(|_| StatusCode::BAD_REQUEST)?;

    // Run blocking DB query off the async runtime
    let db = state.hub.db().clone();
    let me = claims.sub.to_string();
    let messages = tokio::task::spawn_blocking(move || {
        db.get_history(&me, &other.to_string())?
            .into_iter()
            .map(|row| row.into_chat_message())
            .collect::<anyhow::Result<Vec<ChatMessage>>>()
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Failed to load history: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(HistoryResponse { messages }))
}

/// Senders with unread messages for the calling director. Same computation
/// as the `unread_students` push on director login.
pub async fn get_unread(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let caller = state
        .hub
        .resolve_identity(claims.sub)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if caller.role != Role::Director {
        warn!("{} requested the unread list without director role", caller.id);
        return Err(StatusCode::FORBIDDEN);
    }

    let users = state
        .hub
        .compute_unread(caller.id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(UnreadResponse { users }))
}
