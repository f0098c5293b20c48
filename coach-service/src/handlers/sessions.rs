use crate::dtos::{CreateSessionResponse, HistoryResponse, TurnView};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

#[tracing::instrument(skip(state))]
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let session_id = state.coach.create_session().await?;
    Ok(Json(CreateSessionResponse { session_id }))
}

/// Turns of a session in submission order. Unknown ids yield an empty list.
#[tracing::instrument(skip(state))]
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let (username, turns) = match state.coach.session(&session_id).await? {
        Some(session) => (session.display_name, session.turns),
        None => (None, Vec::new()),
    };

    Ok(Json(HistoryResponse {
        session_id,
        username,
        turns: turns.into_iter().map(TurnView::from).collect(),
    }))
}
