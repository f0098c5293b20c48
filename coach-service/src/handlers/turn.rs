use crate::dtos::{TurnRequest, TurnResponse};
use crate::startup::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

#[tracing::instrument(skip(state, request), fields(session_id = %request.session_id))]
pub async fn take_turn(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    request.validate()?;

    let selection = state
        .coach
        .take_turn(&request.session_id, &request.user_msg)
        .await?;

    Ok(Json(TurnResponse {
        question: selection.question,
        next_phase: selection.phase,
    }))
}
