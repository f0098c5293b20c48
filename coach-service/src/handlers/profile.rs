use crate::dtos::{SetUsernameRequest, UsernameResponse};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

#[tracing::instrument(skip(state, request), fields(session_id = %request.session_id))]
pub async fn set_username(
    State(state): State<AppState>,
    Json(request): Json<SetUsernameRequest>,
) -> Result<Json<SetUsernameRequest>, AppError> {
    request.validate()?;
    state
        .coach
        .set_username(&request.session_id, &request.username)
        .await?;
    Ok(Json(request))
}

#[tracing::instrument(skip(state))]
pub async fn get_username(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<UsernameResponse>, AppError> {
    let username = state.coach.get_username(&session_id).await?;
    Ok(Json(UsernameResponse {
        session_id,
        username,
    }))
}
