/*
 * Responsibility
 * - GET /users/{username}
 * - only the user themself or a MASTER may read an identity
 */
use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    api::v1::{dto::identity::UserResponse, extractors::CurrentPrincipal},
    error::AppError,
    services::auth::Authority,
    state::AppState,
};

pub async fn get_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    if principal.username() != username && !principal.has_authority(Authority::Master) {
        tracing::warn!(
            principal = %principal.username(),
            target_user = %username,
            "access to another user's identity denied"
        );
        return Err(AppError::access_denied("no access to another user's data"));
    }

    let record = state
        .identity_store
        .load_by_username(&username)
        .await?
        .ok_or(AppError::not_found("user"))?;

    Ok(Json(UserResponse::from(record)))
}
