use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::{
    auth,
    error::{AppError, AppResult},
    models::{Credentials, NewUser, RoleUpdate, User},
    AppState,
};

// ── POST /api/auth/login ──────────────────────────────────────────────────────

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = auth::authenticate(state.store.as_ref(), &credentials).await?;
    Ok((StatusCode::OK, Json(user)))
}

// ── Directory ─────────────────────────────────────────────────────────────────

pub async fn list_users(State(state): State<AppState>) -> AppResult<(StatusCode, Json<Vec<User>>)> {
    let users: Vec<User> = state
        .store
        .list_users()
        .await?
        .into_iter()
        .map(|record| record.user)
        .collect();

    Ok((StatusCode::OK, Json(users)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = auth::create_user(state.store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if !state.store.delete_user(&id).await? {
        return Err(AppError::NotFound(format!("User {} not found", id)));
    }

    info!(id = %id, "Deleted user");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "User deleted", "id": id })),
    ))
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RoleUpdate>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if !state.store.set_user_role(&id, payload.role).await? {
        return Err(AppError::NotFound(format!("User {} not found", id)));
    }

    info!(id = %id, role = %payload.role, "Updated user role");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "id": id, "role": payload.role })),
    ))
}
