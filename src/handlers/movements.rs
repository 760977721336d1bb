use std::time::Instant;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    export, ledger,
    models::{Movement, MovementFilters, NewMovement, ReverseMovement},
    AppState,
};

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_movements(
    State(state): State<AppState>,
    Query(filters): Query<MovementFilters>,
) -> AppResult<(StatusCode, Json<Vec<Movement>>)> {
    let start = Instant::now();
    let movements = filters.apply(state.store.list_movements().await?);

    info!(
        count = movements.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Listed movements"
    );

    Ok((StatusCode::OK, Json(movements)))
}

// ── Record ────────────────────────────────────────────────────────────────────

pub async fn record_movement(
    State(state): State<AppState>,
    Json(payload): Json<NewMovement>,
) -> AppResult<(StatusCode, Json<Movement>)> {
    let start = Instant::now();
    let movement = ledger::record_movement(state.store.as_ref(), payload).await?;

    debug!(id = %movement.id, elapsed_ms = start.elapsed().as_millis(), "Ledger unit committed");

    Ok((StatusCode::OK, Json(movement)))
}

// ── Reverse ───────────────────────────────────────────────────────────────────

pub async fn reverse_movement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ReverseMovement>,
) -> AppResult<(StatusCode, Json<Movement>)> {
    let counter = ledger::reverse_movement(state.store.as_ref(), &id, payload.usuario).await?;

    info!(original = %id, counter = %counter.id, "Reversed movement");

    Ok((StatusCode::OK, Json(counter)))
}

// ── Delete ────────────────────────────────────────────────────────────────────

/// Drops the audit row only. The stock effect stays; use the reverse route to
/// undo it.
pub async fn delete_movement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let existed = state.store.delete_movement(&id).await?;

    if existed {
        info!(id = %id, "Deleted movement");
    } else {
        debug!(id = %id, "Delete requested for unknown movement");
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Movement deleted",
            "id": id,
        })),
    ))
}

// ── GET /api/movements/export ─────────────────────────────────────────────────

pub async fn export_csv(
    State(state): State<AppState>,
    Query(filters): Query<MovementFilters>,
) -> Result<Response, AppError> {
    let movements = filters.apply(state.store.list_movements().await?);
    let csv = export::movements_csv(&movements)?;
    let file_name = export::file_name(Utc::now().date_naive());

    info!(rows = movements.len(), file = %file_name, "Exported movement audit");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )
        .body(Body::from(csv))
        .map_err(|e| AppError::Internal(e.into()))
}
