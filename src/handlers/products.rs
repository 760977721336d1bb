use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    models::Product,
    AppState,
};

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_products(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<Vec<Product>>)> {
    let start = Instant::now();
    let products = state.store.list_products().await?;

    info!(
        count = products.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Listed products"
    );

    Ok((StatusCode::OK, Json(products)))
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = state
        .store
        .find_product(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;

    Ok((StatusCode::OK, Json(product)))
}

// ── Upsert ────────────────────────────────────────────────────────────────────

/// Full replace keyed by `id`; numeric ranges are not validated.
pub async fn upsert_product(
    State(state): State<AppState>,
    Json(payload): Json<Product>,
) -> AppResult<(StatusCode, Json<Product>)> {
    if payload.id.trim().is_empty() {
        return Err(AppError::BadRequest("id must not be empty".to_string()));
    }

    let start = Instant::now();
    let product = state.store.upsert_product(&payload).await?;

    info!(
        id = %product.id,
        nombre = %product.nombre,
        stock_actual = product.stock_actual,
        elapsed_ms = start.elapsed().as_millis(),
        "Saved product"
    );

    Ok((StatusCode::OK, Json(product)))
}

// ── Delete ────────────────────────────────────────────────────────────────────

/// Unconditional: movements that reference the product are left in place.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let existed = state.store.delete_product(&id).await?;

    if existed {
        info!(id = %id, "Deleted product");
    } else {
        debug!(id = %id, "Delete requested for unknown product");
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Product deleted",
            "id": id,
        })),
    ))
}
