use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;

use crate::{
    error::AppResult,
    stats::{offset_from_minutes, DashboardStats, StatsQuery},
    AppState,
};

pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<(StatusCode, Json<DashboardStats>)> {
    let offset = match query.utc_offset_minutes {
        Some(minutes) => offset_from_minutes(minutes)?,
        None => state.stats_offset,
    };

    let start = Instant::now();
    let products = state.store.list_products().await?;
    let movements = state.store.list_movements().await?;
    let stats = DashboardStats::derive(&products, &movements, &Utc::now().with_timezone(&offset));

    info!(
        total_products = stats.total_products,
        low_stock = stats.low_stock,
        movements_today = stats.movements_today,
        elapsed_ms = start.elapsed().as_millis(),
        "Computed dashboard stats"
    );

    Ok((StatusCode::OK, Json(stats)))
}
