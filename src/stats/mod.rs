use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{Movement, Product};

const RECENT_LIMIT: usize = 5;
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Dashboard counters, recomputed from the full collections on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub movements_today: usize,
    pub recent_movements: Vec<Movement>,
}

impl DashboardStats {
    /// "Today" is the calendar day of `now` in `now`'s own offset.
    pub fn derive<Tz: TimeZone>(
        products: &[Product],
        movements: &[Movement],
        now: &DateTime<Tz>,
    ) -> Self {
        let offset = now.timezone();
        let today = now.date_naive();

        let mut recent: Vec<&Movement> = movements.iter().collect();
        recent.sort_by(|a, b| b.fecha.cmp(&a.fecha));

        Self {
            total_products: products.len(),
            low_stock: products.iter().filter(|p| p.is_low_stock()).count(),
            out_of_stock: products.iter().filter(|p| p.is_out_of_stock()).count(),
            movements_today: movements
                .iter()
                .filter(|m| m.fecha.with_timezone(&offset).date_naive() == today)
                .count(),
            recent_movements: recent.into_iter().take(RECENT_LIMIT).cloned().collect(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    /// Minutes east of UTC, e.g. -180 for Argentina.
    pub utc_offset_minutes: Option<i32>,
}

pub fn offset_from_minutes(minutes: i32) -> AppResult<FixedOffset> {
    if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
        return Err(AppError::BadRequest(format!(
            "utcOffsetMinutes must be within ±{}",
            MAX_OFFSET_MINUTES
        )));
    }
    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| AppError::BadRequest(format!("invalid UTC offset {}", minutes)))
}
