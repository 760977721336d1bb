use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    Entrada,
    Salida,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Entrada => "Entrada",
            MovementKind::Salida => "Salida",
        }
    }

    /// Signed change applied to `stock_actual` for `cantidad` units.
    pub fn delta(self, cantidad: i32) -> i32 {
        match self {
            MovementKind::Entrada => cantidad,
            MovementKind::Salida => -cantidad,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            MovementKind::Entrada => MovementKind::Salida,
            MovementKind::Salida => MovementKind::Entrada,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown movement type {0:?}")]
pub struct UnknownMovementKind(pub String);

impl FromStr for MovementKind {
    type Err = UnknownMovementKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Entrada" => Ok(MovementKind::Entrada),
            "Salida" => Ok(MovementKind::Salida),
            other => Err(UnknownMovementKind(other.to_string())),
        }
    }
}

/// One committed ledger row. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: String,
    pub fecha: DateTime<Utc>,
    pub producto_id: String,
    /// Product name as it was when the movement was recorded.
    pub producto_nombre: String,
    pub tipo: MovementKind,
    pub cantidad: i32,
    pub motivo: String,
    pub usuario: String,
    /// Set on counter-movements: the id of the movement this one undoes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverses: Option<String>,
}

impl Movement {
    /// Case-insensitive match against product name, user and reason.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [&self.producto_nombre, &self.usuario, &self.motivo]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

impl<'r> FromRow<'r, PgRow> for Movement {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let tipo: String = row.try_get("tipo")?;
        Ok(Self {
            id: row.try_get("id")?,
            fecha: row.try_get("fecha")?,
            producto_id: row.try_get("producto_id")?,
            producto_nombre: row.try_get("producto_nombre")?,
            tipo: tipo.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            cantidad: row.try_get("cantidad")?,
            motivo: row.try_get("motivo")?,
            usuario: row.try_get("usuario")?,
            reverses: row.try_get("reverses")?,
        })
    }
}

// ── Request payloads ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMovement {
    pub producto_id: String,
    /// Optional; resolved from the catalog when blank.
    #[serde(default)]
    pub producto_nombre: Option<String>,
    pub tipo: MovementKind,
    pub cantidad: i32,
    #[serde(default)]
    pub motivo: String,
    #[serde(default)]
    pub usuario: String,
}

#[derive(Debug, Deserialize)]
pub struct ReverseMovement {
    #[serde(default)]
    pub usuario: String,
}

// ── Query parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct MovementFilters {
    pub q: Option<String>,
}

impl MovementFilters {
    pub fn apply(&self, movements: Vec<Movement>) -> Vec<Movement> {
        match self.q.as_deref() {
            Some(term) => movements.into_iter().filter(|m| m.matches(term)).collect(),
            None => movements,
        }
    }
}
