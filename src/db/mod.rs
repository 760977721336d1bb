//! Storage seam. Handlers and the ledger only see [`Store`]; production runs on
//! [`PgStore`], tests run on the in-memory store.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Movement, Product, Role, UserRecord};

pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    // ── Products ─────────────────────────────────────────────────────────────

    async fn list_products(&self) -> AppResult<Vec<Product>>;

    async fn find_product(&self, id: &str) -> AppResult<Option<Product>>;

    /// Insert, or overwrite every column of the row with the same id.
    async fn upsert_product(&self, product: &Product) -> AppResult<Product>;

    /// Returns whether a row existed.
    async fn delete_product(&self, id: &str) -> AppResult<bool>;

    // ── Movements ────────────────────────────────────────────────────────────

    /// Newest first.
    async fn list_movements(&self) -> AppResult<Vec<Movement>>;

    async fn find_movement(&self, id: &str) -> AppResult<Option<Movement>>;

    /// Append `movement` and apply its delta to the product balance as one
    /// unit. A missing product fails the unit and nothing is written; a second
    /// counter-movement for the same `reverses` id fails with `Conflict`.
    async fn commit_movement(&self, movement: &Movement) -> AppResult<()>;

    /// Removes the audit row only; the product balance is left as is.
    async fn delete_movement(&self, id: &str) -> AppResult<bool>;

    // ── Users ────────────────────────────────────────────────────────────────

    async fn list_users(&self) -> AppResult<Vec<UserRecord>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// Fails with `Conflict` when the email is already taken.
    async fn insert_user(&self, record: &UserRecord) -> AppResult<()>;

    async fn delete_user(&self, id: &str) -> AppResult<bool>;

    async fn set_user_role(&self, id: &str, role: Role) -> AppResult<bool>;

    async fn count_users(&self) -> AppResult<i64>;
}
