use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::Store;
use crate::error::{AppError, AppResult};
use crate::models::*;

const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(e) => e.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    // ── Products ──────────────────────────────────────────────────────────────

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, codigo, nombre, stock_actual, stock_minimo, precio
             FROM products ORDER BY nombre ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn find_product(&self, id: &str) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, codigo, nombre, stock_actual, stock_minimo, precio
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn upsert_product(&self, product: &Product) -> AppResult<Product> {
        let stored = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, codigo, nombre, stock_actual, stock_minimo, precio)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET codigo       = EXCLUDED.codigo,
                nombre       = EXCLUDED.nombre,
                stock_actual = EXCLUDED.stock_actual,
                stock_minimo = EXCLUDED.stock_minimo,
                precio       = EXCLUDED.precio
            RETURNING id, codigo, nombre, stock_actual, stock_minimo, precio
            "#,
        )
        .bind(&product.id)
        .bind(&product.codigo)
        .bind(&product.nombre)
        .bind(product.stock_actual)
        .bind(product.stock_minimo)
        .bind(product.precio)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn delete_product(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ── Movements ─────────────────────────────────────────────────────────────

    async fn list_movements(&self) -> AppResult<Vec<Movement>> {
        let movements = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, fecha, producto_id, producto_nombre, tipo, cantidad, motivo, usuario, reverses
            FROM movements
            ORDER BY fecha DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    async fn find_movement(&self, id: &str) -> AppResult<Option<Movement>> {
        let movement = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, fecha, producto_id, producto_nombre, tipo, cantidad, motivo, usuario, reverses
            FROM movements WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement)
    }

    async fn commit_movement(&self, movement: &Movement) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO movements
                (id, fecha, producto_id, producto_nombre, tipo, cantidad, motivo, usuario, reverses)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&movement.id)
        .bind(movement.fecha)
        .bind(&movement.producto_id)
        .bind(&movement.producto_nombre)
        .bind(movement.tipo.as_str())
        .bind(movement.cantidad)
        .bind(&movement.motivo)
        .bind(&movement.usuario)
        .bind(&movement.reverses)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &movement.reverses {
            Some(original) if is_unique_violation(&e) => {
                AppError::Conflict(format!("Movement {} was already reversed", original))
            }
            _ => e.into(),
        })?;

        // The UPDATE takes the row lock, so concurrent movements on one
        // product apply their deltas one after the other.
        let adjusted = sqlx::query(
            "UPDATE products SET stock_actual = stock_actual + $1 WHERE id = $2",
        )
        .bind(movement.tipo.delta(movement.cantidad))
        .bind(&movement.producto_id)
        .execute(&mut *tx)
        .await?;

        if adjusted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!(
                "Product {} not found",
                movement.producto_id
            )));
        }

        tx.commit().await?;
        debug!(id = %movement.id, producto_id = %movement.producto_id, "Movement committed");
        Ok(())
    }

    async fn delete_movement(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM movements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ── Users ─────────────────────────────────────────────────────────────────

    async fn list_users(&self) -> AppResult<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(
            "SELECT id, nombre, email, role, avatar, password_hash, password_salt
             FROM users ORDER BY nombre ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, nombre, email, role, avatar, password_hash, password_salt
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert_user(&self, record: &UserRecord) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, nombre, email, role, avatar, password_hash, password_salt)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&record.user.id)
        .bind(&record.user.nombre)
        .bind(&record.user.email)
        .bind(record.user.role.as_str())
        .bind(&record.user.avatar)
        .bind(&record.password_hash)
        .bind(&record.password_salt)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(format!(
                "User {} already exists",
                record.user.email
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_user(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_user_role(&self, id: &str, role: Role) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_users(&self) -> AppResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
