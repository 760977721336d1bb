use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::Store;
use crate::error::{AppError, AppResult};
use crate::models::*;

/// In-process stand-in for [`super::PgStore`]. One mutex over all state gives
/// every call the same all-or-nothing behaviour as a database transaction.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    products: HashMap<String, Product>,
    movements: Vec<Movement>,
    users: Vec<UserRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().await;
            for p in products {
                state.products.insert(p.id.clone(), p);
            }
        }
        store
    }
}

fn newest_first(movements: &mut [Movement]) {
    movements.sort_by(|a, b| b.fecha.cmp(&a.fecha).then_with(|| b.id.cmp(&a.id)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.nombre.cmp(&b.nombre).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn find_product(&self, id: &str) -> AppResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(id).cloned())
    }

    async fn upsert_product(&self, product: &Product) -> AppResult<Product> {
        let mut state = self.state.lock().await;
        state.products.insert(product.id.clone(), product.clone());
        Ok(product.clone())
    }

    async fn delete_product(&self, id: &str) -> AppResult<bool> {
        Ok(self.state.lock().await.products.remove(id).is_some())
    }

    async fn list_movements(&self) -> AppResult<Vec<Movement>> {
        let mut movements = self.state.lock().await.movements.clone();
        newest_first(&mut movements);
        Ok(movements)
    }

    async fn find_movement(&self, id: &str) -> AppResult<Option<Movement>> {
        let state = self.state.lock().await;
        Ok(state.movements.iter().find(|m| m.id == id).cloned())
    }

    async fn commit_movement(&self, movement: &Movement) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(original) = &movement.reverses {
            if state.movements.iter().any(|m| m.reverses.as_ref() == Some(original)) {
                return Err(AppError::Conflict(format!(
                    "Movement {} was already reversed",
                    original
                )));
            }
        }
        let product = state.products.get_mut(&movement.producto_id).ok_or_else(|| {
            AppError::NotFound(format!("Product {} not found", movement.producto_id))
        })?;
        product.stock_actual = product
            .stock_actual
            .checked_add(movement.tipo.delta(movement.cantidad))
            .ok_or_else(|| AppError::BadRequest("stock_actual out of range".to_string()))?;
        state.movements.push(movement.clone());
        Ok(())
    }

    async fn delete_movement(&self, id: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.movements.len();
        state.movements.retain(|m| m.id != id);
        Ok(state.movements.len() < before)
    }

    async fn list_users(&self) -> AppResult<Vec<UserRecord>> {
        let mut users = self.state.lock().await.users.clone();
        users.sort_by(|a, b| a.user.nombre.cmp(&b.user.nombre));
        Ok(users)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.user.email == email).cloned())
    }

    async fn insert_user(&self, record: &UserRecord) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.user.email == record.user.email) {
            return Err(AppError::Conflict(format!(
                "User {} already exists",
                record.user.email
            )));
        }
        state.users.push(record.clone());
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.users.len();
        state.users.retain(|u| u.user.id != id);
        Ok(state.users.len() < before)
    }

    async fn set_user_role(&self, id: &str, role: Role) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.users.iter_mut().find(|u| u.user.id == id) {
            Some(record) => {
                record.user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_users(&self) -> AppResult<i64> {
        Ok(self.state.lock().await.users.len() as i64)
    }
}
