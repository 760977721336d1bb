use serde::{Deserialize, Serialize};

/// Catalog entry. `id` is chosen by the client and acts as the upsert key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub codigo: String,
    pub nombre: String,
    /// May go negative: nothing floors it.
    #[serde(default)]
    pub stock_actual: i32,
    #[serde(default)]
    pub stock_minimo: i32,
    #[serde(default)]
    pub precio: f64,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock_actual <= self.stock_minimo
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock_actual <= 0
    }
}
