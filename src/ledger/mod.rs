//! Stock-movement ledger: every stock change that keeps the balance invariant
//! goes through [`record_movement`].

use chrono::{SubsecRound, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::Store;
use crate::error::{AppError, AppResult};
use crate::models::{Movement, NewMovement};

/// Snapshot name used when neither the request nor the catalog provides one.
pub const FALLBACK_PRODUCT_NAME: &str = "Desconocido";

/// Append a movement and apply its delta to the product as one unit.
///
/// The name snapshot is resolved before the unit starts. If the product is
/// gone by the time the unit runs, the whole unit rolls back and the caller
/// gets [`AppError::Aborted`].
pub async fn record_movement(store: &dyn Store, request: NewMovement) -> AppResult<Movement> {
    commit(store, request, None).await
}

async fn commit(
    store: &dyn Store,
    request: NewMovement,
    reverses: Option<String>,
) -> AppResult<Movement> {
    let NewMovement {
        producto_id,
        producto_nombre,
        tipo,
        cantidad,
        motivo,
        usuario,
    } = request;

    if cantidad <= 0 {
        return Err(AppError::BadRequest("cantidad must be > 0".to_string()));
    }
    if producto_id.trim().is_empty() {
        return Err(AppError::BadRequest("productoId must not be empty".to_string()));
    }

    let producto_nombre = match producto_nombre.filter(|n| !n.trim().is_empty()) {
        Some(nombre) => nombre,
        None => store
            .find_product(&producto_id)
            .await?
            .map(|p| p.nombre)
            .unwrap_or_else(|| FALLBACK_PRODUCT_NAME.to_string()),
    };

    // Postgres keeps microseconds; trim here so the returned row matches the stored one.
    let movement = Movement {
        id: Uuid::new_v4().to_string(),
        fecha: Utc::now().trunc_subsecs(6),
        producto_id,
        producto_nombre,
        tipo,
        cantidad,
        motivo,
        usuario,
        reverses,
    };

    if let Err(e) = store.commit_movement(&movement).await {
        warn!(
            producto_id = %movement.producto_id,
            tipo = %movement.tipo,
            cantidad = movement.cantidad,
            error = %e,
            "Movement rolled back"
        );
        return match e {
            AppError::Conflict(_) => Err(e),
            other => Err(AppError::Aborted(other.to_string())),
        };
    }

    info!(
        id = %movement.id,
        producto_id = %movement.producto_id,
        tipo = %movement.tipo,
        cantidad = movement.cantidad,
        "Recorded movement"
    );

    Ok(movement)
}

/// Undo the stock effect of `id` by recording an opposite movement. The
/// original row stays in the audit trail.
///
/// A movement can be reversed once, and counter-movements themselves cannot be
/// reversed; both cases fail with [`AppError::Conflict`].
pub async fn reverse_movement(store: &dyn Store, id: &str, usuario: String) -> AppResult<Movement> {
    let original = store
        .find_movement(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movement {} not found", id)))?;

    if let Some(target) = &original.reverses {
        return Err(AppError::Conflict(format!(
            "Movement {} is the reversal of {} and cannot be reversed",
            original.id, target
        )));
    }

    commit(
        store,
        NewMovement {
            producto_id: original.producto_id,
            producto_nombre: Some(original.producto_nombre),
            tipo: original.tipo.opposite(),
            cantidad: original.cantidad,
            motivo: format!("Reversión del movimiento {}", original.id),
            usuario,
        },
        Some(original.id),
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::{MovementKind, Product};

    fn product(id: &str, stock_actual: i32, stock_minimo: i32) -> Product {
        Product {
            id: id.to_string(),
            codigo: format!("C-{}", id),
            nombre: format!("Producto {}", id),
            stock_actual,
            stock_minimo,
            precio: 100.0,
        }
    }

    fn request(producto_id: &str, tipo: MovementKind, cantidad: i32) -> NewMovement {
        NewMovement {
            producto_id: producto_id.to_string(),
            producto_nombre: None,
            tipo,
            cantidad,
            motivo: "Ingreso de mercadería".to_string(),
            usuario: "Administrador".to_string(),
        }
    }

    async fn stock_of(store: &MemoryStore, id: &str) -> i32 {
        store.find_product(id).await.unwrap().unwrap().stock_actual
    }

    #[tokio::test]
    async fn salida_decrements_stock_and_appends_one_row() {
        let store = MemoryStore::with_products([product("p1", 10, 5)]).await;

        let movement = record_movement(&store, request("p1", MovementKind::Salida, 3))
            .await
            .unwrap();

        assert_eq!(stock_of(&store, "p1").await, 7);
        let movements = store.list_movements().await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].tipo, MovementKind::Salida);
        assert_eq!(movements[0].cantidad, 3);
        assert_eq!(movements[0], movement);
    }

    #[tokio::test]
    async fn final_stock_is_initial_plus_entries_minus_exits() {
        let store = MemoryStore::with_products([product("p1", 4, 0)]).await;
        let sequence = [
            (MovementKind::Entrada, 10),
            (MovementKind::Salida, 3),
            (MovementKind::Salida, 12),
            (MovementKind::Entrada, 1),
        ];

        for (tipo, cantidad) in sequence {
            record_movement(&store, request("p1", tipo, cantidad)).await.unwrap();
        }

        // 4 + 10 - 3 - 12 + 1; negative balances are allowed on the way.
        assert_eq!(stock_of(&store, "p1").await, 0);
        assert_eq!(store.list_movements().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn unknown_product_is_rejected_without_writing() {
        let store = MemoryStore::with_products([product("p1", 10, 5)]).await;

        let err = record_movement(&store, request("ghost", MovementKind::Entrada, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Aborted(_)));
        assert!(store.list_movements().await.unwrap().is_empty());
        assert_eq!(stock_of(&store, "p1").await, 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_entries_on_one_product_both_apply() {
        let store = Arc::new(MemoryStore::with_products([product("p1", 0, 0)]).await);

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                record_movement(store.as_ref(), request("p1", MovementKind::Entrada, 5)).await
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                record_movement(store.as_ref(), request("p1", MovementKind::Entrada, 5)).await
            })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(stock_of(&store, "p1").await, 10);
    }

    #[tokio::test]
    async fn deleting_a_movement_keeps_the_stock_effect() {
        let store = MemoryStore::with_products([product("p1", 10, 5)]).await;
        let movement = record_movement(&store, request("p1", MovementKind::Salida, 4))
            .await
            .unwrap();

        assert!(store.delete_movement(&movement.id).await.unwrap());

        assert!(store.list_movements().await.unwrap().is_empty());
        assert_eq!(stock_of(&store, "p1").await, 6);
    }

    #[tokio::test]
    async fn reversal_restores_stock_and_keeps_both_rows() {
        let store = MemoryStore::with_products([product("p1", 10, 5)]).await;
        let original = record_movement(&store, request("p1", MovementKind::Salida, 4))
            .await
            .unwrap();

        let counter = reverse_movement(&store, &original.id, "Supervisor".to_string())
            .await
            .unwrap();

        assert_eq!(counter.tipo, MovementKind::Entrada);
        assert_eq!(counter.cantidad, 4);
        assert!(counter.motivo.contains(&original.id));
        assert_eq!(stock_of(&store, "p1").await, 10);
        assert_eq!(store.list_movements().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn a_movement_can_only_be_reversed_once() {
        let store = MemoryStore::with_products([product("p1", 10, 5)]).await;
        let original = record_movement(&store, request("p1", MovementKind::Salida, 4))
            .await
            .unwrap();

        let counter = reverse_movement(&store, &original.id, "Supervisor".to_string())
            .await
            .unwrap();
        assert_eq!(counter.reverses.as_deref(), Some(original.id.as_str()));

        let err = reverse_movement(&store, &original.id, "Supervisor".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(stock_of(&store, "p1").await, 10);
        assert_eq!(store.list_movements().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn counter_movements_cannot_be_reversed() {
        let store = MemoryStore::with_products([product("p1", 10, 5)]).await;
        let original = record_movement(&store, request("p1", MovementKind::Entrada, 3))
            .await
            .unwrap();
        let counter = reverse_movement(&store, &original.id, String::new())
            .await
            .unwrap();

        let err = reverse_movement(&store, &counter.id, String::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(stock_of(&store, "p1").await, 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_reversals_apply_only_once() {
        let store = Arc::new(MemoryStore::with_products([product("p1", 10, 0)]).await);
        let original = record_movement(store.as_ref(), request("p1", MovementKind::Salida, 4))
            .await
            .unwrap();

        let spawn_reverse = || {
            let store = store.clone();
            let id = original.id.clone();
            tokio::spawn(async move { reverse_movement(store.as_ref(), &id, String::new()).await })
        };
        let (a, b) = (spawn_reverse(), spawn_reverse());
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict(_)))));
        assert_eq!(stock_of(&store, "p1").await, 10);
    }

    #[tokio::test]
    async fn reversing_an_unknown_movement_is_not_found() {
        let store = MemoryStore::new();
        let err = reverse_movement(&store, "nope", String::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected_before_storage() {
        let store = MemoryStore::with_products([product("p1", 10, 5)]).await;

        for cantidad in [0, -3] {
            let err = record_movement(&store, request("p1", MovementKind::Entrada, cantidad))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
        assert_eq!(stock_of(&store, "p1").await, 10);
    }

    #[tokio::test]
    async fn name_snapshot_survives_a_later_rename() {
        let store = MemoryStore::with_products([product("p1", 10, 5)]).await;
        record_movement(&store, request("p1", MovementKind::Entrada, 1)).await.unwrap();

        let mut renamed = store.find_product("p1").await.unwrap().unwrap();
        renamed.nombre = "Nombre nuevo".to_string();
        store.upsert_product(&renamed).await.unwrap();

        let movements = store.list_movements().await.unwrap();
        assert_eq!(movements[0].producto_nombre, "Producto p1");
    }

    #[tokio::test]
    async fn client_supplied_name_wins_over_catalog() {
        let store = MemoryStore::with_products([product("p1", 10, 5)]).await;
        let mut req = request("p1", MovementKind::Entrada, 1);
        req.producto_nombre = Some("Resma (caja)".to_string());

        let movement = record_movement(&store, req).await.unwrap();
        assert_eq!(movement.producto_nombre, "Resma (caja)");
    }
}
