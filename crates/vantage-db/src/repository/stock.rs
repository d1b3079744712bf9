//! # Stock Ledger Repository
//!
//! Per-(product, store) quantities with an append-only movement log.
//!
//! ## Two Ways Stock Changes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. ROW EVENTS (the ledger's own triggers)                              │
//! │     INSERT sale_items   → quantity -= item.quantity                     │
//! │     INSERT return_items → quantity += returned quantity                 │
//! │     The engine relies on these and must NOT repeat them.                │
//! │                                                                         │
//! │  2. EXPLICIT ADJUSTMENTS (this repository)                              │
//! │     edit: item removed          → adjust(+qty)                          │
//! │     edit: quantity changed      → adjust(−Δ)                            │
//! │     cancel: restore unreturned  → adjust(+to_restore)                   │
//! │                                                                         │
//! │  Both paths append a stock_movements row; only the explicit path        │
//! │  carries an actor.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomic Conditional Adjustment
//! "Read quantity, compute, write back" is check-then-act and loses
//! updates under concurrent writers. [`StockRepository::adjust`] is a
//! single conditional UPDATE (`WHERE quantity + delta >= 0`); the
//! negative-stock rejection happens in the storage layer, not in
//! application code.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use vantage_core::{StockLevel, StockMovement};

/// Repository for the stock ledger.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Reads a stock level row, if one exists for the pair.
    pub async fn level(&self, product_id: &str, store_id: i64) -> DbResult<Option<StockLevel>> {
        let level = sqlx::query_as::<_, StockLevel>(
            "SELECT product_id, store_id, quantity, updated_at, updated_by \
             FROM stock_levels \
             WHERE product_id = ?1 AND store_id = ?2",
        )
        .bind(product_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    /// Reads the available quantity; a missing row reads as zero.
    pub async fn quantity(&self, product_id: &str, store_id: i64) -> DbResult<i64> {
        Ok(self
            .level(product_id, store_id)
            .await?
            .map(|l| l.quantity)
            .unwrap_or(0))
    }

    /// Applies a signed adjustment atomically and appends a movement.
    ///
    /// ## Arguments
    /// * `delta` - negative deducts, positive restores
    /// * `reason` - human-readable movement explanation
    /// * `actor` - the operator driving the adjustment
    ///
    /// ## Errors
    /// [`DbError::InsufficientStock`] when the row is missing or the
    /// adjustment would take the quantity negative. Nothing is written
    /// in that case.
    pub async fn adjust(
        &self,
        product_id: &str,
        store_id: i64,
        delta: i64,
        reason: &str,
        actor: &str,
    ) -> DbResult<i64> {
        debug!(product_id = %product_id, store_id = %store_id, delta = %delta, "Adjusting stock");

        let now = Utc::now();

        // One statement decides: either the quantity survives the delta
        // and the write lands, or nothing happens.
        let result = sqlx::query(
            "UPDATE stock_levels SET \
                quantity = quantity + ?3, \
                updated_at = ?4, \
                updated_by = ?5 \
             WHERE product_id = ?1 AND store_id = ?2 AND quantity + ?3 >= 0",
        )
        .bind(product_id)
        .bind(store_id)
        .bind(delta)
        .bind(now)
        .bind(actor)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let available = self.quantity(product_id, store_id).await?;
            return Err(DbError::InsufficientStock {
                product_id: product_id.to_string(),
                store_id,
                available,
                requested: -delta,
            });
        }

        let after = self.quantity(product_id, store_id).await?;

        sqlx::query(
            "INSERT INTO stock_movements \
                (product_id, store_id, delta, quantity_before, quantity_after, reason, actor, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(product_id)
        .bind(store_id)
        .bind(delta)
        .bind(after - delta)
        .bind(after)
        .bind(reason)
        .bind(actor)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(after)
    }

    /// Receives stock into a store: upserts the level row and appends a
    /// movement. Used by goods-in flows and test setup, never by the
    /// sale reconciliation paths.
    pub async fn receive(
        &self,
        product_id: &str,
        store_id: i64,
        quantity: i64,
        reason: &str,
        actor: &str,
    ) -> DbResult<i64> {
        debug!(product_id = %product_id, store_id = %store_id, quantity = %quantity, "Receiving stock");

        let now = Utc::now();
        let before = self.quantity(product_id, store_id).await?;

        sqlx::query(
            "INSERT INTO stock_levels (product_id, store_id, quantity, updated_at, updated_by) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT (product_id, store_id) \
             DO UPDATE SET quantity = quantity + excluded.quantity, \
                           updated_at = excluded.updated_at, \
                           updated_by = excluded.updated_by",
        )
        .bind(product_id)
        .bind(store_id)
        .bind(quantity)
        .bind(now)
        .bind(actor)
        .execute(&self.pool)
        .await?;

        let after = before + quantity;

        sqlx::query(
            "INSERT INTO stock_movements \
                (product_id, store_id, delta, quantity_before, quantity_after, reason, actor, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(product_id)
        .bind(store_id)
        .bind(quantity)
        .bind(before)
        .bind(after)
        .bind(reason)
        .bind(actor)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(after)
    }

    /// Lists the movement log for a pair, oldest first.
    pub async fn movements(
        &self,
        product_id: &str,
        store_id: i64,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT id, product_id, store_id, delta, quantity_before, quantity_after, \
                    reason, actor, created_at \
             FROM stock_movements \
             WHERE product_id = ?1 AND store_id = ?2 \
             ORDER BY id",
        )
        .bind(product_id)
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}
