//! # Sale History Repository
//!
//! The append-only audit trail: one entry per semantically meaningful
//! mutation, in the order the operations narrate them.
//!
//! Appends are fire-and-forget from the engine's perspective: a failure
//! to log is surfaced with `warn!` by the caller but never fails the
//! primary operation. The table carries no foreign key to `sales`, so
//! the trail (including a "sale deleted" entry) survives hard deletes.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use vantage_core::{HistoryAction, HistoryEntry};

/// Repository for the per-sale history log.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    /// Creates a new HistoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        HistoryRepository { pool }
    }

    /// Appends one entry.
    pub async fn append(
        &self,
        sale_id: &str,
        action: HistoryAction,
        description: &str,
        actor: &str,
    ) -> DbResult<()> {
        debug!(sale_id = %sale_id, ?action, "Appending history entry");

        let now = Utc::now();

        sqlx::query(
            "INSERT INTO sale_history (sale_id, action, description, actor, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(sale_id)
        .bind(action)
        .bind(description)
        .bind(actor)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists a sale's history in append order.
    pub async fn for_sale(&self, sale_id: &str) -> DbResult<Vec<HistoryEntry>> {
        let entries = sqlx::query_as::<_, HistoryEntry>(
            "SELECT id, sale_id, action, description, actor, created_at \
             FROM sale_history \
             WHERE sale_id = ?1 \
             ORDER BY id",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
