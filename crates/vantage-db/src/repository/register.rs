//! # Cash Register Repository
//!
//! Cash-affecting entries in a store's register session. The engine is a
//! *consumer* of this module: the only operation the sale lifecycle needs
//! is retracting entries keyed to a sale when that sale is cancelled.
//! The register's own open/close workflow lives elsewhere.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use vantage_core::RegisterEntry;

/// Repository for cash register entries.
#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    /// Creates a new RegisterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    /// Records a cash-affecting entry, optionally keyed to a sale.
    pub async fn record(
        &self,
        store_id: i64,
        sale_id: Option<&str>,
        kind: &str,
        amount_cents: i64,
        reason: Option<&str>,
    ) -> DbResult<RegisterEntry> {
        let entry = RegisterEntry {
            id: Uuid::new_v4().to_string(),
            store_id,
            sale_id: sale_id.map(str::to_string),
            kind: kind.to_string(),
            amount_cents,
            reason: reason.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO register_entries (id, store_id, sale_id, kind, amount_cents, reason, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&entry.id)
        .bind(entry.store_id)
        .bind(&entry.sale_id)
        .bind(&entry.kind)
        .bind(entry.amount_cents)
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Retracts every entry keyed to a sale. Returns how many went.
    ///
    /// Called best-effort during cancellation: zero rows is a normal
    /// outcome (most sales never touch the drawer).
    pub async fn retract_for_sale(&self, sale_id: &str) -> DbResult<u64> {
        debug!(sale_id = %sale_id, "Retracting register entries");

        let result = sqlx::query("DELETE FROM register_entries WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Lists entries keyed to a sale.
    pub async fn for_sale(&self, sale_id: &str) -> DbResult<Vec<RegisterEntry>> {
        let entries = sqlx::query_as::<_, RegisterEntry>(
            "SELECT id, store_id, sale_id, kind, amount_cents, reason, created_at \
             FROM register_entries \
             WHERE sale_id = ?1 \
             ORDER BY created_at, id",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
