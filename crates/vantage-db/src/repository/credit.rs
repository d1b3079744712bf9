//! # Customer Credit Ledger Repository
//!
//! Store-credit grants: created by returns, consumed FIFO by payments.
//!
//! The FIFO *decision* is pure ([`vantage_core::credit::allocate_fifo`]);
//! this repository only loads the ordered grants and applies the
//! resulting consumptions.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vantage_core::CustomerCredit;

/// Repository for the customer credit ledger.
#[derive(Debug, Clone)]
pub struct CreditRepository {
    pool: SqlitePool,
}

impl CreditRepository {
    /// Creates a new CreditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CreditRepository { pool }
    }

    /// Lists a customer's grants with remaining balance, oldest first.
    ///
    /// The ordering IS the consumption contract: first granted, first
    /// spent.
    pub async fn active_grants(&self, customer_id: &str) -> DbResult<Vec<CustomerCredit>> {
        let grants = sqlx::query_as::<_, CustomerCredit>(
            "SELECT id, customer_id, origin_sale_id, origin_return_id, \
                    total_cents, used_cents, remaining_cents, reason, granted_by, created_at \
             FROM customer_credits \
             WHERE customer_id = ?1 AND remaining_cents > 0 \
             ORDER BY created_at, id",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    /// Lists every grant a customer ever received, newest first.
    pub async fn all_for_customer(&self, customer_id: &str) -> DbResult<Vec<CustomerCredit>> {
        let grants = sqlx::query_as::<_, CustomerCredit>(
            "SELECT id, customer_id, origin_sale_id, origin_return_id, \
                    total_cents, used_cents, remaining_cents, reason, granted_by, created_at \
             FROM customer_credits \
             WHERE customer_id = ?1 \
             ORDER BY created_at DESC, id",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    /// Consumes part of one grant's remaining balance.
    ///
    /// Conditional on the balance still covering the amount, so a racing
    /// consumer cannot drive `remaining_cents` negative; the
    /// `remaining = total − used` CHECK backstops the arithmetic.
    pub async fn consume(&self, credit_id: &str, amount_cents: i64) -> DbResult<()> {
        debug!(credit_id = %credit_id, amount = %amount_cents, "Consuming credit");

        let result = sqlx::query(
            "UPDATE customer_credits SET \
                used_cents = used_cents + ?2, \
                remaining_cents = remaining_cents - ?2 \
             WHERE id = ?1 AND remaining_cents >= ?2",
        )
        .bind(credit_id)
        .bind(amount_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CustomerCredit (with balance)", credit_id));
        }

        Ok(())
    }

    /// Creates a grant and returns it.
    pub async fn grant(
        &self,
        customer_id: &str,
        total_cents: i64,
        origin_sale_id: Option<&str>,
        origin_return_id: Option<&str>,
        reason: Option<&str>,
        granted_by: &str,
    ) -> DbResult<CustomerCredit> {
        let credit = CustomerCredit {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            origin_sale_id: origin_sale_id.map(str::to_string),
            origin_return_id: origin_return_id.map(str::to_string),
            total_cents,
            used_cents: 0,
            remaining_cents: total_cents,
            reason: reason.map(str::to_string),
            granted_by: granted_by.to_string(),
            created_at: Utc::now(),
        };

        debug!(customer_id = %customer_id, total = %total_cents, "Granting store credit");

        sqlx::query(
            "INSERT INTO customer_credits ( \
                id, customer_id, origin_sale_id, origin_return_id, \
                total_cents, used_cents, remaining_cents, reason, granted_by, created_at \
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&credit.id)
        .bind(&credit.customer_id)
        .bind(&credit.origin_sale_id)
        .bind(&credit.origin_return_id)
        .bind(credit.total_cents)
        .bind(credit.used_cents)
        .bind(credit.remaining_cents)
        .bind(&credit.reason)
        .bind(&credit.granted_by)
        .bind(credit.created_at)
        .execute(&self.pool)
        .await?;

        Ok(credit)
    }
}
