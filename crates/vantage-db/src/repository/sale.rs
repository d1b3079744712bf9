//! # Sale Repository
//!
//! Database operations for the sale aggregate: sales, line items,
//! payments, discounts, and returns.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert_sale() → Sale { status: InProgress, totals: 0 }         │
//! │                                                                         │
//! │  2. BUILD                                                              │
//! │     └── insert_item()     → trigger deducts stock                      │
//! │     └── insert_payment()                                               │
//! │     └── update_totals()   → persist the recomputed tuple               │
//! │                                                                         │
//! │  3. COMPLETE                                                           │
//! │     └── mark_completed() → Sale { status: Completed }                  │
//! │                                                                         │
//! │  4. (OPTIONAL) CANCEL / RETURN                                         │
//! │     └── cancel() zeroes payment bookkeeping                            │
//! │     └── insert_return() + insert_return_item() → trigger restores      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inserting a sale item row deducts stock through the ledger trigger;
//! nothing in this repository adjusts stock directly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vantage_core::totals::SaleTotals;
use vantage_core::{
    Discount, Payment, PaymentMethod, ReturnItem, Sale, SaleItem, SaleKind, SaleReturn,
    SaleStatus,
};

const SALE_COLUMNS: &str = "id, display_number, customer_id, store_id, seller_id, \
     status, kind, due_date, total_cents, discount_cents, paid_cents, balance_cents, \
     created_at, updated_at, completed_at, completed_by";

/// Filters for listing sales. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFilter {
    pub customer_id: Option<String>,
    pub seller_id: Option<String>,
    pub store_id: Option<i64>,
    pub status: Option<SaleStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// Repository for sale aggregate database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Numbering
    // =========================================================================

    /// Claims the next sequential display number.
    ///
    /// ## Why a Counter Row?
    /// `SELECT MAX(display_number) + 1` followed by an INSERT is a race:
    /// two concurrent creates would claim the same number. A single
    /// `UPDATE ... RETURNING` claims atomically. Numbers are never reused;
    /// gaps from deleted sales are acceptable.
    pub async fn next_display_number(&self) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar(
            "UPDATE counters SET value = value + 1 \
             WHERE name = 'sale_display_number' \
             RETURNING value",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Inserts a new sale row.
    pub async fn insert_sale(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, display_number = %sale.display_number, "Inserting sale");

        sqlx::query(
            "INSERT INTO sales ( \
                id, display_number, customer_id, store_id, seller_id, \
                status, kind, due_date, \
                total_cents, discount_cents, paid_cents, balance_cents, \
                created_at, updated_at, completed_at, completed_by \
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&sale.id)
        .bind(sale.display_number)
        .bind(&sale.customer_id)
        .bind(sale.store_id)
        .bind(&sale.seller_id)
        .bind(sale.status)
        .bind(sale.kind)
        .bind(sale.due_date)
        .bind(sale.total_cents)
        .bind(sale.discount_cents)
        .bind(sale.paid_cents)
        .bind(sale.balance_cents)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.completed_at)
        .bind(&sale.completed_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Lists sales matching the filter, newest first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sales WHERE 1=1"));

        if let Some(customer_id) = &filter.customer_id {
            builder.push(" AND customer_id = ").push_bind(customer_id);
        }
        if let Some(seller_id) = &filter.seller_id {
            builder.push(" AND seller_id = ").push_bind(seller_id);
        }
        if let Some(store_id) = filter.store_id {
            builder.push(" AND store_id = ").push_bind(store_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = filter.created_from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.created_to {
            builder.push(" AND created_at <= ").push_bind(to);
        }

        builder.push(" ORDER BY created_at DESC");

        let sales = builder
            .build_query_as::<Sale>()
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Persists a recomputed totals tuple onto the sale row.
    ///
    /// ## When To Call
    /// After any mutation of the sale's items, payments, or discounts.
    pub async fn update_totals(&self, sale_id: &str, totals: &SaleTotals) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE sales SET \
                total_cents = ?2, \
                discount_cents = ?3, \
                paid_cents = ?4, \
                balance_cents = ?5, \
                updated_at = ?6 \
             WHERE id = ?1",
        )
        .bind(sale_id)
        .bind(totals.total_cents)
        .bind(totals.discount_cents)
        .bind(totals.paid_cents)
        .bind(totals.balance_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    /// Marks an in-progress sale as completed.
    pub async fn mark_completed(&self, sale_id: &str, completed_by: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE sales SET \
                status = 'completed', \
                completed_at = ?2, \
                completed_by = ?3, \
                updated_at = ?2 \
             WHERE id = ?1 AND status = 'in_progress'",
        )
        .bind(sale_id)
        .bind(now)
        .bind(completed_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale (in progress)", sale_id));
        }

        Ok(())
    }

    /// Moves a sale to `cancelled`, voiding collected-payment bookkeeping.
    ///
    /// Cancellation does not itself issue refunds; it only zeroes the
    /// sale-level payment figures. Stock restoration happens before this
    /// through explicit ledger adjustments.
    pub async fn cancel(&self, sale_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE sales SET \
                status = 'cancelled', \
                paid_cents = 0, \
                balance_cents = 0, \
                updated_at = ?2 \
             WHERE id = ?1 AND status != 'cancelled'",
        )
        .bind(sale_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    /// Sets a sale's status without touching any other field.
    pub async fn set_status(&self, sale_id: &str, status: SaleStatus) -> DbResult<()> {
        let now = Utc::now();

        let result =
            sqlx::query("UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(sale_id)
                .bind(status)
                .bind(now)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    /// Applies the post-edit state: kind, due date, totals, and the
    /// inferred status, in one statement.
    pub async fn update_after_edit(
        &self,
        sale_id: &str,
        kind: SaleKind,
        due_date: Option<NaiveDate>,
        totals: &SaleTotals,
        status: SaleStatus,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE sales SET \
                kind = ?2, \
                due_date = ?3, \
                total_cents = ?4, \
                discount_cents = ?5, \
                paid_cents = ?6, \
                balance_cents = ?7, \
                status = ?8, \
                updated_at = ?9 \
             WHERE id = ?1",
        )
        .bind(sale_id)
        .bind(kind)
        .bind(due_date)
        .bind(totals.total_cents)
        .bind(totals.discount_cents)
        .bind(totals.paid_cents)
        .bind(totals.balance_cents)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    /// Hard-deletes a sale. Items, payments, discounts, and returns go
    /// with it via ON DELETE CASCADE; the history log survives.
    pub async fn delete(&self, sale_id: &str) -> DbResult<()> {
        debug!(id = %sale_id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Adds a line item to a sale.
    ///
    /// ## Side Effect (by design)
    /// The ledger trigger deducts `(product, store)` stock the moment this
    /// row lands and appends a movement. An overdraw trips the ledger's
    /// CHECK and the whole insert fails; see [`DbError::is_stock_overdraw`].
    pub async fn insert_item(&self, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Adding sale item");

        sqlx::query(
            "INSERT INTO sale_items ( \
                id, sale_id, product_id, product_name, product_code, \
                quantity, unit_price_cents, subtotal_cents, \
                discount_kind, discount_value, discount_cents, \
                returned_quantity, created_at \
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(&item.product_code)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .bind(item.discount_kind)
        .bind(item.discount_value)
        .bind(item.discount_cents)
        .bind(item.returned_quantity)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets all items for a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT id, sale_id, product_id, product_name, product_code, \
                    quantity, unit_price_cents, subtotal_cents, \
                    discount_kind, discount_value, discount_cents, \
                    returned_quantity, created_at \
             FROM sale_items \
             WHERE sale_id = ?1 \
             ORDER BY created_at, id",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets a single item by ID.
    pub async fn get_item(&self, item_id: &str) -> DbResult<Option<SaleItem>> {
        let item = sqlx::query_as::<_, SaleItem>(
            "SELECT id, sale_id, product_id, product_name, product_code, \
                    quantity, unit_price_cents, subtotal_cents, \
                    discount_kind, discount_value, discount_cents, \
                    returned_quantity, created_at \
             FROM sale_items \
             WHERE id = ?1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Rewrites an item's mutable fields (quantity, price, subtotal,
    /// discount). No trigger fires on UPDATE: any stock effect of a
    /// quantity change was already applied through an explicit adjustment.
    pub async fn update_item(&self, item: &SaleItem) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE sale_items SET \
                quantity = ?2, \
                unit_price_cents = ?3, \
                subtotal_cents = ?4, \
                discount_kind = ?5, \
                discount_value = ?6, \
                discount_cents = ?7 \
             WHERE id = ?1",
        )
        .bind(&item.id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .bind(item.discount_kind)
        .bind(item.discount_value)
        .bind(item.discount_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SaleItem", &item.id));
        }

        Ok(())
    }

    /// Deletes a single item row. No stock effect: the caller restores
    /// stock explicitly before calling this.
    pub async fn delete_item(&self, item_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sale_items WHERE id = ?1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SaleItem", item_id));
        }

        Ok(())
    }

    /// Increments an item's returned quantity.
    ///
    /// The `returned_quantity <= quantity` CHECK backstops the engine's
    /// own validation.
    pub async fn add_returned_quantity(&self, item_id: &str, quantity: i64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE sale_items SET returned_quantity = returned_quantity + ?2 WHERE id = ?1",
        )
        .bind(item_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SaleItem", item_id));
        }

        Ok(())
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Records a payment for a sale.
    pub async fn insert_payment(&self, payment: &Payment) -> DbResult<()> {
        debug!(sale_id = %payment.sale_id, amount = %payment.amount_cents, "Recording payment");

        sqlx::query(
            "INSERT INTO payments ( \
                id, sale_id, method, amount_cents, paid_on, note, \
                created_at, created_by, edited, edited_at, edited_by \
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&payment.id)
        .bind(&payment.sale_id)
        .bind(payment.method)
        .bind(payment.amount_cents)
        .bind(payment.paid_on)
        .bind(&payment.note)
        .bind(payment.created_at)
        .bind(&payment.created_by)
        .bind(payment.edited)
        .bind(payment.edited_at)
        .bind(&payment.edited_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets all payments for a sale, oldest first.
    pub async fn get_payments(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT id, sale_id, method, amount_cents, paid_on, note, \
                    created_at, created_by, edited, edited_at, edited_by \
             FROM payments \
             WHERE sale_id = ?1 \
             ORDER BY created_at, id",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Gets a single payment by ID.
    pub async fn get_payment(&self, payment_id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT id, sale_id, method, amount_cents, paid_on, note, \
                    created_at, created_by, edited, edited_at, edited_by \
             FROM payments \
             WHERE id = ?1",
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Deletes every payment on a sale. Returns how many went.
    pub async fn delete_payments(&self, sale_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM payments WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Counts payments on a sale (the hard-delete guard).
    pub async fn count_payments(&self, sale_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Re-tags a payment's method, stamping the editor audit fields.
    pub async fn retag_payment(
        &self,
        payment_id: &str,
        method: PaymentMethod,
        edited_by: &str,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE payments SET \
                method = ?2, \
                edited = 1, \
                edited_at = ?3, \
                edited_by = ?4 \
             WHERE id = ?1",
        )
        .bind(payment_id)
        .bind(method)
        .bind(now)
        .bind(edited_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", payment_id));
        }

        Ok(())
    }

    // =========================================================================
    // Discounts
    // =========================================================================

    /// Records a sale-level discount.
    pub async fn insert_discount(&self, discount: &Discount) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO discounts (id, sale_id, kind, value, reason, applied_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&discount.id)
        .bind(&discount.sale_id)
        .bind(discount.kind)
        .bind(discount.value)
        .bind(&discount.reason)
        .bind(&discount.applied_by)
        .bind(&discount.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets all sale-level discounts, oldest first.
    pub async fn get_discounts(&self, sale_id: &str) -> DbResult<Vec<Discount>> {
        let discounts = sqlx::query_as::<_, Discount>(
            "SELECT id, sale_id, kind, value, reason, applied_by, created_at \
             FROM discounts \
             WHERE sale_id = ?1 \
             ORDER BY created_at, id",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(discounts)
    }

    /// Deletes every sale-level discount on a sale.
    pub async fn delete_discounts(&self, sale_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM discounts WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Records a return header.
    pub async fn insert_return(&self, sale_return: &SaleReturn) -> DbResult<()> {
        debug!(sale_id = %sale_return.sale_id, total = %sale_return.total_cents, "Recording return");

        sqlx::query(
            "INSERT INTO sale_returns ( \
                id, sale_id, kind, total_cents, refund_method, reason, processed_by, created_at \
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&sale_return.id)
        .bind(&sale_return.sale_id)
        .bind(sale_return.kind)
        .bind(sale_return.total_cents)
        .bind(sale_return.refund_method)
        .bind(&sale_return.reason)
        .bind(&sale_return.processed_by)
        .bind(sale_return.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records one returned line.
    ///
    /// ## Side Effect (by design)
    /// The ledger trigger restores the originating item's stock and
    /// appends a movement the moment this row lands.
    pub async fn insert_return_item(&self, item: &ReturnItem) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO return_items (id, return_id, sale_item_id, quantity, reason, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&item.id)
        .bind(&item.return_id)
        .bind(&item.sale_item_id)
        .bind(item.quantity)
        .bind(&item.reason)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets all returns for a sale, newest first.
    pub async fn get_returns(&self, sale_id: &str) -> DbResult<Vec<SaleReturn>> {
        let returns = sqlx::query_as::<_, SaleReturn>(
            "SELECT id, sale_id, kind, total_cents, refund_method, reason, processed_by, created_at \
             FROM sale_returns \
             WHERE sale_id = ?1 \
             ORDER BY created_at DESC, id",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(returns)
    }

    /// Gets the lines of one return.
    pub async fn get_return_items(&self, return_id: &str) -> DbResult<Vec<ReturnItem>> {
        let items = sqlx::query_as::<_, ReturnItem>(
            "SELECT id, return_id, sale_item_id, quantity, reason, created_at \
             FROM return_items \
             WHERE return_id = ?1 \
             ORDER BY created_at, id",
        )
        .bind(return_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

/// Generates a new entity ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
