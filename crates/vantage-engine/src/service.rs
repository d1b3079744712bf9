//! # Sale Service
//!
//! The engine's public surface and its building-block operations:
//! create, add item, add payment, apply discount, finalize, delete,
//! list, and full-aggregate reads. The heavier reconciliation paths
//! live next door: [`crate::edit`], [`crate::cancel`], [`crate::returns`].

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use vantage_core::totals::{compute_totals_from_rows, SaleTotals};
use vantage_core::validation::{validate_discount, validate_new_item, validate_payment_amount};
use vantage_core::{
    credit::allocate_fifo, Discount, DiscountKind, HistoryAction, HistoryEntry, Money,
    NewSaleItem, Payment, PaymentMethod, Sale, SaleItem, SaleKind, SaleReturn, SaleStatus,
    ValidationError,
};
use vantage_db::repository::sale::SaleFilter;
use vantage_db::Database;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Input for creating a sale. Customer/store/seller existence is the
/// caller's collaborator's concern; this engine only requires them to be
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSaleRequest {
    pub customer_id: String,
    pub store_id: i64,
    pub seller_id: String,
    pub kind: SaleKind,
    /// Expected settlement date; only meaningful for deferred sales.
    pub due_date: Option<NaiveDate>,
}

/// A payment as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub method: PaymentMethod,
    pub amount_cents: i64,
    /// Business date; defaults to today when absent.
    pub paid_on: Option<NaiveDate>,
    pub note: Option<String>,
}

/// A sale-level discount as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiscount {
    pub kind: DiscountKind,
    /// Cents for flat, basis points for percent.
    pub value: i64,
    pub reason: Option<String>,
}

/// A return header together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnWithItems {
    pub header: SaleReturn,
    pub items: Vec<vantage_core::ReturnItem>,
}

/// The full sale aggregate: everything a detail view needs in one read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payments: Vec<Payment>,
    pub discounts: Vec<Discount>,
    pub returns: Vec<ReturnWithItems>,
    pub history: Vec<HistoryEntry>,
}

// =============================================================================
// Sale Service
// =============================================================================

/// The sale lifecycle engine.
///
/// Cheap to clone; all state lives in the database handle.
#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
}

impl SaleService {
    /// Creates a new service over an initialized database.
    pub fn new(db: Database) -> Self {
        SaleService { db }
    }

    /// Access to the underlying database (for composition with other
    /// modules that share the pool).
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Shared Helpers
    // =========================================================================

    /// Loads a sale or reports it missing.
    pub(crate) async fn load_sale(&self, sale_id: &str) -> EngineResult<Sale> {
        self.db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Sale".to_string(),
                id: sale_id.to_string(),
            })
    }

    /// Appends a history entry, best-effort.
    ///
    /// A failure to log never fails the primary operation, but operators
    /// should see it.
    pub(crate) async fn log_history(
        &self,
        sale_id: &str,
        action: HistoryAction,
        description: &str,
        actor: &str,
    ) {
        if let Err(err) = self
            .db
            .history()
            .append(sale_id, action, description, actor)
            .await
        {
            warn!(sale_id = %sale_id, error = %err, "Failed to append history entry");
        }
    }

    /// Recomputes the totals tuple from the sale's current child rows and
    /// persists it.
    ///
    /// This is a pure recompute over already-mutated children: no stock
    /// or credit mutation happens here, and status is never advanced.
    pub(crate) async fn recompute_totals(&self, sale_id: &str) -> EngineResult<SaleTotals> {
        let items = self.db.sales().get_items(sale_id).await?;
        let discounts = self.db.sales().get_discounts(sale_id).await?;
        let payments = self.db.sales().get_payments(sale_id).await?;
        let amounts: Vec<i64> = payments.iter().map(|p| p.amount_cents).collect();

        let totals = compute_totals_from_rows(&items, &discounts, &amounts);
        self.db.sales().update_totals(sale_id, &totals).await?;

        debug!(
            sale_id = %sale_id,
            total = totals.total_cents,
            balance = totals.balance_cents,
            "Totals recomputed"
        );

        Ok(totals)
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates a new sale in `in_progress` with all monetary fields at
    /// zero. The display number comes from the counter; gaps from later
    /// deletions are acceptable and numbers are never reused.
    pub async fn create_sale(&self, request: CreateSaleRequest) -> EngineResult<Sale> {
        if request.customer_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "customer_id".to_string(),
            }
            .into());
        }
        if request.seller_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "seller_id".to_string(),
            }
            .into());
        }

        let display_number = self.db.sales().next_display_number().await?;
        let now = Utc::now();

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            display_number,
            customer_id: request.customer_id,
            store_id: request.store_id,
            seller_id: request.seller_id.clone(),
            status: SaleStatus::InProgress,
            kind: request.kind,
            due_date: request.due_date,
            total_cents: 0,
            discount_cents: 0,
            paid_cents: 0,
            balance_cents: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
            completed_by: None,
        };

        self.db.sales().insert_sale(&sale).await?;

        self.log_history(&sale.id, HistoryAction::Created, "Sale created", &request.seller_id)
            .await;

        info!(sale_id = %sale.id, display_number = %display_number, "Sale created");

        Ok(sale)
    }

    // =========================================================================
    // Add Item
    // =========================================================================

    /// Adds a line item to an in-progress sale.
    ///
    /// Stock is deducted by the ledger's insertion side effect, never
    /// here; an overdraw surfaces as the insert failing at the ledger
    /// boundary and is reported as insufficient stock.
    pub async fn add_item(
        &self,
        sale_id: &str,
        item: NewSaleItem,
        actor: &str,
    ) -> EngineResult<SaleItem> {
        validate_new_item(&item)?;

        let sale = self.load_sale(sale_id).await?;
        if sale.status != SaleStatus::InProgress {
            return Err(EngineError::InvalidState {
                sale_id: sale_id.to_string(),
                status: sale.status,
                operation: "add item",
            });
        }

        let row = SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            product_code: item.product_code.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            subtotal_cents: item.subtotal().cents(),
            discount_kind: item.discount.map(|d| d.kind),
            discount_value: item.discount.map(|d| d.value),
            discount_cents: item.resolved_discount().cents(),
            returned_quantity: 0,
            created_at: Utc::now(),
        };

        if let Err(err) = self.db.sales().insert_item(&row).await {
            if err.is_stock_overdraw() {
                let available = self.db.stock().quantity(&item.product_id, sale.store_id).await?;
                return Err(EngineError::InsufficientStock {
                    product: item.product_name,
                    available,
                    requested: item.quantity,
                });
            }
            return Err(err.into());
        }

        self.recompute_totals(sale_id).await?;

        self.log_history(
            sale_id,
            HistoryAction::ItemAdded,
            &format!(
                "Item added: {} ({}un × {})",
                row.product_name,
                row.quantity,
                row.unit_price()
            ),
            actor,
        )
        .await;

        Ok(row)
    }

    /// Removes a single line item from an in-progress sale, restoring
    /// its stock explicitly (deletes carry no ledger trigger).
    pub async fn remove_item(&self, sale_id: &str, item_id: &str, actor: &str) -> EngineResult<()> {
        let sale = self.load_sale(sale_id).await?;
        if sale.status != SaleStatus::InProgress {
            return Err(EngineError::InvalidState {
                sale_id: sale_id.to_string(),
                status: sale.status,
                operation: "remove item",
            });
        }

        let item = self
            .db
            .sales()
            .get_item(item_id)
            .await?
            .filter(|i| i.sale_id == sale_id)
            .ok_or_else(|| EngineError::NotFound {
                entity: "SaleItem".to_string(),
                id: item_id.to_string(),
            })?;

        let reason = format!("sale: item removed (sale #{})", sale.display_number);
        if let Err(err) = self
            .db
            .stock()
            .adjust(&item.product_id, sale.store_id, item.quantity, &reason, actor)
            .await
        {
            // A store with no stock row has nothing to restore into;
            // anything else is a real failure.
            match err {
                vantage_db::DbError::InsufficientStock { .. } => {
                    warn!(product_id = %item.product_id, "No stock row to restore into");
                }
                other => return Err(other.into()),
            }
        }

        self.db.sales().delete_item(item_id).await?;
        self.recompute_totals(sale_id).await?;

        self.log_history(
            sale_id,
            HistoryAction::ItemRemoved,
            &format!(
                "Item removed: {} ({}un × {})",
                item.product_name,
                item.quantity,
                item.unit_price()
            ),
            actor,
        )
        .await;

        Ok(())
    }

    // =========================================================================
    // Add Payment
    // =========================================================================

    /// Records a payment against a sale.
    ///
    /// ## Store Credit
    /// A `store_credit` payment first consumes the customer's grants
    /// oldest-first. The allocation is all-or-nothing: when the grants
    /// cannot cover the amount the payment fails with insufficient
    /// credit and no grant is touched. Only after every consumption is
    /// applied is the payment row inserted.
    ///
    /// Deferred sales are settled over time, so payments are accepted on
    /// completed sales too; only cancelled/returned sales refuse them.
    pub async fn add_payment(
        &self,
        sale_id: &str,
        payment: NewPayment,
        actor: &str,
    ) -> EngineResult<Payment> {
        validate_payment_amount(payment.amount_cents)?;

        let sale = self.load_sale(sale_id).await?;
        if matches!(sale.status, SaleStatus::Cancelled | SaleStatus::Returned) {
            return Err(EngineError::InvalidState {
                sale_id: sale_id.to_string(),
                status: sale.status,
                operation: "record payment",
            });
        }

        if payment.method == PaymentMethod::StoreCredit {
            let grants = self.db.credits().active_grants(&sale.customer_id).await?;
            let allocations = allocate_fifo(&grants, Money::from_cents(payment.amount_cents))?;

            for allocation in &allocations {
                self.db
                    .credits()
                    .consume(&allocation.credit_id, allocation.amount_cents)
                    .await?;
            }

            debug!(
                sale_id = %sale_id,
                grants_consumed = allocations.len(),
                "Store credit consumed FIFO"
            );
        }

        let row = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            method: payment.method,
            amount_cents: payment.amount_cents,
            paid_on: payment.paid_on.unwrap_or_else(|| Utc::now().date_naive()),
            note: payment.note,
            created_at: Utc::now(),
            created_by: actor.to_string(),
            edited: false,
            edited_at: None,
            edited_by: None,
        };

        self.db.sales().insert_payment(&row).await?;
        self.recompute_totals(sale_id).await?;

        self.log_history(
            sale_id,
            HistoryAction::Payment,
            &format!(
                "Payment recorded: {} - {}",
                row.method.label(),
                row.amount()
            ),
            actor,
        )
        .await;

        Ok(row)
    }

    /// Re-tags an existing payment's method, stamping the edit audit
    /// fields. The amount never changes through this path.
    pub async fn edit_payment_method(
        &self,
        sale_id: &str,
        payment_id: &str,
        method: PaymentMethod,
        actor: &str,
    ) -> EngineResult<()> {
        let payment = self
            .db
            .sales()
            .get_payment(payment_id)
            .await?
            .filter(|p| p.sale_id == sale_id)
            .ok_or_else(|| EngineError::NotFound {
                entity: "Payment".to_string(),
                id: payment_id.to_string(),
            })?;

        self.db
            .sales()
            .retag_payment(&payment.id, method, actor)
            .await?;

        self.log_history(
            sale_id,
            HistoryAction::PaymentEdited,
            &format!("Payment method changed to: {}", method.label()),
            actor,
        )
        .await;

        Ok(())
    }

    // =========================================================================
    // Apply Discount
    // =========================================================================

    /// Applies a sale-level discount to an in-progress sale.
    ///
    /// A discount that would push the total below zero is rejected HERE,
    /// before the row lands; the totals engine itself never clamps.
    pub async fn apply_discount(
        &self,
        sale_id: &str,
        discount: NewDiscount,
        actor: &str,
    ) -> EngineResult<Discount> {
        validate_discount(discount.kind, discount.value)?;

        let sale = self.load_sale(sale_id).await?;
        if sale.status != SaleStatus::InProgress {
            return Err(EngineError::InvalidState {
                sale_id: sale_id.to_string(),
                status: sale.status,
                operation: "apply discount",
            });
        }

        // Prospective totals with this discount included
        let items = self.db.sales().get_items(sale_id).await?;
        let mut discounts = self.db.sales().get_discounts(sale_id).await?;
        let payments = self.db.sales().get_payments(sale_id).await?;
        let amounts: Vec<i64> = payments.iter().map(|p| p.amount_cents).collect();

        let row = Discount {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            kind: discount.kind,
            value: discount.value,
            reason: discount.reason,
            applied_by: actor.to_string(),
            created_at: Utc::now(),
        };
        discounts.push(row.clone());

        let prospective = compute_totals_from_rows(&items, &discounts, &amounts);
        if prospective.is_overdiscounted() {
            return Err(ValidationError::DiscountExceedsTotal {
                discount_cents: prospective.discount_cents,
                subtotal_cents: prospective.subtotal_cents,
            }
            .into());
        }

        self.db.sales().insert_discount(&row).await?;
        self.recompute_totals(sale_id).await?;

        let described = match row.kind {
            DiscountKind::Flat => format!("{}", Money::from_cents(row.value)),
            DiscountKind::Percent => format!("{}%", row.value as f64 / 100.0),
        };
        self.log_history(
            sale_id,
            HistoryAction::Discount,
            &format!("Discount applied: {described}"),
            actor,
        )
        .await;

        Ok(row)
    }

    // =========================================================================
    // Finalize
    // =========================================================================

    /// Explicitly completes an in-progress sale.
    ///
    /// Stock was already deducted as items were added; completion is a
    /// pure status transition.
    pub async fn finalize_sale(&self, sale_id: &str, actor: &str) -> EngineResult<Sale> {
        let sale = self.load_sale(sale_id).await?;
        if sale.status != SaleStatus::InProgress {
            return Err(EngineError::InvalidState {
                sale_id: sale_id.to_string(),
                status: sale.status,
                operation: "finalize",
            });
        }

        self.db.sales().mark_completed(sale_id, actor).await?;

        self.log_history(sale_id, HistoryAction::Completed, "Sale completed", actor)
            .await;

        info!(sale_id = %sale_id, "Sale finalized");

        self.load_sale(sale_id).await
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Hard-deletes a sale.
    ///
    /// ## Boundary
    /// A sale holding payments cannot be deleted unless it was cancelled
    /// first (cancellation already voided its payment bookkeeping).
    /// Deletion cascades to items, payments, discounts, and returns; the
    /// history trail (including the entry written here) survives.
    pub async fn delete_sale(&self, sale_id: &str, actor: &str) -> EngineResult<()> {
        let sale = self.load_sale(sale_id).await?;

        if sale.status != SaleStatus::Cancelled {
            let payments = self.db.sales().count_payments(sale_id).await?;
            if payments > 0 {
                return Err(EngineError::InvalidState {
                    sale_id: sale_id.to_string(),
                    status: sale.status,
                    operation: "delete a sale with recorded payments; cancel it first",
                });
            }
        }

        self.log_history(
            sale_id,
            HistoryAction::Deleted,
            &format!("Sale removed from the system (status: {:?})", sale.status),
            actor,
        )
        .await;

        self.db.sales().delete(sale_id).await?;

        info!(sale_id = %sale_id, "Sale deleted");

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Lists sales matching the filter, newest first.
    pub async fn list_sales(&self, filter: &SaleFilter) -> EngineResult<Vec<Sale>> {
        Ok(self.db.sales().list(filter).await?)
    }

    /// Gets the bare sale row.
    pub async fn get_sale(&self, sale_id: &str) -> EngineResult<Sale> {
        self.load_sale(sale_id).await
    }

    /// Gets the full aggregate: sale, items, payments, discounts,
    /// returns (with their lines), and history.
    pub async fn get_full_sale(&self, sale_id: &str) -> EngineResult<FullSale> {
        let sale = self.load_sale(sale_id).await?;
        let items = self.db.sales().get_items(sale_id).await?;
        let payments = self.db.sales().get_payments(sale_id).await?;
        let discounts = self.db.sales().get_discounts(sale_id).await?;
        let returns = self.list_returns(sale_id).await?;
        let history = self.db.history().for_sale(sale_id).await?;

        Ok(FullSale {
            sale,
            items,
            payments,
            discounts,
            returns,
            history,
        })
    }

    /// Lists a customer's store-credit grants that still hold balance,
    /// oldest first (the order they would be consumed).
    pub async fn customer_credits(
        &self,
        customer_id: &str,
    ) -> EngineResult<Vec<vantage_core::CustomerCredit>> {
        Ok(self.db.credits().active_grants(customer_id).await?)
    }

    /// Lists a sale's returns with their lines, newest first.
    pub async fn list_returns(&self, sale_id: &str) -> EngineResult<Vec<ReturnWithItems>> {
        let mut returns = Vec::new();
        for header in self.db.sales().get_returns(sale_id).await? {
            let items = self.db.sales().get_return_items(&header.id).await?;
            returns.push(ReturnWithItems { header, items });
        }
        Ok(returns)
    }
}
