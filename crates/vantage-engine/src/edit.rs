//! # Edit-by-Diff
//!
//! Replaces a sale's item set, payment set, and sale-level discount with
//! a caller-supplied desired state, adjusting stock by the **difference**.
//!
//! ## The Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. VALIDATE        desired state well-formed, sale not cancelled,     │
//! │                     desired totals not over-discounted                 │
//! │  2. PLAN            diff current items vs desired, keyed by product    │
//! │  3. REMOVED         adjust(+qty) ─ delete row ─ history per item       │
//! │  4. ADDED           check availability ─ insert row (trigger deducts)  │
//! │  5. RETAINED        Δqty ≠ 0: check if Δ>0, adjust(−Δ), history        │
//! │                     price-only: history, no stock effect              │
//! │                     any change: UPDATE the row                        │
//! │  6. PAYMENTS        delete all, reinsert caller's list wholesale       │
//! │  7. DISCOUNT        delete all, insert caller's discount if any        │
//! │  8. TOTALS          computed from the DESIRED state directly (no       │
//! │                     re-read); must equal what the shared recompute     │
//! │                     would produce from the same rows                   │
//! │  9. STATUS          inferred: balance ≤ 0 ∧ paid > 0 → completed;      │
//! │                     balance > 0 pulls a completed sale back            │
//! │ 10. HISTORY         one summarizing entry after the per-change ones    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Not Delete-Then-Recreate?
//! Inserting a sale item deducts stock through the ledger trigger.
//! Wholesale recreation would double-deduct every untouched item. The
//! diff touches only what the operator changed.
//!
//! ## Partial Failure (known, documented)
//! Steps 3-5 validate and mutate interleaved per item. A failure midway
//! leaves the earlier removals/insertions applied; there is no
//! compensating rollback. Callers must treat a failed edit as possibly
//! partially applied and re-fetch the sale before retrying.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::service::{NewDiscount, NewPayment, SaleService};
use vantage_core::diff::plan_edit;
use vantage_core::totals::{compute_totals, infer_status, LineAmounts};
use vantage_core::validation::{
    validate_discount, validate_item_set, validate_payment_amount,
};
use vantage_core::{
    HistoryAction, Money, NewSaleItem, Payment, SaleItem, SaleKind, SaleStatus, ValidationError,
};
use vantage_db::DbError;

// =============================================================================
// Request
// =============================================================================

/// The desired state of a sale, in full.
///
/// Items are reconciled by diff; payments and the sale-level discount
/// are replaced wholesale. Store-credit payment rows are re-recorded
/// as-is: their grants were consumed when first recorded, and replaying
/// rows is not a new consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditSaleRequest {
    pub kind: SaleKind,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<NewSaleItem>,
    pub payments: Vec<NewPayment>,
    pub discount: Option<NewDiscount>,
}

impl SaleService {
    // =========================================================================
    // Edit
    // =========================================================================

    /// Reconciles a sale to the requested desired state.
    ///
    /// ## Errors
    /// - `InvalidState` when the sale is cancelled
    /// - `InsufficientStock` when an addition or a quantity increase
    ///   cannot be covered; checked per item, *before* that item's row
    ///   is written
    /// - `Validation` when the desired state is malformed or
    ///   over-discounted (checked before any mutation)
    pub async fn edit_sale(
        &self,
        sale_id: &str,
        request: EditSaleRequest,
        actor: &str,
    ) -> EngineResult<vantage_core::Sale> {
        // ---- 1. validate, before any mutation --------------------------------
        validate_item_set(&request.items)?;
        for payment in &request.payments {
            validate_payment_amount(payment.amount_cents)?;
        }
        if let Some(discount) = &request.discount {
            validate_discount(discount.kind, discount.value)?;
        }

        let desired_totals = compute_totals(
            request.items.iter().map(LineAmounts::from),
            request.discount.iter().map(|d| (d.kind, d.value)),
            request.payments.iter().map(|p| p.amount_cents),
        );
        if desired_totals.is_overdiscounted() {
            return Err(ValidationError::DiscountExceedsTotal {
                discount_cents: desired_totals.discount_cents,
                subtotal_cents: desired_totals.subtotal_cents,
            }
            .into());
        }

        let sale = self.load_sale(sale_id).await?;
        if sale.status == SaleStatus::Cancelled {
            return Err(EngineError::InvalidState {
                sale_id: sale_id.to_string(),
                status: sale.status,
                operation: "edit",
            });
        }

        // ---- 2. plan ---------------------------------------------------------
        let current_items = self.database().sales().get_items(sale_id).await?;
        let plan = plan_edit(&current_items, &request.items);

        let mut changes: Vec<String> = Vec::new();

        // ---- 3. removed: restore stock, delete row ---------------------------
        for item in &plan.removed {
            self.restore_stock_for_edit(
                &item.product_id,
                sale.store_id,
                item.quantity,
                &format!("edit: item removed (sale #{})", sale.display_number),
                actor,
            )
            .await?;

            self.database().sales().delete_item(&item.id).await?;

            changes.push(format!("Removed: {} ({}un)", item.product_name, item.quantity));
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
        }

        // ---- 4. added: pre-validate, insert (trigger deducts) ----------------
        for item in &plan.added {
            let available = self
                .database()
                .stock()
                .quantity(&item.product_id, sale.store_id)
                .await?;
            if available < item.quantity {
                return Err(EngineError::InsufficientStock {
                    product: item.product_name.clone(),
                    available,
                    requested: item.quantity,
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

            if let Err(err) = self.database().sales().insert_item(&row).await {
                // A concurrent writer may have drained the stock between
                // the read above and the insert; the ledger's CHECK is
                // the authority.
                if err.is_stock_overdraw() {
                    return Err(EngineError::InsufficientStock {
                        product: item.product_name.clone(),
                        available,
                        requested: item.quantity,
                    });
                }
                return Err(err.into());
            }

            changes.push(format!("Added: {} ({}un)", item.product_name, item.quantity));
            self.log_history(
                sale_id,
                HistoryAction::ItemAdded,
                &format!(
                    "Item added: {} ({}un × {})",
                    item.product_name,
                    item.quantity,
                    Money::from_cents(item.unit_price_cents)
                ),
                actor,
            )
            .await;
        }

        // ---- 5. retained: quantity deltas, price changes, row updates --------
        for retained in &plan.retained {
            let current = &retained.current;
            let desired = &retained.desired;

            if retained.quantity_delta != 0 {
                let delta = retained.quantity_delta;

                if delta > 0 {
                    let available = self
                        .database()
                        .stock()
                        .quantity(&current.product_id, sale.store_id)
                        .await?;
                    if available < delta {
                        return Err(EngineError::InsufficientStock {
                            product: current.product_name.clone(),
                            available,
                            requested: delta,
                        });
                    }
                }

                // Selling more decreases stock, selling less hands it back
                self.database()
                    .stock()
                    .adjust(
                        &current.product_id,
                        sale.store_id,
                        -delta,
                        &format!(
                            "edit: quantity changed from {} to {} (sale #{})",
                            current.quantity, desired.quantity, sale.display_number
                        ),
                        actor,
                    )
                    .await?;

                changes.push(format!(
                    "Changed: {} ({} → {}un)",
                    current.product_name, current.quantity, desired.quantity
                ));
                self.log_history(
                    sale_id,
                    HistoryAction::Edited,
                    &format!(
                        "Quantity changed: {} ({}un → {}un)",
                        current.product_name, current.quantity, desired.quantity
                    ),
                    actor,
                )
                .await;
            }

            if retained.price_changed {
                changes.push(format!(
                    "Price changed: {} ({} → {})",
                    current.product_name,
                    current.unit_price(),
                    Money::from_cents(desired.unit_price_cents)
                ));
                self.log_history(
                    sale_id,
                    HistoryAction::Edited,
                    &format!(
                        "Price changed: {} ({} → {})",
                        current.product_name,
                        current.unit_price(),
                        Money::from_cents(desired.unit_price_cents)
                    ),
                    actor,
                )
                .await;
            }

            if retained.needs_update {
                let updated = SaleItem {
                    quantity: desired.quantity,
                    unit_price_cents: desired.unit_price_cents,
                    subtotal_cents: desired.subtotal().cents(),
                    discount_kind: desired.discount.map(|d| d.kind),
                    discount_value: desired.discount.map(|d| d.value),
                    discount_cents: desired.resolved_discount().cents(),
                    ..current.clone()
                };
                self.database().sales().update_item(&updated).await?;
            }
        }

        // ---- 6. payments: replace wholesale ----------------------------------
        self.database().sales().delete_payments(sale_id).await?;
        for payment in &request.payments {
            let row = Payment {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.to_string(),
                method: payment.method,
                amount_cents: payment.amount_cents,
                paid_on: payment.paid_on.unwrap_or_else(|| Utc::now().date_naive()),
                note: payment.note.clone(),
                created_at: Utc::now(),
                created_by: actor.to_string(),
                edited: false,
                edited_at: None,
                edited_by: None,
            };
            self.database().sales().insert_payment(&row).await?;
        }

        // ---- 7. discount: replace wholesale ----------------------------------
        self.database().sales().delete_discounts(sale_id).await?;
        if let Some(discount) = &request.discount {
            let row = vantage_core::Discount {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.to_string(),
                kind: discount.kind,
                value: discount.value,
                reason: discount.reason.clone(),
                applied_by: actor.to_string(),
                created_at: Utc::now(),
            };
            self.database().sales().insert_discount(&row).await?;
        }

        // ---- 8-9. totals from the desired state, inferred status -------------
        // Computed up front from the caller's lists; mathematically
        // identical to re-reading the rows just written.
        let status = infer_status(sale.status, &desired_totals);
        self.database()
            .sales()
            .update_after_edit(sale_id, request.kind, request.due_date, &desired_totals, status)
            .await?;

        // ---- 10. summary history ---------------------------------------------
        let summary = if changes.is_empty() {
            "Sale edited: details updated".to_string()
        } else {
            format!("Sale edited: {}", changes.join("; "))
        };
        self.log_history(sale_id, HistoryAction::Edited, &summary, actor)
            .await;

        info!(
            sale_id = %sale_id,
            removed = plan.removed.len(),
            added = plan.added.len(),
            retained = plan.retained.len(),
            "Sale edited"
        );

        self.load_sale(sale_id).await
    }

    /// Restores stock for an item leaving the sale during an edit.
    ///
    /// A store that never had a stock row for the product has nothing to
    /// restore into; that case is logged and skipped rather than failing
    /// the edit.
    async fn restore_stock_for_edit(
        &self,
        product_id: &str,
        store_id: i64,
        quantity: i64,
        reason: &str,
        actor: &str,
    ) -> EngineResult<()> {
        match self
            .database()
            .stock()
            .adjust(product_id, store_id, quantity, reason, actor)
            .await
        {
            Ok(_) => Ok(()),
            Err(DbError::InsufficientStock { .. }) => {
                warn!(product_id = %product_id, store_id = %store_id, "No stock row to restore into");
                Ok(())
            }
            Err(other) => Err(other.into()),
        }
    }
}
