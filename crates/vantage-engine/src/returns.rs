//! # Returns
//!
//! Partial or full reversal of a completed sale's items, with
//! proportional discount allocation and optional store-credit issuance.
//!
//! ## Refund Math
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  returned_subtotal = Σ quantity_returned × unit_price                   │
//! │                                                                         │
//! │  The customer never paid full price if the sale carried a discount:     │
//! │                                                                         │
//! │  refund = returned_subtotal × (1 − discount_total / pre_discount_total) │
//! │                                                                         │
//! │  Example: sale subtotal 200.00, discount 20.00 → returning a 50.00     │
//! │  item refunds 45.00.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock restoration is delegated to the ledger's return-item trigger:
//! inserting the line IS the restoration, consistent with the
//! "insertion performs the effect" discipline used throughout.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::service::SaleService;
use vantage_core::totals::proportional_refund;
use vantage_core::validation::{validate_quantity, validate_reason};
use vantage_core::{
    HistoryAction, Money, PaymentMethod, ReturnItem, ReturnKind, SaleReturn, SaleStatus,
    ValidationError,
};

// =============================================================================
// Request
// =============================================================================

/// One line of a return: which sale item, how many units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnLine {
    pub sale_item_id: String,
    pub quantity: i64,
}

/// A return request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub lines: Vec<ReturnLine>,
    /// Issue the refund as a store-credit grant instead of cash out.
    pub issue_credit: bool,
    /// How the refund leaves the store when no credit is issued.
    pub refund_method: Option<PaymentMethod>,
    pub reason: String,
}

impl SaleService {
    // =========================================================================
    // Return
    // =========================================================================

    /// Processes a partial or full return on a completed sale.
    ///
    /// Every line is validated against its item's unreturned remainder
    /// *before* any mutation; a bad line fails the whole request with
    /// nothing written.
    ///
    /// ## Errors
    /// - `InvalidState` unless the sale is `completed`
    /// - `Validation` for empty/over-quantity lines or a missing reason
    /// - `NotFound` when a line references an item of another sale
    pub async fn process_return(
        &self,
        sale_id: &str,
        request: ReturnRequest,
        actor: &str,
    ) -> EngineResult<SaleReturn> {
        validate_reason(&request.reason)?;
        if request.lines.is_empty() {
            return Err(ValidationError::Required {
                field: "return lines".to_string(),
            }
            .into());
        }
        for line in &request.lines {
            validate_quantity(line.quantity)?;
        }

        let sale = self.load_sale(sale_id).await?;
        if sale.status != SaleStatus::Completed {
            return Err(EngineError::InvalidState {
                sale_id: sale_id.to_string(),
                status: sale.status,
                operation: "process a return (only completed sales)",
            });
        }

        // ---- validate all lines, compute the returned subtotal ---------------
        let items = self.database().sales().get_items(sale_id).await?;
        let mut returned_subtotal = Money::zero();

        for line in &request.lines {
            let item = items
                .iter()
                .find(|i| i.id == line.sale_item_id)
                .ok_or_else(|| EngineError::NotFound {
                    entity: "SaleItem".to_string(),
                    id: line.sale_item_id.clone(),
                })?;

            let remaining = item.unreturned_quantity();
            if line.quantity > remaining {
                return Err(ValidationError::ReturnExceedsRemaining {
                    requested: line.quantity,
                    remaining,
                }
                .into());
            }

            returned_subtotal += item.unit_price().multiply_quantity(line.quantity);
        }

        // ---- proportional discount allocation --------------------------------
        let refund = proportional_refund(
            returned_subtotal,
            sale.discount_total(),
            sale.total_before_discount(),
        );

        debug!(
            sale_id = %sale_id,
            returned_subtotal = %returned_subtotal,
            refund = %refund,
            "Return valued"
        );

        // ---- return header + lines -------------------------------------------
        let header = SaleReturn {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            kind: if request.issue_credit {
                ReturnKind::WithCredit
            } else {
                ReturnKind::WithoutCredit
            },
            total_cents: refund.cents(),
            refund_method: request.refund_method,
            reason: request.reason.clone(),
            processed_by: actor.to_string(),
            created_at: Utc::now(),
        };
        self.database().sales().insert_return(&header).await?;

        for line in &request.lines {
            // The ledger trigger restores stock and logs the movement
            // the moment this row lands; no explicit adjustment here.
            let row = ReturnItem {
                id: Uuid::new_v4().to_string(),
                return_id: header.id.clone(),
                sale_item_id: line.sale_item_id.clone(),
                quantity: line.quantity,
                reason: Some(request.reason.clone()),
                created_at: Utc::now(),
            };
            self.database().sales().insert_return_item(&row).await?;

            self.database()
                .sales()
                .add_returned_quantity(&line.sale_item_id, line.quantity)
                .await?;
        }

        // ---- terminal status when everything came back -----------------------
        let items_after = self.database().sales().get_items(sale_id).await?;
        if !items_after.is_empty() && items_after.iter().all(|i| i.fully_returned()) {
            self.database()
                .sales()
                .set_status(sale_id, SaleStatus::Returned)
                .await?;
        }

        // ---- optional store-credit grant -------------------------------------
        if request.issue_credit {
            let credit = self
                .database()
                .credits()
                .grant(
                    &sale.customer_id,
                    refund.cents(),
                    Some(sale_id),
                    Some(&header.id),
                    Some(&format!("Return of goods - {}", request.reason)),
                    actor,
                )
                .await?;

            debug!(
                sale_id = %sale_id,
                credit_id = %credit.id,
                value = %refund,
                "Store credit granted"
            );
        }

        self.log_history(
            sale_id,
            HistoryAction::Return,
            &format!(
                "Return processed: {} item(s), value: {}{}",
                request.lines.len(),
                refund,
                if request.issue_credit {
                    " (credit issued)"
                } else {
                    ""
                }
            ),
            actor,
        )
        .await;

        info!(
            sale_id = %sale_id,
            return_id = %header.id,
            refund = %refund,
            credit = request.issue_credit,
            "Return processed"
        );

        Ok(header)
    }
}
