//! # Cancellation
//!
//! Voids a sale: restores the never-returned portion of every item to
//! stock, zeroes the payment bookkeeping, deletes the payment rows, and
//! retracts any cash-register entries keyed to the sale.
//!
//! ## Idempotence With Respect to Returns
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  item quantity: 3, already returned: 2                                  │
//! │                                                                         │
//! │  to_restore = quantity − returned = 1                                   │
//! │                                                                         │
//! │  The 2 returned units already went back through the return-item        │
//! │  trigger; restoring them again would double-count. A fully returned    │
//! │  item restores ZERO additional stock.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation does not itself issue refunds; voiding the collected
//! payments' bookkeeping is sale-level; money back to the customer is an
//! out-of-band process.

use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::service::SaleService;
use vantage_core::validation::validate_reason;
use vantage_core::{HistoryAction, Sale, SaleStatus};

impl SaleService {
    /// Cancels a sale.
    ///
    /// ## Errors
    /// - `InvalidState` when the sale is already cancelled
    /// - `Validation` when the reason is empty
    ///
    /// Stock restoration is per item and best-effort in the same way the
    /// source system treats it: a store missing its stock row is logged
    /// and skipped, never blocking the cancellation. Register retraction
    /// is best-effort too. Payment deletion is not; that failure
    /// surfaces.
    pub async fn cancel_sale(
        &self,
        sale_id: &str,
        reason: &str,
        actor: &str,
    ) -> EngineResult<Sale> {
        validate_reason(reason)?;

        let sale = self.load_sale(sale_id).await?;
        if sale.status == SaleStatus::Cancelled {
            return Err(EngineError::InvalidState {
                sale_id: sale_id.to_string(),
                status: sale.status,
                operation: "cancel",
            });
        }

        // Restore what never came back through a return
        let items = self.database().sales().get_items(sale_id).await?;
        for item in &items {
            let to_restore = item.unreturned_quantity();

            if to_restore <= 0 {
                debug!(
                    product_id = %item.product_id,
                    "Item fully returned already, skipping restore"
                );
                continue;
            }

            let movement_reason = format!(
                "cancel: stock restored (sale #{})",
                sale.display_number
            );
            if let Err(err) = self
                .database()
                .stock()
                .adjust(&item.product_id, sale.store_id, to_restore, &movement_reason, actor)
                .await
            {
                warn!(
                    product_id = %item.product_id,
                    store_id = %sale.store_id,
                    error = %err,
                    "Failed to restore stock during cancellation"
                );
            }
        }

        // Status → cancelled; collected-payment bookkeeping voided
        self.database().sales().cancel(sale_id).await?;

        // The payment rows go entirely
        let removed = self.database().sales().delete_payments(sale_id).await?;
        debug!(sale_id = %sale_id, removed = %removed, "Payments removed");

        // Best-effort: pull any drawer entries keyed to this sale
        match self.database().register().retract_for_sale(sale_id).await {
            Ok(0) => {}
            Ok(n) => debug!(sale_id = %sale_id, retracted = %n, "Register entries retracted"),
            Err(err) => {
                warn!(sale_id = %sale_id, error = %err, "Failed to retract register entries");
            }
        }

        self.log_history(
            sale_id,
            HistoryAction::Cancelled,
            &format!("Sale cancelled - stock restored. Reason: {reason}"),
            actor,
        )
        .await;

        info!(sale_id = %sale_id, "Sale cancelled");

        self.load_sale(sale_id).await
    }
}
