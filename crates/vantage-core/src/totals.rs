//! # Totals Engine
//!
//! The invariant engine for a sale's monetary tuple.
//!
//! ## The Invariants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  After EVERY mutation of a sale's children:                             │
//! │                                                                         │
//! │    subtotal  = Σ item.subtotal                                          │
//! │    discounts = Σ item discounts + Σ sale-level discounts                │
//! │    total     = subtotal − discounts                                     │
//! │    paid      = Σ payment.amount                                         │
//! │    balance   = total − paid                                             │
//! │                                                                         │
//! │  Percent discounts at sale level resolve against the FULL subtotal;     │
//! │  item-level percent discounts resolve against their own line.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status is **not** advanced here. Status transitions are explicit
//! operator actions; the one exception is the edit path's inference, which
//! lives in [`infer_status`] and is only called from there.
//!
//! The same computation serves two callers:
//! - the recompute path, reading stored rows back from the database
//! - the edit path, computing directly from the caller-supplied desired
//!   state without a re-read
//!
//! Both must produce identical numbers for identical underlying data,
//! which is why there is exactly one implementation.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Discount, DiscountKind, NewSaleItem, SaleItem, SaleStatus};

// =============================================================================
// Line Amounts
// =============================================================================

/// The two numbers the totals engine needs from each line item.
///
/// Both the stored row and the caller-supplied desired state convert into
/// this, so the engine itself never cares which side it is summing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
}

impl From<&SaleItem> for LineAmounts {
    fn from(item: &SaleItem) -> Self {
        LineAmounts {
            subtotal_cents: item.subtotal_cents,
            discount_cents: item.discount_cents,
        }
    }
}

impl From<&NewSaleItem> for LineAmounts {
    fn from(item: &NewSaleItem) -> Self {
        LineAmounts {
            subtotal_cents: item.subtotal().cents(),
            discount_cents: item.resolved_discount().cents(),
        }
    }
}

// =============================================================================
// Sale Totals
// =============================================================================

/// The consistent monetary tuple persisted onto the sale row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    /// Σ item subtotals, before any discount.
    pub subtotal_cents: i64,
    /// Item-level plus sale-level discounts, resolved to cents.
    pub discount_cents: i64,
    /// `subtotal − discounts`. May be negative here; rejecting that is
    /// the discount-application path's job, not this engine's.
    pub total_cents: i64,
    /// Σ payment amounts.
    pub paid_cents: i64,
    /// `total − paid`. Negative means over-paid.
    pub balance_cents: i64,
}

impl SaleTotals {
    /// True when the discounts have eaten past the subtotal.
    ///
    /// Checked by `apply_discount` *before* persisting the discount row;
    /// the recompute path never clamps.
    #[inline]
    pub fn is_overdiscounted(&self) -> bool {
        self.total_cents < 0
    }
}

/// Resolves a sale-level discount to cents against the full subtotal.
pub fn resolve_sale_discount(subtotal: Money, kind: DiscountKind, value: i64) -> Money {
    match kind {
        DiscountKind::Flat => Money::from_cents(value),
        DiscountKind::Percent => subtotal.percent_of(value as u32),
    }
}

/// Computes the totals tuple from line amounts, sale-level discounts, and
/// payment amounts.
///
/// ## Arguments
/// * `lines` - one [`LineAmounts`] per item (stored or desired)
/// * `sale_discounts` - `(kind, value)` pairs; percent values are basis points
/// * `payments` - payment amounts in cents
pub fn compute_totals(
    lines: impl IntoIterator<Item = LineAmounts>,
    sale_discounts: impl IntoIterator<Item = (DiscountKind, i64)>,
    payments: impl IntoIterator<Item = i64>,
) -> SaleTotals {
    let mut subtotal = Money::zero();
    let mut item_discounts = Money::zero();
    for line in lines {
        subtotal += Money::from_cents(line.subtotal_cents);
        item_discounts += Money::from_cents(line.discount_cents);
    }

    let mut sale_discount_total = Money::zero();
    for (kind, value) in sale_discounts {
        sale_discount_total += resolve_sale_discount(subtotal, kind, value);
    }

    let discount_total = item_discounts + sale_discount_total;
    let total = subtotal - discount_total;

    let paid: Money = payments.into_iter().map(Money::from_cents).sum();
    let balance = total - paid;

    SaleTotals {
        subtotal_cents: subtotal.cents(),
        discount_cents: discount_total.cents(),
        total_cents: total.cents(),
        paid_cents: paid.cents(),
        balance_cents: balance.cents(),
    }
}

/// Convenience wrapper for the recompute path: stored rows in, totals out.
pub fn compute_totals_from_rows(
    items: &[SaleItem],
    discounts: &[Discount],
    payment_amounts: &[i64],
) -> SaleTotals {
    compute_totals(
        items.iter().map(LineAmounts::from),
        discounts.iter().map(|d| (d.kind, d.value)),
        payment_amounts.iter().copied(),
    )
}

// =============================================================================
// Status Inference (edit path only)
// =============================================================================

/// Infers the post-edit status from payment sufficiency.
///
/// ## The Asymmetry (intentional)
/// - `in_progress → completed` only when the balance is covered AND
///   something was actually paid: an empty sale does not self-complete.
/// - `completed → in_progress` whenever a positive balance reappears,
///   e.g. an edit grew the total past what was collected.
///
/// Terminal statuses pass through untouched; the edit operation has
/// already rejected cancelled sales before getting here.
pub fn infer_status(current: SaleStatus, totals: &SaleTotals) -> SaleStatus {
    match current {
        SaleStatus::InProgress if totals.balance_cents <= 0 && totals.paid_cents > 0 => {
            SaleStatus::Completed
        }
        SaleStatus::Completed if totals.balance_cents > 0 => SaleStatus::InProgress,
        other => other,
    }
}

// =============================================================================
// Proportional Refund
// =============================================================================

/// Computes the refund value for returned items, withholding the share of
/// the sale's discount those items carried.
///
/// ## The Allocation
/// ```text
/// discount_ratio = discount_total / total_before_discount
/// refund         = returned_subtotal × (1 − discount_ratio)
/// ```
/// in pure integer math: the withheld share is
/// `returned_subtotal × discount_total / total_before_discount`,
/// rounded half-up.
///
/// ## Example
/// A $200.00 sale with a $20.00 discount refunds a $50.00 item at
/// $45.00: the 10% discount stays withheld.
///
/// When the sale had no discount (or no pre-discount total), the refund
/// is simply the returned subtotal.
pub fn proportional_refund(
    returned_subtotal: Money,
    discount_total: Money,
    total_before_discount: Money,
) -> Money {
    if discount_total.is_positive() && total_before_discount.is_positive() {
        let withheld = returned_subtotal.ratio_of(discount_total, total_before_discount);
        returned_subtotal - withheld
    } else {
        returned_subtotal
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(subtotal_cents: i64, discount_cents: i64) -> LineAmounts {
        LineAmounts {
            subtotal_cents,
            discount_cents,
        }
    }

    #[test]
    fn test_plain_totals() {
        let totals = compute_totals([line(10_000, 0), line(5_000, 0)], [], [7_500]);

        assert_eq!(totals.subtotal_cents, 15_000);
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.total_cents, 15_000);
        assert_eq!(totals.paid_cents, 7_500);
        assert_eq!(totals.balance_cents, 7_500);
    }

    #[test]
    fn test_item_and_sale_discounts_combine() {
        // Items: 100.00 (with 5.00 off) + 100.00
        // Sale-level: 10% of the 200.00 subtotal = 20.00
        let totals = compute_totals(
            [line(10_000, 500), line(10_000, 0)],
            [(DiscountKind::Percent, 1_000)],
            [],
        );

        assert_eq!(totals.subtotal_cents, 20_000);
        assert_eq!(totals.discount_cents, 2_500);
        assert_eq!(totals.total_cents, 17_500);
        assert_eq!(totals.balance_cents, 17_500);
    }

    #[test]
    fn test_flat_sale_discount() {
        let totals = compute_totals([line(20_000, 0)], [(DiscountKind::Flat, 2_000)], [18_000]);

        assert_eq!(totals.total_cents, 18_000);
        assert_eq!(totals.paid_cents, 18_000);
        assert_eq!(totals.balance_cents, 0);
    }

    #[test]
    fn test_invariants_hold() {
        let totals = compute_totals(
            [line(9_900, 990), line(4_950, 0)],
            [(DiscountKind::Flat, 1_000)],
            [5_000, 2_500],
        );

        assert_eq!(
            totals.total_cents,
            totals.subtotal_cents - totals.discount_cents
        );
        assert_eq!(totals.balance_cents, totals.total_cents - totals.paid_cents);
    }

    #[test]
    fn test_overdiscount_is_reported_not_clamped() {
        let totals = compute_totals([line(1_000, 0)], [(DiscountKind::Flat, 1_500)], []);

        assert_eq!(totals.total_cents, -500);
        assert!(totals.is_overdiscounted());
    }

    #[test]
    fn test_empty_sale() {
        let totals = compute_totals([], [], []);
        assert_eq!(totals.total_cents, 0);
        assert_eq!(totals.balance_cents, 0);
    }

    #[test]
    fn test_infer_status_upgrade() {
        let paid_off = compute_totals([line(10_000, 0)], [], [10_000]);
        assert_eq!(
            infer_status(SaleStatus::InProgress, &paid_off),
            SaleStatus::Completed
        );

        // Zero-payment sale never self-completes, even at zero balance
        let empty = compute_totals([], [], []);
        assert_eq!(
            infer_status(SaleStatus::InProgress, &empty),
            SaleStatus::InProgress
        );
    }

    #[test]
    fn test_infer_status_downgrade() {
        // An edit grew the total past what was collected
        let underpaid = compute_totals([line(20_000, 0)], [], [10_000]);
        assert_eq!(
            infer_status(SaleStatus::Completed, &underpaid),
            SaleStatus::InProgress
        );

        // Terminal statuses pass through
        assert_eq!(
            infer_status(SaleStatus::Cancelled, &underpaid),
            SaleStatus::Cancelled
        );
        assert_eq!(
            infer_status(SaleStatus::Returned, &underpaid),
            SaleStatus::Returned
        );
    }

    #[test]
    fn test_infer_status_overpaid_stays_completed() {
        let overpaid = compute_totals([line(10_000, 0)], [], [12_000]);
        assert_eq!(
            infer_status(SaleStatus::Completed, &overpaid),
            SaleStatus::Completed
        );
    }

    #[test]
    fn test_proportional_refund_with_discount() {
        // Subtotal 200.00, discount 20.00, returning a 50.00 item → 45.00
        let refund = proportional_refund(
            Money::from_cents(5_000),
            Money::from_cents(2_000),
            Money::from_cents(20_000),
        );
        assert_eq!(refund.cents(), 4_500);
    }

    #[test]
    fn test_proportional_refund_without_discount() {
        let refund = proportional_refund(
            Money::from_cents(5_000),
            Money::zero(),
            Money::from_cents(20_000),
        );
        assert_eq!(refund.cents(), 5_000);
    }

    #[test]
    fn test_proportional_refund_full_return_covers_whole_total() {
        // Returning everything refunds exactly the discounted total
        let refund = proportional_refund(
            Money::from_cents(20_000),
            Money::from_cents(2_000),
            Money::from_cents(20_000),
        );
        assert_eq!(refund.cents(), 18_000);
    }
}
