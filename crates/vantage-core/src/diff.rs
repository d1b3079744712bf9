//! # Edit-by-Diff Planning
//!
//! Classifies the difference between a sale's current item set and the
//! desired set supplied by the caller.
//!
//! ## Why Diff Instead of Replace?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Inserting a sale item DEDUCTS stock (ledger row-event).               │
//! │  Naive delete-then-recreate would therefore deduct stock TWICE for     │
//! │  every item the operator didn't even touch.                            │
//! │                                                                         │
//! │  current: A×2  B×1          desired: A×3  C×1                          │
//! │                                                                         │
//! │       ┌─────────────┬──────────────┬─────────────────┐                 │
//! │       │   REMOVED   │    ADDED     │    RETAINED     │                 │
//! │       │   B (×1)    │   C (×1)     │  A: Δqty = +1   │                 │
//! │       │ restore +1  │ insert row   │  adjust −Δ      │                 │
//! │       │ delete row  │ (trigger     │  update row     │                 │
//! │       │             │  deducts)    │                 │                 │
//! │       └─────────────┴──────────────┴─────────────────┘                 │
//! │                                                                         │
//! │  Net stock effect: A −1, B +1, C −1. Exactly the operator's intent.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Items are keyed by `product_id`: a sale carries at most one line per
//! product, so product identity is the stable join key across the edit.
//!
//! This module only PLANS. Applying the plan (and living with its
//! partial-failure semantics) is the engine's job.

use std::collections::HashMap;

use crate::types::{NewSaleItem, SaleItem};

// =============================================================================
// Plan Types
// =============================================================================

/// An item present on both sides of the edit.
#[derive(Debug, Clone)]
pub struct RetainedItem {
    /// The stored row.
    pub current: SaleItem,
    /// What the caller wants it to become.
    pub desired: NewSaleItem,
    /// `desired.quantity − current.quantity`. Positive sells more
    /// (stock decreases), negative hands stock back.
    pub quantity_delta: i64,
    /// Unit price differs; no stock effect, history only.
    pub price_changed: bool,
    /// Any persisted field differs (quantity, price, subtotal, discount),
    /// so the row needs an UPDATE.
    pub needs_update: bool,
}

/// The full classification of an edit.
#[derive(Debug, Clone, Default)]
pub struct EditPlan {
    /// In current, absent from desired: restore stock, delete row.
    pub removed: Vec<SaleItem>,
    /// In desired, absent from current: pre-validate stock, insert row.
    pub added: Vec<NewSaleItem>,
    /// Present on both sides, in desired order.
    pub retained: Vec<RetainedItem>,
}

impl EditPlan {
    /// True when the edit touches no item at all.
    pub fn is_item_noop(&self) -> bool {
        self.removed.is_empty()
            && self.added.is_empty()
            && self.retained.iter().all(|r| !r.needs_update)
    }
}

// =============================================================================
// Planner
// =============================================================================

/// Builds the edit plan from the stored items and the desired state.
///
/// Ordering is deterministic: removals follow the stored order, additions
/// and retentions follow the caller's order. The engine applies removals
/// first so handed-back stock is visible to the availability checks that
/// follow.
pub fn plan_edit(current: &[SaleItem], desired: &[NewSaleItem]) -> EditPlan {
    let current_by_product: HashMap<&str, &SaleItem> = current
        .iter()
        .map(|item| (item.product_id.as_str(), item))
        .collect();
    let desired_by_product: HashMap<&str, &NewSaleItem> = desired
        .iter()
        .map(|item| (item.product_id.as_str(), item))
        .collect();

    let mut plan = EditPlan::default();

    for item in current {
        if !desired_by_product.contains_key(item.product_id.as_str()) {
            plan.removed.push(item.clone());
        }
    }

    for wanted in desired {
        match current_by_product.get(wanted.product_id.as_str()) {
            None => plan.added.push(wanted.clone()),
            Some(existing) => {
                let quantity_delta = wanted.quantity - existing.quantity;
                let price_changed = wanted.unit_price_cents != existing.unit_price_cents;
                let subtotal_changed = wanted.subtotal().cents() != existing.subtotal_cents;
                let discount_changed = discount_differs(existing, wanted);

                plan.retained.push(RetainedItem {
                    current: (*existing).clone(),
                    desired: wanted.clone(),
                    quantity_delta,
                    price_changed,
                    needs_update: quantity_delta != 0
                        || price_changed
                        || subtotal_changed
                        || discount_changed,
                });
            }
        }
    }

    plan
}

fn discount_differs(current: &SaleItem, desired: &NewSaleItem) -> bool {
    let current_pair = current.discount_kind.zip(current.discount_value);
    let desired_pair = desired.discount.map(|d| (d.kind, d.value));
    current_pair != desired_pair
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscountKind, ItemDiscount};
    use chrono::Utc;

    fn stored(product_id: &str, quantity: i64, unit_price_cents: i64) -> SaleItem {
        SaleItem {
            id: format!("item-{product_id}"),
            sale_id: "s1".to_string(),
            product_id: product_id.to_string(),
            product_name: format!("Product {product_id}"),
            product_code: String::new(),
            quantity,
            unit_price_cents,
            subtotal_cents: unit_price_cents * quantity,
            discount_kind: None,
            discount_value: None,
            discount_cents: 0,
            returned_quantity: 0,
            created_at: Utc::now(),
        }
    }

    fn wanted(product_id: &str, quantity: i64, unit_price_cents: i64) -> NewSaleItem {
        NewSaleItem {
            product_id: product_id.to_string(),
            product_name: format!("Product {product_id}"),
            product_code: String::new(),
            quantity,
            unit_price_cents,
            discount: None,
        }
    }

    #[test]
    fn test_round_trip_classification() {
        // A×2, B×1  →  A×3, C×1
        let current = [stored("A", 2, 1_000), stored("B", 1, 2_000)];
        let desired = [wanted("A", 3, 1_000), wanted("C", 1, 3_000)];

        let plan = plan_edit(&current, &desired);

        assert_eq!(plan.removed.len(), 1);
        assert_eq!(plan.removed[0].product_id, "B");

        assert_eq!(plan.added.len(), 1);
        assert_eq!(plan.added[0].product_id, "C");

        assert_eq!(plan.retained.len(), 1);
        let retained = &plan.retained[0];
        assert_eq!(retained.current.product_id, "A");
        assert_eq!(retained.quantity_delta, 1);
        assert!(!retained.price_changed);
        assert!(retained.needs_update);
    }

    #[test]
    fn test_untouched_item_is_noop() {
        let current = [stored("A", 2, 1_000)];
        let desired = [wanted("A", 2, 1_000)];

        let plan = plan_edit(&current, &desired);

        assert!(plan.is_item_noop());
        assert_eq!(plan.retained.len(), 1);
        assert!(!plan.retained[0].needs_update);
    }

    #[test]
    fn test_price_only_change() {
        let current = [stored("A", 2, 1_000)];
        let desired = [wanted("A", 2, 1_200)];

        let plan = plan_edit(&current, &desired);
        let retained = &plan.retained[0];

        assert_eq!(retained.quantity_delta, 0);
        assert!(retained.price_changed);
        assert!(retained.needs_update);
        assert!(!plan.is_item_noop());
    }

    #[test]
    fn test_quantity_decrease_is_negative_delta() {
        let current = [stored("A", 5, 1_000)];
        let desired = [wanted("A", 2, 1_000)];

        let plan = plan_edit(&current, &desired);
        assert_eq!(plan.retained[0].quantity_delta, -3);
    }

    #[test]
    fn test_discount_change_triggers_update() {
        let current = [stored("A", 2, 1_000)];
        let mut desired_item = wanted("A", 2, 1_000);
        desired_item.discount = Some(ItemDiscount {
            kind: DiscountKind::Percent,
            value: 500,
        });

        let plan = plan_edit(&current, &[desired_item]);
        let retained = &plan.retained[0];

        assert_eq!(retained.quantity_delta, 0);
        assert!(!retained.price_changed);
        assert!(retained.needs_update);
    }

    #[test]
    fn test_empty_desired_removes_everything() {
        let current = [stored("A", 2, 1_000), stored("B", 1, 2_000)];
        let plan = plan_edit(&current, &[]);

        assert_eq!(plan.removed.len(), 2);
        assert!(plan.added.is_empty());
        assert!(plan.retained.is_empty());
    }

    #[test]
    fn test_all_new_on_empty_sale() {
        let desired = [wanted("A", 1, 500), wanted("B", 2, 700)];
        let plan = plan_edit(&[], &desired);

        assert!(plan.removed.is_empty());
        assert_eq!(plan.added.len(), 2);
    }
}
