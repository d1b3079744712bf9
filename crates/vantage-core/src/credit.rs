//! # FIFO Store-Credit Allocation
//!
//! Decides how a store-credit payment is spread across a customer's
//! credit grants, oldest first.
//!
//! ## Why a Pure Function?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The allocation is a priority-ordered assignment problem:               │
//! │                                                                         │
//! │  grants (by creation):  [ #1: 30.00 ] [ #2: 50.00 ]                    │
//! │  payment: 40.00                                                         │
//! │                                                                         │
//! │  allocate ──► [ (#1, 30.00), (#2, 10.00) ]                             │
//! │                                                                         │
//! │  The caller applies the resulting writes; nothing is mutated here.      │
//! │  Either the WHOLE payment is allocatable or NOTHING is touched;        │
//! │  the all-or-nothing check happens before any allocation is produced.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::CustomerCredit;

// =============================================================================
// Allocation
// =============================================================================

/// One grant consumption produced by the allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditAllocation {
    pub credit_id: String,
    pub amount_cents: i64,
}

/// Walks the grants in the order given (the ledger returns them oldest
/// first) and consumes `min(remaining_need, grant.remaining)` from each
/// until the payment is covered.
///
/// ## Errors
/// [`CoreError::InsufficientCredit`] when the grants cannot cover the
/// amount. Checked up front: no partial allocation is ever returned.
///
/// ## Example
/// ```rust
/// # use vantage_core::credit::allocate_fifo;
/// # use vantage_core::money::Money;
/// # use vantage_core::types::CustomerCredit;
/// # use chrono::Utc;
/// # fn grant(id: &str, remaining: i64) -> CustomerCredit {
/// #     CustomerCredit {
/// #         id: id.to_string(), customer_id: "c1".to_string(),
/// #         origin_sale_id: None, origin_return_id: None,
/// #         total_cents: remaining, used_cents: 0, remaining_cents: remaining,
/// #         reason: None, granted_by: "u1".to_string(), created_at: Utc::now(),
/// #     }
/// # }
/// let grants = [grant("old", 3_000), grant("new", 5_000)];
/// let allocations = allocate_fifo(&grants, Money::from_cents(4_000)).unwrap();
///
/// assert_eq!(allocations[0].amount_cents, 3_000); // oldest drained first
/// assert_eq!(allocations[1].amount_cents, 1_000);
/// ```
pub fn allocate_fifo(
    grants: &[CustomerCredit],
    amount: Money,
) -> CoreResult<Vec<CreditAllocation>> {
    let available: Money = grants.iter().map(CustomerCredit::remaining).sum();

    if available < amount {
        return Err(CoreError::InsufficientCredit {
            available_cents: available.cents(),
            requested_cents: amount.cents(),
        });
    }

    let mut allocations = Vec::new();
    let mut remaining_need = amount;

    for grant in grants {
        if remaining_need.is_zero() {
            break;
        }
        if grant.is_exhausted() {
            continue;
        }

        let consumed = remaining_need.min(grant.remaining());
        allocations.push(CreditAllocation {
            credit_id: grant.id.clone(),
            amount_cents: consumed.cents(),
        });
        remaining_need -= consumed;
    }

    Ok(allocations)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn grant(id: &str, remaining_cents: i64) -> CustomerCredit {
        CustomerCredit {
            id: id.to_string(),
            customer_id: "c1".to_string(),
            origin_sale_id: None,
            origin_return_id: None,
            total_cents: remaining_cents.max(1),
            used_cents: 0,
            remaining_cents,
            reason: None,
            granted_by: "u1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_oldest_grant_drains_first() {
        // Oldest remaining 30.00, newest remaining 50.00; paying 40.00
        // fully consumes the oldest and takes 10.00 from the newest.
        let grants = [grant("old", 3_000), grant("new", 5_000)];

        let allocations = allocate_fifo(&grants, Money::from_cents(4_000)).unwrap();

        assert_eq!(
            allocations,
            vec![
                CreditAllocation {
                    credit_id: "old".to_string(),
                    amount_cents: 3_000,
                },
                CreditAllocation {
                    credit_id: "new".to_string(),
                    amount_cents: 1_000,
                },
            ]
        );
    }

    #[test]
    fn test_single_grant_partial_consumption() {
        let grants = [grant("only", 5_000)];
        let allocations = allocate_fifo(&grants, Money::from_cents(2_000)).unwrap();

        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].amount_cents, 2_000);
    }

    #[test]
    fn test_exact_coverage() {
        let grants = [grant("a", 1_000), grant("b", 2_000)];
        let allocations = allocate_fifo(&grants, Money::from_cents(3_000)).unwrap();

        let consumed: i64 = allocations.iter().map(|a| a.amount_cents).sum();
        assert_eq!(consumed, 3_000);
    }

    #[test]
    fn test_insufficient_credit_allocates_nothing() {
        let grants = [grant("a", 1_000), grant("b", 2_000)];
        let err = allocate_fifo(&grants, Money::from_cents(4_000)).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientCredit {
                available_cents: 3_000,
                requested_cents: 4_000,
            }
        ));
    }

    #[test]
    fn test_exhausted_grants_are_skipped() {
        let grants = [grant("empty", 0), grant("live", 2_000)];
        let allocations = allocate_fifo(&grants, Money::from_cents(1_500)).unwrap();

        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].credit_id, "live");
    }

    #[test]
    fn test_no_grants_at_all() {
        let err = allocate_fifo(&[], Money::from_cents(100)).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientCredit { .. }));
    }
}
