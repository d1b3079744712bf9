//! # Validation Module
//!
//! Input validation utilities for the sale engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (UI / API boundary)                                   │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine operation (Rust)                                      │
//! │  └── THIS MODULE: business rule validation, before any mutation        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / FK constraints                                │
//! │  └── CHECK (quantity >= 0) on the stock ledger                         │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{DiscountKind, ItemDiscount, NewSaleItem};
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (promotional give-aways)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Cannot pay zero or negative amounts
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a discount value for its kind.
///
/// ## Rules
/// - Flat: non-negative cents
/// - Percent: 0 to 10000 basis points (0% to 100%)
pub fn validate_discount(kind: DiscountKind, value: i64) -> ValidationResult<()> {
    match kind {
        DiscountKind::Flat => {
            if value < 0 {
                return Err(ValidationError::OutOfRange {
                    field: "discount value".to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
        }
        DiscountKind::Percent => {
            if !(0..=10_000).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field: "discount percent".to_string(),
                    min: 0,
                    max: 10_000,
                });
            }
        }
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates one caller-supplied line item.
pub fn validate_new_item(item: &NewSaleItem) -> ValidationResult<()> {
    if item.product_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }

    validate_quantity(item.quantity)?;
    validate_price_cents(item.unit_price_cents)?;

    if let Some(ItemDiscount { kind, value }) = item.discount {
        validate_discount(kind, value)?;

        // An item discount may not exceed its own line.
        let resolved = ItemDiscount { kind, value }.resolve(item.subtotal());
        if resolved > item.subtotal() {
            return Err(ValidationError::DiscountExceedsTotal {
                discount_cents: resolved.cents(),
                subtotal_cents: item.subtotal().cents(),
            });
        }
    }

    Ok(())
}

/// Validates a full desired item set (Create/Edit input).
///
/// ## Rules
/// - At most MAX_SALE_ITEMS lines
/// - Every line individually valid
pub fn validate_item_set(items: &[NewSaleItem]) -> ValidationResult<()> {
    if items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "sale items".to_string(),
            min: 0,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    for item in items {
        validate_new_item(item)?;
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use vantage_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates free-text reasons (cancellation, return, discount).
///
/// ## Rules
/// - Must not be empty: the history trail needs a human explanation
/// - Maximum 500 characters
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn new_item(quantity: i64, unit_price_cents: i64) -> NewSaleItem {
        NewSaleItem {
            product_id: "p1".to_string(),
            product_name: "Handset".to_string(),
            product_code: "HS-01".to_string(),
            quantity,
            unit_price_cents,
            discount: None,
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(100).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_payment_amount(-500).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(DiscountKind::Flat, 0).is_ok());
        assert!(validate_discount(DiscountKind::Flat, 5_000).is_ok());
        assert!(validate_discount(DiscountKind::Flat, -1).is_err());

        assert!(validate_discount(DiscountKind::Percent, 0).is_ok());
        assert!(validate_discount(DiscountKind::Percent, 10_000).is_ok());
        assert!(validate_discount(DiscountKind::Percent, 10_001).is_err());
        assert!(validate_discount(DiscountKind::Percent, -1).is_err());
    }

    #[test]
    fn test_validate_new_item() {
        assert!(validate_new_item(&new_item(2, 10_000)).is_ok());

        let mut bad = new_item(2, 10_000);
        bad.product_id = "  ".to_string();
        assert!(validate_new_item(&bad).is_err());

        // Flat item discount larger than the line is rejected
        let mut over = new_item(1, 1_000);
        over.discount = Some(ItemDiscount {
            kind: DiscountKind::Flat,
            value: 2_000,
        });
        assert!(matches!(
            validate_new_item(&over),
            Err(ValidationError::DiscountExceedsTotal { .. })
        ));
    }

    #[test]
    fn test_validate_item_set_size() {
        let items: Vec<NewSaleItem> = (0..=MAX_SALE_ITEMS)
            .map(|_| new_item(1, 100))
            .collect();
        assert!(validate_item_set(&items).is_err());
        assert!(validate_item_set(&items[..MAX_SALE_ITEMS]).is_ok());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
        assert!(validate_uuid("123").is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("customer changed their mind").is_ok());
        assert!(validate_reason("").is_err());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(501)).is_err());
    }
}
