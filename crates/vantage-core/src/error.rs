//! # Error Types
//!
//! Domain-specific error types for vantage-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vantage-core errors (this file)                                       │
//! │  ├── CoreError        - Pure business rule violations                  │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  vantage-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  vantage-engine errors (separate crate)                                │
//! │  └── EngineError      - The full taxonomy the caller sees              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → Caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (IDs, amounts, limits)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Pure business logic errors.
///
/// These errors represent business rule violations detectable without any
/// storage access. They should be caught and translated to user-friendly
/// messages by the operation layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The customer's store-credit grants cannot cover the payment.
    ///
    /// ## When This Occurs
    /// - A `store_credit` payment exceeds the sum of all remaining
    ///   grant balances
    ///
    /// No grant is consumed when this is returned: the FIFO allocator
    /// checks the full amount before producing any allocation.
    #[error("insufficient store credit: available {available_cents}, requested {requested_cents}")]
    InsufficientCredit {
        available_cents: i64,
        requested_cents: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any mutation runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A discount would push the sale total below zero.
    ///
    /// ## When This Occurs
    /// - Applying a flat discount larger than the remaining subtotal
    /// - Stacking discounts past 100%
    ///
    /// The totals engine never clamps; the rejection happens at the
    /// point of discount application.
    #[error("discount of {discount_cents} cents exceeds the sale subtotal of {subtotal_cents} cents")]
    DiscountExceedsTotal {
        discount_cents: i64,
        subtotal_cents: i64,
    },

    /// A return line asks for more units than the item still holds.
    ///
    /// ## When This Occurs
    /// - Returning quantity beyond `quantity - returned_quantity`
    /// - Re-returning an already fully returned item
    #[error("cannot return {requested} units; only {remaining} remain unreturned")]
    ReturnExceedsRemaining { requested: i64, remaining: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientCredit {
            available_cents: 3000,
            requested_cents: 4500,
        };
        assert_eq!(
            err.to_string(),
            "insufficient store credit: available 3000, requested 4500"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer_id".to_string(),
        };
        assert_eq!(err.to_string(), "customer_id is required");

        let err = ValidationError::ReturnExceedsRemaining {
            requested: 3,
            remaining: 1,
        };
        assert_eq!(
            err.to_string(),
            "cannot return 3 units; only 1 remain unreturned"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
