//! # Engine Error Types
//!
//! The error taxonomy callers of the engine see.
//!
//! ## Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NotFound            sale / item / payment absent                       │
//! │  InvalidState        operation not permitted in current status          │
//! │  InsufficientStock   a store cannot cover the requested quantity        │
//! │  InsufficientCredit  grants cannot cover a store-credit payment         │
//! │  Validation          malformed monetary/quantity input                  │
//! │  Db                  underlying collaborator call failed                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error carries a human-readable message and is returned
//! synchronously. The only failures not surfaced as errors are the
//! best-effort history appends and register retractions, which are
//! logged with `warn!` by the operations.

use thiserror::Error;

use vantage_core::{CoreError, SaleStatus, ValidationError};
use vantage_db::DbError;

/// Errors returned by the public sale operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The sale's current status forbids this operation.
    ///
    /// ## Examples
    /// - Editing a cancelled sale
    /// - Returning items on a sale that was never completed
    /// - Deleting a sale that holds payments
    #[error("sale {sale_id} is {status:?}: cannot {operation}")]
    InvalidState {
        sale_id: String,
        status: SaleStatus,
        operation: &'static str,
    },

    /// A store's stock cannot cover the requested quantity.
    #[error("insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// The customer's store-credit grants cannot cover the payment.
    /// No grant was mutated.
    #[error("insufficient store credit: available {available_cents}, requested {requested_cents}")]
    InsufficientCredit {
        available_cents: i64,
        requested_cents: i64,
    },

    /// Malformed input, rejected before any mutation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An underlying collaborator call failed.
    #[error("persistence failure: {0}")]
    Db(DbError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Database errors largely pass through, but the ones with a precise
/// domain meaning are translated:
/// - the ledger's conditional-decrement refusal → `InsufficientStock`
/// - row-lookup misses → `NotFound`
///
/// A CHECK violation from the stock triggers is NOT auto-translated
/// here because it carries no product context; the operations that
/// insert ledger-observed rows map it themselves via
/// [`DbError::is_stock_overdraw`].
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            } => EngineError::InsufficientStock {
                product: product_id,
                available,
                requested,
            },
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Db(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientCredit {
                available_cents,
                requested_cents,
            } => EngineError::InsufficientCredit {
                available_cents,
                requested_cents,
            },
            CoreError::Validation(v) => EngineError::Validation(v),
        }
    }
}
