//! # vantage-core: Pure Business Logic for Vantage POS
//!
//! This crate is the **heart** of the sale lifecycle engine. It contains
//! the reconciliation math as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Vantage POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  vantage-engine (operations)                    │   │
//! │  │   create ──► add items/payments ──► edit ──► cancel ──► return │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vantage-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  totals   │  │   diff    │  │   │
//! │  │   │   Sale    │  │   Money   │  │ invariant │  │ edit plan │  │   │
//! │  │   │  Payment  │  │  bps math │  │  engine   │  │  (by-diff)│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │  credit   │  │ validation│                                 │   │
//! │  │   │ FIFO alloc│  │   rules   │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    vantage-db (Database Layer)                  │   │
//! │  │          SQLite ledgers, migrations, repositories               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, SaleItem, Payment, CustomerCredit, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`totals`] - The totals invariant engine and refund math
//! - [`diff`] - Edit-by-diff planning (old vs desired item sets)
//! - [`credit`] - FIFO store-credit allocation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use vantage_core::money::Money;
//! use vantage_core::totals::proportional_refund;
//!
//! // A sale of $200.00 with $20.00 discount; one $50.00 item comes back.
//! let refund = proportional_refund(
//!     Money::from_cents(5_000),
//!     Money::from_cents(2_000),
//!     Money::from_cents(20_000),
//! );
//!
//! // The customer gets $45.00: the discount share stays withheld.
//! assert_eq!(refund.cents(), 4_500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod credit;
pub mod diff;
pub mod error;
pub mod money;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use vantage_core::Money` instead of
// `use vantage_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use totals::SaleTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed on a single sale
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
/// Can be made configurable per-store in future versions.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single item on a sale
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
/// Configurable per-store in future versions.
pub const MAX_ITEM_QUANTITY: i64 = 999;
