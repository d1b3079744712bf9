//! # vantage-engine: Sale Lifecycle & Reconciliation Engine
//!
//! The operations layer of Vantage POS: creating, building, editing,
//! cancelling, and returning sales while keeping four interdependent
//! ledgers consistent: sale totals, per-store stock, customer store
//! credit, and the audit history.
//!
//! ## Control Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller (UI / API layer)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleService operation                                                  │
//! │       │  1. validate against current aggregate state                    │
//! │       │  2. compute deltas against the stock/credit ledgers             │
//! │       │  3. write sale/item/payment/discount rows                       │
//! │       │     (ledger triggers apply row-event stock effects)             │
//! │       │  4. recompute the totals tuple                                  │
//! │       ▼  5. append history entries, in narrative order                  │
//! │  Result<aggregate, EngineError>                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Model (read this before touching the edit path)
//!
//! Operations are sequences of individually-atomic statements with **no
//! cross-call transaction**. Create, Return, and credit consumption
//! validate fully before mutating; the Edit loop validates and mutates
//! interleaved per item, so a mid-loop failure leaves prior item/stock
//! mutations in place. Callers must treat a failed edit as *possibly
//! partially applied* and re-fetch the sale before retrying. Concurrent
//! edits of the same sale are not serialized here; the storage layer's
//! atomic conditional adjustments keep stock non-negative regardless.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cancel;
pub mod edit;
pub mod error;
pub mod returns;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use edit::EditSaleRequest;
pub use error::{EngineError, EngineResult};
pub use returns::{ReturnLine, ReturnRequest};
pub use service::{
    CreateSaleRequest, FullSale, NewDiscount, NewPayment, ReturnWithItems, SaleService,
};

// The filter type callers pass to list_sales
pub use vantage_db::repository::sale::SaleFilter;
