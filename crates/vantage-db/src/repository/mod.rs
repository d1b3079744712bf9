//! # Repository Module
//!
//! Database repository implementations for Vantage POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Engine operation                                                      │
//! │       │                                                                 │
//! │       │  db.sales().get_items(&sale_id)                                │
//! │       │  db.stock().adjust(&product_id, store_id, +2, reason, actor)   │
//! │       ▼                                                                 │
//! │  SaleRepository / StockRepository / ...                                │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • Each external collaborator of the engine is one repository          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`sale::SaleRepository`] - The sale aggregate: sales, items, payments,
//!   discounts, returns
//! - [`stock::StockRepository`] - The stock ledger: levels, atomic
//!   adjustments, movement log
//! - [`credit::CreditRepository`] - The customer credit ledger
//! - [`history::HistoryRepository`] - The append-only sale history log
//! - [`register::RegisterRepository`] - Cash register entries

pub mod credit;
pub mod history;
pub mod register;
pub mod sale;
pub mod stock;
