//! # vantage-db: Database Layer for Vantage POS
//!
//! This crate provides database access for the sale lifecycle engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Vantage POS Data Flow                             │
//! │                                                                         │
//! │  Engine operation (edit_sale, cancel_sale, ...)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     vantage-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  sale, stock, │    │  (embedded)  │  │   │
//! │  │   │               │    │  credit,      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  history,     │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │  register     │    │  + triggers  │  │   │
//! │  │   │ Management    │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL, foreign keys ON, ledger triggers)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Ledger Triggers
//!
//! The schema installs two AFTER INSERT triggers: a `sale_items` row
//! deducts stock, a `return_items` row restores it, both with an
//! append-only `stock_movements` record. Repositories here NEVER repeat
//! those adjustments; [`repository::stock::StockRepository::adjust`]
//! exists only for the pure edit/cancel reconciliation paths that are
//! not expressed as inserts of ledger-observed rows.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vantage_db::{Database, DbConfig};
//!
//! // Create database with default config
//! let config = DbConfig::new("path/to/db.sqlite");
//! let db = Database::new(config).await?;
//!
//! // Use repositories
//! let sale = db.sales().get_by_id("uuid-here").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::credit::CreditRepository;
pub use repository::history::HistoryRepository;
pub use repository::register::RegisterRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::StockRepository;
