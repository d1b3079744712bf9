//! # Domain Types
//!
//! Core domain types for the sale lifecycle engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    SaleItem     │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──┤  sale_id (FK)   │   │  sale_id (FK)   │       │
//! │  │  display_number │   │  quantity       │   │  method         │       │
//! │  │  status / kind  │   │  returned_qty   │   │  amount_cents   │       │
//! │  │  totals tuple   │   │  discount       │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   SaleReturn    │   │ CustomerCredit  │   │   StockLevel    │       │
//! │  │  + ReturnItem   │   │  total/used/    │   │  (product,      │       │
//! │  │  refund value   │   │  remaining      │   │   store) → qty  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Sales have:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `display_number`: sequential, human-readable, printed on receipts

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
///
/// `Cancelled` and `Returned` are terminal with respect to stock effects:
/// cancellation restores the never-returned portion of every item, a full
/// return restores exactly the returned items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale is being assembled (items/payments being added).
    InProgress,
    /// Sale has been explicitly completed.
    Completed,
    /// Sale was cancelled; stock restored, payments voided.
    Cancelled,
    /// Every item was returned to the store.
    Returned,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::InProgress
    }
}

// =============================================================================
// Sale Kind
// =============================================================================

/// How the sale is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleKind {
    /// Paid at the counter.
    Normal,
    /// Deferred payment: the customer settles the balance over time,
    /// tracked against `due_date`.
    Deferred,
}

impl Default for SaleKind {
    fn default() -> Self {
        SaleKind::Normal
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// Accepted payment methods.
///
/// `StoreCredit` is special: recording such a payment consumes the
/// customer's credit grants FIFO before the payment row is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    Transfer,
    StoreCredit,
}

impl PaymentMethod {
    /// Human-readable label for history descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit card",
            PaymentMethod::DebitCard => "debit card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::StoreCredit => "store credit",
        }
    }
}

// =============================================================================
// Discount Kind
// =============================================================================

/// Shape of a discount value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// A fixed amount; `value` is cents.
    Flat,
    /// A percentage of the base; `value` is basis points (1000 = 10%).
    Percent,
}

// =============================================================================
// Return Kind
// =============================================================================

/// Whether a return issues store credit or is settled out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// Refund value becomes a CustomerCredit grant.
    WithCredit,
    /// Refund is handled outside the credit ledger (cash back, etc.).
    WithoutCredit,
}

// =============================================================================
// History Action
// =============================================================================

/// Classifies entries in the per-sale audit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    ItemAdded,
    ItemRemoved,
    Payment,
    PaymentEdited,
    Discount,
    Edited,
    Completed,
    Cancelled,
    Return,
    Deleted,
}

// =============================================================================
// Sale
// =============================================================================

/// A point-of-sale transaction.
///
/// ## Invariants (hold after every mutation)
/// - `total_cents == Σ item.subtotal_cents − discount_cents`
/// - `balance_cents == total_cents − paid_cents`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Sequential receipt number. Allocated from a counter; gaps from
    /// deleted sales are acceptable and numbers are never reused.
    pub display_number: i64,
    pub customer_id: String,
    pub store_id: i64,
    pub seller_id: String,
    pub status: SaleStatus,
    pub kind: SaleKind,
    /// Expected settlement date for deferred sales.
    pub due_date: Option<NaiveDate>,
    /// Grand total after all discounts.
    pub total_cents: i64,
    /// Item-level plus sale-level discounts, resolved to cents.
    pub discount_cents: i64,
    /// Sum of all payment amounts.
    pub paid_cents: i64,
    /// `total_cents - paid_cents`; negative means over-paid.
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
}

impl Sale {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the resolved discount total as Money.
    #[inline]
    pub fn discount_total(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    /// Returns the amount paid as Money.
    #[inline]
    pub fn paid_total(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    /// Returns the outstanding balance as Money.
    #[inline]
    pub fn balance_due(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// The sale's total before any discount was taken.
    ///
    /// Used as the denominator when allocating a discount share to a
    /// partial return.
    #[inline]
    pub fn total_before_discount(&self) -> Money {
        Money::from_cents(self.total_cents + self.discount_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item on a sale.
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Product code at time of sale (frozen).
    pub product_code: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// `unit_price_cents × quantity`.
    pub subtotal_cents: i64,
    /// Per-item discount shape, if any.
    pub discount_kind: Option<DiscountKind>,
    /// Cents for flat, basis points for percent.
    pub discount_value: Option<i64>,
    /// The discount resolved to cents at write time.
    pub discount_cents: i64,
    /// Units already returned. Invariant: `0 ≤ returned_quantity ≤ quantity`.
    pub returned_quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Units not yet returned by the customer.
    #[inline]
    pub fn unreturned_quantity(&self) -> i64 {
        self.quantity - self.returned_quantity
    }

    /// True once every unit has come back.
    #[inline]
    pub fn fully_returned(&self) -> bool {
        self.returned_quantity >= self.quantity
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards a sale.
/// A sale can have multiple payments for split tender and deferred
/// settlement scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    /// Business date the money changed hands.
    pub paid_on: NaiveDate,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    /// Set when the method was re-tagged after the fact.
    pub edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub edited_by: Option<String>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// A sale-level discount.
///
/// Item-level discounts live on [`SaleItem`]; both feed the same
/// `discount_cents` total on the sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Discount {
    pub id: String,
    pub sale_id: String,
    pub kind: DiscountKind,
    /// Cents for flat, basis points for percent.
    pub value: i64,
    pub reason: Option<String>,
    pub applied_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Return
// =============================================================================

/// A partial or full reversal of a completed sale's items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleReturn {
    pub id: String,
    pub sale_id: String,
    pub kind: ReturnKind,
    /// The refund value after proportional discount allocation.
    pub total_cents: i64,
    pub refund_method: Option<PaymentMethod>,
    pub reason: String,
    pub processed_by: String,
    pub created_at: DateTime<Utc>,
}

/// One returned line, referencing the sale item it reverses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnItem {
    pub id: String,
    pub return_id: String,
    pub sale_item_id: String,
    pub quantity: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer Credit
// =============================================================================

/// A store-credit grant on a customer's account.
///
/// Consumed oldest-first (FIFO on `created_at`) when the customer pays
/// with store credit. Invariant: `remaining_cents == total_cents −
/// used_cents ≥ 0`, enforced both here and by a database CHECK.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CustomerCredit {
    pub id: String,
    pub customer_id: String,
    /// Sale whose return produced this grant, if any.
    pub origin_sale_id: Option<String>,
    pub origin_return_id: Option<String>,
    pub total_cents: i64,
    pub used_cents: i64,
    pub remaining_cents: i64,
    pub reason: Option<String>,
    pub granted_by: String,
    pub created_at: DateTime<Utc>,
}

impl CustomerCredit {
    /// Returns the unconsumed balance as Money.
    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.remaining_cents)
    }

    /// A grant with nothing left is skipped by the allocator.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining_cents <= 0
    }
}

// =============================================================================
// Stock Ledger Types
// =============================================================================

/// Per-(product, store) stock quantity. Never negative: the storage layer
/// rejects any write that would overdraw it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockLevel {
    pub product_id: String,
    pub store_id: i64,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

/// One append-only entry in the stock movement log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: i64,
    pub product_id: String,
    pub store_id: i64,
    /// Signed change: negative for sales, positive for restocks/returns.
    pub delta: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: String,
    /// None for rows written by the ledger's own row-event triggers.
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// History
// =============================================================================

/// One immutable entry in a sale's audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct HistoryEntry {
    pub id: i64,
    pub sale_id: String,
    pub action: HistoryAction,
    pub description: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cash Register
// =============================================================================

/// A cash-affecting entry in a store's register session.
///
/// The engine only ever retracts entries keyed to a sale when that sale
/// is cancelled; recording them is the register module's business.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RegisterEntry {
    pub id: String,
    pub store_id: i64,
    pub sale_id: Option<String>,
    pub kind: String,
    pub amount_cents: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Caller-Supplied Item State
// =============================================================================

/// A per-item discount as supplied by the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ItemDiscount {
    pub kind: DiscountKind,
    /// Cents for flat, basis points for percent.
    pub value: i64,
}

impl ItemDiscount {
    /// Resolves this discount to cents against a line subtotal.
    pub fn resolve(&self, subtotal: Money) -> Money {
        match self.kind {
            DiscountKind::Flat => Money::from_cents(self.value),
            DiscountKind::Percent => subtotal.percent_of(self.value as u32),
        }
    }
}

/// The desired state of one line item, as supplied to Create/Edit.
///
/// The stored `subtotal_cents` is always computed here
/// (`unit_price × quantity`), never trusted from the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSaleItem {
    pub product_id: String,
    pub product_name: String,
    pub product_code: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount: Option<ItemDiscount>,
}

impl NewSaleItem {
    /// Line subtotal: `unit_price × quantity`.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    /// The item discount resolved to cents, zero when absent.
    pub fn resolved_discount(&self) -> Money {
        self.discount
            .map(|d| d.resolve(self.subtotal()))
            .unwrap_or_else(Money::zero)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
