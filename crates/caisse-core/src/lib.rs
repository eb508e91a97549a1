//! # caisse-core: Promotion & Loyalty Rules for the Caisse POS
//!
//! This crate decides what a promo code is worth, whether it may be used,
//! and how a customer's spending turns into points and tiers. Every rule is
//! a pure function over plain data with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caisse Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Checkout workflow (register app / caisse CLI)          │   │
//! │  │   Cart ──► Promo entry ──► Payment ──► Order completion        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plain data in, values out              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caisse-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  promo    │  │ discount  │  │  loyalty  │  │redemption │  │   │
//! │  │   │ validate  │  │ compute_  │  │  earn /   │  │  Usage    │  │   │
//! │  │   │           │  │ discount  │  │  tiers    │  │  Counter  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   error   │  │validation │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK READS • PURE FUNCTIONS       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 Store (promo records, ledger)                   │   │
//! │  │        implements UsageCounter with a conditional UPDATE        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (PromoCode, CartLineSnapshot, LoyaltyProgram, etc.)
//! - [`money`] - Money type with integer FCFA arithmetic
//! - [`discount`] - Discount amount for a promo against a cart
//! - [`promo`] - Promo code admissibility
//! - [`loyalty`] - Points, tiers, redemption
//! - [`redemption`] - Atomic promo usage counting
//! - [`error`] - Domain error types
//! - [`validation`] - Back-office record validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, "now" is always a parameter
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All amounts are whole FCFA (i64)
//! 4. **Decisions are values**: a rejected promo is a [`PromoRejection`], not a panic
//!
//! ## Example Usage
//!
//! ```rust
//! use caisse_core::discount::{cart_subtotal, compute_discount};
//! use caisse_core::{CartLineSnapshot, Discount, DiscountRate, Money, PromoCode};
//! use chrono::{Duration, Utc};
//!
//! let now = Utc::now();
//! let promo = PromoCode::new(
//!     "TABASKI10",
//!     Discount::Percentage(DiscountRate::from_percentage(10.0)),
//!     now - Duration::days(1),
//!     now + Duration::days(7),
//! );
//!
//! let lines = vec![CartLineSnapshot::new("thiof", Money::from_units(12_500), 2)];
//! let subtotal = cart_subtotal(&lines);
//!
//! assert!(caisse_core::promo::validate(Some(&promo), subtotal, 0, now).is_valid);
//! assert_eq!(compute_discount(&promo, subtotal, &lines), Money::from_units(2_500));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod promo;
pub mod redemption;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use caisse_core::Money` instead of
// `use caisse_core::money::Money`

pub use discount::{cart_subtotal, compute_discount};
pub use error::{CoreError, CoreResult, UsageScope, ValidationError};
pub use loyalty::{CustomerLoyalty, Redemption, SaleCredit};
pub use money::Money;
pub use promo::{PromoRejection, PromoValidation};
pub use redemption::{InMemoryUsageCounter, UsageCounter, UsageSnapshot};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Shortest promo code the back office accepts.
pub const MIN_CODE_LENGTH: usize = 3;

/// Longest promo code the back office accepts.
///
/// ## Business Reason
/// Codes are typed by cashiers and printed on receipts.
pub const MAX_CODE_LENGTH: usize = 32;

/// Maximum quantity of a single cart line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: u32 = 999;
