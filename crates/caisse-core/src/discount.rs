//! # Discount Calculator
//!
//! Turns an admitted promo code and a cart snapshot into a discount amount.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       compute_discount                                  │
//! │                                                                         │
//! │  subtotal < minPurchaseAmount? ──yes──► 0                              │
//! │          │ no                                                           │
//! │          ▼                                                              │
//! │  match promo.discount                                                  │
//! │    Percentage(rate) ──► subtotal × rate   (half-up)                    │
//! │    Fixed(amount)    ──► amount                                         │
//! │    Bogo             ──► Σ cheaper line of each price-ordered pair      │
//! │    FreeShipping     ──► 0   (waiver is applied by the caller)          │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  min(maxDiscountAmount) ──► min(subtotal) ──► max(0)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The caller is expected to have run [`crate::promo::validate`] first. The
//! minimum-purchase check is repeated here so an unvalidated call still
//! cannot produce a discount the promo never allowed.

use tracing::debug;

use crate::money::Money;
use crate::types::{CartLineSnapshot, Discount, PromoCode};

/// Sums `price × quantity` over the cart.
///
/// ```rust
/// use caisse_core::discount::cart_subtotal;
/// use caisse_core::{CartLineSnapshot, Money};
///
/// let lines = vec![
///     CartLineSnapshot::new("rice", Money::from_units(1000), 2),
///     CartLineSnapshot::new("oil", Money::from_units(800), 1),
/// ];
/// assert_eq!(cart_subtotal(&lines).units(), 2800);
/// ```
pub fn cart_subtotal(lines: &[CartLineSnapshot]) -> Money {
    lines.iter().map(CartLineSnapshot::line_total).sum()
}

/// Computes the discount `promo` grants on a cart.
///
/// The result is always within `[0, subtotal]`.
///
/// ```rust
/// use caisse_core::discount::compute_discount;
/// use caisse_core::{Discount, DiscountRate, Money, PromoCode};
/// use chrono::{TimeZone, Utc};
///
/// let promo = PromoCode::new(
///     "DIX",
///     Discount::Percentage(DiscountRate::from_percentage(10.0)),
///     Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap(),
/// );
/// let amount = compute_discount(&promo, Money::from_units(100_000), &[]);
/// assert_eq!(amount.units(), 10_000);
/// ```
pub fn compute_discount(promo: &PromoCode, subtotal: Money, lines: &[CartLineSnapshot]) -> Money {
    if let Some(minimum) = promo.min_purchase_amount {
        if subtotal < minimum {
            debug!(code = %promo.code, %subtotal, %minimum, "Subtotal below minimum, no discount");
            return Money::zero();
        }
    }

    let raw = match promo.discount {
        Discount::Percentage(rate) => subtotal.percentage(rate),
        Discount::Fixed(amount) => amount,
        Discount::Bogo => bogo_discount(promo, lines),
        Discount::FreeShipping => Money::zero(),
    };

    let capped = match promo.max_discount_amount {
        Some(max) => raw.min(max),
        None => raw,
    };
    let amount = capped.clamp_to(subtotal);

    debug!(
        code = %promo.code,
        kind = promo.discount.kind(),
        %subtotal,
        %raw,
        discount = %amount,
        "Computed discount"
    );
    amount
}

/// Buy-one-get-one over the promo's eligible lines.
///
/// ## Pairing
/// ```text
/// eligible, by unit price desc:  [1500 ×1] [1000 ×2] [800 ×1] [500 ×3] [300 ×1]
///                                 └──── pair ────┘  └──── pair ───┘  unpaired
/// contribution:                   1000 × min(1,2)   500 × min(1,3)      0
///                                     = 1000           = 500
/// ```
/// Equal prices keep their cart order (the sort is stable).
fn bogo_discount(promo: &PromoCode, lines: &[CartLineSnapshot]) -> Money {
    let mut eligible: Vec<&CartLineSnapshot> =
        lines.iter().filter(|line| promo.applies_to(line)).collect();
    eligible.sort_by(|a, b| b.price.cmp(&a.price));

    eligible
        .chunks_exact(2)
        .map(|pair| match pair {
            [first, second] => first
                .price
                .min(second.price)
                .multiply_quantity(i64::from(first.quantity.min(second.quantity))),
            _ => Money::zero(),
        })
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
