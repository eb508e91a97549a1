//! # Validation Module
//!
//! Record validation for the back office.
//!
//! ## Who Calls This
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Back-office form (TypeScript)                                │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Issuer (Rust)                                                │
//! │  └── THIS MODULE: promo/program/cart-line record rules                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Rules engine (discount, promo, loyalty)                      │
//! │  └── Trusts the record. Never calls into this module.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caisse_core::validation::{normalize_code, validate_code};
//!
//! let code = normalize_code("  tabaski10 ");
//! assert_eq!(code, "TABASKI10");
//! assert!(validate_code(&code).is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CartLineSnapshot, Discount, LoyaltyProgram, PromoCode};
use crate::{MAX_CODE_LENGTH, MAX_ITEM_QUANTITY, MIN_CODE_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Promo Code
// =============================================================================

/// Canonical form of a code typed at the till: trimmed, upper-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validates a promo code string.
///
/// ## Rules
/// - Must not be empty
/// - Between 3 and 32 characters
/// - Letters, digits, hyphens and underscores only
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    let len = code.chars().count();
    if len < MIN_CODE_LENGTH {
        return Err(ValidationError::TooShort {
            field: "code".to_string(),
            min: MIN_CODE_LENGTH,
        });
    }

    if len > MAX_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LENGTH,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a promo code record before it is saved.
///
/// ## Rules
/// - `code` passes [`validate_code`]
/// - Percentage at most 100%; fixed amount positive
/// - Minimum purchase and maximum discount not negative
/// - `start_date` not after `end_date`
/// - `usage_count` not above `usage_limit`
pub fn validate_promo_code(promo: &PromoCode) -> ValidationResult<()> {
    validate_code(&promo.code)?;

    match promo.discount {
        Discount::Percentage(rate) if rate.bps() > 10_000 => {
            return Err(ValidationError::OutOfRange {
                field: "discountValue".to_string(),
                min: 0,
                max: 100,
            });
        }
        Discount::Fixed(amount) if !amount.is_positive() => {
            return Err(ValidationError::MustBePositive {
                field: "discountValue".to_string(),
            });
        }
        _ => {}
    }

    validate_non_negative("minPurchaseAmount", promo.min_purchase_amount)?;
    validate_non_negative("maxDiscountAmount", promo.max_discount_amount)?;

    if promo.start_date > promo.end_date {
        return Err(ValidationError::InvertedRange {
            start: "startDate".to_string(),
            end: "endDate".to_string(),
        });
    }

    if let Some(limit) = promo.usage_limit {
        if promo.usage_count > limit {
            return Err(ValidationError::OutOfRange {
                field: "usageCount".to_string(),
                min: 0,
                max: i64::from(limit),
            });
        }
    }

    Ok(())
}

fn validate_non_negative(field: &str, amount: Option<Money>) -> ValidationResult<()> {
    match amount {
        Some(amount) if amount.is_negative() => Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// Validates a cart line snapshot.
///
/// ## Rules
/// - Product id required
/// - Price not negative (zero is a free item)
/// - Quantity between 1 and MAX_ITEM_QUANTITY (999)
pub fn validate_cart_line(line: &CartLineSnapshot) -> ValidationResult<()> {
    if line.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if line.price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    if line.quantity == 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if line.quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::from(MAX_ITEM_QUANTITY),
        });
    }

    Ok(())
}

// =============================================================================
// Loyalty Program
// =============================================================================

/// Validates loyalty program settings.
///
/// ## Rules
/// - Point value not negative
/// - Bonus window, if set: start not after end, multiplier above zero
pub fn validate_loyalty_program(program: &LoyaltyProgram) -> ValidationResult<()> {
    if program.points_value.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "pointsValue".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    if let Some(bonus) = &program.bonus {
        if bonus.start_date > bonus.end_date {
            return Err(ValidationError::InvertedRange {
                start: "bonusStartDate".to_string(),
                end: "bonusEndDate".to_string(),
            });
        }
        if bonus.multiplier.bps() == 0 {
            return Err(ValidationError::MustBePositive {
                field: "bonusMultiplier".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
