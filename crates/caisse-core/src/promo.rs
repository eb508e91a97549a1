//! # Promo Validator
//!
//! Decides whether a promo code may be applied to a cart, before any discount
//! is computed.
//!
//! ## Check Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate(promo, subtotal, customer_usage_count, now)                   │
//! │                                                                         │
//! │  1. promo is None                      ──► InvalidCode                  │
//! │  2. status != active                   ──► Inactive                     │
//! │  3. now < startDate                    ──► NotYetValid                  │
//! │  4. now > endDate                      ──► Expired                      │
//! │  5. usageCount >= usageLimit           ──► UsageLimitReached            │
//! │  6. customer count >= usagePerCustomer ──► CustomerLimitReached         │
//! │  7. subtotal < minPurchaseAmount       ──► MinimumNotMet                │
//! │  8. otherwise                          ──► valid                        │
//! │                                                                         │
//! │  First failure wins.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation only reads `usage_count`. The order-completion workflow records
//! a use after payment is confirmed, through a
//! [`UsageCounter`](crate::redemption::UsageCounter).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PromoCode, PromoStatus};

// =============================================================================
// Rejection
// =============================================================================

/// Why a promo code was refused. `Display` is the cashier-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PromoRejection {
    #[error("Invalid promo code")]
    InvalidCode,

    #[error("This promo code is not active")]
    Inactive { status: PromoStatus },

    #[error("This promo code is not yet valid")]
    NotYetValid {
        #[ts(as = "String")]
        start: DateTime<Utc>,
    },

    #[error("This promo code has expired")]
    Expired {
        #[ts(as = "String")]
        end: DateTime<Utc>,
    },

    #[error("This promo code has reached its usage limit")]
    UsageLimitReached { limit: u32 },

    #[error("You have already used this promo code the maximum number of times")]
    CustomerLimitReached { limit: u32 },

    #[error("Minimum purchase of {required} required")]
    MinimumNotMet { required: Money },
}

// =============================================================================
// Validation Result
// =============================================================================

/// Outcome of [`validate`], shaped for the checkout screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromoValidation {
    pub is_valid: bool,
    /// Set when `is_valid` is false.
    pub error: Option<PromoRejection>,
    /// Human-readable outcome.
    pub message: Option<String>,
}

impl PromoValidation {
    fn valid(code: &str) -> Self {
        PromoValidation {
            is_valid: true,
            error: None,
            message: Some(format!("Promo code {} is valid", code)),
        }
    }

    fn rejected(rejection: PromoRejection) -> Self {
        PromoValidation {
            is_valid: false,
            message: Some(rejection.to_string()),
            error: Some(rejection),
        }
    }

    /// Converts into a `Result` for callers that prefer `?`.
    pub fn into_result(self) -> Result<(), PromoRejection> {
        match self.error {
            Some(rejection) => Err(rejection),
            None => Ok(()),
        }
    }
}

impl From<PromoRejection> for PromoValidation {
    fn from(rejection: PromoRejection) -> Self {
        PromoValidation::rejected(rejection)
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Decides whether `promo` is admissible for a cart.
///
/// ## Arguments
/// * `promo` - the record found for the entered code, `None` if the lookup missed
/// * `subtotal` - pre-discount cart total
/// * `customer_usage_count` - times this customer has already used the code
/// * `now` - evaluation instant; read once by the caller
///
/// ## Example
/// ```rust
/// use caisse_core::promo::validate;
/// use caisse_core::{Discount, Money, PromoCode};
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let promo = PromoCode::new("FREESHIP", Discount::FreeShipping, now - Duration::days(1), now + Duration::days(1));
///
/// assert!(validate(Some(&promo), Money::from_units(10_000), 0, now).is_valid);
/// assert!(!validate(None, Money::from_units(10_000), 0, now).is_valid);
/// ```
pub fn validate(
    promo: Option<&PromoCode>,
    subtotal: Money,
    customer_usage_count: u32,
    now: DateTime<Utc>,
) -> PromoValidation {
    let Some(promo) = promo else {
        debug!("Promo lookup missed");
        return PromoValidation::rejected(PromoRejection::InvalidCode);
    };

    match check(promo, subtotal, customer_usage_count, now) {
        Ok(()) => PromoValidation::valid(&promo.code),
        Err(rejection) => {
            debug!(code = %promo.code, reason = %rejection, "Promo rejected");
            PromoValidation::rejected(rejection)
        }
    }
}

fn check(
    promo: &PromoCode,
    subtotal: Money,
    customer_usage_count: u32,
    now: DateTime<Utc>,
) -> Result<(), PromoRejection> {
    if promo.status != PromoStatus::Active {
        return Err(PromoRejection::Inactive {
            status: promo.status,
        });
    }

    if now < promo.start_date {
        return Err(PromoRejection::NotYetValid {
            start: promo.start_date,
        });
    }

    if now > promo.end_date {
        return Err(PromoRejection::Expired {
            end: promo.end_date,
        });
    }

    if let Some(limit) = promo.usage_limit {
        if promo.usage_count >= limit {
            return Err(PromoRejection::UsageLimitReached { limit });
        }
    }

    if let Some(limit) = promo.usage_per_customer {
        if customer_usage_count >= limit {
            return Err(PromoRejection::CustomerLimitReached { limit });
        }
    }

    if let Some(required) = promo.min_purchase_amount {
        if subtotal < required {
            return Err(PromoRejection::MinimumNotMet { required });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
