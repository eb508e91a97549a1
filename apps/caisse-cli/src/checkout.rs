//! # Checkout Scenario Runner
//!
//! Plays one sale through the rules engine the way the register does after
//! payment is confirmed.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  scenario.json                                                          │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  validate_cart_line (each)  ── bad line ──► CliError::InvalidScenario  │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  subtotal ──► promo::validate ── rejected ──► discount 0               │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  redeem_points (optional) ── over balance ──► CoreError, nothing used  │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  UsageCounter::try_redeem (last fallible step)                         │
//! │      │ limit hit ──► rejected, discount 0                               │
//! │      ▼                                                                  │
//! │  compute_discount                                                       │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  net = subtotal - discount - redeemed points value (floor 0)           │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  CustomerLoyalty::record_sale(net) ──► points, tier, ledger entries    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caisse_core::discount::{cart_subtotal, compute_discount};
use caisse_core::loyalty::redeem_points;
use caisse_core::promo::validate;
use caisse_core::validation::validate_cart_line;
use caisse_core::{
    CartLineSnapshot, CoreError, CustomerLoyalty, LoyaltyProgram, LoyaltyTransaction, Money,
    PromoCode, PromoRejection, PromoValidation, Redemption, UsageCounter, UsageScope,
    UsageSnapshot,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CliError, CliResult};

// =============================================================================
// Scenario
// =============================================================================

/// A sale to play through the engine, as read from JSON.
///
/// ## Example
/// ```json
/// {
///   "promo": { "code": "TABASKI10", "discount": { "type": "percentage", "value": 10 },
///              "startDate": "2026-06-01T00:00:00Z", "endDate": "2026-06-30T23:59:59Z" },
///   "lines": [{ "id": "thiof", "price": 12500, "quantity": 2 }],
///   "customerId": "cust-001",
///   "customerTotalSpent": 480000,
///   "customerPoints": 300
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutScenario {
    /// The promo record found for the entered code.
    #[serde(default)]
    pub promo: Option<PromoCode>,

    pub lines: Vec<CartLineSnapshot>,

    pub customer_id: String,

    /// Prior uses of the promo by this customer.
    #[serde(default)]
    pub customer_usage_count: u32,

    /// Lifetime spend before this sale.
    #[serde(default)]
    pub customer_total_spent: Money,

    /// Points balance before this sale.
    #[serde(default)]
    pub customer_points: u64,

    /// Points the customer spends on this sale (0 = none).
    #[serde(default)]
    pub redeem_points: u64,

    #[serde(default)]
    pub sale_id: Option<String>,
}

impl CheckoutScenario {
    /// Reads a scenario file.
    pub fn from_file(path: &std::path::Path) -> CliResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// The customer's standing before the sale.
    pub fn customer(&self) -> CustomerLoyalty {
        CustomerLoyalty::new(
            self.customer_id.clone(),
            self.customer_total_spent,
            self.customer_points,
            self.customer_points,
        )
    }
}

// =============================================================================
// Report
// =============================================================================

/// Everything the register shows and stores after the sale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReport {
    pub subtotal: Money,
    /// Absent when no promo was entered.
    pub promo: Option<PromoValidation>,
    pub discount: Money,
    pub free_shipping: bool,
    /// Counts after this sale's promo use was recorded.
    pub usage: Option<UsageSnapshot>,
    pub redemption: Option<Redemption>,
    pub net_total: Money,
    pub points_earned: u64,
    pub tier_changed: bool,
    pub loyalty: CustomerLoyalty,
    /// New ledger entries, in the order they happened.
    pub transactions: Vec<LoyaltyTransaction>,
}

// =============================================================================
// Runner
// =============================================================================

/// Runs `scenario` against `program`, recording promo use in `counter`.
pub fn run_checkout(
    scenario: &CheckoutScenario,
    program: &LoyaltyProgram,
    counter: &dyn UsageCounter,
    now: DateTime<Utc>,
) -> CliResult<CheckoutReport> {
    for line in &scenario.lines {
        validate_cart_line(line)
            .map_err(|e| CliError::InvalidScenario(format!("line '{}': {}", line.id, e)))?;
    }

    let subtotal = cart_subtotal(&scenario.lines);
    let validation = scenario
        .promo
        .as_ref()
        .map(|promo| validate(Some(promo), subtotal, scenario.customer_usage_count, now));

    let mut customer = scenario.customer();
    let mut transactions = Vec::new();

    let redemption = if scenario.redeem_points > 0 {
        let redemption = redeem_points(scenario.redeem_points, &customer, program)?;
        let (debited, tx) =
            customer.apply_redemption(&redemption, scenario.sale_id.as_deref(), now);
        customer = debited;
        transactions.push(tx);
        Some(redemption)
    } else {
        None
    };

    // Last fallible step: a recorded use is never given back
    let (promo, discount, usage) = match (&scenario.promo, validation) {
        (Some(promo), Some(validation)) => {
            commit_promo(promo, validation, scenario, subtotal, counter)?
        }
        _ => (None, Money::zero(), None),
    };
    let free_shipping = usage.is_some()
        && scenario
            .promo
            .as_ref()
            .is_some_and(|p| p.discount.waives_shipping());

    let net_total = (subtotal - discount - redemption.map_or(Money::zero(), |r| r.value))
        .max(Money::zero());

    let credit = customer.record_sale(net_total, program, scenario.sale_id.as_deref(), now);
    transactions.extend(credit.transaction);

    info!(
        customer_id = %scenario.customer_id,
        %subtotal,
        %discount,
        %net_total,
        points = credit.points_earned,
        tier = %credit.loyalty.tier(),
        "Checkout complete"
    );

    Ok(CheckoutReport {
        subtotal,
        promo,
        discount,
        free_shipping,
        usage,
        redemption,
        net_total,
        points_earned: credit.points_earned,
        tier_changed: credit.tier_changed,
        loyalty: credit.loyalty,
        transactions,
    })
}

type PromoOutcome = (Option<PromoValidation>, Money, Option<UsageSnapshot>);

fn commit_promo(
    promo: &PromoCode,
    validation: PromoValidation,
    scenario: &CheckoutScenario,
    subtotal: Money,
    counter: &dyn UsageCounter,
) -> CliResult<PromoOutcome> {
    if !validation.is_valid {
        return Ok((Some(validation), Money::zero(), None));
    }

    match counter.try_redeem(promo, &scenario.customer_id) {
        Ok(usage) => {
            let discount = compute_discount(promo, subtotal, &scenario.lines);
            Ok((Some(validation), discount, Some(usage)))
        }
        Err(CoreError::UsageLimitExceeded { scope, limit, .. }) => {
            // Quota went between validation and completion
            debug!(code = %promo.code, %scope, "Promo use refused by counter");
            let rejection = match scope {
                UsageScope::Global => PromoRejection::UsageLimitReached { limit },
                UsageScope::PerCustomer => PromoRejection::CustomerLimitReached { limit },
            };
            Ok((Some(rejection.into()), Money::zero(), None))
        }
        Err(e) => Err(e.into()),
    }
}
