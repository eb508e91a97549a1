//! # Domain Types
//!
//! The data model shared by the discount calculator, the promo validator and
//! the loyalty accountant. None of the three owns these records; they arrive
//! already loaded from the promo store, the cart and the settings store.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   PromoCode     │   │ CartLineSnapshot│   │ LoyaltyProgram  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code           │   │  id             │   │  pointsPerFCFA  │       │
//! │  │  discount ──┐   │   │  price          │   │  pointsValue    │       │
//! │  │  status     │   │   │  quantity       │   │  bonus window   │       │
//! │  │  quotas     │   │   │  category?      │   └─────────────────┘       │
//! │  └─────────────┼───┘   └─────────────────┘                              │
//! │                ▼                             ┌─────────────────┐       │
//! │  ┌─────────────────────────┐                 │LoyaltyTransaction│      │
//! │  │ Discount                │                 │  ─────────────  │       │
//! │  │  Percentage(rate)       │                 │  earn / redeem  │       │
//! │  │  Fixed(amount)          │                 │  expire / bonus │       │
//! │  │  Bogo                   │                 │  append-only    │       │
//! │  │  FreeShipping           │                 └─────────────────┘       │
//! │  └─────────────────────────┘                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Field names are camelCase, matching the records the front-end stores.
//! Rates cross the wire as plain numbers (`10` for 10%, `0.01` points per
//! franc) and are held internally as fixed-point integers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Rates
// =============================================================================

/// Percentage discount represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10% and 10000 bps = 100%.
/// Serialised as a percentage number (`10`, `7.5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(from = "f64", into = "f64")]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a rate from a percentage. Negative and NaN inputs become zero.
    pub fn from_percentage(pct: f64) -> Self {
        DiscountRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }
}

impl From<f64> for DiscountRate {
    fn from(pct: f64) -> Self {
        DiscountRate::from_percentage(pct)
    }
}

impl From<DiscountRate> for f64 {
    fn from(rate: DiscountRate) -> Self {
        rate.percentage()
    }
}

/// Loyalty earn rate: points per unit of currency, in millionths.
///
/// `0.01` points per franc is stored as `10_000`. Six decimal places keep
/// rates like `0.0025` exact, so flooring never loses a point to float noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(from = "f64", into = "f64")]
#[ts(export)]
pub struct PointsRate(u32);

impl PointsRate {
    pub const SCALE: u32 = 1_000_000;

    #[inline]
    pub const fn from_micros(micros: u32) -> Self {
        PointsRate(micros)
    }

    /// Creates a rate from points-per-unit, e.g. `0.01`.
    pub fn from_per_unit(points: f64) -> Self {
        PointsRate((points * Self::SCALE as f64).round() as u32)
    }

    #[inline]
    pub const fn micros(&self) -> u32 {
        self.0
    }

    pub fn per_unit(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl From<f64> for PointsRate {
    fn from(points: f64) -> Self {
        PointsRate::from_per_unit(points)
    }
}

impl From<PointsRate> for f64 {
    fn from(rate: PointsRate) -> Self {
        rate.per_unit()
    }
}

/// Bonus-window points multiplier in basis points (2x = 20000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(from = "f64", into = "f64")]
#[ts(export)]
pub struct BonusMultiplier(u32);

impl BonusMultiplier {
    pub const SCALE: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        BonusMultiplier(bps)
    }

    pub fn from_factor(factor: f64) -> Self {
        BonusMultiplier((factor * Self::SCALE as f64).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    pub fn factor(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// No-op multiplier (1x).
    pub const fn identity() -> Self {
        BonusMultiplier(Self::SCALE)
    }
}

impl From<f64> for BonusMultiplier {
    fn from(factor: f64) -> Self {
        BonusMultiplier::from_factor(factor)
    }
}

impl From<BonusMultiplier> for f64 {
    fn from(multiplier: BonusMultiplier) -> Self {
        multiplier.factor()
    }
}

// =============================================================================
// Promo Status
// =============================================================================

/// Back-office status of a promo code.
///
/// Independent of the validity dates: an `Active` code outside its window is
/// still rejected, and a `Scheduled` code inside its window is still rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PromoStatus {
    #[default]
    Active,
    Inactive,
    Expired,
    Scheduled,
}

impl std::fmt::Display for PromoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromoStatus::Active => write!(f, "active"),
            PromoStatus::Inactive => write!(f, "inactive"),
            PromoStatus::Expired => write!(f, "expired"),
            PromoStatus::Scheduled => write!(f, "scheduled"),
        }
    }
}

// =============================================================================
// Discount Strategy
// =============================================================================

/// The discount a promo code grants. One variant per strategy; the value a
/// strategy needs travels inside its variant.
///
/// ## Wire Format
/// ```json
/// { "type": "percentage", "value": 10 }
/// { "type": "fixed", "value": 5000 }
/// { "type": "bogo" }
/// { "type": "free_shipping" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the subtotal.
    Percentage(DiscountRate),
    /// Flat amount off, not scaled by the subtotal.
    Fixed(Money),
    /// Buy one, get one: the cheaper line of each price-ordered pair is free.
    Bogo,
    /// No monetary discount; the caller waives shipping.
    FreeShipping,
}

impl Discount {
    /// Returns true when the caller must waive shipping for this promo.
    #[inline]
    pub const fn waives_shipping(&self) -> bool {
        matches!(self, Discount::FreeShipping)
    }

    /// Short strategy name, as used on the wire.
    pub const fn kind(&self) -> &'static str {
        match self {
            Discount::Percentage(_) => "percentage",
            Discount::Fixed(_) => "fixed",
            Discount::Bogo => "bogo",
            Discount::FreeShipping => "free_shipping",
        }
    }
}

// =============================================================================
// Promo Code
// =============================================================================

/// A discount rule as issued by the back office.
///
/// The engine treats this record as read-only. `usage_count` is advanced by
/// the order-completion workflow, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    /// Human-entered code, unique across the store (e.g. "TABASKI10").
    pub code: String,

    /// Strategy and value.
    pub discount: Discount,

    /// Subtotal below which the promo does not apply.
    #[serde(default)]
    pub min_purchase_amount: Option<Money>,

    /// Upper bound on the discount this promo can produce.
    #[serde(default)]
    pub max_discount_amount: Option<Money>,

    /// Global redemption cap.
    #[serde(default)]
    pub usage_limit: Option<u32>,

    /// Redemptions so far, across all customers.
    #[serde(default)]
    pub usage_count: u32,

    /// Redemption cap per customer.
    #[serde(default)]
    pub usage_per_customer: Option<u32>,

    /// First instant the code is valid (inclusive).
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,

    /// Last instant the code is valid (inclusive).
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,

    #[serde(default)]
    pub status: PromoStatus,

    /// Product ids the promo is restricted to.
    #[serde(default)]
    pub applicable_products: Vec<String>,

    /// Categories the promo is restricted to.
    #[serde(default)]
    pub applicable_categories: Vec<String>,

    /// Product ids never discounted (ignored when an include list is set).
    #[serde(default)]
    pub excluded_products: Vec<String>,

    /// Categories never discounted (ignored when an include list is set).
    #[serde(default)]
    pub excluded_categories: Vec<String>,
}

impl PromoCode {
    /// Creates an active promo with no quotas, no minimum and no restrictions.
    pub fn new(
        code: impl Into<String>,
        discount: Discount,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        PromoCode {
            code: code.into(),
            discount,
            min_purchase_amount: None,
            max_discount_amount: None,
            usage_limit: None,
            usage_count: 0,
            usage_per_customer: None,
            start_date,
            end_date,
            status: PromoStatus::Active,
            applicable_products: Vec::new(),
            applicable_categories: Vec::new(),
            excluded_products: Vec::new(),
            excluded_categories: Vec::new(),
        }
    }

    /// Returns true when an include list restricts the promo.
    pub fn has_inclusions(&self) -> bool {
        !self.applicable_products.is_empty() || !self.applicable_categories.is_empty()
    }

    /// Decides whether a cart line is eligible for this promo.
    ///
    /// ## Rules
    /// - Include lists set: eligible iff the product id or category is listed.
    ///   Exclusions are not consulted.
    /// - No include list: eligible unless the product id or category is
    ///   excluded.
    pub fn applies_to(&self, line: &CartLineSnapshot) -> bool {
        let category = line.category.as_deref();
        let listed = |list: &[String], value: &str| list.iter().any(|v| v == value);

        if self.has_inclusions() {
            return listed(&self.applicable_products, &line.id)
                || category.is_some_and(|c| listed(&self.applicable_categories, c));
        }

        !(listed(&self.excluded_products, &line.id)
            || category.is_some_and(|c| listed(&self.excluded_categories, c)))
    }

    /// Remaining global redemptions, if capped.
    pub fn remaining_uses(&self) -> Option<u32> {
        self.usage_limit
            .map(|limit| limit.saturating_sub(self.usage_count))
    }
}

// =============================================================================
// Cart Line Snapshot
// =============================================================================

/// One cart line, frozen at the moment the discount is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLineSnapshot {
    /// Product id.
    pub id: String,
    /// Unit price.
    pub price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub category: Option<String>,
}

impl CartLineSnapshot {
    pub fn new(id: impl Into<String>, price: Money, quantity: u32) -> Self {
        CartLineSnapshot {
            id: id.into(),
            price,
            quantity,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(i64::from(self.quantity))
    }
}

// =============================================================================
// Loyalty Program
// =============================================================================

/// A time-boxed points multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BonusWindow {
    /// Inclusive.
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    /// Inclusive.
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    pub multiplier: BonusMultiplier,
}

impl BonusWindow {
    /// Returns true when `now` falls inside the window, both ends included.
    #[inline]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }
}

/// Loyalty program settings, as held by the settings store.
///
/// Unknown keys are rejected: a flat `bonusMultiplier` or `bonusStartDate`
/// must not load as a program with no bonus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoyaltyProgram {
    /// Points earned per franc spent.
    #[serde(rename = "pointsPerFCFA", default = "default_points_rate")]
    pub points_per_fcfa: PointsRate,

    /// Redemption value of one point.
    #[serde(default = "default_point_value")]
    pub points_value: Money,

    /// Smallest balance a customer may redeem in one go.
    #[serde(default = "default_min_points_to_redeem")]
    pub min_points_to_redeem: u64,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Optional bonus period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub bonus: Option<BonusWindow>,
}

fn default_points_rate() -> PointsRate {
    PointsRate::from_micros(10_000) // 0.01 points per franc
}

fn default_point_value() -> Money {
    Money::from_units(5)
}

fn default_min_points_to_redeem() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for LoyaltyProgram {
    fn default() -> Self {
        LoyaltyProgram {
            points_per_fcfa: default_points_rate(),
            points_value: default_point_value(),
            min_points_to_redeem: default_min_points_to_redeem(),
            is_active: true,
            bonus: None,
        }
    }
}

impl LoyaltyProgram {
    /// Returns the multiplier in force at `now`, if any.
    pub fn active_bonus(&self, now: DateTime<Utc>) -> Option<BonusMultiplier> {
        self.bonus
            .filter(|window| window.contains(now))
            .map(|window| window.multiplier)
    }
}

// =============================================================================
// Loyalty Tier
// =============================================================================

/// Loyalty rank. Ordered: `Bronze < Silver < Gold < Platinum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    /// All tiers, lowest first.
    pub const ALL: [LoyaltyTier; 4] = [
        LoyaltyTier::Bronze,
        LoyaltyTier::Silver,
        LoyaltyTier::Gold,
        LoyaltyTier::Platinum,
    ];

    /// The tier above this one.
    pub const fn next(&self) -> Option<LoyaltyTier> {
        match self {
            LoyaltyTier::Bronze => Some(LoyaltyTier::Silver),
            LoyaltyTier::Silver => Some(LoyaltyTier::Gold),
            LoyaltyTier::Gold => Some(LoyaltyTier::Platinum),
            LoyaltyTier::Platinum => None,
        }
    }
}

impl std::fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoyaltyTier::Bronze => write!(f, "bronze"),
            LoyaltyTier::Silver => write!(f, "silver"),
            LoyaltyTier::Gold => write!(f, "gold"),
            LoyaltyTier::Platinum => write!(f, "platinum"),
        }
    }
}

// =============================================================================
// Loyalty Transaction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Points from a purchase.
    Earn,
    /// Points spent.
    Redeem,
    /// Points that lapsed.
    Expire,
    /// Points granted outside a purchase (campaigns, goodwill).
    Bonus,
}

impl TransactionType {
    /// Returns true for types that add to the balance.
    pub const fn is_credit(&self) -> bool {
        matches!(self, TransactionType::Earn | TransactionType::Bonus)
    }
}

/// An entry in a customer's points ledger. Append-only: once built, never
/// edited or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyTransaction {
    pub id: String,
    pub customer_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub points: u64,
    pub description: String,
    #[serde(default)]
    pub related_sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LoyaltyTransaction {
    fn record(
        customer_id: &str,
        kind: TransactionType,
        points: u64,
        description: String,
        related_sale_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        LoyaltyTransaction {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            kind,
            points,
            description,
            related_sale_id,
            created_at,
        }
    }

    /// Points earned on a sale.
    pub fn earn(
        customer_id: &str,
        points: u64,
        sale_id: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let description = match sale_id {
            Some(sale) => format!("Earned {} points on sale {}", points, sale),
            None => format!("Earned {} points", points),
        };
        Self::record(
            customer_id,
            TransactionType::Earn,
            points,
            description,
            sale_id.map(str::to_string),
            created_at,
        )
    }

    /// Points granted outside a purchase.
    pub fn bonus(
        customer_id: &str,
        points: u64,
        reason: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::record(
            customer_id,
            TransactionType::Bonus,
            points,
            reason.into(),
            None,
            created_at,
        )
    }

    /// Points spent, optionally against a sale.
    pub fn redeem(
        customer_id: &str,
        points: u64,
        sale_id: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::record(
            customer_id,
            TransactionType::Redeem,
            points,
            format!("Redeemed {} points", points),
            sale_id.map(str::to_string),
            created_at,
        )
    }

    /// Points that lapsed.
    pub fn expire(customer_id: &str, points: u64, created_at: DateTime<Utc>) -> Self {
        Self::record(
            customer_id,
            TransactionType::Expire,
            points,
            format!("{} points expired", points),
            None,
            created_at,
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
