//! # Usage Counter
//!
//! The contract the order-completion workflow uses to record that a promo
//! code was used.
//!
//! ## Contract
//! The validator only reads `usage_count`, so two registers can both see
//! `99 / 100` and both admit the code. The store that owns the counter closes
//! that race with a single conditional increment:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  try_redeem(promo, customer)  ── one atomic step ──                     │
//! │                                                                         │
//! │    total    < usageLimit?        no ──► Err(UsageLimitExceeded Global) │
//! │    customer < usagePerCustomer?  no ──► Err(... PerCustomer)           │
//! │    total += 1; customer += 1           ──► Ok(UsageSnapshot)           │
//! │                                                                         │
//! │  SQL stores: UPDATE promo_codes SET usage_count = usage_count + 1      │
//! │              WHERE code = ? AND (usage_limit IS NULL                   │
//! │                                  OR usage_count < usage_limit)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Call it after payment is confirmed, never during validation, so abandoned
//! carts do not consume quota.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult, UsageScope};
use crate::types::PromoCode;

/// Counts after a successful redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub code: String,
    /// Global uses including this one.
    pub usage_count: u32,
    /// This customer's uses including this one.
    pub customer_usage_count: u32,
}

/// Atomic check-and-increment of a promo's usage counters.
pub trait UsageCounter: Send + Sync {
    /// Records one use of `promo` by `customer_id` if neither the global nor
    /// the per-customer limit would be exceeded. On error nothing is counted.
    fn try_redeem(&self, promo: &PromoCode, customer_id: &str) -> CoreResult<UsageSnapshot>;

    /// Global uses of `code` so far.
    fn usage_count(&self, code: &str) -> CoreResult<u32>;

    /// Uses of `code` by `customer_id` so far.
    fn customer_usage(&self, code: &str, customer_id: &str) -> CoreResult<u32>;
}

#[derive(Debug, Default)]
struct CodeUsage {
    total: u32,
    by_customer: HashMap<String, u32>,
}

/// Mutex-guarded reference implementation.
///
/// A code seen for the first time starts from the `usage_count` carried on
/// its record, or from a count supplied through [`InMemoryUsageCounter::seed`].
#[derive(Debug, Default)]
pub struct InMemoryUsageCounter {
    codes: Mutex<HashMap<String, CodeUsage>>,
}

impl InMemoryUsageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preloads counts, e.g. from order history.
    pub fn seed(
        &self,
        code: &str,
        total: u32,
        by_customer: impl IntoIterator<Item = (String, u32)>,
    ) -> CoreResult<()> {
        let mut codes = self.lock()?;
        codes.insert(
            code.to_string(),
            CodeUsage {
                total,
                by_customer: by_customer.into_iter().collect(),
            },
        );
        Ok(())
    }

    fn lock(&self) -> CoreResult<std::sync::MutexGuard<'_, HashMap<String, CodeUsage>>> {
        self.codes.lock().map_err(|e| {
            warn!("Usage counter mutex poisoned");
            CoreError::CounterUnavailable(e.to_string())
        })
    }
}

impl UsageCounter for InMemoryUsageCounter {
    fn try_redeem(&self, promo: &PromoCode, customer_id: &str) -> CoreResult<UsageSnapshot> {
        let mut codes = self.lock()?;
        let usage = codes
            .entry(promo.code.clone())
            .or_insert_with(|| CodeUsage {
                total: promo.usage_count,
                by_customer: HashMap::new(),
            });

        if let Some(limit) = promo.usage_limit {
            if usage.total >= limit {
                return Err(CoreError::UsageLimitExceeded {
                    code: promo.code.clone(),
                    scope: UsageScope::Global,
                    limit,
                });
            }
        }

        let customer_count = usage.by_customer.get(customer_id).copied().unwrap_or(0);
        if let Some(limit) = promo.usage_per_customer {
            if customer_count >= limit {
                return Err(CoreError::UsageLimitExceeded {
                    code: promo.code.clone(),
                    scope: UsageScope::PerCustomer,
                    limit,
                });
            }
        }

        usage.total = usage.total.saturating_add(1);
        let customer_count = customer_count.saturating_add(1);
        usage
            .by_customer
            .insert(customer_id.to_string(), customer_count);

        debug!(code = %promo.code, %customer_id, total = usage.total, "Promo use recorded");

        Ok(UsageSnapshot {
            code: promo.code.clone(),
            usage_count: usage.total,
            customer_usage_count: customer_count,
        })
    }

    fn usage_count(&self, code: &str) -> CoreResult<u32> {
        Ok(self.lock()?.get(code).map_or(0, |usage| usage.total))
    }

    fn customer_usage(&self, code: &str, customer_id: &str) -> CoreResult<u32> {
        Ok(self
            .lock()?
            .get(code)
            .and_then(|usage| usage.by_customer.get(customer_id).copied())
            .unwrap_or(0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Discount;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn promo(limit: Option<u32>, per_customer: Option<u32>) -> PromoCode {
        let now = Utc::now();
        let mut promo = PromoCode::new(
            "LIMITED",
            Discount::FreeShipping,
            now - Duration::days(1),
            now + Duration::days(1),
        );
        promo.usage_limit = limit;
        promo.usage_per_customer = per_customer;
        promo
    }

    #[test]
    fn test_redeem_increments_both_counts() {
        let counter = InMemoryUsageCounter::new();
        let p = promo(Some(5), None);

        let snap = counter.try_redeem(&p, "c1").unwrap();
        assert_eq!(snap.usage_count, 1);
        assert_eq!(snap.customer_usage_count, 1);

        counter.try_redeem(&p, "c1").unwrap();
        counter.try_redeem(&p, "c2").unwrap();
        assert_eq!(counter.usage_count("LIMITED").unwrap(), 3);
        assert_eq!(counter.customer_usage("LIMITED", "c1").unwrap(), 2);
        assert_eq!(counter.customer_usage("LIMITED", "c3").unwrap(), 0);
    }

    #[test]
    fn test_global_limit_not_exceeded() {
        let counter = InMemoryUsageCounter::new();
        let p = promo(Some(2), None);

        counter.try_redeem(&p, "a").unwrap();
        counter.try_redeem(&p, "b").unwrap();
        let err = counter.try_redeem(&p, "c").unwrap_err();
        assert!(matches!(
            err,
            CoreError::UsageLimitExceeded { scope: UsageScope::Global, limit: 2, .. }
        ));
        assert_eq!(counter.usage_count("LIMITED").unwrap(), 2);
        assert_eq!(counter.customer_usage("LIMITED", "c").unwrap(), 0);
    }

    #[test]
    fn test_per_customer_limit_not_exceeded() {
        let counter = InMemoryUsageCounter::new();
        let p = promo(None, Some(1));

        counter.try_redeem(&p, "c1").unwrap();
        let err = counter.try_redeem(&p, "c1").unwrap_err();
        assert!(matches!(
            err,
            CoreError::UsageLimitExceeded { scope: UsageScope::PerCustomer, .. }
        ));
        // Other customers are unaffected
        assert!(counter.try_redeem(&p, "c2").is_ok());
        assert_eq!(counter.usage_count("LIMITED").unwrap(), 2);
    }

    #[test]
    fn test_starts_from_record_usage_count() {
        let counter = InMemoryUsageCounter::new();
        let mut p = promo(Some(10), None);
        p.usage_count = 9;

        assert_eq!(counter.try_redeem(&p, "c1").unwrap().usage_count, 10);
        assert!(counter.try_redeem(&p, "c2").is_err());
    }

    #[test]
    fn test_seed() {
        let counter = InMemoryUsageCounter::new();
        counter
            .seed("LIMITED", 4, [("c1".to_string(), 1)])
            .unwrap();
        let p = promo(None, Some(1));

        assert!(counter.try_redeem(&p, "c1").is_err());
        assert_eq!(counter.try_redeem(&p, "c2").unwrap().usage_count, 5);
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_never_oversell() {
        let counter = Arc::new(InMemoryUsageCounter::new());
        let p = Arc::new(promo(Some(10), None));

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let counter = Arc::clone(&counter);
                let p = Arc::clone(&p);
                tokio::spawn(async move { counter.try_redeem(&p, &format!("customer-{}", i)) })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 10);
        assert_eq!(counter.usage_count("LIMITED").unwrap(), 10);
    }
}
