//! # Error Types
//!
//! Domain-specific error types for caisse-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caisse-core errors (this file)                                        │
//! │  ├── CoreError        - Redemption and usage-counter failures          │
//! │  └── ValidationError  - Issuer-side record validation failures         │
//! │                                                                         │
//! │  NOT errors:                                                           │
//! │  └── PromoRejection   - A promo that does not apply (promo.rs).        │
//! │                         Returned as a value, rendered by the UI.       │
//! │                                                                         │
//! │  caisse-cli errors (separate crate)                                    │
//! │  └── CliError         - Config, file and JSON failures                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, points, limits)
//! 3. Errors are enum variants, never String
//! 4. A rejected promo code is an answer, not an error

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors from operations that can refuse to proceed.
///
/// Discount and admissibility decisions never produce these; they always
/// resolve to a value. Only points redemption and the usage-counter contract
/// fail this way.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The loyalty program is switched off.
    #[error("Loyalty program is not active")]
    ProgramInactive,

    /// Redemption below the program minimum.
    #[error("At least {minimum} points are required to redeem, got {requested}")]
    BelowRedemptionMinimum { requested: u64, minimum: u64 },

    /// Redemption larger than the customer's balance.
    ///
    /// ## User Workflow
    /// ```text
    /// Cashier enters: redeem 800 points
    ///      │
    ///      ▼
    /// available_points = 650
    ///      │
    ///      ▼
    /// InsufficientPoints { requested: 800, available: 650 }
    ///      │
    ///      ▼
    /// UI shows: "Only 650 points available"
    /// ```
    #[error("Insufficient points: available {available}, requested {requested}")]
    InsufficientPoints { requested: u64, available: u64 },

    /// Zero-point redemption.
    #[error("Redemption must be for at least one point")]
    EmptyRedemption,

    /// A redemption would push a promo past one of its quotas.
    ///
    /// ## When This Occurs
    /// - Two registers redeem the last use of a code at the same moment;
    ///   the second compare-and-increment loses
    /// - A customer retries a checkout after already using their quota
    #[error("Usage limit exceeded for {code}: {scope} limit {limit}")]
    UsageLimitExceeded {
        code: String,
        scope: UsageScope,
        limit: u32,
    },

    /// The usage counter's storage is unusable.
    #[error("Usage counter unavailable: {0}")]
    CounterUnavailable(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Which quota a redemption ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageScope {
    Global,
    PerCustomer,
}

impl std::fmt::Display for UsageScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageScope::Global => write!(f, "global"),
            UsageScope::PerCustomer => write!(f, "per-customer"),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Record validation errors.
///
/// Raised by the helpers in [`crate::validation`] when the back office
/// creates or edits a promo code or program settings.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. a code with spaces).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two dates in the wrong order.
    #[error("{start} must not be after {end}")]
    InvertedRange { start: String, end: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
