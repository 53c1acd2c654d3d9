//! Risk factor evaluators
//!
//! Each evaluator inspects one slice of the transaction and history and
//! returns a single [`RiskFactor`]. Tiers are checked highest first and use
//! strict `>` comparisons, so a value exactly on a boundary falls into the
//! lower tier.

use crate::geo::haversine_km;
use crate::types::{FactorKind, GeoPoint, Location, RiskFactor, Severity, UserHistory};
use chrono::{DateTime, FixedOffset, Timelike};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

/// Categories that always score as high risk (matched case-insensitively)
pub const DEFAULT_HIGH_RISK_CATEGORIES: [&str; 4] = ["gambling", "crypto", "forex", "adult"];

/// Amount relative to the user's average.
///
/// `history.avg_amount` must be positive; the engine validates this before
/// calling.
pub fn amount_risk(amount: Decimal, history: &UserHistory) -> RiskFactor {
    let avg_ratio = amount.checked_div(history.avg_amount).unwrap_or(Decimal::MAX);
    // Reported for diagnostics only, never scored.
    let max_ratio = amount.checked_div(history.max_amount).unwrap_or(Decimal::MAX);
    debug!(%avg_ratio, %max_ratio, "amount ratios");

    let (score, severity) = if avg_ratio > Decimal::from(4) {
        (25, Severity::Critical)
    } else if avg_ratio > Decimal::from(2) {
        (20, Severity::High)
    } else if avg_ratio > Decimal::new(15, 1) {
        (10, Severity::Medium)
    } else {
        return RiskFactor::new(
            FactorKind::Amount,
            0,
            Severity::Low,
            "Amount is within normal range",
        );
    };

    let shown = displayed_ratio(amount, history.avg_amount).unwrap_or(avg_ratio);
    RiskFactor::new(
        FactorKind::Amount,
        score,
        severity,
        format!("Amount is {}x higher than your average transaction", shown),
    )
}

/// `amount / avg_amount` rounded to one decimal place.
///
/// `None` when the ratio overflows or is too large to carry a decimal digit.
pub fn displayed_ratio(amount: Decimal, avg_amount: Decimal) -> Option<Decimal> {
    let ratio = amount.checked_div(avg_amount)?;
    let mut shown = ratio.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    shown.rescale(1);
    (shown.scale() == 1).then_some(shown)
}

/// Distance from the last known location
pub fn location_risk(location: &Location, last_location: Option<GeoPoint>) -> RiskFactor {
    let Some(last) = last_location else {
        return RiskFactor::new(
            FactorKind::Location,
            5,
            Severity::Low,
            "First transaction from this location",
        );
    };

    let distance = haversine_km(location.point(), last);
    debug!(distance_km = distance, "location distance");

    let (score, severity) = if distance > 1000.0 {
        (20, Severity::High)
    } else if distance > 500.0 {
        (15, Severity::Medium)
    } else if distance > 100.0 {
        (5, Severity::Low)
    } else {
        return RiskFactor::new(
            FactorKind::Location,
            0,
            Severity::Low,
            "Transaction location is within normal range",
        );
    };

    RiskFactor::new(
        FactorKind::Location,
        score,
        severity,
        format!(
            "Transaction location is {:.0}km from last transaction",
            distance.round()
        ),
    )
}

/// Merchant familiarity and category
pub fn merchant_risk(
    merchant_name: &str,
    merchant_category: &str,
    history: &UserHistory,
    high_risk_categories: &[String],
) -> RiskFactor {
    let is_frequent_merchant = history.frequent_merchants.contains(merchant_name);
    let is_frequent_category = history.frequent_categories.contains(merchant_category);
    let is_high_risk_category = high_risk_categories
        .iter()
        .any(|c| c.eq_ignore_ascii_case(merchant_category));

    if is_high_risk_category {
        RiskFactor::new(
            FactorKind::Merchant,
            20,
            Severity::High,
            format!("Transaction in high-risk category: {}", merchant_category),
        )
    } else if !is_frequent_merchant && !is_frequent_category {
        RiskFactor::new(
            FactorKind::Merchant,
            10,
            Severity::Medium,
            "New merchant and category for your account",
        )
    } else if !is_frequent_merchant {
        RiskFactor::new(
            FactorKind::Merchant,
            5,
            Severity::Low,
            "New merchant in familiar category",
        )
    } else {
        RiskFactor::new(FactorKind::Merchant, 0, Severity::Low, "Trusted merchant")
    }
}

/// Time of day, read in the timestamp's own offset
pub fn behavioral_risk(at: DateTime<FixedOffset>) -> RiskFactor {
    let hour = at.hour();
    // `hour > 23` never holds; the window is effectively 00:00-05:59.
    let is_unusual_time = hour < 6 || hour > 23;

    if is_unusual_time {
        RiskFactor::new(
            FactorKind::Behavioral,
            10,
            Severity::Medium,
            format!("Transaction at unusual time: {}:00", hour),
        )
    } else {
        RiskFactor::new(
            FactorKind::Behavioral,
            0,
            Severity::Low,
            "Transaction time is normal",
        )
    }
}

/// Transaction frequency
pub fn velocity_risk(history: &UserHistory) -> RiskFactor {
    let per_day = history.avg_daily_transactions;

    if per_day > 20.0 {
        RiskFactor::new(
            FactorKind::Velocity,
            15,
            Severity::High,
            "Unusually high transaction frequency detected",
        )
    } else if per_day > 10.0 {
        RiskFactor::new(
            FactorKind::Velocity,
            10,
            Severity::Medium,
            "High transaction frequency",
        )
    } else {
        RiskFactor::new(
            FactorKind::Velocity,
            0,
            Severity::Low,
            "Normal transaction frequency",
        )
    }
}

/// Stand-in for [`location_risk`] when the request has no location
pub fn missing_location() -> RiskFactor {
    RiskFactor::new(
        FactorKind::MissingLocation,
        15,
        Severity::Medium,
        "Location data unavailable - using historical patterns",
    )
}

/// Stand-in for [`merchant_risk`] when merchant name or category is absent
pub fn missing_merchant() -> RiskFactor {
    RiskFactor::new(
        FactorKind::MissingMerchant,
        10,
        Severity::Low,
        "Merchant information missing - inferred from transaction history",
    )
}
