//! Decision aggregation
//!
//! Combines weighted factor scores into a raw risk score, maps the score to
//! a [`Decision`] and renders the explanation lists returned to the caller.

use crate::types::{Decision, RiskFactor};
use crate::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Notice placed ahead of all other reasons when fallback mode was used
pub const FALLBACK_NOTICE: &str =
    "\u{26A1} Fallback mode active - some data filled from historical patterns";

/// Score thresholds, checked from `reject` down. Each is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    /// Scores at or above this are rejected
    pub reject: Decimal,
    /// Scores at or above this go to manual review
    pub review: Decimal,
    /// Scores at or above this are allowed with a warning
    pub warn: Decimal,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            reject: Decimal::from(90),
            review: Decimal::from(60),
            warn: Decimal::from(30),
        }
    }
}

impl DecisionThresholds {
    /// Thresholds must be non-negative and strictly descending
    pub fn validate(&self) -> Result<()> {
        if self.warn < Decimal::ZERO {
            return Err(Error::InvalidConfig(format!(
                "warn threshold {} must not be negative",
                self.warn
            )));
        }
        if !(self.reject > self.review && self.review > self.warn) {
            return Err(Error::InvalidConfig(format!(
                "thresholds must satisfy reject > review > warn (got {} / {} / {})",
                self.reject, self.review, self.warn
            )));
        }
        Ok(())
    }

    /// Map a raw weighted score to a decision
    pub fn decide(&self, total: Decimal) -> Decision {
        if total >= self.reject {
            Decision::Reject
        } else if total >= self.review {
            Decision::Review
        } else if total >= self.warn {
            Decision::AllowWithWarning
        } else {
            Decision::Allow
        }
    }
}

/// Raw weighted score: Σ(score × weight). Not normalised.
pub fn weighted_total(factors: &[RiskFactor]) -> Decimal {
    factors.iter().map(RiskFactor::weighted_score).sum()
}

/// Round a raw score half up to whole points
pub fn round_score(total: Decimal) -> u32 {
    total
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(u32::MAX)
}

/// Fallback notice (if any), then every scoring factor, highest score first
pub fn reasons(factors: &[RiskFactor], fallback_used: bool) -> Vec<String> {
    let mut scoring: Vec<&RiskFactor> = factors.iter().filter(|f| f.score > 0).collect();
    // Stable, so equal scores keep evaluation order
    scoring.sort_by(|a, b| b.score.cmp(&a.score));

    let mut out = Vec::with_capacity(scoring.len() + 1);
    if fallback_used {
        out.push(FALLBACK_NOTICE.to_string());
    }
    out.extend(
        scoring
            .into_iter()
            .map(|f| format!("{} {}", f.severity.icon(), f.reason)),
    );
    out
}

/// Next steps for the caller, keyed by decision
pub fn recommendations(factors: &[RiskFactor], decision: Decision) -> Vec<String> {
    match decision {
        Decision::Reject => vec![
            "This transaction has been blocked for your security".to_string(),
            "Contact support if you believe this is an error".to_string(),
        ],
        Decision::Review => vec![
            "This transaction requires manual review".to_string(),
            "You will be notified once the review is complete".to_string(),
        ],
        Decision::AllowWithWarning => {
            let mut out = vec!["Proceed with caution - unusual activity detected".to_string()];
            if let Some(top) = factors.iter().find(|f| f.severity.is_elevated()) {
                out.push(format!("Review: {}", top.reason));
            }
            out
        }
        Decision::Allow => vec!["Transaction appears safe to proceed".to_string()],
    }
}
