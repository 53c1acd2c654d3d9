//! Data quality and confidence estimation

use crate::types::MissingField;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Contextual fields the engine expects: amount, location, merchant, time, device
pub const EXPECTED_FIELDS: usize = 5;

/// Confidence penalty applied whenever fallback mode was used
pub const FALLBACK_PENALTY: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// Data quality and confidence for one assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityEstimate {
    /// Share of expected fields present, 0-100
    pub data_quality: Decimal,
    /// Data quality less the fallback penalty, clamped to 0-100
    pub confidence: Decimal,
}

impl QualityEstimate {
    /// Estimate from the fields that were absent
    pub fn from_missing(missing: &[MissingField], fallback_used: bool) -> Self {
        let present = EXPECTED_FIELDS.saturating_sub(missing.len());
        let data_quality =
            Decimal::from(present as u64) / Decimal::from(EXPECTED_FIELDS as u64) * Decimal::ONE_HUNDRED;

        let mut confidence = data_quality;
        if fallback_used {
            confidence -= FALLBACK_PENALTY;
        }
        let confidence = confidence.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

        Self {
            data_quality,
            confidence,
        }
    }

    /// Data quality rounded to a whole percentage
    pub fn data_quality_score(&self) -> u8 {
        round_percent(self.data_quality)
    }

    /// Confidence rounded to a whole percentage
    pub fn confidence_score(&self) -> u8 {
        round_percent(self.confidence)
    }
}

fn round_percent(value: Decimal) -> u8 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u8()
        .unwrap_or(0)
}
