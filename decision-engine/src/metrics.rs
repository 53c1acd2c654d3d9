//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `risk_assessments_total{decision}` - Assessments by decision
//! - `risk_fallback_total` - Assessments made with missing data
//! - `risk_invalid_input_total` - Requests rejected by precondition checks
//! - `risk_score` - Histogram of rounded risk scores

use crate::types::RiskAssessment;
use crate::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Assessments by decision
    pub assessments_total: IntCounterVec,

    /// Assessments that used fallback mode
    pub fallback_total: IntCounter,

    /// Requests rejected before scoring
    pub invalid_input_total: IntCounter,

    /// Risk score histogram
    pub risk_score: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let assessments_total = IntCounterVec::new(
            Opts::new("risk_assessments_total", "Assessments by decision"),
            &["decision"],
        )?;
        registry.register(Box::new(assessments_total.clone()))?;

        let fallback_total = IntCounter::new(
            "risk_fallback_total",
            "Assessments made with missing contextual data",
        )?;
        registry.register(Box::new(fallback_total.clone()))?;

        let invalid_input_total = IntCounter::new(
            "risk_invalid_input_total",
            "Requests rejected by precondition checks",
        )?;
        registry.register(Box::new(invalid_input_total.clone()))?;

        let risk_score = Histogram::with_opts(
            HistogramOpts::new("risk_score", "Histogram of rounded risk scores")
                .buckets(vec![0.0, 5.0, 10.0, 15.0, 20.0, 30.0, 60.0, 90.0]),
        )?;
        registry.register(Box::new(risk_score.clone()))?;

        Ok(Self {
            assessments_total,
            fallback_total,
            invalid_input_total,
            risk_score,
            registry,
        })
    }

    /// Record a completed assessment
    pub fn record_assessment(&self, assessment: &RiskAssessment) {
        self.assessments_total
            .with_label_values(&[assessment.decision.as_str()])
            .inc();
        if assessment.fallback_used {
            self.fallback_total.inc();
        }
        self.risk_score.observe(f64::from(assessment.risk_score));
    }

    /// Record a request rejected before scoring
    pub fn record_invalid_input(&self) {
        self.invalid_input_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
