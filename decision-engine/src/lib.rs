//! Transaction Risk Decision Engine
//!
//! Real-time risk assessment for payments, tolerant of incomplete data.
//!
//! # Architecture
//!
//! - **Evaluators** (`factors`): amount, location, merchant, time of day and
//!   velocity, each producing one weighted [`RiskFactor`]
//! - **Fallback**: missing location or merchant data is replaced by a
//!   synthetic factor and reported through `missing_fields`
//! - **Aggregation** (`decision`): raw weighted sum, thresholds, reasons and
//!   recommendations
//! - **Engine** ([`RiskScorer`]): the single entry point, a pure function of
//!   its inputs plus an injectable clock
//!
//! # Invariants
//!
//! - `risk_score == round(Σ score × weight)` over the returned factors
//! - `fallback_used` iff `missing_fields` is non-empty
//! - `confidence_score == clamp(data_quality_score − 20·fallback, 0, 100)`

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations)]

pub mod clock;
pub mod config;
pub mod decision;
pub mod error;
pub mod factors;
pub mod geo;
pub mod history;
pub mod metrics;
pub mod processor;
pub mod quality;
pub mod scoring;
pub mod store;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use decision::DecisionThresholds;
pub use error::{Error, Result};
pub use history::HistoryProvider;
pub use metrics::Metrics;
pub use processor::{CreateTransaction, SubmittedTransaction, TransactionProcessor};
pub use scoring::RiskScorer;
pub use store::{InMemoryStore, TransactionStore};
pub use types::*;
