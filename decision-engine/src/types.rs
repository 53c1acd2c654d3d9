//! Core types for the decision engine

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude (-90..=90)
    pub lat: f64,
    /// Longitude (-180..=180)
    pub lng: f64,
}

impl GeoPoint {
    /// Create new point
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both coordinates finite and within WGS84 bounds
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Where a transaction took place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Human readable place name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Location {
    /// Create unnamed location
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng, name: None }
    }

    /// Coordinates only
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Device the transaction originated from. Carried through, not scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Device fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Client IP address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Client user agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Transaction under evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionContext {
    /// Amount, must be positive
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// Opaque recipient identifier
    pub recipient_id: String,

    /// Merchant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,

    /// Merchant category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_category: Option<String>,

    /// Transaction location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Transaction timestamp; the engine clock is used when absent.
    /// Offset-less ISO-8601 values are taken as wall-clock time.
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<DateTime<FixedOffset>>,

    /// Originating device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
}

impl TransactionContext {
    /// Create context with only the mandatory fields
    pub fn new(amount: Decimal, recipient_id: impl Into<String>) -> Self {
        Self {
            amount,
            recipient_id: recipient_id.into(),
            merchant_name: None,
            merchant_category: None,
            location: None,
            time: None,
            device_info: None,
        }
    }

    /// Set merchant name and category
    pub fn with_merchant(mut self, name: impl Into<String>, category: impl Into<String>) -> Self {
        self.merchant_name = Some(name.into());
        self.merchant_category = Some(category.into());
        self
    }

    /// Set location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set timestamp
    pub fn at(mut self, time: DateTime<FixedOffset>) -> Self {
        self.time = Some(time);
        self
    }

    /// Merchant name and category, only when both are present and non-empty
    pub fn merchant(&self) -> Option<(&str, &str)> {
        let name = self.merchant_name.as_deref().filter(|s| !s.is_empty())?;
        let category = self.merchant_category.as_deref().filter(|s| !s.is_empty())?;
        Some((name, category))
    }
}

/// Statistical profile of a user's prior transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHistory {
    /// Average transaction amount, must be positive
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_amount: Decimal,

    /// Largest transaction amount, must be positive
    #[serde(with = "rust_decimal::serde::float")]
    pub max_amount: Decimal,

    /// Number of prior transactions
    #[serde(default)]
    pub transaction_count: u64,

    /// Time of the most recent transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transaction_time: Option<DateTime<Utc>>,

    /// Location of the most recent located transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_location: Option<GeoPoint>,

    /// Merchants the user has paid before
    #[serde(default)]
    pub frequent_merchants: BTreeSet<String>,

    /// Merchant categories the user has paid before
    #[serde(default)]
    pub frequent_categories: BTreeSet<String>,

    /// Average transactions per day
    #[serde(default)]
    pub avg_daily_transactions: f64,
}

impl UserHistory {
    /// Create history with the given amount profile and no other signals
    pub fn new(avg_amount: Decimal, max_amount: Decimal) -> Self {
        Self {
            avg_amount,
            max_amount,
            transaction_count: 0,
            last_transaction_time: None,
            last_location: None,
            frequent_merchants: BTreeSet::new(),
            frequent_categories: BTreeSet::new(),
            avg_daily_transactions: 0.0,
        }
    }
}

/// Severity tier of a risk factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
}

/// Display icons indexed by severity discriminant
const SEVERITY_ICONS: [&str; 4] = ["\u{1F7E2}", "\u{1F7E1}", "\u{1F7E0}", "\u{1F534}"];

impl Severity {
    /// Icon shown in front of a reason line
    pub fn icon(self) -> &'static str {
        SEVERITY_ICONS[self as usize]
    }

    /// High or critical
    pub fn is_elevated(self) -> bool {
        self >= Severity::High
    }

    /// Lower-case label
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies which evaluator produced a factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorKind {
    /// Amount relative to history
    #[serde(rename = "Transaction Amount")]
    Amount,
    /// Distance from last location
    #[serde(rename = "Location Analysis")]
    Location,
    /// Merchant familiarity and category
    #[serde(rename = "Merchant Analysis")]
    Merchant,
    /// Time of day
    #[serde(rename = "Behavioral Pattern")]
    Behavioral,
    /// Transaction frequency
    #[serde(rename = "Velocity Check")]
    Velocity,
    /// Synthetic factor for absent location
    #[serde(rename = "Missing Location")]
    MissingLocation,
    /// Synthetic factor for absent merchant data
    #[serde(rename = "Missing Merchant Data")]
    MissingMerchant,
}

impl FactorKind {
    /// Fixed weight applied to this factor's score
    pub fn weight(self) -> Decimal {
        match self {
            FactorKind::Amount => Decimal::new(25, 2),
            FactorKind::Location => Decimal::new(20, 2),
            FactorKind::Merchant => Decimal::new(20, 2),
            FactorKind::Behavioral => Decimal::new(15, 2),
            FactorKind::Velocity => Decimal::new(20, 2),
            FactorKind::MissingLocation => Decimal::new(20, 2),
            FactorKind::MissingMerchant => Decimal::new(15, 2),
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            FactorKind::Amount => "Transaction Amount",
            FactorKind::Location => "Location Analysis",
            FactorKind::Merchant => "Merchant Analysis",
            FactorKind::Behavioral => "Behavioral Pattern",
            FactorKind::Velocity => "Velocity Check",
            FactorKind::MissingLocation => "Missing Location",
            FactorKind::MissingMerchant => "Missing Merchant Data",
        }
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One evaluator's verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Evaluator that produced the factor
    pub name: FactorKind,

    /// Raw points before weighting
    pub score: u32,

    /// Coefficient applied to `score`
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,

    /// Human readable explanation
    pub reason: String,

    /// Severity tier
    pub severity: Severity,
}

impl RiskFactor {
    /// Create factor carrying the kind's fixed weight
    pub fn new(kind: FactorKind, score: u32, severity: Severity, reason: impl Into<String>) -> Self {
        Self {
            name: kind,
            score,
            weight: kind.weight(),
            reason: reason.into(),
            severity,
        }
    }

    /// `score × weight`
    pub fn weighted_score(&self) -> Decimal {
        Decimal::from(self.score) * self.weight
    }
}

/// Categorical verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Proceed
    Allow,
    /// Proceed, but surface a warning
    AllowWithWarning,
    /// Hold for manual review
    Review,
    /// Block
    Reject,
}

impl Decision {
    /// Wire label
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::AllowWithWarning => "ALLOW_WITH_WARNING",
            Decision::Review => "REVIEW",
            Decision::Reject => "REJECT",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected contextual field that was absent from the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingField {
    /// No location
    Location,
    /// No merchant name or category
    Merchant,
}

impl MissingField {
    /// Wire label
    pub fn as_str(self) -> &'static str {
        match self {
            MissingField::Location => "location",
            MissingField::Merchant => "merchant",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk assessment result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Verdict
    pub decision: Decision,

    /// Weighted score, rounded half up
    pub risk_score: u32,

    /// Confidence in the score (0-100)
    pub confidence_score: u8,

    /// True when any expected field was missing
    pub fallback_used: bool,

    /// Rendered explanations, highest scoring first
    pub reasons: Vec<String>,

    /// Every factor that contributed, in evaluation order
    pub risk_factors: Vec<RiskFactor>,

    /// Share of expected fields present (0-100)
    pub data_quality_score: u8,

    /// Fields that triggered fallback
    pub missing_fields: Vec<MissingField>,

    /// Next steps for the caller
    pub recommendations: Vec<String>,
}

/// Transport envelope for a single assessment call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRequest {
    /// Transaction under evaluation
    pub transaction: TransactionContext,
    /// User profile
    pub history: UserHistory,
}

/// Lenient ISO-8601 parsing for transaction timestamps
pub mod timestamp {
    use chrono::{DateTime, FixedOffset, NaiveDateTime};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    const LOCAL_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];

    /// Parse an RFC 3339 timestamp, or an offset-less local one.
    ///
    /// A local timestamp keeps its wall-clock reading and gets a zero
    /// offset, so the hour of day seen by the engine is the hour written.
    pub fn parse(raw: &str) -> Result<DateTime<FixedOffset>, String> {
        if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
            return Ok(t);
        }

        LOCAL_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc().fixed_offset())
            .ok_or_else(|| {
                format!(
                    "invalid timestamp {:?}: expected ISO-8601 such as 2024-03-10T14:30:00+05:30",
                    raw
                )
            })
    }

    /// Serde adapter for `Option<DateTime<FixedOffset>>` fields
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}
