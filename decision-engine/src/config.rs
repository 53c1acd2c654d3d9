//! Configuration for the decision engine

use crate::decision::DecisionThresholds;
use crate::factors::DEFAULT_HIGH_RISK_CATEGORIES;
use crate::{Error, Result};
use chrono::FixedOffset;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Decision engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Model version stamped on persisted assessments
    pub model_version: String,

    /// Decision thresholds
    pub thresholds: DecisionThresholds,

    /// Merchant categories always treated as high risk
    pub high_risk_categories: Vec<String>,

    /// Offset used to read the hour of day when a transaction has no timestamp
    pub local_utc_offset_minutes: i32,

    /// Profile used for users with no transaction history
    pub default_profile: DefaultProfile,

    /// Emit logs as JSON
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "decision-engine".to_string(),
            model_version: format!("weighted-v{}", env!("CARGO_PKG_VERSION")),
            thresholds: DecisionThresholds::default(),
            high_risk_categories: DEFAULT_HIGH_RISK_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            local_utc_offset_minutes: 0,
            default_profile: DefaultProfile::default(),
            log_json: false,
        }
    }
}

/// Amount profile assumed for a user with no prior transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultProfile {
    /// Average amount
    pub avg_amount: Decimal,

    /// Maximum amount
    pub max_amount: Decimal,
}

impl Default for DefaultProfile {
    fn default() -> Self {
        Self {
            avg_amount: Decimal::from(1200),
            max_amount: Decimal::from(5000),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(version) = std::env::var("RISK_MODEL_VERSION") {
            config.model_version = version;
        }

        if let Ok(value) = std::env::var("RISK_REJECT_THRESHOLD") {
            config.thresholds.reject = parse_decimal("RISK_REJECT_THRESHOLD", &value)?;
        }

        if let Ok(value) = std::env::var("RISK_REVIEW_THRESHOLD") {
            config.thresholds.review = parse_decimal("RISK_REVIEW_THRESHOLD", &value)?;
        }

        if let Ok(value) = std::env::var("RISK_WARN_THRESHOLD") {
            config.thresholds.warn = parse_decimal("RISK_WARN_THRESHOLD", &value)?;
        }

        if let Ok(value) = std::env::var("RISK_HIGH_RISK_CATEGORIES") {
            config.high_risk_categories = value
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }

        if let Ok(value) = std::env::var("RISK_LOCAL_UTC_OFFSET_MINUTES") {
            config.local_utc_offset_minutes = value.parse().map_err(|e| {
                Error::InvalidConfig(format!("RISK_LOCAL_UTC_OFFSET_MINUTES: {}", e))
            })?;
        }

        if let Ok(value) = std::env::var("RISK_LOG_JSON") {
            config.log_json = matches!(value.as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.local_offset()?;

        if self.default_profile.avg_amount <= Decimal::ZERO
            || self.default_profile.max_amount <= Decimal::ZERO
        {
            return Err(Error::InvalidConfig(
                "default profile amounts must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Offset for reading local time
    pub fn local_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.local_utc_offset_minutes * 60).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "local_utc_offset_minutes {} out of range",
                self.local_utc_offset_minutes
            ))
        })
    }
}

fn parse_decimal(name: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|e| Error::InvalidConfig(format!("{}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "decision-engine");
        assert_eq!(config.thresholds.reject, Decimal::from(90));
        assert_eq!(config.high_risk_categories.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            local_utc_offset_minutes = 330

            [thresholds]
            reject = 40
            review = 20
            warn = 10
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.thresholds.warn, Decimal::from(10));
        assert_eq!(config.local_offset().unwrap().local_minus_utc(), 330 * 60);
        assert_eq!(config.default_profile.avg_amount, Decimal::from(1200));
    }

    #[test]
    fn test_rejects_out_of_range_offset() {
        let config = Config {
            local_utc_offset_minutes: 24 * 60,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    fn write_temp(content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("decision-engine-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_from_file() {
        let path = write_temp(
            r#"
            model_version = "weighted-test"
            high_risk_categories = ["gambling", "lottery"]

            [thresholds]
            reject = 40
            review = 20
            warn = 10

            [default_profile]
            avg_amount = 800
            max_amount = 3000
            "#,
        );

        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.model_version, "weighted-test");
        assert_eq!(config.thresholds.review, Decimal::from(20));
        assert_eq!(config.high_risk_categories, vec!["gambling", "lottery"]);
        assert_eq!(config.default_profile.avg_amount, Decimal::from(800));
        assert_eq!(config.service_name, "decision-engine");
    }

    #[test]
    fn test_from_file_validates() {
        let path = write_temp(
            r#"
            [thresholds]
            reject = 10
            review = 20
            warn = 30
            "#,
        );

        let result = Config::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_file_errors() {
        let path = write_temp("thresholds = \"high\"");
        let result = Config::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        let missing = std::env::temp_dir().join("decision-engine-does-not-exist.toml");
        assert!(matches!(Config::from_file(missing), Err(Error::Io(_))));
    }

    const ENV_VARS: [&str; 7] = [
        "RISK_MODEL_VERSION",
        "RISK_REJECT_THRESHOLD",
        "RISK_REVIEW_THRESHOLD",
        "RISK_WARN_THRESHOLD",
        "RISK_HIGH_RISK_CATEGORIES",
        "RISK_LOCAL_UTC_OFFSET_MINUTES",
        "RISK_LOG_JSON",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    // Process environment is shared, so every from_env case runs in this one test.
    #[test]
    fn test_from_env() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.thresholds.reject, Decimal::from(90));
        assert!(!config.log_json);

        std::env::set_var("RISK_MODEL_VERSION", "weighted-env");
        std::env::set_var("RISK_REJECT_THRESHOLD", "50");
        std::env::set_var("RISK_REVIEW_THRESHOLD", "25.5");
        std::env::set_var("RISK_WARN_THRESHOLD", " 12 ");
        std::env::set_var("RISK_HIGH_RISK_CATEGORIES", "gambling, lottery,,crypto ");
        std::env::set_var("RISK_LOCAL_UTC_OFFSET_MINUTES", "330");
        std::env::set_var("RISK_LOG_JSON", "true");

        let config = Config::from_env().unwrap();
        assert_eq!(config.model_version, "weighted-env");
        assert_eq!(config.thresholds.reject, Decimal::from(50));
        assert_eq!(config.thresholds.review, Decimal::new(255, 1));
        assert_eq!(config.thresholds.warn, Decimal::from(12));
        assert_eq!(config.high_risk_categories, vec!["gambling", "lottery", "crypto"]);
        assert_eq!(config.local_offset().unwrap().local_minus_utc(), 330 * 60);
        assert!(config.log_json);

        std::env::set_var("RISK_REVIEW_THRESHOLD", "not-a-number");
        assert!(matches!(Config::from_env(), Err(Error::InvalidConfig(_))));

        std::env::set_var("RISK_REVIEW_THRESHOLD", "80");
        assert!(matches!(Config::from_env(), Err(Error::InvalidConfig(_))));

        std::env::set_var("RISK_REVIEW_THRESHOLD", "25");
        std::env::set_var("RISK_LOCAL_UTC_OFFSET_MINUTES", "abc");
        assert!(matches!(Config::from_env(), Err(Error::InvalidConfig(_))));

        clear_env();
    }
}
