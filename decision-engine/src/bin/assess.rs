//! Assess a single transaction from a JSON request file

use anyhow::Context;
use clap::Parser;
use decision_engine::{AssessmentRequest, Config, RiskScorer};
use std::io::Read;
use std::path::PathBuf;

/// Score a transaction request and print the assessment as JSON
#[derive(Debug, Parser)]
#[command(name = "risk-assess", version)]
struct Args {
    /// Request file with `transaction` and `history`; stdin when absent or `-`
    input: Option<PathBuf>,

    /// TOML config file; RISK_* environment variables are used when absent
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::from_env()?,
    };

    init_tracing(config.log_json);
    tracing::info!("Starting {} ({})", config.service_name, config.model_version);

    let raw = match args.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let request: AssessmentRequest =
        serde_json::from_str(&raw).context("parsing assessment request")?;

    let scorer = RiskScorer::from_config(&config)?;
    let assessment = scorer.assess_risk(&request.transaction, &request.history)?;

    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    // Logs go to stderr so stdout stays valid JSON
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parses_input_and_config() {
        let args = Args::try_parse_from(["risk-assess", "req.json", "--config", "risk.toml"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("req.json")));
        assert_eq!(args.config, Some(PathBuf::from("risk.toml")));
    }

    #[test]
    fn test_stdin_when_no_input() {
        let args = Args::try_parse_from(["risk-assess"]).unwrap();
        assert!(args.input.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn test_config_requires_value() {
        assert!(Args::try_parse_from(["risk-assess", "--config"]).is_err());
        assert!(Args::try_parse_from(["risk-assess", "a.json", "b.json"]).is_err());
    }
}
