// Run configuration: built-in defaults, then an optional TOML file, then
// environment variables. CLI flags are applied on top by `main`.

use crate::Error;
use clap::ValueEnum;
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, str::FromStr, time::Duration};

pub const DEFAULT_ETHERSCAN_URL: &str = "https://api.etherscan.io/api";
pub const PUBLIC_RPC_URL: &str = "https://eth.llamarpc.com";

///
/// OutputFormat
///

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[display("table")]
    Table,
    #[display("csv")]
    Csv,
    #[display("json")]
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(Error::Config(format!("unsupported output format: {other}"))),
        }
    }
}

///
/// AnalysisSettings
///
/// The only configuration the analysis stages see.
///

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Length cap of the ranked wallet list.
    pub max_early_wallets: usize,
    /// Wallets that received less than this many tokens are left out.
    pub min_token_amount: Decimal,
    pub include_likely_airdrops: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self { max_early_wallets: 50, min_token_amount: Decimal::ZERO, include_likely_airdrops: true }
    }
}

///
/// Config
///

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub etherscan_api_key: Option<String>,
    pub etherscan_base_url: String,
    pub alchemy_api_key: Option<String>,
    pub rpc_url: Option<String>,
    pub max_transactions_per_request: u32,
    pub max_pages: u32,
    pub rate_limit_delay_ms: u64,
    pub max_retries: usize,
    pub output_format: OutputFormat,
    pub analysis: AnalysisSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            etherscan_api_key: None,
            etherscan_base_url: DEFAULT_ETHERSCAN_URL.to_string(),
            alchemy_api_key: None,
            rpc_url: None,
            max_transactions_per_request: 10_000,
            max_pages: 1,
            rate_limit_delay_ms: 200,
            max_retries: 3,
            output_format: OutputFormat::Table,
            analysis: AnalysisSettings::default(),
        }
    }
}

impl Config {
    /// Defaults, overlaid by `path` when given, overlaid by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&fs::read_to_string(path)?)?,
            None => Self::default(),
        };

        config.apply_env(|key| env::var(key).ok())?;

        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay values found through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get("ETHERSCAN_API_KEY") {
            self.etherscan_api_key = Some(key);
        }
        if let Some(key) = get("ALCHEMY_API_KEY") {
            self.alchemy_api_key = Some(key);
        }
        if let Some(url) = get("ETH_RPC_URL") {
            self.rpc_url = Some(url);
        }
        if let Some(v) = get("MAX_EARLY_WALLETS") {
            self.analysis.max_early_wallets = parse_env("MAX_EARLY_WALLETS", &v)?;
        }
        if let Some(v) = get("MAX_TRANSACTIONS_PER_REQUEST") {
            self.max_transactions_per_request = parse_env("MAX_TRANSACTIONS_PER_REQUEST", &v)?;
        }
        if let Some(v) = get("RATE_LIMIT_DELAY") {
            let seconds: f64 = parse_env("RATE_LIMIT_DELAY", &v)?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(Error::Config(format!("RATE_LIMIT_DELAY must be a non-negative number, got {v}")));
            }
            self.rate_limit_delay_ms = (seconds * 1000.0).round() as u64;
        }
        if let Some(v) = get("OUTPUT_FORMAT") {
            self.output_format = v.parse()?;
        }
        if let Some(v) = get("INCLUDE_LIKELY_AIRDROPS") {
            self.analysis.include_likely_airdrops = v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = get("MIN_TOKEN_AMOUNT") {
            self.analysis.min_token_amount = parse_env("MIN_TOKEN_AMOUNT", &v)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.analysis.max_early_wallets == 0 {
            return Err(Error::Config("max_early_wallets must be greater than zero".to_string()));
        }
        if self.analysis.min_token_amount.is_sign_negative() {
            return Err(Error::Config("min_token_amount must not be negative".to_string()));
        }
        if self.max_transactions_per_request == 0 || self.max_pages == 0 {
            return Err(Error::Config("max_transactions_per_request and max_pages must be positive".to_string()));
        }

        Ok(())
    }

    /// Explorer key, required by every mode that goes online.
    pub fn require_api_key(&self) -> Result<&str, Error> {
        self.etherscan_api_key
            .as_deref()
            .filter(|key| !is_placeholder(key))
            .ok_or_else(|| Error::Config("ETHERSCAN_API_KEY environment variable is required".to_string()))
    }

    pub fn has_api_key(&self) -> bool {
        self.require_api_key().is_ok()
    }

    /// JSON-RPC endpoint for direct contract calls.
    pub fn node_url(&self) -> String {
        if let Some(url) = &self.rpc_url {
            return url.clone();
        }

        match self.alchemy_api_key.as_deref().filter(|key| !is_placeholder(key)) {
            Some(key) => format!("https://eth-mainnet.g.alchemy.com/v2/{key}"),
            None => PUBLIC_RPC_URL.to_string(),
        }
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

// template values like "your_key_here" count as unset
fn is_placeholder(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || key.to_lowercase().starts_with("your_")
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value.parse().map_err(|_| Error::Config(format!("invalid value for {key}: {value}")))
}
