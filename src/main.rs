pub mod addresses;
pub mod amounts;
pub mod config;
pub mod export;
pub mod local_transfers;
pub mod models;
pub mod parser;
pub mod report;
pub mod token_info;
pub mod transactions;
pub mod wallet_analyzer;
pub mod wallet_grouper;

use addresses::{is_valid_address, normalize_address};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use config::{Config, OutputFormat};
use dotenv::dotenv;
use env_logger::Env;
use export::{print_report, write_csv, write_json};
use local_transfers::read_transfer_file;
use models::{AnalysisReport, TokenDescriptor};
use parser::RawTransfer;
use report::analyze_transfers;
use rust_decimal::Decimal;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;
use token_info::{resolve_token, NodeClient};
use transactions::EtherscanClient;

const ENV_FILE: &str = ".env";

const ENV_TEMPLATE: &str = "# Early wallet tracker configuration

# Required: Etherscan API key (https://etherscan.io/apis)
ETHERSCAN_API_KEY=your_etherscan_api_key_here

# Optional: node access for contract metadata lookups
# ALCHEMY_API_KEY=your_alchemy_api_key_here
# ETH_RPC_URL=https://eth.llamarpc.com

# Analysis settings
MAX_EARLY_WALLETS=50
MAX_TRANSACTIONS_PER_REQUEST=10000
RATE_LIMIT_DELAY=0.2
INCLUDE_LIKELY_AIRDROPS=true
MIN_TOKEN_AMOUNT=0.0

# Output settings
OUTPUT_FORMAT=table
";

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("explorer API error: {0}")]
    Api(String),

    #[error("invalid transfer file: {0}")]
    TransferFile(String),

    #[error("could not resolve token {0:?}, expected a contract address")]
    UnresolvedToken(String),

    #[error("none of the {0} transfer rows could be parsed")]
    NoUsableTransfers(usize),
}

///
/// Cli
///

#[derive(Debug, Parser)]
#[command(name = "early-wallets", version, about = "Find the earliest wallets to interact with an ERC-20 token")]
struct Cli {
    /// Log progress at info level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Track the earliest wallet interactions with a token
    Track(TrackArgs),

    /// Write a .env template in the current directory
    Setup {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct TrackArgs {
    /// Token contract address
    token: String,

    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file for csv/json
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long)]
    max_wallets: Option<usize>,

    #[arg(long)]
    exclude_airdrops: bool,

    /// Minimum tokens received for a wallet to be listed
    #[arg(long)]
    min_amount: Option<Decimal>,

    /// Read transfers from a local JSON/JSONL file instead of the explorer
    #[arg(long)]
    input: Option<PathBuf>,

    /// ETH price in USD for gas cost estimates
    #[arg(long)]
    eth_price: Option<f64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    symbol: Option<String>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    decimals: Option<u8>,
}

impl TrackArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(format) = self.format {
            config.output_format = format;
        }
        if let Some(max) = self.max_wallets {
            config.analysis.max_early_wallets = max;
        }
        if self.exclude_airdrops {
            config.analysis.include_likely_airdrops = false;
        }
        if let Some(min) = self.min_amount {
            config.analysis.min_token_amount = min;
        }
    }

    fn has_metadata(&self) -> bool {
        self.symbol.is_some() || self.name.is_some() || self.decimals.is_some()
    }

    // flags win over whatever was resolved
    fn override_metadata(&self, mut token: TokenDescriptor) -> TokenDescriptor {
        if let Some(symbol) = &self.symbol {
            token.symbol = symbol.clone();
        }
        if let Some(name) = &self.name {
            token.name = name.clone();
        }
        if let Some(decimals) = self.decimals {
            token.decimals = decimals;
        }

        token
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();
    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Track(args) => run_track(args).await,
        Command::Setup { force } => run_setup(Path::new(ENV_FILE), force),
    }
}

async fn run_track(args: TrackArgs) -> anyhow::Result<()> {
    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);
    config.validate()?;

    let (token, rows, eth_price) = match &args.input {
        Some(path) => load_offline(&args, &config, path).await?,
        None => load_online(&args, &config).await?,
    };

    if rows.is_empty() {
        println!("No token transfers found for {}", token.contract_address);
    }

    let report = analyze_transfers(&token, &rows, eth_price, &config.analysis)?;
    write_output(&report, config.output_format, args.output.as_deref())?;

    Ok(())
}

async fn load_online(args: &TrackArgs, config: &Config) -> anyhow::Result<(TokenDescriptor, Vec<RawTransfer>, Option<f64>)> {
    println!("Initializing API clients...");
    let etherscan = EtherscanClient::new(config)?;
    let node = NodeClient::new(&config.node_url())?;

    println!("Resolving token: {}", args.token);
    let token = args.override_metadata(resolve_token(&args.token, &etherscan, &node).await?);

    println!("Analyzing early interactions for {} ({})...", token.name, token.symbol);
    let rows = etherscan.get_token_transfers(&token.contract_address).await?;
    println!("Found {} token transfers", rows.len());

    let eth_price = match args.eth_price {
        Some(price) => Some(price),
        None if rows.is_empty() => None,
        None => Some(etherscan.get_current_eth_price().await),
    };

    Ok((token, rows, eth_price))
}

async fn load_offline(
    args: &TrackArgs,
    config: &Config,
    path: &Path,
) -> anyhow::Result<(TokenDescriptor, Vec<RawTransfer>, Option<f64>)> {
    let address = normalize_address(&args.token);
    if !is_valid_address(&address) {
        return Err(Error::UnresolvedToken(args.token.clone()).into());
    }

    let token = if config.has_api_key() && !args.has_metadata() {
        let etherscan = EtherscanClient::new(config)?;
        let node = NodeClient::new(&config.node_url())?;
        resolve_token(&address, &etherscan, &node).await?
    } else {
        TokenDescriptor::unknown(&address)
    };
    let token = args.override_metadata(token);

    println!("Reading transfers from {}", path.display());
    let rows = read_transfer_file(path).with_context(|| format!("failed to read {}", path.display()))?;
    println!("Found {} token transfers", rows.len());

    Ok((token, rows, args.eth_price))
}

fn write_output(report: &AnalysisReport, format: OutputFormat, output: Option<&Path>) -> Result<(), Error> {
    if format == OutputFormat::Table || output.is_none() {
        print_report(report);
    }

    if let Some(path) = output {
        match format {
            OutputFormat::Csv => {
                write_csv(report, path)?;
                println!("Results exported to {}", path.display());
            }
            OutputFormat::Json => {
                write_json(report, path)?;
                println!("Results exported to {}", path.display());
            }
            OutputFormat::Table => println!("Table output is printed only; use --format csv or json to write a file"),
        }
    }

    Ok(())
}

fn run_setup(path: &Path, force: bool) -> anyhow::Result<()> {
    if !write_env_template(path, force)? {
        println!("{} already exists, pass --force to overwrite it", path.display());
        return Ok(());
    }

    println!("Created {}", path.display());
    println!("\nEdit the file and add your API key:");
    println!("1. Get an Etherscan API key from https://etherscan.io/apis");
    println!("2. Replace 'your_etherscan_api_key_here' with your key");
    println!("3. Optional: add an Alchemy key or ETH_RPC_URL for contract lookups");
    println!("4. Run: early-wallets track <contract_address>");

    Ok(())
}

/// Returns false when the file exists and `force` is not set.
fn write_env_template(path: &Path, force: bool) -> Result<bool, Error> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, ENV_TEMPLATE)?;

    Ok(true)
}
