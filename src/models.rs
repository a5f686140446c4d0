use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";
pub const UNKNOWN_NAME: &str = "Unknown Token";
pub const DEFAULT_DECIMALS: u8 = 18;

///
/// TokenDescriptor
///

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub name: String,
    pub symbol: String,
    pub contract_address: String,
    pub decimals: u8,
    pub total_supply: Option<String>,
}

impl TokenDescriptor {
    pub fn new(name: &str, symbol: &str, contract_address: &str, decimals: u8) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            contract_address: contract_address.to_lowercase(),
            decimals,
            total_supply: None,
        }
    }

    /// Placeholder used when no metadata source answers.
    pub fn unknown(contract_address: &str) -> Self {
        Self::new(UNKNOWN_NAME, UNKNOWN_SYMBOL, contract_address, DEFAULT_DECIMALS)
    }

    pub fn is_unknown(&self) -> bool {
        self.symbol == UNKNOWN_SYMBOL
    }
}

///
/// Direction
///

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[display("in")]
    In,
    #[display("out")]
    Out,
}

///
/// TransferRecord
///
/// One token transfer seen from a single wallet's side. Every perspective is
/// built as its own value, so two wallets never share a record.
///

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub wallet_address: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub token_amount: Decimal,
    pub token_amount_raw: String,
    pub direction: Direction,
    pub from_address: String,
    pub to_address: String,
    pub gas_used: Option<u64>,
    pub gas_price: Option<String>,
}

impl TransferRecord {
    /// Build the same transfer as seen by `wallet`.
    pub fn for_wallet(&self, wallet: &str, direction: Direction) -> Self {
        Self {
            wallet_address: wallet.to_string(),
            tx_hash: self.tx_hash.clone(),
            block_number: self.block_number,
            timestamp: self.timestamp,
            token_amount: self.token_amount,
            token_amount_raw: self.token_amount_raw.clone(),
            direction,
            from_address: self.from_address.clone(),
            to_address: self.to_address.clone(),
            gas_used: self.gas_used,
            gas_price: self.gas_price.clone(),
        }
    }

    /// The other side of the transfer.
    pub fn counterparty(&self) -> &str {
        match self.direction {
            Direction::In => &self.from_address,
            Direction::Out => &self.to_address,
        }
    }
}

///
/// WalletKind
///

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WalletKind {
    Airdrop,
    Buyer,
    Unknown,
}

///
/// WalletSummary
///

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub wallet_address: String,
    pub first_transaction: TransferRecord,
    pub total_received: Decimal,
    pub total_sent: Decimal,
    pub net_position: Decimal,
    pub transaction_count: usize,
    pub estimated_eth_cost: Option<Decimal>,
    pub estimated_usd_cost: Option<Decimal>,
    pub is_likely_buyer: bool,
    pub is_likely_airdrop: bool,
}

impl WalletSummary {
    pub fn kind(&self) -> WalletKind {
        if self.is_likely_airdrop {
            WalletKind::Airdrop
        } else if self.is_likely_buyer {
            WalletKind::Buyer
        } else {
            WalletKind::Unknown
        }
    }
}

///
/// PipelineStats
///
/// Per-stage counts, so skipped rows and dropped wallets are visible
/// without reading the logs.
///

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub rows_received: usize,
    pub rows_accepted: usize,
    pub rows_skipped: usize,
    pub wallets_grouped: usize,
    pub wallets_analyzed: usize,
    pub wallets_below_threshold: usize,
    pub wallets_failed: usize,
    pub airdrops_excluded: usize,
}

///
/// AnalysisReport
///

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub token: TokenDescriptor,
    pub total_transactions: usize,
    pub unique_wallets: usize,
    pub earliest_wallets: Vec<WalletSummary>,
    pub generated_at: DateTime<Utc>,
    pub stats: PipelineStats,
}
