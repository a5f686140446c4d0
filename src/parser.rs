use crate::{
    addresses::{is_valid_address, normalize_address},
    amounts::{is_unsigned_integer, scale_token_amount},
    models::{Direction, TokenDescriptor, TransferRecord},
};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error as ThisError;

///
/// RawTransfer
///
/// One row of a token-transfer history as the explorer returns it. Every
/// field is optional here; the parser decides what is required.
///

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransfer {
    #[serde(default, deserialize_with = "string_or_number")]
    pub time_stamp: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub block_number: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub gas_used: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub gas_price: Option<String>,
}

// explorers send numbers as strings, local dumps often don't
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;

    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

///
/// SkipReason
///

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum SkipReason {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid transaction hash {0:?}")]
    InvalidHash(String),

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("invalid block number {0:?}")]
    InvalidBlockNumber(String),

    #[error("invalid token amount {0:?}")]
    InvalidAmount(String),

    #[error("invalid addresses: from={from}, to={to}")]
    InvalidAddress { from: String, to: String },

    #[error("invalid gas used {0:?}")]
    InvalidGasUsed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub index: usize,
    pub hash: Option<String>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub records: Vec<TransferRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// Turn raw rows into inbound records for the recipient, keeping input
/// order. Bad rows are set aside with a reason, never fatal.
pub fn parse_transfers(rows: &[RawTransfer], token: &TokenDescriptor) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for (index, row) in rows.iter().enumerate() {
        match parse_row(row, token) {
            Ok(record) => outcome.records.push(record),
            Err(reason) => {
                warn!("Skipping transfer {} (row {index}): {reason}", row.hash.as_deref().unwrap_or("unknown"));
                outcome.skipped.push(SkippedRow { index, hash: row.hash.clone(), reason });
            }
        }
    }

    info!(
        "Parsed {} valid transfers from {} raw rows ({} skipped)",
        outcome.records.len(),
        rows.len(),
        outcome.skipped.len()
    );

    outcome
}

pub fn parse_row(row: &RawTransfer, token: &TokenDescriptor) -> Result<TransferRecord, SkipReason> {
    let time_stamp = required(&row.time_stamp, "timeStamp")?;
    let value = required(&row.value, "value")?;
    let hash = required(&row.hash, "hash")?;
    let block_number = required(&row.block_number, "blockNumber")?;
    let from = required(&row.from, "from")?;
    let to = required(&row.to, "to")?;

    let hash = hash.trim();
    if !is_valid_tx_hash(hash) {
        return Err(SkipReason::InvalidHash(hash.to_string()));
    }

    let timestamp = parse_timestamp(time_stamp).ok_or_else(|| SkipReason::InvalidTimestamp(time_stamp.to_string()))?;

    let value = value.trim();
    if !is_unsigned_integer(value) {
        return Err(SkipReason::InvalidAmount(value.to_string()));
    }
    let token_amount = scale_token_amount(value, token.decimals);

    let from_address = normalize_address(from.trim());
    let to_address = normalize_address(to.trim());
    if !is_valid_address(&from_address) || !is_valid_address(&to_address) {
        return Err(SkipReason::InvalidAddress { from: from_address, to: to_address });
    }

    let block_number =
        parse_quantity(block_number).ok_or_else(|| SkipReason::InvalidBlockNumber(block_number.to_string()))?;

    let gas_used = match non_empty(&row.gas_used) {
        Some(gas) => Some(parse_quantity(gas).ok_or_else(|| SkipReason::InvalidGasUsed(gas.to_string()))?),
        None => None,
    };

    Ok(TransferRecord {
        wallet_address: to_address.clone(),
        tx_hash: hash.to_string(),
        block_number,
        timestamp,
        token_amount,
        token_amount_raw: value.to_string(),
        direction: Direction::In,
        from_address,
        to_address,
        gas_used,
        gas_price: non_empty(&row.gas_price).map(|p| p.trim().to_string()),
    })
}

/// `0x` followed by 64 hex digits.
pub fn is_valid_tx_hash(hash: &str) -> bool {
    hash.strip_prefix("0x").is_some_and(|digits| digits.len() == 64 && digits.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

fn required<'a>(field: &'a Option<String>, name: &'static str) -> Result<&'a str, SkipReason> {
    non_empty(field).ok_or(SkipReason::MissingField(name))
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let seconds = text.trim().parse::<i64>().ok()?;

    DateTime::from_timestamp(seconds, 0)
}

// decimal, or 0x-prefixed hex as node RPCs return it
fn parse_quantity(text: &str) -> Option<u64> {
    let text = text.trim();

    match text.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse::<u64>().ok(),
    }
}
