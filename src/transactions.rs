use crate::{
    config::Config,
    models::{TokenDescriptor, DEFAULT_DECIMALS, UNKNOWN_NAME, UNKNOWN_SYMBOL},
    parser::RawTransfer,
    token_info::{abi, SELECTOR_DECIMALS, SELECTOR_NAME, SELECTOR_SYMBOL},
    Error,
};
use anyhow::Context;
use chrono::Utc;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::{sleep, Duration};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const NO_TRANSACTIONS: &str = "No transactions found";
const FALLBACK_ETH_PRICE: f64 = 2000.0;

// anchor for estimating the chain head when the explorer is unreachable
const ANCHOR_BLOCK: u64 = 15_500_000;
const ANCHOR_TIMESTAMP: i64 = 1_663_200_000;
const SECONDS_PER_BLOCK: i64 = 12;

///
/// ApiResponse
///
/// Envelope shared by all explorer endpoints. Regular modules carry
/// `status`/`message`, proxy calls mirror JSON-RPC and carry `error`.
///

#[derive(Debug, Default, Deserialize)]
pub struct ApiResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub result: Option<Value>,
    pub error: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TokenInfoRow {
    token_name: String,
    symbol: String,
    divisor: String,
    total_supply: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceCodeRow {
    #[serde(rename = "ContractName")]
    contract_name: String,
}

/// Unwrap the envelope, turning explorer-level failures into errors.
///
/// "No transactions found" is an empty history, not a failure.
pub fn check_response(response: ApiResponse) -> Result<Value, Error> {
    if let Some(error) = response.error {
        let message = error.get("message").and_then(Value::as_str).map(str::to_string).unwrap_or_else(|| error.to_string());
        return Err(Error::Api(message));
    }

    let result = response.result.unwrap_or(Value::Null);

    match response.status.as_deref() {
        None | Some("1") => Ok(result),
        Some(_) => {
            let message = response.message.unwrap_or_default();
            let detail = result.as_str().unwrap_or_default();

            if message.contains(NO_TRANSACTIONS) || detail.contains(NO_TRANSACTIONS) {
                return Ok(Value::Array(Vec::new()));
            }

            if detail.is_empty() {
                Err(Error::Api(message))
            } else {
                Err(Error::Api(format!("{message}: {detail}")))
            }
        }
    }
}

fn is_retryable(e: &Error) -> bool {
    match e {
        Error::Http(_) => true,
        Error::Api(message) => message.to_lowercase().contains("rate limit"),
        _ => false,
    }
}

/// `1` followed by zeros gives the number of zeros. Some explorers report
/// the decimals themselves, so a small plain integer is taken as is.
/// Anything that does not fit a `u8` falls back to the default.
pub fn decimals_from_divisor(divisor: &str) -> u8 {
    let divisor = divisor.trim();

    if let Some(zeros) = divisor.strip_prefix('1') {
        if zeros.chars().all(|c| c == '0') {
            return u8::try_from(zeros.len()).unwrap_or(DEFAULT_DECIMALS);
        }
    }

    match divisor.parse::<u8>() {
        Ok(decimals) if decimals <= 36 => decimals,
        _ => DEFAULT_DECIMALS,
    }
}

pub fn parse_hex_quantity(hex: &str) -> Option<u64> {
    let digits = hex.trim().strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }

    u64::from_str_radix(digits, 16).ok()
}

/// Chain head estimated from wall-clock time, 12 seconds per block.
pub fn estimated_block_number(now: i64) -> u64 {
    let elapsed = (now - ANCHOR_TIMESTAMP).max(0);

    ANCHOR_BLOCK + (elapsed / SECONDS_PER_BLOCK) as u64
}

fn parse_eth_price(result: &Value) -> Option<f64> {
    let price = match result.get("ethusd")? {
        Value::String(s) => s.parse().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };

    (price > 0.0).then_some(price)
}

///
/// EtherscanClient
///

pub struct EtherscanClient {
    http: Client,
    base_url: String,
    api_key: String,
    page_size: u32,
    max_pages: u32,
    delay: Duration,
    max_retries: usize,
}

impl EtherscanClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let api_key = config.require_api_key()?.to_string();
        let http = Client::builder().timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS)).build()?;

        Ok(Self {
            http,
            base_url: config.etherscan_base_url.clone(),
            api_key,
            page_size: config.max_transactions_per_request,
            max_pages: config.max_pages,
            delay: config.rate_limit_delay(),
            max_retries: config.max_retries,
        })
    }

    async fn fetch(&self, params: &[(&str, String)]) -> Result<Value, Error> {
        let response: ApiResponse = self
            .http
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        sleep(self.delay).await;

        check_response(response)
    }

    async fn fetch_with_retry(&self, params: &[(&str, String)]) -> Result<Value, Error> {
        let mut attempts = 0;
        loop {
            match self.fetch(params).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempts += 1;
                    if attempts >= self.max_retries || !is_retryable(&e) {
                        return Err(e);
                    }
                    warn!("Explorer request failed: {e}. Retrying {attempts}/{}...", self.max_retries);
                    sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    /// Full transfer history of a token contract, oldest first.
    pub async fn get_token_transfers(&self, contract: &str) -> anyhow::Result<Vec<RawTransfer>> {
        let end_block = self.get_current_block_number().await;
        let mut rows = Vec::new();

        for page in 1..=self.max_pages {
            let params = [
                ("module", "account".to_string()),
                ("action", "tokentx".to_string()),
                ("contractaddress", contract.to_string()),
                ("startblock", "0".to_string()),
                ("endblock", end_block.to_string()),
                ("page", page.to_string()),
                ("offset", self.page_size.to_string()),
                ("sort", "asc".to_string()),
            ];

            let result = self
                .fetch_with_retry(&params)
                .await
                .with_context(|| format!("fetching transfers of {contract} (page {page})"))?;

            let batch: Vec<RawTransfer> = match result {
                Value::Null => Vec::new(),
                other => serde_json::from_value(other).context("unexpected tokentx result")?,
            };
            let count = batch.len();
            rows.extend(batch);

            info!("page {page}: {count} transfers");
            if count < self.page_size as usize {
                break;
            }
        }

        Ok(rows)
    }

    pub async fn get_current_block_number(&self) -> u64 {
        let params = [("module", "proxy".to_string()), ("action", "eth_blockNumber".to_string())];

        match self.fetch_with_retry(&params).await {
            Ok(result) => match result.as_str().and_then(parse_hex_quantity) {
                Some(block) => return block,
                None => warn!("Unexpected eth_blockNumber result {result}, estimating"),
            },
            Err(e) => warn!("Failed to get current block number: {e}, estimating"),
        }

        estimated_block_number(Utc::now().timestamp())
    }

    pub async fn get_current_eth_price(&self) -> f64 {
        let params = [("module", "stats".to_string()), ("action", "ethprice".to_string())];

        match self.fetch_with_retry(&params).await {
            Ok(result) => parse_eth_price(&result).unwrap_or_else(|| {
                warn!("Unexpected ethprice result {result}, using {FALLBACK_ETH_PRICE}");
                FALLBACK_ETH_PRICE
            }),
            Err(e) => {
                warn!("ETH price request failed: {e}, using {FALLBACK_ETH_PRICE}");
                FALLBACK_ETH_PRICE
            }
        }
    }

    /// Token metadata from the explorer, trying progressively weaker
    /// sources. Never fails; the last resort is an unknown descriptor.
    pub async fn get_token_info(&self, contract: &str) -> TokenDescriptor {
        match self.token_info_endpoint(contract).await {
            Ok(Some(token)) => return token,
            Ok(None) => debug!("tokeninfo has nothing for {contract}"),
            Err(e) => warn!("Token info request failed for {contract}: {e}"),
        }

        match self.source_code_name(contract).await {
            Ok(Some(name)) => return TokenDescriptor::new(&name, UNKNOWN_SYMBOL, contract, DEFAULT_DECIMALS),
            Ok(None) => debug!("no verified source for {contract}"),
            Err(e) => warn!("Contract source request failed for {contract}: {e}"),
        }

        if let Some(token) = self.token_info_via_proxy(contract).await {
            return token;
        }

        TokenDescriptor::unknown(contract)
    }

    async fn token_info_endpoint(&self, contract: &str) -> Result<Option<TokenDescriptor>, Error> {
        let params = [
            ("module", "token".to_string()),
            ("action", "tokeninfo".to_string()),
            ("contractaddress", contract.to_string()),
        ];
        let result = self.fetch_with_retry(&params).await?;
        let rows: Vec<TokenInfoRow> = serde_json::from_value(result)?;

        Ok(rows.into_iter().next().map(|row| {
            let name = if row.token_name.is_empty() { UNKNOWN_NAME } else { &row.token_name };
            let symbol = if row.symbol.is_empty() { UNKNOWN_SYMBOL } else { &row.symbol };
            let decimals = if row.divisor.is_empty() { DEFAULT_DECIMALS } else { decimals_from_divisor(&row.divisor) };

            let mut token = TokenDescriptor::new(name, symbol, contract, decimals);
            token.total_supply = row.total_supply;
            token
        }))
    }

    async fn source_code_name(&self, contract: &str) -> Result<Option<String>, Error> {
        let params = [
            ("module", "contract".to_string()),
            ("action", "getsourcecode".to_string()),
            ("address", contract.to_string()),
        ];
        let result = self.fetch_with_retry(&params).await?;
        let rows: Vec<SourceCodeRow> = serde_json::from_value(result)?;

        Ok(rows.into_iter().next().map(|row| row.contract_name).filter(|name| !name.is_empty()))
    }

    async fn proxy_eth_call(&self, contract: &str, selector: &str) -> Option<String> {
        let params = [
            ("module", "proxy".to_string()),
            ("action", "eth_call".to_string()),
            ("to", contract.to_string()),
            ("data", selector.to_string()),
            ("tag", "latest".to_string()),
        ];

        match self.fetch_with_retry(&params).await {
            Ok(Value::String(data)) => Some(data),
            Ok(other) => {
                warn!("eth_call {selector} on {contract} returned {other}");
                None
            }
            Err(e) => {
                warn!("eth_call {selector} on {contract} failed: {e}");
                None
            }
        }
    }

    async fn token_info_via_proxy(&self, contract: &str) -> Option<TokenDescriptor> {
        let name = self.proxy_eth_call(contract, SELECTOR_NAME).await;
        let symbol = self.proxy_eth_call(contract, SELECTOR_SYMBOL).await;
        let decimals = self.proxy_eth_call(contract, SELECTOR_DECIMALS).await;

        if name.is_none() && symbol.is_none() && decimals.is_none() {
            return None;
        }

        let name = name.as_deref().and_then(abi::decode_string).filter(|s| !s.is_empty());
        let symbol = symbol.as_deref().and_then(abi::decode_string).filter(|s| !s.is_empty());
        let decimals = decimals.as_deref().and_then(abi::decode_decimals).unwrap_or(DEFAULT_DECIMALS);

        Some(TokenDescriptor::new(
            name.as_deref().unwrap_or(UNKNOWN_NAME),
            symbol.as_deref().unwrap_or(UNKNOWN_SYMBOL),
            contract,
            decimals,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: Value) -> ApiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_check_response_ok() {
        let result = check_response(response(json!({"status": "1", "message": "OK", "result": [{"hash": "0x01"}]})));
        assert_eq!(result.unwrap(), json!([{"hash": "0x01"}]));
    }

    #[test]
    fn test_check_response_no_transactions_is_empty() {
        let result = check_response(response(json!({"status": "0", "message": "No transactions found", "result": []})));
        assert_eq!(result.unwrap(), json!([]));
    }

    #[test]
    fn test_check_response_api_error() {
        let result = check_response(response(json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"})));

        match result {
            Err(Error::Api(message)) => assert_eq!(message, "NOTOK: Invalid API Key"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_check_response_proxy() {
        let result = check_response(response(json!({"jsonrpc": "2.0", "id": 83, "result": "0x10d4f"})));
        assert_eq!(result.unwrap(), json!("0x10d4f"));

        let result = check_response(response(json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "execution reverted"}})));
        assert!(matches!(result, Err(Error::Api(m)) if m == "execution reverted"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable(&Error::Api("NOTOK: Max rate limit reached".to_string())));
        assert!(!is_retryable(&Error::Api("NOTOK: Invalid API Key".to_string())));
    }

    #[test]
    fn test_decimals_from_divisor() {
        assert_eq!(decimals_from_divisor("1000000000000000000"), 18);
        assert_eq!(decimals_from_divisor("1000000"), 6);
        assert_eq!(decimals_from_divisor("1"), 0);
        assert_eq!(decimals_from_divisor("18"), 18);
        assert_eq!(decimals_from_divisor("8"), 8);
        assert_eq!(decimals_from_divisor("garbage"), DEFAULT_DECIMALS);
        assert_eq!(decimals_from_divisor("4294967295"), DEFAULT_DECIMALS);
        assert_eq!(decimals_from_divisor(&format!("1{}", "0".repeat(70_000))), DEFAULT_DECIMALS);
    }

    #[test]
    fn test_parse_hex_quantity() {
        assert_eq!(parse_hex_quantity("0x10d4f"), Some(68943));
        assert_eq!(parse_hex_quantity("0x"), None);
        assert_eq!(parse_hex_quantity("10d4f"), None);
    }

    #[test]
    fn test_estimated_block_number() {
        assert_eq!(estimated_block_number(ANCHOR_TIMESTAMP), ANCHOR_BLOCK);
        assert_eq!(estimated_block_number(ANCHOR_TIMESTAMP + 120), ANCHOR_BLOCK + 10);
        assert_eq!(estimated_block_number(0), ANCHOR_BLOCK);
    }

    #[test]
    fn test_parse_eth_price() {
        assert_eq!(parse_eth_price(&json!({"ethbtc": "0.05", "ethusd": "3120.55"})), Some(3120.55));
        assert_eq!(parse_eth_price(&json!({"ethusd": 1800})), Some(1800.0));
        assert_eq!(parse_eth_price(&json!({"ethusd": "0"})), None);
        assert_eq!(parse_eth_price(&json!("oops")), None);
    }

    #[test]
    fn test_token_info_rows() {
        let rows: Vec<TokenInfoRow> = serde_json::from_value(json!([{
            "contractAddress": "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984",
            "tokenName": "Uniswap",
            "symbol": "UNI",
            "divisor": "1000000000000000000",
            "totalSupply": "1000000000000000000000000000"
        }]))
        .unwrap();

        assert_eq!(rows[0].token_name, "Uniswap");
        assert_eq!(decimals_from_divisor(&rows[0].divisor), 18);
        assert_eq!(rows[0].total_supply.as_deref(), Some("1000000000000000000000000000"));
    }
}
