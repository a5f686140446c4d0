use crate::{
    addresses::{is_valid_address, normalize_address},
    models::{TokenDescriptor, DEFAULT_DECIMALS, UNKNOWN_NAME, UNKNOWN_SYMBOL},
    transactions::EtherscanClient,
    Error,
};
use anyhow::{anyhow, Context};
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

// ERC-20 function selectors
pub const SELECTOR_NAME: &str = "0x06fdde03";
pub const SELECTOR_SYMBOL: &str = "0x95d89b41";
pub const SELECTOR_DECIMALS: &str = "0x313ce567";
pub const SELECTOR_TOTAL_SUPPLY: &str = "0x18160ddd";

const NODE_TIMEOUT_SECS: u64 = 15;

///
/// abi
///
/// Decoding of `eth_call` return data for the few ERC-20 getters we use.
///

pub mod abi {
    use alloy::{primitives::U256, sol, sol_types::SolCall};

    const WORD: usize = 32;

    sol! {
        interface IERC20 {
            function name() external view returns (string);
            function symbol() external view returns (string);
            function decimals() external view returns (uint8);
            function totalSupply() external view returns (uint256);
        }
    }

    fn bytes_of(data: &str) -> Option<Vec<u8>> {
        let body = data.trim().trim_start_matches("0x");
        hex::decode(body).ok()
    }

    /// Decode a `string` return value.
    ///
    /// Handles the standard dynamic encoding as well as the fixed `bytes32`
    /// form some early tokens return.
    pub fn decode_string(data: &str) -> Option<String> {
        let raw = bytes_of(data)?;

        if raw.len() < 2 * WORD {
            let end = raw.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
            return Some(String::from_utf8_lossy(&raw[..end]).into_owned());
        }

        IERC20::nameCall::abi_decode_returns(&raw).ok()
    }

    fn decode_word(data: &str) -> Option<U256> {
        let raw = bytes_of(data)?;
        if raw.is_empty() || raw.len() > WORD {
            return None;
        }

        Some(U256::from_be_slice(&raw))
    }

    /// Decode a `uint256` return value into its decimal string.
    pub fn decode_uint(data: &str) -> Option<String> {
        decode_word(data).map(|value| value.to_string())
    }

    /// `decimals()` is a `uint8`; wider values are rejected.
    pub fn decode_decimals(data: &str) -> Option<u8> {
        u8::try_from(decode_word(data)?).ok()
    }
}

///
/// NodeClient
///
/// Plain JSON-RPC against an Ethereum node.
///

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<Value>,
}

pub struct NodeClient {
    http: Client,
    url: String,
}

impl NodeClient {
    pub fn new(url: &str) -> Result<Self, Error> {
        let http = Client::builder().timeout(Duration::from_secs(NODE_TIMEOUT_SECS)).build()?;

        Ok(Self { http, url: url.to_string() })
    }

    pub async fn eth_call(&self, to: &str, data: &str) -> anyhow::Result<String> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{ "to": to, "data": data }, "latest"],
        });

        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("node request failed")?
            .error_for_status()?
            .json()
            .await
            .context("node returned invalid JSON")?;

        if let Some(error) = response.error {
            return Err(anyhow!("eth_call {data} on {to}: {error}"));
        }

        response.result.ok_or_else(|| anyhow!("eth_call {data} on {to}: empty result"))
    }

    async fn call<T>(&self, contract: &str, selector: &str, decode: fn(&str) -> Option<T>) -> Option<T> {
        match self.eth_call(contract, selector).await {
            Ok(data) => decode(&data),
            Err(e) => {
                warn!("{e:#}");
                None
            }
        }
    }

    /// Token metadata straight from the contract. Missing getters fall
    /// back to the usual defaults.
    pub async fn token_descriptor(&self, contract: &str) -> TokenDescriptor {
        let name = self.call(contract, SELECTOR_NAME, abi::decode_string).await.filter(|s| !s.is_empty());
        let symbol = self.call(contract, SELECTOR_SYMBOL, abi::decode_string).await.filter(|s| !s.is_empty());
        let decimals = self.call(contract, SELECTOR_DECIMALS, abi::decode_decimals).await;
        let total_supply = self.call(contract, SELECTOR_TOTAL_SUPPLY, abi::decode_uint).await;

        let mut token = TokenDescriptor::new(
            name.as_deref().unwrap_or(UNKNOWN_NAME),
            symbol.as_deref().unwrap_or(UNKNOWN_SYMBOL),
            contract,
            decimals.unwrap_or(DEFAULT_DECIMALS),
        );
        token.total_supply = total_supply;

        token
    }
}

/// Turn user input into token metadata.
///
/// Only contract addresses are accepted. The explorer is asked first and
/// the node is consulted when the explorer has no symbol for the token.
pub async fn resolve_token(input: &str, etherscan: &EtherscanClient, node: &NodeClient) -> Result<TokenDescriptor, Error> {
    let address = normalize_address(input);
    if !is_valid_address(&address) {
        return Err(Error::UnresolvedToken(input.to_string()));
    }

    let explorer = etherscan.get_token_info(&address).await;
    if !explorer.is_unknown() {
        return Ok(explorer);
    }

    info!("explorer has no symbol for {address}, asking the node");
    let mut token = node.token_descriptor(&address).await;

    // keep a contract name the explorer did find
    if token.name == UNKNOWN_NAME {
        token.name = explorer.name;
    }

    Ok(token)
}
