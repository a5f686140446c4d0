// Known Ethereum addresses and the contract-likelihood heuristic.
// The lists and pattern rules are a best-effort classifier: they will miss
// contracts and flag some ordinary wallets.

use std::collections::HashSet;

pub const SPECIAL: &[(&str, &[&str])] = &[
    ("Null Address", &["0x0000000000000000000000000000000000000000"]),
    ("Burn Address", &["0x000000000000000000000000000000000000dead"]),
    (
        "EVM Precompiles",
        &[
            "0x0000000000000000000000000000000000000001",
            "0x0000000000000000000000000000000000000002",
            "0x0000000000000000000000000000000000000003",
            "0x0000000000000000000000000000000000000004",
            "0x0000000000000000000000000000000000000005",
            "0x0000000000000000000000000000000000000006",
            "0x0000000000000000000000000000000000000007",
            "0x0000000000000000000000000000000000000008",
            "0x0000000000000000000000000000000000000009",
        ],
    ),
];

pub const DEXES: &[(&str, &[&str])] = &[
    (
        "Uniswap",
        &[
            "0x7a250d5630b4cf539739df2c5dacb4c659f2488d", // v2 router
            "0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45", // v3 router 2
            "0xe592427a0aece92de3edee1f18e0157c05861564", // v3 swap router
            "0x3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad", // universal router
        ],
    ),
    (
        "1inch",
        &["0x1111111254eeb25477b68fb85ed929f73a960582", "0x11111254369792b2ca5d084ab5eea397ca8fa48b"],
    ),
    ("0x Exchange Proxy", &["0xdef1c0ded9bec7f1a1670819833240f027b25eff"]),
    ("MetaMask Swap Router", &["0x881d40237659c251811cec9c364ef91dc08d300c"]),
];

pub const CEXES: &[(&str, &[&str])] = &[
    (
        "Binance",
        &[
            "0xa0b86a33e6441e3c6cdeaf9bf464c44c78a1f0e9",
            "0x3f5ce5fbfe3e9af3971dd833d26ba9b5c936f0be",
            "0xd551234ae421e3bcba99a0da6d736074f22192ff",
        ],
    ),
    ("FTX", &["0x564286362092d8e7936f0549571a803b203aaced"]),
];

pub const TOKENS: &[(&str, &[&str])] = &[
    ("DAI", &["0x6b175474e89094c44da98b954eedeac495271d0f"]),
    ("WETH", &["0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"]),
];

pub const NFT_MARKETS: &[(&str, &[&str])] = &[(
    "OpenSea Seaport",
    &["0x1e0049783f008a0085193e00003d00cd54003c71", "0x00000000006c3852cbef3e08e8df289169ede581"],
)];

/// An address body with fewer distinct hex digits than this looks generated.
pub const MIN_DISTINCT_HEX_DIGITS: usize = 5;

/// Leading or trailing run of zeros that marks vanity/contract addresses.
pub const ZERO_RUN: &str = "00000";

const ALL_LISTS: &[&[(&str, &[&str])]] = &[SPECIAL, DEXES, CEXES, TOKENS, NFT_MARKETS];

/// True when, after an optional `0x`, the string is exactly 40 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    let body = address.strip_prefix("0x").unwrap_or(address);

    body.len() == 40 && body.chars().all(|c| c.is_ascii_hexdigit())
}

/// Lower-case with a `0x` prefix. Empty input stays empty.
pub fn normalize_address(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }

    let lower = address.to_lowercase();
    if lower.starts_with("0x") {
        lower
    } else {
        format!("0x{lower}")
    }
}

/// Name of the list entry holding `address`, if any.
pub fn known_label(address: &str) -> Option<&'static str> {
    let address = normalize_address(address);

    ALL_LISTS
        .iter()
        .flat_map(|list| list.iter())
        .find(|(_, addrs)| addrs.iter().any(|a| *a == address))
        .map(|(name, _)| *name)
}

/// Heuristic guess at whether `address` belongs to a contract rather than
/// a wallet. Anything that is not a well-formed address is not a contract.
pub fn is_likely_contract(address: &str) -> bool {
    let address = normalize_address(address);
    if !is_valid_address(&address) {
        return false;
    }

    if known_label(&address).is_some() {
        return true;
    }

    let body = &address[2..];
    let distinct: HashSet<char> = body.chars().collect();

    distinct.len() < MIN_DISTINCT_HEX_DIGITS || body.ends_with(ZERO_RUN) || body.starts_with(ZERO_RUN)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0x8ba1f109551bd432803012645ac136ddd64dba72";

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_address(WALLET));
        assert!(is_valid_address(&WALLET[2..]));
        assert!(is_valid_address("0xABCDEFabcdef0123456789ABCDEFabcdef012345"));

        assert!(!is_valid_address(""));
        assert!(!is_valid_address("0x"));
        assert!(!is_valid_address(&WALLET[..41]));
        assert!(!is_valid_address(&format!("{WALLET}0")));
        assert!(!is_valid_address("0xzz a1f109551bd432803012645ac136ddd64dba72"));
        assert!(!is_valid_address("0X8ba1f109551bd432803012645ac136ddd64dba72"));
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address(""), "");
        assert_eq!(normalize_address("ABCdef"), "0xabcdef");
        assert_eq!(normalize_address("0xABC"), "0xabc");

        for input in ["", "0xABC", "abc", "0X8BA1", WALLET] {
            let once = normalize_address(input);
            assert_eq!(normalize_address(&once), once);
        }
    }

    #[test]
    fn test_known_contracts() {
        assert!(is_likely_contract("0x7a250d5630b4cf539739df2c5dacb4c659f2488d"));
        assert!(is_likely_contract("0x7A250D5630B4CF539739DF2C5DACB4C659F2488D"));
        assert!(is_likely_contract("0x000000000000000000000000000000000000dead"));
        assert_eq!(known_label("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"), Some("WETH"));
        assert_eq!(known_label(WALLET), None);
    }

    #[test]
    fn test_pattern_contracts() {
        // four distinct digits
        assert!(is_likely_contract("0x1212121212121212121212121212121212123434"));
        // trailing zeros
        assert!(is_likely_contract("0x8ba1f109551bd432803012645ac136ddd6400000"));
        // leading zeros
        assert!(is_likely_contract("0x000008f109551bd432803012645ac136ddd64dba"));
    }

    #[test]
    fn test_wallets_are_not_contracts() {
        assert!(!is_likely_contract(WALLET));
        assert!(!is_likely_contract("0x2b5ad5c4795c026514f8317c7a215e218dccd6cf"));
        assert!(!is_likely_contract(""));
        assert!(!is_likely_contract("not an address"));
    }
}
