use crate::{
    amounts::format_number,
    models::{AnalysisReport, WalletSummary},
    Error,
};
use chrono::SecondsFormat;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use num_format::{Locale, ToFormattedString};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::{fs, io::Write, path::Path};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TABLE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

///
/// CsvRow
///

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Rank")]
    rank: usize,
    #[serde(rename = "Wallet_Address")]
    wallet_address: &'a str,
    #[serde(rename = "Amount_Received")]
    amount_received: f64,
    #[serde(rename = "Token_Symbol")]
    token_symbol: &'a str,
    #[serde(rename = "Transaction_Hash")]
    transaction_hash: &'a str,
    #[serde(rename = "Block_Number")]
    block_number: u64,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Is_Likely_Buyer")]
    is_likely_buyer: bool,
    #[serde(rename = "Is_Likely_Airdrop")]
    is_likely_airdrop: bool,
    #[serde(rename = "Transaction_Count")]
    transaction_count: usize,
    #[serde(rename = "Total_Sent")]
    total_sent: f64,
    #[serde(rename = "Net_Position")]
    net_position: f64,
    #[serde(rename = "Estimated_Gas_Cost_USD")]
    estimated_gas_cost_usd: Option<String>,
}

///
/// JSON document
///

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    token_info: JsonTokenInfo<'a>,
    analysis_summary: JsonSummary,
    earliest_wallets: Vec<JsonWallet<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonTokenInfo<'a> {
    name: &'a str,
    symbol: &'a str,
    contract_address: &'a str,
    decimals: u8,
}

#[derive(Debug, Serialize)]
struct JsonSummary {
    total_transactions: usize,
    unique_wallets: usize,
    analysis_date: String,
}

#[derive(Debug, Serialize)]
struct JsonWallet<'a> {
    rank: usize,
    wallet_address: &'a str,
    amount_received: f64,
    total_sent: f64,
    net_position: f64,
    transaction_count: usize,
    first_transaction: JsonFirstTransaction<'a>,
    is_likely_buyer: bool,
    is_likely_airdrop: bool,
    estimated_gas_cost_usd: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonFirstTransaction<'a> {
    hash: &'a str,
    block_number: u64,
    timestamp: String,
    from_address: &'a str,
    to_address: &'a str,
}

fn as_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}

fn iso(wallet: &WalletSummary) -> String {
    wallet.first_transaction.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `0x1234...abcd`
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }

    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();

    format!("{head}...{tail}")
}

pub fn short_hash(hash: &str) -> String {
    if hash.chars().count() <= 10 {
        return hash.to_string();
    }

    format!("{}...", hash.chars().take(10).collect::<String>())
}

pub fn render_table(report: &AnalysisReport) -> Table {
    let has_cost = report.earliest_wallets.iter().any(|w| w.estimated_usd_cost.is_some());

    let mut header = vec!["Rank", "Wallet Address", "Amount Received", "Transaction Hash", "Block", "Date", "Type"];
    if has_cost {
        header.push("Gas Cost (USD)");
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);

    for (i, wallet) in report.earliest_wallets.iter().enumerate() {
        let first = &wallet.first_transaction;
        let mut row = vec![
            Cell::new(i + 1),
            Cell::new(short_address(&wallet.wallet_address)),
            Cell::new(format!("{} {}", format_number(wallet.total_received, 2), report.token.symbol))
                .set_alignment(CellAlignment::Right),
            Cell::new(short_hash(&first.tx_hash)),
            Cell::new(first.block_number.to_formatted_string(&Locale::en)).set_alignment(CellAlignment::Right),
            Cell::new(first.timestamp.format(TABLE_DATE_FORMAT)),
            Cell::new(wallet.kind()),
        ];

        if has_cost {
            let cost = match wallet.estimated_usd_cost {
                Some(cost) => format!("${cost:.2}"),
                None => "N/A".to_string(),
            };
            row.push(Cell::new(cost).set_alignment(CellAlignment::Right));
        }

        table.add_row(row);
    }

    table
}

pub fn print_report(report: &AnalysisReport) {
    let token = &report.token;

    println!("\nToken Information");
    println!("=================");
    println!("{} ({})", token.name, token.symbol);
    println!("Contract: {}", token.contract_address);
    println!("Decimals: {}", token.decimals);

    println!("\nAnalysis Summary:");
    println!("Total Transactions: {}", report.total_transactions.to_formatted_string(&Locale::en));
    println!("Unique Wallets: {}", report.unique_wallets.to_formatted_string(&Locale::en));
    println!("Showing: {} earliest wallets", report.earliest_wallets.len());

    if report.stats.rows_skipped > 0 {
        println!("Skipped {} malformed transfer rows", report.stats.rows_skipped);
    }

    if report.earliest_wallets.is_empty() {
        println!("No wallet interactions found.");
        return;
    }

    println!("\nEarliest {} Wallet Interactions", token.symbol);
    println!("{}", render_table(report));
}

pub fn write_csv_to<W: Write>(report: &AnalysisReport, writer: W) -> Result<(), Error> {
    let mut csv = csv::Writer::from_writer(writer);

    for (i, wallet) in report.earliest_wallets.iter().enumerate() {
        let first = &wallet.first_transaction;
        csv.serialize(CsvRow {
            rank: i + 1,
            wallet_address: &wallet.wallet_address,
            amount_received: as_f64(wallet.total_received),
            token_symbol: &report.token.symbol,
            transaction_hash: &first.tx_hash,
            block_number: first.block_number,
            timestamp: iso(wallet),
            date: first.timestamp.format(DATE_FORMAT).to_string(),
            is_likely_buyer: wallet.is_likely_buyer,
            is_likely_airdrop: wallet.is_likely_airdrop,
            transaction_count: wallet.transaction_count,
            total_sent: as_f64(wallet.total_sent),
            net_position: as_f64(wallet.net_position),
            estimated_gas_cost_usd: wallet.estimated_usd_cost.map(|c| c.to_string()),
        })?;
    }

    csv.flush()?;
    Ok(())
}

pub fn write_csv<P: AsRef<Path>>(report: &AnalysisReport, path: P) -> Result<(), Error> {
    write_csv_to(report, fs::File::create(path)?)
}

pub fn to_json(report: &AnalysisReport) -> Result<String, Error> {
    let document = JsonReport {
        token_info: JsonTokenInfo {
            name: &report.token.name,
            symbol: &report.token.symbol,
            contract_address: &report.token.contract_address,
            decimals: report.token.decimals,
        },
        analysis_summary: JsonSummary {
            total_transactions: report.total_transactions,
            unique_wallets: report.unique_wallets,
            analysis_date: report.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        },
        earliest_wallets: report
            .earliest_wallets
            .iter()
            .enumerate()
            .map(|(i, wallet)| JsonWallet {
                rank: i + 1,
                wallet_address: &wallet.wallet_address,
                amount_received: as_f64(wallet.total_received),
                total_sent: as_f64(wallet.total_sent),
                net_position: as_f64(wallet.net_position),
                transaction_count: wallet.transaction_count,
                first_transaction: JsonFirstTransaction {
                    hash: &wallet.first_transaction.tx_hash,
                    block_number: wallet.first_transaction.block_number,
                    timestamp: iso(wallet),
                    from_address: &wallet.first_transaction.from_address,
                    to_address: &wallet.first_transaction.to_address,
                },
                is_likely_buyer: wallet.is_likely_buyer,
                is_likely_airdrop: wallet.is_likely_airdrop,
                estimated_gas_cost_usd: wallet.estimated_usd_cost.map(|c| c.to_string()),
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn write_json<P: AsRef<Path>>(report: &AnalysisReport, path: P) -> Result<(), Error> {
    fs::write(path, to_json(report)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, PipelineStats, TokenDescriptor, TransferRecord};
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    const WALLET: &str = "0x8ba1f109551bd432803012645ac136ddd64dba72";
    const ROUTER: &str = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d";

    fn report(usd_cost: Option<Decimal>) -> AnalysisReport {
        let first = TransferRecord {
            wallet_address: WALLET.to_string(),
            tx_hash: "0xdeadbeefcafebabe0011".to_string(),
            block_number: 12_345_678,
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            token_amount: dec!(1500),
            token_amount_raw: "1500".to_string(),
            direction: Direction::In,
            from_address: ROUTER.to_string(),
            to_address: WALLET.to_string(),
            gas_used: Some(21000),
            gas_price: Some("20000000000".to_string()),
        };

        AnalysisReport {
            token: TokenDescriptor::new("Test Token", "TST", "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", 18),
            total_transactions: 3,
            unique_wallets: 2,
            earliest_wallets: vec![WalletSummary {
                wallet_address: WALLET.to_string(),
                first_transaction: first,
                total_received: dec!(1500),
                total_sent: dec!(500),
                net_position: dec!(1000),
                transaction_count: 2,
                estimated_eth_cost: Some(dec!(0.00042)),
                estimated_usd_cost: usd_cost,
                is_likely_buyer: true,
                is_likely_airdrop: false,
            }],
            generated_at: DateTime::from_timestamp(1_700_001_000, 0).unwrap(),
            stats: PipelineStats::default(),
        }
    }

    #[test]
    fn test_short_forms() {
        assert_eq!(short_address(WALLET), "0x8ba1...ba72");
        assert_eq!(short_address("0x12"), "0x12");
        assert_eq!(short_hash("0xdeadbeefcafebabe"), "0xdeadbeef...");
        assert_eq!(short_hash("0x01"), "0x01");
    }

    #[test]
    fn test_short_forms_multibyte() {
        assert_eq!(short_hash("0x日本語日本語日本語"), "0x日本語日本語日本...");
        assert_eq!(short_address("0x日本語日本語日本語日本"), "0x日本語日...本語日本");
    }

    #[test]
    fn test_csv_export() {
        let mut out = Vec::new();
        write_csv_to(&report(Some(dec!(0.84))), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Rank,Wallet_Address,Amount_Received,Token_Symbol,Transaction_Hash,Block_Number,Timestamp,Date,\
             Is_Likely_Buyer,Is_Likely_Airdrop,Transaction_Count,Total_Sent,Net_Position,Estimated_Gas_Cost_USD"
        );
        assert_eq!(
            lines.next().unwrap(),
            format!(
                "1,{WALLET},1500.0,TST,0xdeadbeefcafebabe0011,12345678,2023-11-14T22:13:20Z,2023-11-14 22:13:20,\
                 true,false,2,500.0,1000.0,0.84"
            )
        );
    }

    #[test]
    fn test_csv_without_cost_leaves_cell_empty() {
        let mut out = Vec::new();
        write_csv_to(&report(None), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.lines().nth(1).unwrap().ends_with(",1000.0,"));
    }

    #[test]
    fn test_json_export() {
        let json: serde_json::Value = serde_json::from_str(&to_json(&report(None)).unwrap()).unwrap();

        assert_eq!(json["token_info"]["symbol"], "TST");
        assert_eq!(json["analysis_summary"]["total_transactions"], 3);
        assert_eq!(json["analysis_summary"]["analysis_date"], "2023-11-14T22:30:00Z");

        let wallet = &json["earliest_wallets"][0];
        assert_eq!(wallet["rank"], 1);
        assert_eq!(wallet["amount_received"], 1500.0);
        assert_eq!(wallet["first_transaction"]["block_number"], 12_345_678);
        assert_eq!(wallet["first_transaction"]["from_address"], ROUTER);
        assert_eq!(wallet["is_likely_buyer"], true);
        assert!(wallet["estimated_gas_cost_usd"].is_null());
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_json(&report(Some(dec!(0.84))), &path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(json["earliest_wallets"][0]["estimated_gas_cost_usd"], "0.84");
    }

    #[test]
    fn test_table_cost_column_only_with_costs() {
        let with_cost = render_table(&report(Some(dec!(0.84)))).to_string();
        assert!(with_cost.contains("Gas Cost (USD)"));
        assert!(with_cost.contains("$0.84"));
        assert!(with_cost.contains("1.50K TST"));
        assert!(with_cost.contains("12,345,678"));
        assert!(with_cost.contains("Buyer"));

        let without = render_table(&report(None)).to_string();
        assert!(!without.contains("Gas Cost (USD)"));
    }
}
