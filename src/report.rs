use crate::{
    amounts::estimate_cost_usd,
    config::AnalysisSettings,
    models::{AnalysisReport, PipelineStats, TokenDescriptor, WalletSummary},
    parser::{parse_transfers, RawTransfer},
    wallet_analyzer::{WalletAnalyzer, WalletOutcome},
    wallet_grouper::{group_by_wallet, WalletTransfers},
    Error,
};
use chrono::Utc;
use log::{info, warn};

/// Fill in the USD gas cost of each wallet's first transaction.
pub fn enrich_costs(summaries: &mut [WalletSummary], eth_price_usd: Option<f64>) {
    let Some(price) = eth_price_usd else {
        return;
    };

    for summary in summaries {
        let first = &summary.first_transaction;
        summary.estimated_usd_cost = estimate_cost_usd(first.gas_used, first.gas_price.as_deref(), price);
    }
}

/// Earliest first appearance wins; ties fall back to transaction hash and
/// then wallet address so the order is reproducible.
pub fn rank_wallets(mut summaries: Vec<WalletSummary>, max_wallets: usize) -> Vec<WalletSummary> {
    summaries.sort_by(|a, b| {
        a.first_transaction
            .block_number
            .cmp(&b.first_transaction.block_number)
            .then_with(|| a.first_transaction.tx_hash.cmp(&b.first_transaction.tx_hash))
            .then_with(|| a.wallet_address.cmp(&b.wallet_address))
    });
    summaries.truncate(max_wallets);

    summaries
}

/// Run every wallet through the analyzer, counting what was dropped.
pub fn analyze_wallets(
    wallets: WalletTransfers,
    settings: &AnalysisSettings,
    stats: &mut PipelineStats,
) -> Vec<WalletSummary> {
    let analyzer = WalletAnalyzer::new(settings);
    let mut summaries = Vec::with_capacity(wallets.len());

    for (wallet, transfers) in wallets {
        match analyzer.analyze(&wallet, transfers) {
            WalletOutcome::Analyzed(summary) => summaries.push(summary),
            WalletOutcome::BelowThreshold => stats.wallets_below_threshold += 1,
            WalletOutcome::Failed(e) => {
                warn!("Error analyzing wallet {wallet}: {e}");
                stats.wallets_failed += 1;
            }
        }
    }
    stats.wallets_analyzed = summaries.len();

    summaries
}

/// Raw rows in, ranked report out.
///
/// An empty history is an empty report. A history where no row survives
/// parsing is an error, since there is nothing to rank.
///
/// Likely airdrops are dropped before the list is cut to
/// `max_early_wallets`, so the cap counts only the wallets that are kept.
pub fn analyze_transfers(
    token: &TokenDescriptor,
    rows: &[RawTransfer],
    eth_price_usd: Option<f64>,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport, Error> {
    let mut stats = PipelineStats { rows_received: rows.len(), ..PipelineStats::default() };

    if rows.is_empty() {
        return Ok(empty_report(token, stats));
    }

    let parsed = parse_transfers(rows, token);
    stats.rows_accepted = parsed.records.len();
    stats.rows_skipped = parsed.skipped.len();

    if parsed.records.is_empty() {
        return Err(Error::NoUsableTransfers(rows.len()));
    }

    let wallets = group_by_wallet(&parsed.records);
    stats.wallets_grouped = wallets.len();

    let mut summaries = analyze_wallets(wallets, settings, &mut stats);
    enrich_costs(&mut summaries, eth_price_usd);

    if !settings.include_likely_airdrops {
        let before = summaries.len();
        summaries.retain(|s| !s.is_likely_airdrop);
        stats.airdrops_excluded = before - summaries.len();
    }

    let earliest_wallets = rank_wallets(summaries, settings.max_early_wallets);

    info!(
        "Ranked {} of {} analyzed wallets ({} below threshold, {} failed)",
        earliest_wallets.len(),
        stats.wallets_analyzed,
        stats.wallets_below_threshold,
        stats.wallets_failed
    );

    Ok(AnalysisReport {
        token: token.clone(),
        total_transactions: stats.rows_accepted,
        unique_wallets: stats.wallets_grouped,
        earliest_wallets,
        generated_at: Utc::now(),
        stats,
    })
}

fn empty_report(token: &TokenDescriptor, stats: PipelineStats) -> AnalysisReport {
    AnalysisReport {
        token: token.clone(),
        total_transactions: 0,
        unique_wallets: 0,
        earliest_wallets: Vec::new(),
        generated_at: Utc::now(),
        stats,
    }
}
