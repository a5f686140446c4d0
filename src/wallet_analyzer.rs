use crate::{
    addresses::is_likely_contract,
    amounts::{estimate_cost_eth, is_round_number},
    config::AnalysisSettings,
    models::{Direction, TransferRecord, WalletSummary},
};
use rust_decimal::Decimal;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum WalletError {
    #[error("wallet has no transfers")]
    NoTransfers,

    #[error("{0} total overflowed")]
    AmountOverflow(Direction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletOutcome {
    Analyzed(WalletSummary),
    BelowThreshold,
    Failed(WalletError),
}

///
/// Classification
///

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_likely_buyer: bool,
    pub is_likely_airdrop: bool,
}

/// Buyer/airdrop flags for a wallet's transfers, sorted or not.
///
/// An airdrop is a single inbound round amount from a contract. A buyer is
/// anything with a positive intake that is not an airdrop and shows some
/// sign of a purchase. The airdrop preconditions exclude buyer, so both
/// flags are never set together.
pub fn classify(transfers: &[TransferRecord], total_received: Decimal) -> Classification {
    let round = is_round_number(total_received);
    let single = match transfers {
        [only] => Some(only),
        _ => None,
    };

    let is_likely_airdrop = single
        .map(|tx| tx.direction == Direction::In && is_likely_contract(tx.counterparty()) && round)
        .unwrap_or(false);

    let is_likely_buyer = !is_likely_airdrop
        && total_received > Decimal::ZERO
        && (!round || transfers.len() > 1 || single.is_some_and(|tx| !is_likely_contract(tx.counterparty())));

    Classification { is_likely_buyer, is_likely_airdrop }
}

///
/// WalletAnalyzer
///

pub struct WalletAnalyzer {
    min_token_amount: Decimal,
}

impl WalletAnalyzer {
    pub fn new(settings: &AnalysisSettings) -> Self {
        Self { min_token_amount: settings.min_token_amount }
    }

    pub fn analyze(&self, wallet: &str, mut transfers: Vec<TransferRecord>) -> WalletOutcome {
        if transfers.is_empty() {
            return WalletOutcome::Failed(WalletError::NoTransfers);
        }

        // stable, so same-block transfers keep arrival order
        transfers.sort_by_key(|tx| tx.block_number);

        let (total_received, total_sent) = match totals(&transfers) {
            Ok(totals) => totals,
            Err(e) => return WalletOutcome::Failed(e),
        };

        if total_received < self.min_token_amount {
            return WalletOutcome::BelowThreshold;
        }

        let Some(net_position) = total_received.checked_sub(total_sent) else {
            return WalletOutcome::Failed(WalletError::AmountOverflow(Direction::Out));
        };

        let flags = classify(&transfers, total_received);
        let first_transaction = transfers[0].clone();
        let estimated_eth_cost = estimate_cost_eth(first_transaction.gas_used, first_transaction.gas_price.as_deref());

        WalletOutcome::Analyzed(WalletSummary {
            wallet_address: wallet.to_string(),
            first_transaction,
            total_received,
            total_sent,
            net_position,
            transaction_count: transfers.len(),
            estimated_eth_cost,
            estimated_usd_cost: None,
            is_likely_buyer: flags.is_likely_buyer,
            is_likely_airdrop: flags.is_likely_airdrop,
        })
    }
}

fn totals(transfers: &[TransferRecord]) -> Result<(Decimal, Decimal), WalletError> {
    let mut received = Decimal::ZERO;
    let mut sent = Decimal::ZERO;

    for tx in transfers {
        match tx.direction {
            Direction::In => {
                received = received.checked_add(tx.token_amount).ok_or(WalletError::AmountOverflow(Direction::In))?;
            }
            Direction::Out => {
                sent = sent.checked_add(tx.token_amount).ok_or(WalletError::AmountOverflow(Direction::Out))?;
            }
        }
    }

    Ok((received, sent))
}
