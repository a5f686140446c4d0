use crate::{
    addresses::is_likely_contract,
    models::{Direction, TransferRecord},
};
use log::{debug, info};
use std::collections::HashMap;

pub type WalletTransfers = HashMap<String, Vec<TransferRecord>>;

/// Attribute every transfer to the wallets on both ends.
///
/// The recipient always gets an inbound record. The sender gets an outbound
/// record unless it looks like a contract, so routers and pools don't turn
/// up as early "wallets". Each wallet's list keeps arrival order.
pub fn group_by_wallet(records: &[TransferRecord]) -> WalletTransfers {
    let mut wallets: WalletTransfers = HashMap::new();
    let mut suppressed = 0usize;

    for record in records {
        wallets
            .entry(record.to_address.clone())
            .or_default()
            .push(record.for_wallet(&record.to_address, Direction::In));

        if is_likely_contract(&record.from_address) {
            suppressed += 1;
            continue;
        }

        wallets
            .entry(record.from_address.clone())
            .or_default()
            .push(record.for_wallet(&record.from_address, Direction::Out));
    }

    debug!("Suppressed {suppressed} outbound legs from likely contracts");
    info!("Grouped {} transfers into {} unique wallets", records.len(), wallets.len());

    wallets
}
