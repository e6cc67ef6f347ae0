pub mod wallet_store;

pub use wallet_store::{
    LoadReport, SkipReason, SkippedDocument, StoreState, WalletDocument, WalletStore,
};

use bitcoin::Network;
use std::path::{Path, PathBuf};

pub(crate) const WALLET_FILE: &str = "wallet.json";
pub(crate) const ACCOUNTS_DIR: &str = "accounts";
pub(crate) const TRANSACTIONS_DIR: &str = "transactions";

/// Directory name for a network, lower-case.
pub fn network_dir_name(network: Network) -> &'static str {
    match network {
        Network::Bitcoin => "main",
        Network::Testnet => "test",
        Network::Signet => "signet",
        Network::Regtest => "regtest",
        _ => "test",
    }
}

/// `<root>/<network>/<walletId>`
pub fn wallet_dir(root: &Path, network: Network, wallet_id: &str) -> PathBuf {
    root.join(network_dir_name(network)).join(wallet_id)
}
