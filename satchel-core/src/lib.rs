//! Satchel - Hierarchical-deterministic wallet core
//!
//! This library manages key-derivation accounts under a single encrypted
//! master seed and persists wallet, account and transaction state as a
//! directory of JSON documents with cross-checked references.

pub mod account;
pub mod error;
pub mod keys;
pub mod storage;
pub mod types;
pub mod wallet;

pub use account::{Account, AccountColors, AccountKind, AccountOptions};
pub use error::{Result, SatchelError};
pub use keys::KeyFamily;
pub use storage::{LoadReport, StoreState, WalletStore};
pub use types::{ScriptPubKeyType, SpendingDetails, TransactionData};
pub use wallet::{Wallet, WalletManager, DEFAULT_ACCOUNT_NAME};

pub use ::bitcoin::{Network, NetworkKind};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_wallet_creation() {
        let temp_dir = tempdir().unwrap();
        let manager = WalletManager::new(temp_dir.path());

        let (store, mnemonic) = manager
            .create_wallet("test-wallet", "hunter2", Network::Regtest)
            .unwrap();
        assert_eq!(mnemonic.split_whitespace().count(), 24);

        let wallet = store.wallet().unwrap();
        assert_eq!(wallet.name(), "test-wallet");
        assert_eq!(wallet.network(), Network::Regtest);
        assert!(!wallet.is_ext_pub_key_wallet());
        assert!(store.exists());
    }
}
