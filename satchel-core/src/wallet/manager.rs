use std::fs;
use std::path::PathBuf;

use bitcoin::Network;

use crate::error::{Result, SatchelError};
use crate::storage::{network_dir_name, wallet_dir, LoadReport, WalletDocument, WalletStore};
use crate::wallet::{generate_mnemonic, Wallet};

/// Identity row for a stored wallet.
#[derive(Debug, Clone)]
pub struct WalletSummary {
    pub id: String,
    pub name: String,
    pub network: Network,
}

/// Root-directory-scoped wallet lifecycle: create, import, load, list,
/// delete.
pub struct WalletManager {
    root_directory: PathBuf,
}

impl WalletManager {
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
        }
    }

    /// Create a wallet with a fresh 24-word mnemonic; returns the store
    /// and the mnemonic for the user to back up.
    pub fn create_wallet(
        &self,
        name: &str,
        passphrase: &str,
        network: Network,
    ) -> Result<(WalletStore, String)> {
        if self.wallet_exists_named(name, network)? {
            return Err(SatchelError::validation(format!(
                "Wallet '{}' already exists",
                name
            )));
        }

        let mnemonic = generate_mnemonic()?;
        let mut wallet = Wallet::with_network(name, network)?;
        wallet.init_seed(&mnemonic, passphrase)?;

        tracing::info!("Created wallet '{}' with ID: {}", name, wallet.id());
        let store = WalletStore::with_wallet(&self.root_directory, wallet);
        store.save()?;
        Ok((store, mnemonic))
    }

    /// Recreate a wallet from an existing mnemonic.
    pub fn import_wallet(
        &self,
        name: &str,
        mnemonic: &str,
        passphrase: &str,
        network: Network,
    ) -> Result<WalletStore> {
        if self.wallet_exists_named(name, network)? {
            return Err(SatchelError::validation(format!(
                "Wallet '{}' already exists",
                name
            )));
        }

        let mut wallet = Wallet::with_network(name, network)?;
        wallet.init_seed(mnemonic, passphrase)?;

        tracing::info!("Imported wallet '{}' with ID: {}", name, wallet.id());
        let store = WalletStore::with_wallet(&self.root_directory, wallet);
        store.save()?;
        Ok(store)
    }

    pub fn load_wallet(&self, id: &str, network: Network) -> Result<(WalletStore, LoadReport)> {
        WalletStore::open(&self.root_directory, id, network)
    }

    /// Every wallet stored under the network directory. Unreadable
    /// wallet documents are skipped with a warning.
    pub fn list_wallets(&self, network: Network) -> Result<Vec<WalletSummary>> {
        let dir = self.root_directory.join(network_dir_name(network));
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut wallets = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let wallet_file = entry.path().join(crate::storage::WALLET_FILE);
            if !wallet_file.is_file() {
                continue;
            }
            let contents = fs::read_to_string(&wallet_file)?;
            match serde_json::from_str::<WalletDocument>(&contents) {
                Ok(doc) => wallets.push(WalletSummary {
                    id: doc.id,
                    name: doc.name,
                    network: doc.network,
                }),
                Err(e) => tracing::warn!(
                    "Skipping unreadable wallet document {}: {}",
                    wallet_file.display(),
                    e
                ),
            }
        }
        Ok(wallets)
    }

    pub fn wallet_exists_named(&self, name: &str, network: Network) -> Result<bool> {
        Ok(self
            .list_wallets(network)?
            .iter()
            .any(|summary| summary.name == name))
    }

    pub fn delete_wallet(&self, id: &str, network: Network) -> Result<()> {
        let dir = wallet_dir(&self.root_directory, network, id);
        if !dir.exists() {
            return Err(SatchelError::WalletNotFound { id: id.to_string() });
        }
        fs::remove_dir_all(&dir)?;
        tracing::info!("Deleted wallet '{}'", id);
        Ok(())
    }
}
