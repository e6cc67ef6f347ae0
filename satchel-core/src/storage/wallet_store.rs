use std::fs;
use std::path::{Path, PathBuf};

use bitcoin::{BlockHash, Network, Txid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountColors, AccountKind};
use crate::error::{Result, SatchelError};
use crate::storage::{wallet_dir, ACCOUNTS_DIR, TRANSACTIONS_DIR, WALLET_FILE};
use crate::types::TransactionData;
use crate::wallet::Wallet;

/// Whether the attached wallet has been realized from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Unloaded,
    Loaded,
}

/// Why a referenced document did not make it into the loaded wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Missing,
    UnknownAccountType(String),
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub id: String,
    pub reason: SkipReason,
}

/// Diagnostic summary of a load: every skipped document and cosmetic
/// repair, so callers can tell a partial wallet from a clean one without
/// scraping logs.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub skipped_accounts: Vec<SkippedDocument>,
    pub skipped_transactions: Vec<SkippedDocument>,
    pub repaired_color_accounts: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped_accounts.is_empty() && self.skipped_transactions.is_empty()
    }
}

/// On-disk form of the wallet tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDocument {
    pub id: String,
    pub name: String,
    pub network: Network,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_seed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts_root: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub creation_time: DateTime<Utc>,
    #[serde(default)]
    pub block_locator: Vec<BlockHash>,
    #[serde(default)]
    pub tx_ids: Vec<Txid>,
    #[serde(default)]
    pub account_ids: Vec<String>,
}

impl WalletDocument {
    pub(crate) fn from_wallet(wallet: &Wallet) -> Self {
        Self {
            id: wallet.id().to_string(),
            name: wallet.name().to_string(),
            network: wallet.network(),
            encrypted_seed: wallet.encrypted_seed().map(str::to_string),
            chain_code: wallet.chain_code().map(hex::encode),
            accounts_root: wallet.accounts_root().map(str::to_string),
            creation_time: wallet.creation_time(),
            block_locator: wallet.block_locator().to_vec(),
            tx_ids: wallet.tx_ids().to_vec(),
            account_ids: wallet.account_ids(),
        }
    }

    fn apply_to(self, wallet: &mut Wallet) -> Result<()> {
        let chain_code = match self.chain_code {
            Some(encoded) => {
                let bytes = hex::decode(&encoded)
                    .map_err(|e| SatchelError::crypto(format!("Malformed chain code: {}", e)))?;
                let array: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| SatchelError::crypto("Malformed chain code: expected 32 bytes"))?;
                Some(array)
            }
            None => None,
        };

        wallet.id = self.id;
        wallet.name = self.name;
        wallet.network = self.network;
        wallet.encrypted_seed = self.encrypted_seed;
        wallet.chain_code = chain_code;
        wallet.accounts_root = self.accounts_root;
        wallet.creation_time = self.creation_time;
        wallet.block_locator = self.block_locator;
        wallet.tx_ids = self.tx_ids;

        // Whatever was cached belongs to the previous contents.
        *wallet.cached_private_key.write() = None;
        *wallet.cached_master_key.write() = None;
        Ok(())
    }
}

/// File-system persistence for one wallet: a wallet document, one
/// document per account and one per transaction, under
/// `<root>/<network>/<walletId>/`.
pub struct WalletStore {
    root_directory: PathBuf,
    state: StoreState,
    wallet: Option<Wallet>,
}

impl WalletStore {
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
            state: StoreState::Unloaded,
            wallet: None,
        }
    }

    pub fn with_wallet(root_directory: impl Into<PathBuf>, wallet: Wallet) -> Self {
        let mut store = Self::new(root_directory);
        store.attach(wallet);
        store
    }

    /// Attach a shell wallet for `id` and realize it from disk.
    pub fn open(
        root_directory: impl Into<PathBuf>,
        id: &str,
        network: Network,
    ) -> Result<(Self, LoadReport)> {
        let mut shell = Wallet::with_network("unnamed", network)?;
        shell.id = id.to_string();
        let mut store = Self::with_wallet(root_directory, shell);
        let report = store.load()?;
        Ok((store, report))
    }

    pub fn attach(&mut self, wallet: Wallet) {
        self.wallet = Some(wallet);
        self.state = StoreState::Unloaded;
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn wallet(&self) -> Option<&Wallet> {
        self.wallet.as_ref()
    }

    pub fn wallet_mut(&mut self) -> Option<&mut Wallet> {
        self.wallet.as_mut()
    }

    pub fn into_wallet(self) -> Option<Wallet> {
        self.wallet
    }

    pub fn exists(&self) -> bool {
        match &self.wallet {
            Some(wallet) => wallet_dir(&self.root_directory, wallet.network(), wallet.id())
                .join(WALLET_FILE)
                .is_file(),
            None => false,
        }
    }

    /// Realize the attached wallet from its documents.
    ///
    /// Listed-but-missing accounts and transactions are skipped with a
    /// warning and recorded in the returned report; each account's
    /// transaction index is then recomputed from what was actually found.
    pub fn load(&mut self) -> Result<LoadReport> {
        let wallet = self
            .wallet
            .as_mut()
            .ok_or_else(|| SatchelError::persistence("No wallet attached"))?;
        if wallet.id().trim().is_empty() {
            return Err(SatchelError::validation("Wallet id must be set before loading"));
        }

        let dir = wallet_dir(&self.root_directory, wallet.network(), wallet.id());
        let wallet_file = dir.join(WALLET_FILE);
        if !wallet_file.is_file() {
            return Err(SatchelError::WalletNotFound {
                id: wallet.id().to_string(),
            });
        }

        let contents = fs::read_to_string(&wallet_file)?;
        let doc: WalletDocument = serde_json::from_str(&contents)?;
        let account_ids = doc.account_ids.clone();
        doc.apply_to(wallet)?;

        let mut report = LoadReport::default();
        let mut accounts = Vec::new();
        for account_id in &account_ids {
            if let Some(account) = load_account(&dir, account_id, &mut report) {
                accounts.push(account);
            }
        }

        for account in &mut accounts {
            if account.colors().is_none() {
                account.set_colors(AccountColors::derive(account.id()));
                report.repaired_color_accounts.push(account.id().to_string());
            }

            let tx_ids = account.tx_ids().to_vec();
            let mut txs = Vec::new();
            for txid in &tx_ids {
                if let Some(tx) = load_transaction(&dir, account.id(), txid, &mut report) {
                    txs.push(tx);
                }
            }
            account.set_transactions(txs);
        }

        wallet.accounts = accounts;
        if wallet.current_account_id.is_none() {
            wallet.current_account_id = wallet.accounts.first().map(|a| a.id().to_string());
        }

        self.state = StoreState::Loaded;
        Ok(report)
    }

    /// Write the three document tiers in order: wallet, accounts,
    /// transactions. Directories are created lazily. The tiers are not
    /// written atomically; an interrupted save is repaired by the next
    /// load.
    pub fn save(&self) -> Result<()> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or_else(|| SatchelError::persistence("No wallet attached"))?;
        let dir = wallet_dir(&self.root_directory, wallet.network(), wallet.id());
        fs::create_dir_all(&dir)?;

        let doc = WalletDocument::from_wallet(wallet);
        fs::write(dir.join(WALLET_FILE), serde_json::to_string_pretty(&doc)?)?;

        if !wallet.accounts().is_empty() {
            let accounts_dir = dir.join(ACCOUNTS_DIR);
            fs::create_dir_all(&accounts_dir)?;
            for account in wallet.accounts() {
                fs::write(
                    accounts_dir.join(format!("{}.json", account.id())),
                    serde_json::to_string_pretty(account)?,
                )?;
            }
        }

        let txs: Vec<&TransactionData> = wallet
            .accounts()
            .iter()
            .flat_map(|a| a.transactions())
            .collect();
        if !txs.is_empty() {
            let tx_dir = dir.join(TRANSACTIONS_DIR);
            fs::create_dir_all(&tx_dir)?;
            for tx in txs {
                fs::write(
                    tx_dir.join(format!("{}.json", tx.id)),
                    serde_json::to_string_pretty(tx)?,
                )?;
            }
        }

        tracing::info!("Saved wallet {} to {}", wallet.id(), dir.display());
        Ok(())
    }

    /// Remove the wallet's entire directory subtree.
    pub fn delete(&mut self) -> Result<()> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or_else(|| SatchelError::persistence("No wallet attached"))?;
        let dir = wallet_dir(&self.root_directory, wallet.network(), wallet.id());
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        self.state = StoreState::Unloaded;
        tracing::info!("Deleted wallet {}", dir.display());
        Ok(())
    }
}

fn load_account(dir: &Path, account_id: &str, report: &mut LoadReport) -> Option<Account> {
    let path = dir.join(ACCOUNTS_DIR).join(format!("{}.json", account_id));
    if !path.is_file() {
        tracing::warn!("Account document {} is missing; skipping", path.display());
        report.skipped_accounts.push(SkippedDocument {
            id: account_id.to_string(),
            reason: SkipReason::Missing,
        });
        return None;
    }

    let value: serde_json::Value = match fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|contents| serde_json::from_str(&contents).map_err(|e| e.to_string()))
    {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Account document {} is unreadable: {}; skipping", path.display(), e);
            report.skipped_accounts.push(SkippedDocument {
                id: account_id.to_string(),
                reason: SkipReason::Unreadable(e),
            });
            return None;
        }
    };

    let discriminator = value
        .get("accountType")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if AccountKind::from_discriminator(&discriminator).is_none() {
        tracing::warn!(
            "Account {} has unknown account type '{}'; skipping",
            account_id,
            discriminator
        );
        report.skipped_accounts.push(SkippedDocument {
            id: account_id.to_string(),
            reason: SkipReason::UnknownAccountType(discriminator),
        });
        return None;
    }

    match serde_json::from_value::<Account>(value) {
        Ok(account) => Some(account),
        Err(e) => {
            tracing::warn!("Account document {} is malformed: {}; skipping", path.display(), e);
            report.skipped_accounts.push(SkippedDocument {
                id: account_id.to_string(),
                reason: SkipReason::Unreadable(e.to_string()),
            });
            None
        }
    }
}

fn load_transaction(
    dir: &Path,
    account_id: &str,
    txid: &Txid,
    report: &mut LoadReport,
) -> Option<TransactionData> {
    let path = dir.join(TRANSACTIONS_DIR).join(format!("{}.json", txid));
    if !path.is_file() {
        tracing::warn!(
            "Transaction document {} referenced by account {} is missing; skipping",
            path.display(),
            account_id
        );
        report.skipped_transactions.push(SkippedDocument {
            id: txid.to_string(),
            reason: SkipReason::Missing,
        });
        return None;
    }

    match fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|contents| {
            serde_json::from_str::<TransactionData>(&contents).map_err(|e| e.to_string())
        }) {
        Ok(tx) => Some(tx),
        Err(e) => {
            tracing::warn!(
                "Transaction document {} is unreadable: {}; skipping",
                path.display(),
                e
            );
            report.skipped_transactions.push(SkippedDocument {
                id: txid.to_string(),
                reason: SkipReason::Unreadable(e),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountKind, AccountOptions};
    use crate::types::sample_tx;
    use std::collections::HashSet;
    use tempfile::tempdir;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const PASSPHRASE: &str = "store-pass";

    fn seeded_store(root: &Path) -> WalletStore {
        let mut wallet = Wallet::with_network("stored-wallet", Network::Regtest).unwrap();
        wallet.init_seed(MNEMONIC, PASSPHRASE).unwrap();
        wallet
            .add_account(AccountKind::Bip84, None, PASSPHRASE, AccountOptions::None)
            .unwrap();
        wallet
            .add_account(
                AccountKind::Paper,
                Some("paper"),
                PASSPHRASE,
                AccountOptions::None,
            )
            .unwrap();
        let account_id = wallet.accounts()[0].id().to_string();
        wallet.accounts_mut()[0].add_transaction(sample_tx(&account_id));
        WalletStore::with_wallet(root, wallet)
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = seeded_store(dir.path());
        store.save().unwrap();

        let original = store.wallet().unwrap();
        let (loaded_store, report) =
            WalletStore::open(dir.path(), original.id(), Network::Regtest).unwrap();
        assert!(report.is_clean());
        assert_eq!(loaded_store.state(), StoreState::Loaded);

        let loaded = loaded_store.wallet().unwrap();
        assert_eq!(loaded.id(), original.id());
        assert_eq!(loaded.name(), original.name());
        assert_eq!(loaded.network(), original.network());
        assert_eq!(loaded.encrypted_seed(), original.encrypted_seed());
        assert_eq!(loaded.chain_code(), original.chain_code());
        // Documents carry seconds resolution.
        assert_eq!(
            loaded.creation_time().timestamp(),
            original.creation_time().timestamp()
        );

        let original_ids: HashSet<String> = original.account_ids().into_iter().collect();
        let loaded_ids: HashSet<String> = loaded.account_ids().into_iter().collect();
        assert_eq!(loaded_ids, original_ids);

        for account in loaded.accounts() {
            let counterpart = original.account(account.id()).unwrap();
            assert_eq!(account.kind(), counterpart.kind());
            assert_eq!(account.tx_ids(), counterpart.tx_ids());
        }

        // The first account becomes current implicitly.
        assert_eq!(
            loaded.current_account().map(|a| a.id().to_string()),
            loaded.accounts().first().map(|a| a.id().to_string())
        );

        // The decrypted key still round-trips through the reloaded seed.
        assert!(loaded.get_private_key(PASSPHRASE, true).is_ok());
    }

    #[test]
    fn test_load_requires_wallet_document() {
        let dir = tempdir().unwrap();
        let wallet = Wallet::with_network("ghost", Network::Regtest).unwrap();
        let mut store = WalletStore::with_wallet(dir.path(), wallet);
        assert!(!store.exists());
        assert!(matches!(
            store.load(),
            Err(SatchelError::WalletNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_account_document_is_skipped_and_index_healed() {
        let dir = tempdir().unwrap();
        let store = seeded_store(dir.path());
        store.save().unwrap();
        let wallet_id = store.wallet().unwrap().id().to_string();
        let removed_id = store.wallet().unwrap().accounts()[1].id().to_string();

        let wallet_path = wallet_dir(dir.path(), Network::Regtest, &wallet_id);
        fs::remove_file(
            wallet_path
                .join(ACCOUNTS_DIR)
                .join(format!("{}.json", removed_id)),
        )
        .unwrap();

        let (loaded_store, report) =
            WalletStore::open(dir.path(), &wallet_id, Network::Regtest).unwrap();
        assert_eq!(report.skipped_accounts.len(), 1);
        assert_eq!(report.skipped_accounts[0].id, removed_id);
        assert_eq!(report.skipped_accounts[0].reason, SkipReason::Missing);

        let loaded = loaded_store.wallet().unwrap();
        assert_eq!(loaded.accounts().len(), 1);
        assert!(!loaded.account_ids().contains(&removed_id));
    }

    #[test]
    fn test_unknown_account_type_is_skipped() {
        let dir = tempdir().unwrap();
        let store = seeded_store(dir.path());
        store.save().unwrap();
        let wallet_id = store.wallet().unwrap().id().to_string();
        let wallet_path = wallet_dir(dir.path(), Network::Regtest, &wallet_id);

        // Append a forged account of an unrecognized kind to the index.
        fs::write(
            wallet_path.join(ACCOUNTS_DIR).join("forged.json"),
            r#"{"accountType":"bip9999","id":"forged"}"#,
        )
        .unwrap();
        let mut doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(wallet_path.join(WALLET_FILE)).unwrap())
                .unwrap();
        doc["accountIds"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!("forged"));
        fs::write(
            wallet_path.join(WALLET_FILE),
            serde_json::to_string_pretty(&doc).unwrap(),
        )
        .unwrap();

        let (loaded_store, report) =
            WalletStore::open(dir.path(), &wallet_id, Network::Regtest).unwrap();
        assert_eq!(report.skipped_accounts.len(), 1);
        assert_eq!(
            report.skipped_accounts[0].reason,
            SkipReason::UnknownAccountType("bip9999".to_string())
        );
        // The recognizable accounts still load.
        assert_eq!(loaded_store.wallet().unwrap().accounts().len(), 2);
    }

    #[test]
    fn test_missing_transaction_document_heals_index() {
        let dir = tempdir().unwrap();
        let store = seeded_store(dir.path());
        store.save().unwrap();
        let wallet_id = store.wallet().unwrap().id().to_string();
        let txid = store.wallet().unwrap().accounts()[0].tx_ids()[0];

        let wallet_path = wallet_dir(dir.path(), Network::Regtest, &wallet_id);
        fs::remove_file(
            wallet_path
                .join(TRANSACTIONS_DIR)
                .join(format!("{}.json", txid)),
        )
        .unwrap();

        let (loaded_store, report) =
            WalletStore::open(dir.path(), &wallet_id, Network::Regtest).unwrap();
        assert_eq!(report.skipped_transactions.len(), 1);
        assert_eq!(report.skipped_transactions[0].id, txid.to_string());

        let loaded = loaded_store.wallet().unwrap();
        let account = loaded.account(loaded.accounts()[0].id()).unwrap();
        assert!(account.tx_ids().is_empty());
        assert!(account.transactions().is_empty());
    }

    #[test]
    fn test_absent_colors_are_repaired_deterministically() {
        let dir = tempdir().unwrap();
        let store = seeded_store(dir.path());
        store.save().unwrap();
        let wallet_id = store.wallet().unwrap().id().to_string();
        let account_id = store.wallet().unwrap().accounts()[0].id().to_string();

        let wallet_path = wallet_dir(dir.path(), Network::Regtest, &wallet_id);
        let account_file = wallet_path
            .join(ACCOUNTS_DIR)
            .join(format!("{}.json", account_id));
        let mut doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&account_file).unwrap()).unwrap();
        doc.as_object_mut().unwrap().remove("colors");
        fs::write(&account_file, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        let (loaded_store, report) =
            WalletStore::open(dir.path(), &wallet_id, Network::Regtest).unwrap();
        assert_eq!(report.repaired_color_accounts, vec![account_id.clone()]);
        let loaded = loaded_store.wallet().unwrap();
        assert_eq!(
            loaded.account(&account_id).unwrap().colors(),
            Some(&AccountColors::derive(&account_id))
        );
    }

    #[test]
    fn test_delete_removes_subtree() {
        let dir = tempdir().unwrap();
        let mut store = seeded_store(dir.path());
        store.save().unwrap();
        assert!(store.exists());

        store.delete().unwrap();
        assert!(!store.exists());
        let wallet_id = store.wallet().unwrap().id().to_string();
        assert!(!wallet_dir(dir.path(), Network::Regtest, &wallet_id).exists());
    }

    #[test]
    fn test_save_requires_attached_wallet() {
        let dir = tempdir().unwrap();
        let store = WalletStore::new(dir.path());
        assert!(matches!(
            store.save(),
            Err(SatchelError::Persistence(_))
        ));
    }

    #[test]
    fn test_document_layout_paths() {
        let dir = tempdir().unwrap();
        let store = seeded_store(dir.path());
        store.save().unwrap();
        let wallet = store.wallet().unwrap();

        let base = dir
            .path()
            .join("regtest")
            .join(wallet.id());
        assert!(base.join(WALLET_FILE).is_file());
        for account in wallet.accounts() {
            assert!(base
                .join(ACCOUNTS_DIR)
                .join(format!("{}.json", account.id()))
                .is_file());
        }
        for tx in wallet.accounts()[0].transactions() {
            assert!(base
                .join(TRANSACTIONS_DIR)
                .join(format!("{}.json", tx.id))
                .is_file());
        }
    }
}
