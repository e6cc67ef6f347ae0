pub mod manager;

pub use manager::{WalletManager, WalletSummary};

use bip39::{Language, Mnemonic};
use bitcoin::bip32::{Xpriv, Xpub};
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{Amount, BlockHash, Network, NetworkKind, Txid};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::account::{Account, AccountKind, AccountOptions, HdAccount, PaperAccount, WasabiAccount};
use crate::error::{Result, SatchelError};
use crate::keys::{self, seed};

/// Name given to a wallet's first account when the caller supplies none.
pub const DEFAULT_ACCOUNT_NAME: &str = "Account 1";

pub fn generate_mnemonic() -> Result<String> {
    let mut rng = bip39::rand::thread_rng();
    let mnemonic = Mnemonic::generate_in_with(&mut rng, Language::English, 24)
        .map_err(|e| SatchelError::internal(format!("Failed to generate mnemonic: {}", e)))?;
    Ok(mnemonic.to_string())
}

/// Parse and validate a mnemonic against the English wordlist.
pub fn parse_mnemonic(mnemonic: &str) -> Result<Mnemonic> {
    if mnemonic.trim().is_empty() {
        return Err(SatchelError::validation("Mnemonic must not be empty"));
    }
    Mnemonic::parse_in(Language::English, mnemonic)
        .map_err(|e| SatchelError::crypto(format!("Invalid mnemonic: {}", e)))
}

/// The wallet aggregate: identity, encrypted master seed, realized
/// accounts and the decrypted-key caches.
///
/// Not designed for concurrent use on one instance; callers serialize
/// access per wallet id. The caches are behind locks so the forced
/// re-verification path is a single critical section in threaded hosts.
pub struct Wallet {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) network: Network,
    pub(crate) creation_time: DateTime<Utc>,
    pub(crate) encrypted_seed: Option<String>,
    pub(crate) chain_code: Option<[u8; 32]>,
    pub(crate) accounts_root: Option<String>,
    pub(crate) block_locator: Vec<BlockHash>,
    pub(crate) tx_ids: Vec<Txid>,
    pub(crate) accounts: Vec<Account>,
    pub(crate) current_account_id: Option<String>,
    pub(crate) cached_private_key: RwLock<Option<SecretKey>>,
    pub(crate) cached_master_key: RwLock<Option<Xpriv>>,
}

impl Wallet {
    /// Fresh mainnet wallet shell with no seed applied.
    pub fn new(name: &str) -> Result<Self> {
        Self::with_network(name, Network::Bitcoin)
    }

    pub fn with_network(name: &str, network: Network) -> Result<Self> {
        Self::with_creation_time(name, network, Utc::now())
    }

    pub fn with_creation_time(
        name: &str,
        network: Network,
        creation_time: DateTime<Utc>,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(SatchelError::validation("Wallet name must not be empty"));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            network,
            creation_time,
            encrypted_seed: None,
            chain_code: None,
            accounts_root: None,
            block_locator: Vec::new(),
            tx_ids: Vec::new(),
            accounts: Vec::new(),
            current_account_id: None,
            cached_private_key: RwLock::new(None),
            cached_master_key: RwLock::new(None),
        })
    }

    // Wallet metadata
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    pub fn encrypted_seed(&self) -> Option<&str> {
        self.encrypted_seed.as_deref()
    }

    pub fn chain_code(&self) -> Option<[u8; 32]> {
        self.chain_code
    }

    /// Neutered master key in the generic encoding, present once a seed
    /// has been applied.
    pub fn accounts_root(&self) -> Option<&str> {
        self.accounts_root.as_deref()
    }

    pub fn block_locator(&self) -> &[BlockHash] {
        &self.block_locator
    }

    /// Chain-sync bookmark, maintained by the sync collaborator.
    pub fn set_block_locator(&mut self, locator: Vec<BlockHash>) {
        self.block_locator = locator;
    }

    pub fn tx_ids(&self) -> &[Txid] {
        &self.tx_ids
    }

    pub fn set_tx_ids(&mut self, tx_ids: Vec<Txid>) {
        self.tx_ids = tx_ids;
    }

    /// True while no encrypted seed is present (watch-only wallet).
    pub fn is_ext_pub_key_wallet(&self) -> bool {
        self.encrypted_seed.is_none()
    }

    // Accounts
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut [Account] {
        &mut self.accounts
    }

    pub fn account_ids(&self) -> Vec<String> {
        self.accounts.iter().map(|a| a.id().to_string()).collect()
    }

    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id() == id)
    }

    pub fn account_mut(&mut self, id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id() == id)
    }

    pub fn current_account_id(&self) -> Option<&str> {
        self.current_account_id.as_deref()
    }

    pub fn current_account(&self) -> Option<&Account> {
        self.current_account_id
            .as_deref()
            .and_then(|id| self.account(id))
    }

    pub fn set_current_account(&mut self, id: &str) -> Result<()> {
        if self.account(id).is_none() {
            return Err(SatchelError::validation(format!(
                "No account with id {} in this wallet",
                id
            )));
        }
        self.current_account_id = Some(id.to_string());
        Ok(())
    }

    /// Sum of spendable amounts across all accounts.
    pub fn balance(&self, confirmed_only: bool) -> Amount {
        self.accounts
            .iter()
            .map(|a| a.balance(confirmed_only))
            .sum()
    }

    /// Apply a mnemonic: derive the master key, encrypt it under the
    /// passphrase and record the chain code and accounts root.
    ///
    /// The passphrase both salts the BIP39 seed and encrypts the
    /// resulting private key. Re-keying an already-seeded wallet is
    /// rejected; it would orphan the derivation lineage of existing
    /// accounts.
    pub fn init_seed(&mut self, mnemonic: &str, passphrase: &str) -> Result<()> {
        if self.encrypted_seed.is_some() {
            return Err(SatchelError::validation("Wallet already has a seed"));
        }
        let mnemonic = parse_mnemonic(mnemonic)?;
        let seed_bytes = mnemonic.to_seed(passphrase);
        let master = Xpriv::new_master(self.network, &seed_bytes)
            .map_err(|e| SatchelError::crypto(format!("Failed to derive master key: {}", e)))?;

        self.encrypted_seed = Some(seed::encrypt_secret_key(&master.private_key, passphrase)?);
        self.chain_code = Some(keys::chain_code_bytes(&master));

        let secp = Secp256k1::new();
        self.accounts_root = Some(Xpub::from_priv(&secp, &master).to_string());

        *self.cached_private_key.write() = Some(master.private_key);
        *self.cached_master_key.write() = Some(master);
        tracing::info!("Applied seed to wallet {}", self.id);
        Ok(())
    }

    /// Decrypted master private key.
    ///
    /// The cached copy is returned unless `force_verification` is set or
    /// no cache exists; re-decrypting against the stored seed is the only
    /// operation that proves the passphrase. A failed forced decryption
    /// leaves both caches untouched.
    pub fn get_private_key(&self, passphrase: &str, force_verification: bool) -> Result<SecretKey> {
        if !force_verification {
            if let Some(key) = *self.cached_private_key.read() {
                return Ok(key);
            }
        }
        let encrypted = self
            .encrypted_seed
            .as_ref()
            .ok_or_else(|| SatchelError::validation("Wallet has no encrypted seed"))?;
        let key = seed::decrypt_secret_key(encrypted, passphrase)?;
        *self.cached_private_key.write() = Some(key);
        *self.cached_master_key.write() = None;
        Ok(key)
    }

    /// Master extended private key, rebuilt from the private key and the
    /// stored chain code and cached separately.
    pub fn get_master_key(&self, passphrase: &str, force_verification: bool) -> Result<Xpriv> {
        if !force_verification {
            if let Some(key) = *self.cached_master_key.read() {
                return Ok(key);
            }
        }
        let chain_code = self
            .chain_code
            .ok_or_else(|| SatchelError::validation("Wallet has no chain code"))?;
        let private_key = self.get_private_key(passphrase, force_verification)?;
        let master =
            keys::assemble_master_key(NetworkKind::from(self.network), &private_key, &chain_code)?;
        *self.cached_master_key.write() = Some(master);
        Ok(master)
    }

    /// Create a new account and attach it to the wallet.
    ///
    /// The first account may omit its name and gets
    /// [`DEFAULT_ACCOUNT_NAME`]; every later account must be named.
    pub fn add_account(
        &mut self,
        kind: AccountKind,
        name: Option<&str>,
        passphrase: &str,
        options: AccountOptions,
    ) -> Result<&Account> {
        let name = match name {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            Some(_) => {
                return Err(SatchelError::validation("Account name must not be empty"))
            }
            None if self.accounts.is_empty() => DEFAULT_ACCOUNT_NAME.to_string(),
            None => {
                return Err(SatchelError::validation(
                    "Account name is required after the first account",
                ))
            }
        };

        let account = match kind {
            AccountKind::Bip32
            | AccountKind::Bip44
            | AccountKind::Bip49
            | AccountKind::Bip84
            | AccountKind::Bip141 => {
                if self.encrypted_seed.is_none() {
                    return Err(SatchelError::validation(
                        "Wallet has no master key; apply a mnemonic first",
                    ));
                }
                let master = self.get_master_key(passphrase, false)?;
                let hd = HdAccount::derive(kind, &master, &self.id, self.network, &name)?;
                Account::from_hd(kind, hd)?
            }
            AccountKind::Paper => {
                let (wif, script_pub_key_type) = match options {
                    AccountOptions::Paper {
                        wif,
                        script_pub_key_type,
                    } => (wif, script_pub_key_type),
                    _ => (None, None),
                };
                Account::Paper(PaperAccount::create(
                    &self.id,
                    self.network,
                    &name,
                    wif.as_deref(),
                    script_pub_key_type,
                )?)
            }
            AccountKind::Wasabi => {
                let ext_pub_key = match options {
                    AccountOptions::Wasabi { ext_pub_key } => ext_pub_key,
                    _ => {
                        return Err(SatchelError::validation(
                            "Importing a wasabi account requires an extended public key",
                        ))
                    }
                };
                Account::Wasabi(WasabiAccount::import(
                    &self.id,
                    self.network,
                    &name,
                    &ext_pub_key,
                )?)
            }
        };

        if self.current_account_id.is_none() {
            self.current_account_id = Some(account.id().to_string());
        }
        tracing::info!(
            "Added {} account '{}' to wallet {}",
            kind,
            account.name(),
            self.id
        );
        let idx = self.accounts.len();
        self.accounts.push(account);
        Ok(&self.accounts[idx])
    }

    /// String-discriminator variant of [`Wallet::add_account`], for
    /// callers holding the kind as text.
    pub fn add_account_of_kind(
        &mut self,
        kind: &str,
        name: Option<&str>,
        passphrase: &str,
        options: AccountOptions,
    ) -> Result<&Account> {
        let kind = kind.parse::<AccountKind>()?;
        self.add_account(kind, name, passphrase, options)
    }
}
