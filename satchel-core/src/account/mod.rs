pub mod hd;
pub mod paper;
pub mod wasabi;

pub use hd::HdAccount;
pub use paper::PaperAccount;
pub use wasabi::WasabiAccount;

use bitcoin::bip32::DerivationPath;
use bitcoin::{Address, Amount, Network, Txid};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

use crate::error::{Result, SatchelError};
use crate::keys::convert::KeyFamily;
use crate::types::{ScriptPubKeyType, TransactionData};

/// Closed set of supported account kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Bip32,
    Bip44,
    Bip49,
    Bip84,
    Bip141,
    Paper,
    Wasabi,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Bip32 => "bip32",
            AccountKind::Bip44 => "bip44",
            AccountKind::Bip49 => "bip49",
            AccountKind::Bip84 => "bip84",
            AccountKind::Bip141 => "bip141",
            AccountKind::Paper => "paper",
            AccountKind::Wasabi => "wasabi",
        }
    }

    /// Parse a document discriminator; `None` for anything outside the set.
    pub fn from_discriminator(s: &str) -> Option<AccountKind> {
        match s {
            "bip32" => Some(AccountKind::Bip32),
            "bip44" => Some(AccountKind::Bip44),
            "bip49" => Some(AccountKind::Bip49),
            "bip84" => Some(AccountKind::Bip84),
            "bip141" => Some(AccountKind::Bip141),
            "paper" => Some(AccountKind::Paper),
            "wasabi" => Some(AccountKind::Wasabi),
            _ => None,
        }
    }

    pub fn is_hd(&self) -> bool {
        matches!(
            self,
            AccountKind::Bip32
                | AccountKind::Bip44
                | AccountKind::Bip49
                | AccountKind::Bip84
                | AccountKind::Bip141
        )
    }

    /// Canonical derivation path of the account root below the master key.
    pub fn derivation_path(&self, network: Network) -> Result<DerivationPath> {
        let path = self.derivation_path_string(network)?;
        DerivationPath::from_str(&path)
            .map_err(|e| SatchelError::internal(format!("Bad derivation path {}: {}", path, e)))
    }

    pub(crate) fn derivation_path_string(&self, network: Network) -> Result<String> {
        let coin = crate::keys::coin_type(network);
        Ok(match self {
            AccountKind::Bip32 => "m/0'".to_string(),
            AccountKind::Bip44 => format!("m/44'/{}'/0'", coin),
            AccountKind::Bip49 => format!("m/49'/{}'/0'", coin),
            AccountKind::Bip84 => format!("m/84'/{}'/0'", coin),
            AccountKind::Bip141 => format!("m/141'/{}'/0'", coin),
            AccountKind::Paper | AccountKind::Wasabi => {
                return Err(SatchelError::validation(format!(
                    "{} accounts have no derivation path",
                    self
                )))
            }
        })
    }

    /// Extended-key encoding family used for the kind.
    pub fn key_family(&self) -> KeyFamily {
        match self {
            AccountKind::Bip49 => KeyFamily::Bip49,
            AccountKind::Bip84 => KeyFamily::Bip84,
            _ => KeyFamily::Bip32,
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = SatchelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_discriminator(s).ok_or_else(|| SatchelError::invalid_account_type(s))
    }
}

/// Per-kind creation options. Options carried for a kind other than the
/// one being created are ignored.
#[derive(Debug, Clone, Default)]
pub enum AccountOptions {
    #[default]
    None,
    Paper {
        wif: Option<String>,
        script_pub_key_type: Option<ScriptPubKeyType>,
    },
    Wasabi {
        ext_pub_key: String,
    },
}

/// Cosmetic display colors; derived from the account id when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountColors {
    pub primary: String,
    pub secondary: String,
}

impl AccountColors {
    pub fn derive(account_id: &str) -> Self {
        let digest = Sha256::digest(account_id.as_bytes());
        Self {
            primary: format!("#{:02x}{:02x}{:02x}", digest[0], digest[1], digest[2]),
            secondary: format!("#{:02x}{:02x}{:02x}", digest[3], digest[4], digest[5]),
        }
    }
}

/// A wallet account, dispatched on the `accountType` document field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "accountType")]
pub enum Account {
    #[serde(rename = "bip32")]
    Bip32(HdAccount),
    #[serde(rename = "bip44")]
    Bip44(HdAccount),
    #[serde(rename = "bip49")]
    Bip49(HdAccount),
    #[serde(rename = "bip84")]
    Bip84(HdAccount),
    #[serde(rename = "bip141")]
    Bip141(HdAccount),
    #[serde(rename = "paper")]
    Paper(PaperAccount),
    #[serde(rename = "wasabi")]
    Wasabi(WasabiAccount),
}

impl Account {
    pub(crate) fn from_hd(kind: AccountKind, account: HdAccount) -> Result<Account> {
        Ok(match kind {
            AccountKind::Bip32 => Account::Bip32(account),
            AccountKind::Bip44 => Account::Bip44(account),
            AccountKind::Bip49 => Account::Bip49(account),
            AccountKind::Bip84 => Account::Bip84(account),
            AccountKind::Bip141 => Account::Bip141(account),
            AccountKind::Paper | AccountKind::Wasabi => {
                return Err(SatchelError::invalid_account_type(kind.as_str()))
            }
        })
    }

    pub fn kind(&self) -> AccountKind {
        match self {
            Account::Bip32(_) => AccountKind::Bip32,
            Account::Bip44(_) => AccountKind::Bip44,
            Account::Bip49(_) => AccountKind::Bip49,
            Account::Bip84(_) => AccountKind::Bip84,
            Account::Bip141(_) => AccountKind::Bip141,
            Account::Paper(_) => AccountKind::Paper,
            Account::Wasabi(_) => AccountKind::Wasabi,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => &a.id,
            Account::Paper(a) => &a.id,
            Account::Wasabi(a) => &a.id,
        }
    }

    pub fn wallet_id(&self) -> &str {
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => &a.wallet_id,
            Account::Paper(a) => &a.wallet_id,
            Account::Wasabi(a) => &a.wallet_id,
        }
    }

    pub fn network(&self) -> Network {
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => a.network,
            Account::Paper(a) => a.network,
            Account::Wasabi(a) => a.network,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => &a.name,
            Account::Paper(a) => &a.name,
            Account::Wasabi(a) => &a.name,
        }
    }

    pub fn colors(&self) -> Option<&AccountColors> {
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => a.colors.as_ref(),
            Account::Paper(a) => a.colors.as_ref(),
            Account::Wasabi(a) => a.colors.as_ref(),
        }
    }

    pub fn set_colors(&mut self, colors: AccountColors) {
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => a.colors = Some(colors),
            Account::Paper(a) => a.colors = Some(colors),
            Account::Wasabi(a) => a.colors = Some(colors),
        }
    }

    pub fn tx_ids(&self) -> &[Txid] {
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => &a.tx_ids,
            Account::Paper(a) => &a.tx_ids,
            Account::Wasabi(a) => &a.tx_ids,
        }
    }

    pub fn transactions(&self) -> &[TransactionData] {
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => &a.txs,
            Account::Paper(a) => &a.txs,
            Account::Wasabi(a) => &a.txs,
        }
    }

    /// Attach a transaction produced by the chain-sync collaborator.
    pub fn add_transaction(&mut self, tx: TransactionData) {
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => {
                a.tx_ids.push(tx.id);
                a.txs.push(tx);
            }
            Account::Paper(a) => {
                a.tx_ids.push(tx.id);
                a.txs.push(tx);
            }
            Account::Wasabi(a) => {
                a.tx_ids.push(tx.id);
                a.txs.push(tx);
            }
        }
    }

    /// Replace the realized transaction list and recompute the id index
    /// from it.
    pub fn set_transactions(&mut self, txs: Vec<TransactionData>) {
        let ids: Vec<Txid> = txs.iter().map(|tx| tx.id).collect();
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => {
                a.tx_ids = ids;
                a.txs = txs;
            }
            Account::Paper(a) => {
                a.tx_ids = ids;
                a.txs = txs;
            }
            Account::Wasabi(a) => {
                a.tx_ids = ids;
                a.txs = txs;
            }
        }
    }

    /// Outputs that can still be spent.
    pub fn unspent_transactions(&self) -> Vec<&TransactionData> {
        self.transactions()
            .iter()
            .filter(|tx| tx.is_spendable())
            .collect()
    }

    /// Sum of spendable amounts over this account's outputs.
    pub fn balance(&self, confirmed_only: bool) -> Amount {
        self.transactions()
            .iter()
            .map(|tx| tx.spendable_amount(confirmed_only))
            .sum()
    }

    pub fn receive_address(&self, index: u32) -> Result<Address> {
        self.address_at(0, index)
    }

    pub fn change_address(&self, index: u32) -> Result<Address> {
        self.address_at(1, index)
    }

    fn address_at(&self, chain: u32, index: u32) -> Result<Address> {
        match self {
            Account::Bip32(a)
            | Account::Bip44(a)
            | Account::Bip49(a)
            | Account::Bip84(a)
            | Account::Bip141(a) => a.derive_address(self.kind(), chain, index),
            Account::Paper(a) => a.address(),
            Account::Wasabi(a) => a.derive_address(chain, index),
        }
    }
}
