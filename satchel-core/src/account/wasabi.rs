use bitcoin::bip32::ChildNumber;
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Address, Network, Txid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountColors;
use crate::error::{Result, SatchelError};
use crate::keys::convert;
use crate::types::TransactionData;

/// An account imported from an external wallet: watch-only extended
/// public key, no private material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasabiAccount {
    pub id: String,
    pub wallet_id: String,
    pub network: Network,
    pub name: String,
    /// Imported extended public key, kept in its original encoding.
    pub ext_pub_key: String,
    #[serde(default)]
    pub tx_ids: Vec<Txid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<AccountColors>,
    #[serde(skip)]
    pub txs: Vec<TransactionData>,
}

impl WasabiAccount {
    pub fn import(
        wallet_id: &str,
        network: Network,
        name: &str,
        ext_pub_key: &str,
    ) -> Result<Self> {
        // Validate up front; the original encoding is preserved on disk.
        convert::parse_xpub(ext_pub_key)?;

        let id = Uuid::new_v4().to_string();
        Ok(Self {
            colors: Some(AccountColors::derive(&id)),
            id,
            wallet_id: wallet_id.to_string(),
            network,
            name: name.to_string(),
            ext_pub_key: ext_pub_key.to_string(),
            tx_ids: Vec::new(),
            txs: Vec::new(),
        })
    }

    /// Child address at `chain` (0 receive, 1 change) and `index`.
    /// Imported accounts are native segwit.
    pub fn derive_address(&self, chain: u32, index: u32) -> Result<Address> {
        let xpub = convert::parse_xpub(&self.ext_pub_key)?;
        let secp = Secp256k1::new();
        let steps = [
            ChildNumber::from_normal_idx(chain)
                .map_err(|e| SatchelError::validation(format!("Bad chain index: {}", e)))?,
            ChildNumber::from_normal_idx(index)
                .map_err(|e| SatchelError::validation(format!("Bad address index: {}", e)))?,
        ];
        let child = xpub
            .derive_pub(&secp, &steps)
            .map_err(|e| SatchelError::crypto(format!("Address derivation failed: {}", e)))?;
        let compressed = CompressedPublicKey::from_slice(&child.public_key.serialize())
            .map_err(|e| SatchelError::crypto(format!("Invalid derived key: {}", e)))?;
        Ok(Address::p2wpkh(&compressed, self.network))
    }
}
