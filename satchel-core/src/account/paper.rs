use bip39::rand::{rngs::OsRng, RngCore};
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{Address, Network, NetworkKind, PrivateKey, Txid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountColors;
use crate::error::{Result, SatchelError};
use crate::types::{ScriptPubKeyType, TransactionData};

/// A single imported or freshly generated key, outside any derivation
/// tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperAccount {
    pub id: String,
    pub wallet_id: String,
    pub network: Network,
    pub name: String,
    /// WIF encoding of the single private key.
    pub wif: String,
    pub script_pub_key_type: ScriptPubKeyType,
    #[serde(default)]
    pub tx_ids: Vec<Txid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<AccountColors>,
    #[serde(skip)]
    pub txs: Vec<TransactionData>,
}

impl PaperAccount {
    /// Import the given WIF key, or generate a fresh one when none is
    /// supplied.
    pub fn create(
        wallet_id: &str,
        network: Network,
        name: &str,
        wif: Option<&str>,
        script_pub_key_type: Option<ScriptPubKeyType>,
    ) -> Result<Self> {
        let key = match wif {
            Some(wif) => {
                let key = PrivateKey::from_wif(wif)
                    .map_err(|e| SatchelError::crypto(format!("Malformed WIF key: {}", e)))?;
                if key.network != NetworkKind::from(network) {
                    return Err(SatchelError::validation(
                        "WIF key network does not match the wallet network",
                    ));
                }
                key
            }
            None => {
                let mut bytes = [0u8; 32];
                OsRng.fill_bytes(&mut bytes);
                let secret = SecretKey::from_slice(&bytes)
                    .map_err(|e| SatchelError::internal(format!("Generated key rejected: {}", e)))?;
                PrivateKey::new(secret, network)
            }
        };

        let id = Uuid::new_v4().to_string();
        Ok(Self {
            colors: Some(AccountColors::derive(&id)),
            id,
            wallet_id: wallet_id.to_string(),
            network,
            name: name.to_string(),
            wif: key.to_wif(),
            script_pub_key_type: script_pub_key_type.unwrap_or_default(),
            tx_ids: Vec::new(),
            txs: Vec::new(),
        })
    }

    /// The account's single address; receive and change are the same.
    pub fn address(&self) -> Result<Address> {
        let key = PrivateKey::from_wif(&self.wif)
            .map_err(|e| SatchelError::crypto(format!("Malformed WIF key: {}", e)))?;
        let secp = Secp256k1::new();
        let public_key = key.public_key(&secp);
        let compressed = CompressedPublicKey::from_slice(&public_key.inner.serialize())
            .map_err(|e| SatchelError::crypto(format!("Invalid key: {}", e)))?;

        let address = match self.script_pub_key_type {
            ScriptPubKeyType::Legacy => Address::p2pkh(public_key.pubkey_hash(), self.network),
            ScriptPubKeyType::SegwitP2sh => Address::p2shwpkh(&compressed, self.network),
            ScriptPubKeyType::Segwit => Address::p2wpkh(&compressed, self.network),
        };
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_defaults_to_segwit() {
        let account =
            PaperAccount::create("wallet-1", Network::Regtest, "paper", None, None).unwrap();
        assert_eq!(account.script_pub_key_type, ScriptPubKeyType::Segwit);
        assert!(account.address().unwrap().to_string().starts_with("bcrt1"));
    }

    #[test]
    fn test_imported_wif_round_trips() {
        let original =
            PaperAccount::create("wallet-1", Network::Regtest, "paper", None, None).unwrap();
        let imported = PaperAccount::create(
            "wallet-1",
            Network::Regtest,
            "imported",
            Some(&original.wif),
            Some(ScriptPubKeyType::Legacy),
        )
        .unwrap();
        assert_eq!(imported.wif, original.wif);
        assert_eq!(imported.script_pub_key_type, ScriptPubKeyType::Legacy);
    }

    #[test]
    fn test_malformed_wif_is_rejected() {
        let result = PaperAccount::create(
            "wallet-1",
            Network::Regtest,
            "paper",
            Some("definitely-not-wif"),
            None,
        );
        assert!(matches!(result, Err(SatchelError::Crypto(_))));
    }

    #[test]
    fn test_network_mismatch_is_rejected() {
        let mainnet =
            PaperAccount::create("wallet-1", Network::Bitcoin, "paper", None, None).unwrap();
        let result = PaperAccount::create(
            "wallet-1",
            Network::Regtest,
            "paper",
            Some(&mainnet.wif),
            None,
        );
        assert!(matches!(result, Err(SatchelError::Validation(_))));
    }
}
