use bitcoin::bip32::{ChildNumber, Xpriv, Xpub};
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Address, Network, PublicKey, Txid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{AccountColors, AccountKind};
use crate::error::{Result, SatchelError};
use crate::keys::convert;
use crate::types::TransactionData;

/// A derivation-based account: one child subtree of the wallet master key.
///
/// Both extended key encodings are stored in the kind's version-prefix
/// family, so a bip84 account persists zprv/zpub strings while a bip44
/// account persists the generic pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HdAccount {
    pub id: String,
    pub wallet_id: String,
    pub network: Network,
    pub name: String,
    pub key_path: String,
    pub ext_priv_key: String,
    pub ext_pub_key: String,
    #[serde(default)]
    pub tx_ids: Vec<Txid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<AccountColors>,
    #[serde(skip)]
    pub txs: Vec<TransactionData>,
}

impl HdAccount {
    /// Derive a fresh account of `kind` from the wallet master key.
    pub fn derive(
        kind: AccountKind,
        master: &Xpriv,
        wallet_id: &str,
        network: Network,
        name: &str,
    ) -> Result<Self> {
        let path = kind.derivation_path(network)?;
        let secp = Secp256k1::new();
        let account_xprv = master
            .derive_priv(&secp, &path)
            .map_err(|e| SatchelError::crypto(format!("Account derivation failed: {}", e)))?;
        let account_xpub = Xpub::from_priv(&secp, &account_xprv);

        let family = kind.key_family();
        let id = Uuid::new_v4().to_string();
        Ok(Self {
            colors: Some(AccountColors::derive(&id)),
            id,
            wallet_id: wallet_id.to_string(),
            network,
            name: name.to_string(),
            key_path: kind.derivation_path_string(network)?,
            ext_priv_key: convert::xpriv_to_family(&account_xprv, family),
            ext_pub_key: convert::xpub_to_family(&account_xpub, family),
            tx_ids: Vec::new(),
            txs: Vec::new(),
        })
    }

    /// The account-level extended public key, whatever family it is
    /// encoded under.
    pub fn xpub(&self) -> Result<Xpub> {
        convert::parse_xpub(&self.ext_pub_key)
    }

    /// Child address at `chain` (0 receive, 1 change) and `index`.
    pub fn derive_address(&self, kind: AccountKind, chain: u32, index: u32) -> Result<Address> {
        let xpub = self.xpub()?;
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
        let address = match kind {
            AccountKind::Bip32 | AccountKind::Bip44 => {
                Address::p2pkh(PublicKey::new(child.public_key).pubkey_hash(), self.network)
            }
            AccountKind::Bip49 => Address::p2shwpkh(&compressed, self.network),
            _ => Address::p2wpkh(&compressed, self.network),
        };
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master(network: Network) -> Xpriv {
        Xpriv::new_master(network, &[0x11; 64]).unwrap()
    }

    #[test]
    fn test_derive_stores_family_encodings() {
        let master = master(Network::Bitcoin);
        let bip84 = HdAccount::derive(
            AccountKind::Bip84,
            &master,
            "wallet-1",
            Network::Bitcoin,
            "spending",
        )
        .unwrap();
        assert!(bip84.ext_priv_key.starts_with("zprv"));
        assert!(bip84.ext_pub_key.starts_with("zpub"));
        assert_eq!(bip84.key_path, "m/84'/0'/0'");
        assert_eq!(bip84.wallet_id, "wallet-1");
        assert!(bip84.colors.is_some());

        let bip49 = HdAccount::derive(
            AccountKind::Bip49,
            &master,
            "wallet-1",
            Network::Bitcoin,
            "wrapped",
        )
        .unwrap();
        assert!(bip49.ext_priv_key.starts_with("yprv"));
        assert!(bip49.ext_pub_key.starts_with("ypub"));

        let bip44 = HdAccount::derive(
            AccountKind::Bip44,
            &master,
            "wallet-1",
            Network::Bitcoin,
            "legacy",
        )
        .unwrap();
        assert!(bip44.ext_priv_key.starts_with("xprv"));
        assert!(bip44.ext_pub_key.starts_with("xpub"));
    }

    #[test]
    fn test_neutered_key_matches_private_key() {
        let master = master(Network::Testnet);
        let account = HdAccount::derive(
            AccountKind::Bip84,
            &master,
            "wallet-1",
            Network::Testnet,
            "spending",
        )
        .unwrap();
        let xprv = convert::parse_xpriv(&account.ext_priv_key).unwrap();
        let xpub = account.xpub().unwrap();
        assert_eq!(Xpub::from_priv(&Secp256k1::new(), &xprv), xpub);
    }

    #[test]
    fn test_address_forms_per_kind() {
        let master = master(Network::Bitcoin);
        let cases = [
            (AccountKind::Bip44, "1"),
            (AccountKind::Bip49, "3"),
            (AccountKind::Bip84, "bc1"),
            (AccountKind::Bip141, "bc1"),
        ];
        for (kind, prefix) in cases {
            let account =
                HdAccount::derive(kind, &master, "wallet-1", Network::Bitcoin, "acct").unwrap();
            let address = account.derive_address(kind, 0, 0).unwrap();
            assert!(
                address.to_string().starts_with(prefix),
                "{} address {} should start with {}",
                kind,
                address,
                prefix
            );
        }
    }

    #[test]
    fn test_receive_and_change_addresses_differ() {
        let master = master(Network::Regtest);
        let account = HdAccount::derive(
            AccountKind::Bip84,
            &master,
            "wallet-1",
            Network::Regtest,
            "acct",
        )
        .unwrap();
        let receive = account.derive_address(AccountKind::Bip84, 0, 0).unwrap();
        let change = account.derive_address(AccountKind::Bip84, 1, 0).unwrap();
        assert_ne!(receive.to_string(), change.to_string());
        assert!(receive.to_string().starts_with("bcrt1"));
    }
}
