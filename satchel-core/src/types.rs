use bitcoin::{Amount, BlockHash, Network, ScriptBuf, Txid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Script form a single-key account encumbers its outputs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptPubKeyType {
    Legacy,
    Segwit,
    SegwitP2sh,
}

impl Default for ScriptPubKeyType {
    fn default() -> Self {
        ScriptPubKeyType::Segwit
    }
}

/// Marks an output as spent: which transaction consumed it and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingDetails {
    pub spender_transaction_id: Txid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u32>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub creation_time: DateTime<Utc>,
}

/// One tracked transaction output, persisted as its own document.
///
/// Populated by the chain-sync collaborator and immutable afterwards
/// except for confirmation and spending-state updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    pub id: Txid,
    pub account_id: String,
    pub network: Network,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub amount: Amount,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub amount_sent: Amount,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub total_amount: Amount,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub total_fees: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_send: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_receive: Option<bool>,
    /// Output position within the parent transaction.
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<BlockHash>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub creation_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_proof: Option<String>,
    pub script_pub_key: ScriptBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_to_script_pub_key: Option<ScriptBuf>,
    /// Raw hex encoding of the full transaction, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default = "default_true")]
    pub is_propagated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spending_details: Option<SpendingDetails>,
}

fn default_true() -> bool {
    true
}

impl TransactionData {
    pub fn is_confirmed(&self) -> bool {
        self.block_height.is_some()
    }

    /// An output is spendable when it is an incoming output with no
    /// recorded spend.
    pub fn is_spendable(&self) -> bool {
        self.is_send == Some(false) && self.spending_details.is_none()
    }

    pub fn spendable_amount(&self, confirmed_only: bool) -> Amount {
        if self.is_spendable() && (!confirmed_only || self.is_confirmed()) {
            self.amount
        } else {
            Amount::ZERO
        }
    }
}

/// Test fixture shared across module tests.
#[cfg(test)]
pub(crate) fn sample_tx(account_id: &str) -> TransactionData {
    use std::str::FromStr;

    TransactionData {
        id: Txid::from_str("1111111111111111111111111111111111111111111111111111111111111111")
            .unwrap(),
        account_id: account_id.to_string(),
        network: Network::Regtest,
        amount: Amount::from_sat(50_000),
        amount_sent: Amount::ZERO,
        total_amount: Amount::from_sat(50_000),
        total_fees: Amount::from_sat(141),
        is_send: Some(false),
        is_receive: Some(true),
        index: 0,
        block_height: None,
        block_hash: None,
        creation_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        merkle_proof: None,
        script_pub_key: ScriptBuf::new(),
        sent_to_script_pub_key: None,
        raw_transaction: None,
        memo: None,
        is_propagated: true,
        spending_details: None,
    }
}
