use bitcoin::base58;
use bitcoin::bip32::{Xpriv, Xpub};
use bitcoin::NetworkKind;
use std::str::FromStr;

use crate::error::{Result, SatchelError};

/// Serialized extended keys are 78 bytes: 4 version + 1 depth + 4 parent
/// fingerprint + 4 child number + 32 chain code + 33 key data.
const EXTENDED_KEY_LEN: usize = 78;
const VERSION_LEN: usize = 4;

/// Version-prefix family an extended key string is encoded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// Generic encoding: xprv/xpub on mainnet, tprv/tpub on testnet.
    Bip32,
    /// P2SH-wrapped segwit encoding: yprv/ypub, uprv/upub.
    Bip49,
    /// Native segwit encoding: zprv/zpub, vprv/vpub.
    Bip84,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyKind {
    Private,
    Public,
}

pub(crate) fn version_prefix(network: NetworkKind, kind: KeyKind, family: KeyFamily) -> [u8; 4] {
    match (network, kind, family) {
        (NetworkKind::Main, KeyKind::Private, KeyFamily::Bip32) => [0x04, 0x88, 0xAD, 0xE4],
        (NetworkKind::Main, KeyKind::Public, KeyFamily::Bip32) => [0x04, 0x88, 0xB2, 0x1E],
        (NetworkKind::Main, KeyKind::Private, KeyFamily::Bip49) => [0x04, 0x9D, 0x78, 0x78],
        (NetworkKind::Main, KeyKind::Public, KeyFamily::Bip49) => [0x04, 0x9D, 0x7C, 0xB2],
        (NetworkKind::Main, KeyKind::Private, KeyFamily::Bip84) => [0x04, 0xB2, 0x43, 0x0C],
        (NetworkKind::Main, KeyKind::Public, KeyFamily::Bip84) => [0x04, 0xB2, 0x47, 0x46],
        (NetworkKind::Test, KeyKind::Private, KeyFamily::Bip32) => [0x04, 0x35, 0x83, 0x94],
        (NetworkKind::Test, KeyKind::Public, KeyFamily::Bip32) => [0x04, 0x35, 0x87, 0xCF],
        (NetworkKind::Test, KeyKind::Private, KeyFamily::Bip49) => [0x04, 0x4A, 0x4E, 0x28],
        (NetworkKind::Test, KeyKind::Public, KeyFamily::Bip49) => [0x04, 0x4A, 0x52, 0x62],
        (NetworkKind::Test, KeyKind::Private, KeyFamily::Bip84) => [0x04, 0x5F, 0x18, 0xBC],
        (NetworkKind::Test, KeyKind::Public, KeyFamily::Bip84) => [0x04, 0x5F, 0x1C, 0xF6],
    }
}

fn classify_prefix(prefix: [u8; 4]) -> Option<(NetworkKind, KeyKind, KeyFamily)> {
    let classified = match prefix {
        [0x04, 0x88, 0xAD, 0xE4] => (NetworkKind::Main, KeyKind::Private, KeyFamily::Bip32),
        [0x04, 0x88, 0xB2, 0x1E] => (NetworkKind::Main, KeyKind::Public, KeyFamily::Bip32),
        [0x04, 0x9D, 0x78, 0x78] => (NetworkKind::Main, KeyKind::Private, KeyFamily::Bip49),
        [0x04, 0x9D, 0x7C, 0xB2] => (NetworkKind::Main, KeyKind::Public, KeyFamily::Bip49),
        [0x04, 0xB2, 0x43, 0x0C] => (NetworkKind::Main, KeyKind::Private, KeyFamily::Bip84),
        [0x04, 0xB2, 0x47, 0x46] => (NetworkKind::Main, KeyKind::Public, KeyFamily::Bip84),
        [0x04, 0x35, 0x83, 0x94] => (NetworkKind::Test, KeyKind::Private, KeyFamily::Bip32),
        [0x04, 0x35, 0x87, 0xCF] => (NetworkKind::Test, KeyKind::Public, KeyFamily::Bip32),
        [0x04, 0x4A, 0x4E, 0x28] => (NetworkKind::Test, KeyKind::Private, KeyFamily::Bip49),
        [0x04, 0x4A, 0x52, 0x62] => (NetworkKind::Test, KeyKind::Public, KeyFamily::Bip49),
        [0x04, 0x5F, 0x18, 0xBC] => (NetworkKind::Test, KeyKind::Private, KeyFamily::Bip84),
        [0x04, 0x5F, 0x1C, 0xF6] => (NetworkKind::Test, KeyKind::Public, KeyFamily::Bip84),
        _ => return None,
    };
    Some(classified)
}

/// Guess the network from an encoded key's leading character.
///
/// The mainnet families all start with 'x', 'y' or 'z'; anything else is
/// treated as testnet. This is a convenience, not a security boundary;
/// callers that know the network should pass it explicitly.
pub fn infer_network(encoded: &str) -> NetworkKind {
    match encoded.chars().next() {
        Some('x') | Some('y') | Some('z') => NetworkKind::Main,
        _ => NetworkKind::Test,
    }
}

/// Re-encode an extended key string under a different version-prefix
/// family.
///
/// The key material is untouched: only the first four bytes of the
/// Base58Check payload change. Whether the key is private or public is
/// read from its current prefix.
pub fn convert(encoded: &str, network: Option<NetworkKind>, family: KeyFamily) -> Result<String> {
    let mut data = base58::decode_check(encoded)
        .map_err(|e| SatchelError::crypto(format!("Malformed extended key: {}", e)))?;
    if data.len() != EXTENDED_KEY_LEN {
        return Err(SatchelError::crypto(format!(
            "Malformed extended key: expected {} bytes, got {}",
            EXTENDED_KEY_LEN,
            data.len()
        )));
    }

    let mut current = [0u8; VERSION_LEN];
    current.copy_from_slice(&data[..VERSION_LEN]);
    let (_, kind, _) = classify_prefix(current).ok_or_else(|| {
        SatchelError::crypto(format!(
            "Unrecognized extended key version prefix: {}",
            hex::encode(current)
        ))
    })?;

    let network = network.unwrap_or_else(|| infer_network(encoded));
    data[..VERSION_LEN].copy_from_slice(&version_prefix(network, kind, family));
    Ok(base58::encode_check(&data))
}

/// Encode an already-parsed extended private key under a family encoding.
pub fn xpriv_to_family(key: &Xpriv, family: KeyFamily) -> String {
    let mut data = key.encode().to_vec();
    data[..VERSION_LEN].copy_from_slice(&version_prefix(key.network, KeyKind::Private, family));
    base58::encode_check(&data)
}

/// Encode an already-parsed extended public key under a family encoding.
pub fn xpub_to_family(key: &Xpub, family: KeyFamily) -> String {
    let mut data = key.encode().to_vec();
    data[..VERSION_LEN].copy_from_slice(&version_prefix(key.network, KeyKind::Public, family));
    base58::encode_check(&data)
}

/// Parse an extended public key encoded under any supported family.
pub fn parse_xpub(encoded: &str) -> Result<Xpub> {
    let generic = convert(encoded, None, KeyFamily::Bip32)?;
    Xpub::from_str(&generic)
        .map_err(|e| SatchelError::crypto(format!("Malformed extended public key: {}", e)))
}

/// Parse an extended private key encoded under any supported family.
pub fn parse_xpriv(encoded: &str) -> Result<Xpriv> {
    let generic = convert(encoded, None, KeyFamily::Bip32)?;
    Xpriv::from_str(&generic)
        .map_err(|e| SatchelError::crypto(format!("Malformed extended private key: {}", e)))
}
