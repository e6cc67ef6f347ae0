pub mod convert;
pub mod seed;

pub use convert::{infer_network, parse_xpriv, parse_xpub, xpriv_to_family, xpub_to_family, KeyFamily};
pub use seed::{decrypt_secret_key, encrypt_secret_key};

use bitcoin::bip32::Xpriv;
use bitcoin::secp256k1::SecretKey;
use bitcoin::{Network, NetworkKind};

use crate::error::{Result, SatchelError};

/// BIP44 coin type: 0 on mainnet, 1 everywhere else.
pub fn coin_type(network: Network) -> u32 {
    match network {
        Network::Bitcoin => 0,
        _ => 1,
    }
}

/// Chain code of an extended key: bytes 13..45 of the 78-byte BIP32
/// serialization.
pub(crate) fn chain_code_bytes(key: &Xpriv) -> [u8; 32] {
    let data = key.encode();
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&data[13..45]);
    chain_code
}

/// Rebuild a master extended private key from its stored parts. Depth,
/// parent fingerprint and child number are all zero for a master key.
pub(crate) fn assemble_master_key(
    network: NetworkKind,
    private_key: &SecretKey,
    chain_code: &[u8; 32],
) -> Result<Xpriv> {
    let mut data = [0u8; 78];
    data[..4].copy_from_slice(&convert::version_prefix(
        network,
        convert::KeyKind::Private,
        KeyFamily::Bip32,
    ));
    data[13..45].copy_from_slice(chain_code);
    data[46..78].copy_from_slice(&private_key.secret_bytes());
    Xpriv::decode(&data)
        .map_err(|e| SatchelError::crypto(format!("Failed to rebuild master key: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_master_key_round_trip() {
        let master = Xpriv::new_master(Network::Bitcoin, &[0x99; 32]).unwrap();
        let chain_code = chain_code_bytes(&master);
        let rebuilt =
            assemble_master_key(NetworkKind::Main, &master.private_key, &chain_code).unwrap();
        assert_eq!(rebuilt, master);
    }

    #[test]
    fn test_coin_type() {
        assert_eq!(coin_type(Network::Bitcoin), 0);
        assert_eq!(coin_type(Network::Testnet), 1);
        assert_eq!(coin_type(Network::Regtest), 1);
    }
}
