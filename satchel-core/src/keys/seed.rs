use base64::{engine::general_purpose, Engine as _};
use bip39::rand::{rngs::OsRng, RngCore};
use bitcoin::secp256k1::SecretKey;

// ChaCha20Poly1305 for authenticated encryption
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};

use crate::error::{Result, SatchelError};

const SALT_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const PBKDF2_ROUNDS: u32 = 100_000;

/// Encrypt a master secret key with a user passphrase.
///
/// The result is `base64(salt || nonce || ciphertext)`; the AEAD tag
/// inside the ciphertext doubles as the passphrase check on decryption.
pub fn encrypt_secret_key(key: &SecretKey, passphrase: &str) -> Result<String> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new(&derive_key(passphrase, &salt));
    let secret = key.secret_bytes();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), secret.as_ref())
        .map_err(|e| SatchelError::crypto(format!("Seed encryption failed: {}", e)))?;

    let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(general_purpose::STANDARD.encode(blob))
}

/// Decrypt an encrypted seed string back into the master secret key.
///
/// An authentication failure means the passphrase is wrong or the stored
/// seed is corrupt and is reported as [`SatchelError::WrongPassphrase`],
/// never as garbage key bytes.
pub fn decrypt_secret_key(encoded: &str, passphrase: &str) -> Result<SecretKey> {
    let blob = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| SatchelError::crypto(format!("Malformed encrypted seed: {}", e)))?;
    if blob.len() <= SALT_SIZE + NONCE_SIZE {
        return Err(SatchelError::crypto("Malformed encrypted seed: truncated"));
    }
    let (salt, rest) = blob.split_at(SALT_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

    let cipher = ChaCha20Poly1305::new(&derive_key(passphrase, salt));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SatchelError::WrongPassphrase)?;

    SecretKey::from_slice(&plaintext)
        .map_err(|e| SatchelError::crypto(format!("Decrypted seed is not a valid key: {}", e)))
}

/// Derive the symmetric key from the passphrase using PBKDF2
fn derive_key(passphrase: &str, salt: &[u8]) -> Key {
    use pbkdf2::pbkdf2_hmac;
    use sha2::Sha256;

    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    *Key::from_slice(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SecretKey {
        SecretKey::from_slice(&[0x42; 32]).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = test_key();
        let passphrase = "test_passphrase_123";

        let encrypted = encrypt_secret_key(&key, passphrase).unwrap();
        let decrypted = decrypt_secret_key(&encrypted, passphrase).unwrap();

        assert_eq!(key, decrypted);
    }

    #[test]
    fn test_wrong_passphrase() {
        let key = test_key();

        let encrypted = encrypt_secret_key(&key, "test_passphrase_123").unwrap();
        let result = decrypt_secret_key(&encrypted, "wrong_passphrase");

        assert!(matches!(result, Err(SatchelError::WrongPassphrase)));
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_encryption() {
        let key = test_key();
        let a = encrypt_secret_key(&key, "pass").unwrap();
        let b = encrypt_secret_key(&key, "pass").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_seed_string() {
        assert!(matches!(
            decrypt_secret_key("not base64!!!", "pass"),
            Err(SatchelError::Crypto(_))
        ));
        assert!(matches!(
            decrypt_secret_key("AAAA", "pass"),
            Err(SatchelError::Crypto(_))
        ));
    }
}
