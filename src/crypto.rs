use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use thiserror::Error;
use tracing::warn;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key must be 32 bytes base64-encoded: {0}")]
    InvalidKey(String),
    #[error("encryption failed: {0}")]
    EncryptFailed(String),
}

/// Encrypts and decrypts API secrets at rest.
///
/// Wire form is base64(nonce || AES-256-GCM ciphertext). An empty plaintext
/// stays an empty ciphertext ("no secret configured"), and decryption of an
/// unreadable value yields `None` rather than an error so callers can treat
/// "undecryptable" as a per-client condition.
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; 32],
}

impl SecretCipher {
    pub fn from_key(base64_key: &str) -> Result<Self, CryptoError> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(base64_key.trim())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        if decoded.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                decoded.len()
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&decoded);
        Ok(Self { key })
    }

    /// Generate a fresh random key, base64-encoded. Used by `odoodash keygen`.
    pub fn generate_key() -> String {
        let key: [u8; 32] = rand::random();
        base64::engine::general_purpose::STANDARD.encode(key)
    }

    pub fn encrypt(&self, plain: &str) -> Result<String, CryptoError> {
        if plain.is_empty() {
            return Ok(String::new());
        }
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::EncryptFailed(e.to_string()))?;
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let encrypted = cipher
            .encrypt(nonce, plain.as_bytes())
            .map_err(|e| CryptoError::EncryptFailed(e.to_string()))?;
        let mut payload = Vec::with_capacity(NONCE_LEN + encrypted.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&encrypted);
        Ok(base64::engine::general_purpose::STANDARD.encode(payload))
    }

    /// Returns `Some("")` for an empty stored value and `None` when the value
    /// cannot be decrypted with the configured key.
    pub fn decrypt(&self, stored: &str) -> Option<String> {
        if stored.is_empty() {
            return Some(String::new());
        }
        let payload = match base64::engine::general_purpose::STANDARD.decode(stored) {
            Ok(p) => p,
            Err(e) => {
                warn!("stored secret is not valid base64: {}", e);
                return None;
            }
        };
        if payload.len() <= NONCE_LEN {
            warn!("stored secret too short to contain a nonce");
            return None;
        }
        let cipher = Aes256Gcm::new_from_slice(&self.key).ok()?;
        let nonce = Nonce::from_slice(&payload[..NONCE_LEN]);
        match cipher.decrypt(nonce, &payload[NONCE_LEN..]) {
            Ok(plain) => String::from_utf8(plain).ok(),
            Err(_) => {
                warn!("failed to decrypt stored secret (wrong key?)");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> SecretCipher {
        SecretCipher::from_key(&SecretCipher::generate_key()).unwrap()
    }

    #[test]
    fn round_trip_non_empty_secret() {
        let c = cipher();
        for secret in ["api-key-123", "clé avec accents", "x"] {
            let encrypted = c.encrypt(secret).unwrap();
            assert_ne!(encrypted, secret);
            assert_eq!(c.decrypt(&encrypted).as_deref(), Some(secret));
        }
    }

    #[test]
    fn empty_string_passes_through() {
        let c = cipher();
        assert_eq!(c.encrypt("").unwrap(), "");
        assert_eq!(c.decrypt("").as_deref(), Some(""));
    }

    #[test]
    fn undecryptable_value_is_none_not_empty() {
        let c = cipher();
        assert_eq!(c.decrypt("not base64 at all!"), None);

        // Valid ciphertext under a different key.
        let other = cipher();
        let foreign = other.encrypt("secret").unwrap();
        assert_eq!(c.decrypt(&foreign), None);
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(SecretCipher::from_key("short").is_err());
        let eight = base64::engine::general_purpose::STANDARD.encode([0u8; 8]);
        assert!(SecretCipher::from_key(&eight).is_err());
    }
}
