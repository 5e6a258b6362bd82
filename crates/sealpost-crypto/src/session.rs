use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

/// Length of the derived AES-256 key.
pub const SESSION_KEY_LEN: usize = 32;
/// AES-GCM IV length, prepended to every ciphertext.
pub const IV_LEN: usize = 12;
/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

const HKDF_SALT: [u8; 32] = [0u8; 32];
const HKDF_INFO: &[u8] = b"Ed25519 Key Exchange";

/// Pairwise AES-256-GCM key shared by two identities.
///
/// Derived from X25519 agreement between one party's exchange secret and the
/// other's exchange public key, so both directions of a conversation use the
/// same key.
#[derive(ZeroizeOnDrop)]
pub struct SessionKey {
    key: [u8; SESSION_KEY_LEN],
}

impl SessionKey {
    /// Derive the session key for a pair of exchange keys.
    ///
    /// X25519 agreement, then HKDF-SHA256 with a 32-byte all-zero salt and
    /// info = `b"Ed25519 Key Exchange"`. Swapping the roles of the two parties
    /// yields the same key.
    pub fn derive(
        remote_exchange_public: &PublicKey,
        local_exchange_secret: &StaticSecret,
    ) -> Result<Self, CryptoError> {
        let shared = local_exchange_secret.diffie_hellman(remote_exchange_public);
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidKey(
                "X25519 agreement produced a low-order shared secret".into(),
            ));
        }

        let hk = Hkdf::<Sha256>::new(Some(&HKDF_SALT), shared.as_bytes());
        let mut key = [0u8; SESSION_KEY_LEN];
        hk.expand(HKDF_INFO, &mut key)
            .map_err(|e| CryptoError::KeyGeneration(format!("HKDF expand: {e}")))?;
        Ok(Self { key })
    }

    /// Restore a session key from raw bytes (e.g. unwrapped from a key exchange).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; SESSION_KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "session key must be {SESSION_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { key })
    }

    /// Raw key bytes, needed to wrap the key for a key-exchange recipient.
    ///
    /// # Security
    /// This is the symmetric secret.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.key
    }

    /// Encrypt with AES-256-GCM under a fresh random IV.
    ///
    /// Returns `[12-byte IV || ciphertext || 16-byte tag]`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::EncryptionError(e.to_string()))?;

        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);
        let nonce = Nonce::from_slice(&iv);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::EncryptionError(e.to_string()))?;

        let mut output = Vec::with_capacity(IV_LEN + ciphertext.len());
        output.extend_from_slice(&iv);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Decrypt data produced by [`SessionKey::encrypt`].
    ///
    /// Fails with `DecryptionError` on a short input or a tag mismatch
    /// (tampered data or the wrong key).
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < IV_LEN + TAG_LEN {
            return Err(CryptoError::DecryptionError(
                "ciphertext too short".to_string(),
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::DecryptionError(e.to_string()))?;

        let (iv, ciphertext) = data.split_at(IV_LEN);
        cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| CryptoError::DecryptionError("authentication tag mismatch".into()))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey([REDACTED])")
    }
}
