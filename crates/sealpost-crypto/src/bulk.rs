//! RSA bulk wrapping.
//!
//! Used for data the recipient must recover without a session: the sender's
//! uid, the message-type marker and, in key exchanges, the session key.
//! Every ciphertext is one fixed-size block of [`BULK_BLOCK_LEN`] bytes.

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::CryptoError;

/// Default RSA modulus size, also the smallest accepted.
pub const BULK_KEY_BITS: usize = 2048;
/// Largest modulus whose SPKI encoding `rsa` will decode again.
pub const BULK_MAX_KEY_BITS: usize = 4096;
/// Ciphertext length for a [`BULK_KEY_BITS`] key.
pub const BULK_BLOCK_LEN: usize = BULK_KEY_BITS / 8;
/// Largest plaintext one OAEP-SHA256 block can carry for a 2048-bit key.
pub const BULK_MAX_PLAINTEXT: usize = BULK_BLOCK_LEN - 2 * 32 - 2;

/// Recipient-side public key for bulk wrapping.
#[derive(Clone, PartialEq, Eq)]
pub struct BulkPublicKey {
    inner: RsaPublicKey,
}

/// Private half of a bulk keypair. Zeroized on drop by `rsa`.
#[derive(Clone)]
pub struct BulkPrivateKey {
    inner: RsaPrivateKey,
}

/// Generate a bulk keypair with a modulus of `bits` bits.
pub fn generate_bulk_keypair(bits: usize) -> Result<(BulkPublicKey, BulkPrivateKey), CryptoError> {
    if bits < BULK_KEY_BITS {
        return Err(CryptoError::KeyGeneration(format!(
            "RSA modulus of {bits} bits is below the {BULK_KEY_BITS}-bit minimum"
        )));
    }
    if bits > BULK_MAX_KEY_BITS {
        return Err(CryptoError::KeyGeneration(format!(
            "RSA modulus of {bits} bits is above the {BULK_MAX_KEY_BITS}-bit maximum"
        )));
    }
    let private = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| CryptoError::KeyGeneration(format!("RSA: {e}")))?;
    let public = RsaPublicKey::from(&private);
    Ok((
        BulkPublicKey { inner: public },
        BulkPrivateKey { inner: private },
    ))
}

impl BulkPublicKey {
    /// Encrypt one block with RSA-OAEP (SHA-256).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let limit = self.max_plaintext_len();
        if plaintext.len() > limit {
            return Err(CryptoError::EncryptionError(format!(
                "bulk plaintext of {} bytes exceeds the {limit}-byte block limit",
                plaintext.len()
            )));
        }
        self.inner
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
            .map_err(|e| CryptoError::EncryptionError(format!("RSA-OAEP: {e}")))
    }

    /// Ciphertext length produced by this key.
    pub fn block_len(&self) -> usize {
        self.inner.size()
    }

    /// Largest plaintext accepted by [`BulkPublicKey::encrypt`].
    pub fn max_plaintext_len(&self) -> usize {
        self.block_len().saturating_sub(2 * 32 + 2)
    }

    /// X.509 `SubjectPublicKeyInfo` DER encoding.
    pub fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        self.inner
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidKey(format!("RSA public key encoding: {e}")))
    }

    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        RsaPublicKey::from_public_key_der(der)
            .map(|inner| Self { inner })
            .map_err(|e| CryptoError::InvalidKey(format!("RSA public key: {e}")))
    }
}

impl BulkPrivateKey {
    /// Decrypt one block produced by [`BulkPublicKey::encrypt`].
    pub fn decrypt(&self, block: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.inner
            .decrypt(Oaep::new::<Sha256>(), block)
            .map_err(|e| CryptoError::DecryptionError(format!("RSA-OAEP: {e}")))
    }

    pub fn public_key(&self) -> BulkPublicKey {
        BulkPublicKey {
            inner: RsaPublicKey::from(&self.inner),
        }
    }

    /// Ciphertext block length this key decrypts.
    pub fn block_len(&self) -> usize {
        self.inner.size()
    }

    /// PKCS#8 DER encoding.
    ///
    /// # Security
    /// This is the private key material.
    pub fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        self.inner
            .to_pkcs8_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidKey(format!("RSA private key encoding: {e}")))
    }

    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        RsaPrivateKey::from_pkcs8_der(der)
            .map(|inner| Self { inner })
            .map_err(|e| CryptoError::InvalidKey(format!("RSA private key: {e}")))
    }
}

impl std::fmt::Debug for BulkPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BulkPublicKey(RSA-{})", self.block_len() * 8)
    }
}

impl std::fmt::Debug for BulkPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BulkPrivateKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;

    fn keypair() -> &'static (BulkPublicKey, BulkPrivateKey) {
        static KEYS: OnceLock<(BulkPublicKey, BulkPrivateKey)> = OnceLock::new();
        KEYS.get_or_init(|| generate_bulk_keypair(BULK_KEY_BITS).unwrap())
    }

    #[test]
    fn block_round_trip() {
        let (public, private) = keypair();
        let uid = b"11111111-1111-1111-1111-111111111111";

        let block = public.encrypt(uid).unwrap();
        assert_eq!(block.len(), BULK_BLOCK_LEN);
        assert_eq!(private.decrypt(&block).unwrap(), uid);
    }

    #[test]
    fn padding_is_randomized() {
        let (public, _) = keypair();
        let a = public.encrypt(b"same").unwrap();
        let b = public.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn oversized_plaintext_rejected() {
        let (public, _) = keypair();
        assert_eq!(public.max_plaintext_len(), BULK_MAX_PLAINTEXT);
        assert!(public.encrypt(&[0u8; BULK_MAX_PLAINTEXT]).is_ok());
        assert!(public.encrypt(&[0u8; BULK_MAX_PLAINTEXT + 1]).is_err());
    }

    #[test]
    fn tampered_block_rejected() {
        let (public, private) = keypair();
        let mut block = public.encrypt(b"routing").unwrap();
        block[10] ^= 0x80;
        assert!(private.decrypt(&block).is_err());
    }

    #[test]
    fn der_round_trip() {
        let (public, private) = keypair();

        let public_der = public.to_der().unwrap();
        assert_eq!(&BulkPublicKey::from_der(&public_der).unwrap(), public);

        let restored = BulkPrivateKey::from_der(&private.to_der().unwrap()).unwrap();
        let block = public.encrypt(b"restored").unwrap();
        assert_eq!(restored.decrypt(&block).unwrap(), b"restored");
        assert_eq!(&restored.public_key(), public);
    }

    #[test]
    fn small_modulus_rejected() {
        assert!(generate_bulk_keypair(1024).is_err());
    }

    #[test]
    fn oversized_modulus_rejected() {
        assert!(matches!(
            generate_bulk_keypair(BULK_MAX_KEY_BITS + 64),
            Err(CryptoError::KeyGeneration(_))
        ));
    }
}
