//! Algorithm suites.
//!
//! A suite bundles the signature, key-agreement and AEAD primitives used for
//! one envelope. The wire format carries the suite's one-byte code; adding a
//! suite means adding an [`Algorithm`] variant and its [`SymmetricSuite`]
//! implementation, call sites only ever talk to the trait.

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::identity::DeviceClient;
use crate::session::SessionKey;
use crate::signing::{self, KEY_LEN, SIGNATURE_LEN};

/// Operations an envelope needs from its algorithm suite.
pub trait SymmetricSuite {
    /// One-byte identifier written at the start of every envelope.
    fn code(&self) -> u8;

    /// Stable name used in configuration and key directories.
    fn name(&self) -> &'static str;

    /// Length of the encoded signing public key in the envelope header.
    fn signing_key_len(&self) -> usize;

    /// Length of a detached signature.
    fn signature_len(&self) -> usize;

    /// Sign `message` with the local identity's signing key.
    fn sign(&self, message: &[u8], local: &DeviceClient) -> Result<Vec<u8>, CryptoError>;

    /// Verify `signature` over `message` against the remote identity's signing key.
    fn verify(
        &self,
        signature: &[u8],
        message: &[u8],
        remote: &DeviceClient,
    ) -> Result<(), CryptoError>;

    /// Verify `signature` over `message` against raw signing-key bytes, for
    /// callers that only hold the key as it appeared on the wire.
    fn verify_with_key(
        &self,
        signature: &[u8],
        message: &[u8],
        signing_key: &[u8],
    ) -> Result<(), CryptoError>;

    /// Derive the pairwise session key. Symmetric in the two identities.
    fn derive_key(
        &self,
        remote: &DeviceClient,
        local: &DeviceClient,
    ) -> Result<SessionKey, CryptoError>;

    /// Authenticated encryption, output is `iv || ciphertext || tag`.
    fn encrypt(&self, plaintext: &[u8], key: &SessionKey) -> Result<Vec<u8>, CryptoError>;

    /// Inverse of [`SymmetricSuite::encrypt`].
    fn decrypt(&self, data: &[u8], key: &SessionKey) -> Result<Vec<u8>, CryptoError>;
}

/// Ed25519 signatures, X25519 + HKDF-SHA256 agreement, AES-256-GCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Suite;

impl SymmetricSuite for Ed25519Suite {
    fn code(&self) -> u8 {
        0
    }

    fn name(&self) -> &'static str {
        "ED25519"
    }

    fn signing_key_len(&self) -> usize {
        KEY_LEN
    }

    fn signature_len(&self) -> usize {
        SIGNATURE_LEN
    }

    fn sign(&self, message: &[u8], local: &DeviceClient) -> Result<Vec<u8>, CryptoError> {
        let secrets = local.secret_keys()?;
        Ok(signing::sign(message, &secrets.signing).to_vec())
    }

    fn verify(
        &self,
        signature: &[u8],
        message: &[u8],
        remote: &DeviceClient,
    ) -> Result<(), CryptoError> {
        signing::verify(signature, message, &remote.public_keys().signing)
    }

    fn verify_with_key(
        &self,
        signature: &[u8],
        message: &[u8],
        signing_key: &[u8],
    ) -> Result<(), CryptoError> {
        let key = signing::signing_public_from_bytes(signing_key)?;
        signing::verify(signature, message, &key)
    }

    fn derive_key(
        &self,
        remote: &DeviceClient,
        local: &DeviceClient,
    ) -> Result<SessionKey, CryptoError> {
        let secrets = local.secret_keys()?;
        SessionKey::derive(&remote.public_keys().exchange, &secrets.exchange)
    }

    fn encrypt(&self, plaintext: &[u8], key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
        key.encrypt(plaintext)
    }

    fn decrypt(&self, data: &[u8], key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
        key.decrypt(data)
    }
}

/// Supported suites. Serialized by name (`"ED25519"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    #[default]
    #[serde(rename = "ED25519")]
    Ed25519,
}

impl Algorithm {
    /// Every suite this build understands.
    pub const ALL: [Algorithm; 1] = [Algorithm::Ed25519];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.code() == code)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    fn suite(self) -> &'static dyn SymmetricSuite {
        match self {
            Algorithm::Ed25519 => &Ed25519Suite,
        }
    }
}

impl SymmetricSuite for Algorithm {
    fn code(&self) -> u8 {
        self.suite().code()
    }

    fn name(&self) -> &'static str {
        self.suite().name()
    }

    fn signing_key_len(&self) -> usize {
        self.suite().signing_key_len()
    }

    fn signature_len(&self) -> usize {
        self.suite().signature_len()
    }

    fn sign(&self, message: &[u8], local: &DeviceClient) -> Result<Vec<u8>, CryptoError> {
        self.suite().sign(message, local)
    }

    fn verify(
        &self,
        signature: &[u8],
        message: &[u8],
        remote: &DeviceClient,
    ) -> Result<(), CryptoError> {
        self.suite().verify(signature, message, remote)
    }

    fn verify_with_key(
        &self,
        signature: &[u8],
        message: &[u8],
        signing_key: &[u8],
    ) -> Result<(), CryptoError> {
        self.suite().verify_with_key(signature, message, signing_key)
    }

    fn derive_key(
        &self,
        remote: &DeviceClient,
        local: &DeviceClient,
    ) -> Result<SessionKey, CryptoError> {
        self.suite().derive_key(remote, local)
    }

    fn encrypt(&self, plaintext: &[u8], key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
        self.suite().encrypt(plaintext, key)
    }

    fn decrypt(&self, data: &[u8], key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
        self.suite().decrypt(data, key)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_and_name_lookup() {
        assert_eq!(Algorithm::from_code(0), Some(Algorithm::Ed25519));
        assert_eq!(Algorithm::from_code(7), None);
        assert_eq!(Algorithm::from_name("ED25519"), Some(Algorithm::Ed25519));
        assert_eq!(Algorithm::from_name("RSA"), None);
        assert_eq!(Algorithm::Ed25519.to_string(), "ED25519");
    }

    #[test]
    fn verify_with_raw_key_bytes() {
        let key = signing::generate_signing_keypair();
        let public = key.verifying_key().to_bytes();
        let signature = signing::sign(b"mailbox", &key);

        let suite = Algorithm::Ed25519;
        assert!(suite.verify_with_key(&signature, b"mailbox", &public).is_ok());
        assert!(matches!(
            suite.verify_with_key(&signature, b"mailbox!", &public),
            Err(CryptoError::VerificationError(_))
        ));
        assert!(matches!(
            suite.verify_with_key(&signature, b"mailbox", &public[..31]),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn ed25519_sizes() {
        assert_eq!(Algorithm::Ed25519.signing_key_len(), 32);
        assert_eq!(Algorithm::Ed25519.signature_len(), 64);
    }
}
