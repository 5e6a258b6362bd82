use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as ExchangePublicKey, StaticSecret};

use crate::error::CryptoError;

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Length of an Ed25519 or X25519 key in bytes (public or secret).
pub const KEY_LEN: usize = 32;

/// Generate a fresh Ed25519 signing keypair from the OS RNG.
///
/// The public half is `signing_key.verifying_key()`.
pub fn generate_signing_keypair() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Derive the X25519 exchange secret from an Ed25519 signing key.
///
/// Uses the SHA-512-expanded scalar (same scalar that Ed25519 uses internally)
/// so the resulting exchange public key equals the Edwards→Montgomery image of
/// the signing public key. The exchange key is never generated independently.
pub fn derive_exchange_secret(signing_key: &SigningKey) -> StaticSecret {
    StaticSecret::from(signing_key.to_scalar_bytes())
}

/// Public half of an X25519 exchange secret.
pub fn derive_exchange_public(exchange_secret: &StaticSecret) -> ExchangePublicKey {
    ExchangePublicKey::from(exchange_secret)
}

/// Convert a peer's Ed25519 public key to its X25519 counterpart.
///
/// Uses the standard Edwards→Montgomery birational map (RFC 7748). Matches
/// `derive_exchange_public(&derive_exchange_secret(sk))` for the same key.
pub fn signing_to_exchange_public(signing_public: &VerifyingKey) -> ExchangePublicKey {
    ExchangePublicKey::from(signing_public.to_montgomery().to_bytes())
}

/// Sign `message` exactly as given (Ed25519 does its own hashing).
pub fn sign(message: &[u8], signing_key: &SigningKey) -> [u8; SIGNATURE_LEN] {
    signing_key.sign(message).to_bytes()
}

/// Verify an Ed25519 signature over `message`.
pub fn verify(
    signature: &[u8],
    message: &[u8],
    public_key: &VerifyingKey,
) -> Result<(), CryptoError> {
    let sig_bytes: [u8; SIGNATURE_LEN] = signature.try_into().map_err(|_| {
        CryptoError::VerificationError(format!(
            "signature must be {SIGNATURE_LEN} bytes, got {}",
            signature.len()
        ))
    })?;
    let signature = Signature::from_bytes(&sig_bytes);
    public_key
        .verify_strict(message, &signature)
        .map_err(|e| CryptoError::VerificationError(e.to_string()))
}

/// Parse a 32-byte Ed25519 public key.
pub fn signing_public_from_bytes(bytes: &[u8]) -> Result<VerifyingKey, CryptoError> {
    let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!("Ed25519 public key must be {KEY_LEN} bytes"))
    })?;
    VerifyingKey::from_bytes(&arr)
        .map_err(|e| CryptoError::InvalidKey(format!("invalid Ed25519 public key: {e}")))
}

/// Parse a 32-byte X25519 public key.
pub fn exchange_public_from_bytes(bytes: &[u8]) -> Result<ExchangePublicKey, CryptoError> {
    let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!("X25519 public key must be {KEY_LEN} bytes"))
    })?;
    Ok(ExchangePublicKey::from(arr))
}
