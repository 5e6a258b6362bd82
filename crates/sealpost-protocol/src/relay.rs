//! Mailbox authentication for the relay.
//!
//! To list or delete its stored envelopes a client proves it owns the signing
//! key the envelopes are addressed to:
//! `u8 algorithm | signature | signing key | u64 timestamp`, the signature
//! covering `signing key | u64 timestamp`.

use bytes::{Buf, BufMut};

use sealpost_crypto::signing::KEY_LEN;
use sealpost_crypto::{Algorithm, CryptoError, DeviceClient, SymmetricSuite};

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub algorithm: Algorithm,
    pub signature: Vec<u8>,
    pub signing_key: [u8; KEY_LEN],
    pub timestamp: u64,
}

impl AuthRequest {
    pub fn new(local: &DeviceClient, now: u64) -> Result<Self, ProtocolError> {
        let algorithm = local.algorithm();
        let signing_key = local.signing_public_bytes();
        let signature = algorithm.sign(&signed_bytes(&signing_key, now), local)?;
        Ok(Self {
            algorithm,
            signature,
            signing_key,
            timestamp: now,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.signature.len() + KEY_LEN + 8);
        out.put_u8(self.algorithm.code());
        out.put_slice(&self.signature);
        out.put_slice(&self.signing_key);
        out.put_u64(self.timestamp);
        out
    }

    pub fn from_bytes(mut data: &[u8]) -> Result<Self, ProtocolError> {
        if !data.has_remaining() {
            return Err(ProtocolError::Framing("empty auth request".into()));
        }
        let code = data.get_u8();
        let algorithm =
            Algorithm::from_code(code).ok_or(ProtocolError::UnsupportedAlgorithm(code))?;

        let signature_len = algorithm.signature_len();
        let expected = signature_len + KEY_LEN + 8;
        if data.remaining() != expected {
            return Err(ProtocolError::Framing(format!(
                "auth request body must be {expected} bytes, got {}",
                data.remaining()
            )));
        }
        let signature = data[..signature_len].to_vec();
        data.advance(signature_len);
        let mut signing_key = [0u8; KEY_LEN];
        data.copy_to_slice(&mut signing_key);
        let timestamp = data.get_u64();

        Ok(Self {
            algorithm,
            signature,
            signing_key,
            timestamp,
        })
    }

    /// Decode a request and check its signature. Relay side.
    pub fn verify(data: &[u8]) -> Result<Self, ProtocolError> {
        let request = Self::from_bytes(data)?;
        let message = signed_bytes(&request.signing_key, request.timestamp);
        request
            .algorithm
            .verify_with_key(&request.signature, &message, &request.signing_key)
            .map_err(|e| match e {
                CryptoError::VerificationError(_) => ProtocolError::SignatureMismatch,
                other => other.into(),
            })?;
        Ok(request)
    }
}

fn signed_bytes(signing_key: &[u8; KEY_LEN], timestamp: u64) -> Vec<u8> {
    let mut message = Vec::with_capacity(KEY_LEN + 8);
    message.extend_from_slice(signing_key);
    message.put_u64(timestamp);
    message
}
