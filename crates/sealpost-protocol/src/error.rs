use sealpost_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    /// AEAD tag mismatch or a payload that contradicts itself.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("message integrity compromised")]
    SignatureMismatch,

    #[error("framing error: {0}")]
    Framing(String),

    #[error("truncated frame: declared {declared} bytes, {remaining} remaining")]
    TruncatedFrame { declared: u64, remaining: usize },

    #[error("unknown sender: {0}")]
    UnknownSender(String),

    #[error("identity has no private keys: {0}")]
    IdentityState(String),

    #[error("unsupported algorithm code: {0}")]
    UnsupportedAlgorithm(u8),

    #[error("envelope is addressed to a different identity")]
    Misrouted,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ProtocolError {
    /// Whether the error means the envelope was tampered with or forged.
    ///
    /// Such envelopes are dropped whole; none of their content is released.
    pub fn is_security_event(&self) -> bool {
        matches!(self, Self::Integrity(_) | Self::SignatureMismatch)
    }
}

impl From<CryptoError> for ProtocolError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::DecryptionError(reason) => Self::Integrity(reason),
            CryptoError::IdentityState(uid) => Self::IdentityState(uid),
            other => Self::Crypto(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_errors_map_to_taxonomy() {
        let tag = ProtocolError::from(CryptoError::DecryptionError("tag".into()));
        assert!(matches!(tag, ProtocolError::Integrity(_)));
        assert!(tag.is_security_event());

        let state = ProtocolError::from(CryptoError::IdentityState("uid".into()));
        assert!(matches!(state, ProtocolError::IdentityState(_)));
        assert!(!state.is_security_event());

        let other = ProtocolError::from(CryptoError::InvalidKey("short".into()));
        assert!(matches!(other, ProtocolError::Crypto(_)));
    }

    #[test]
    fn signature_mismatch_message() {
        assert_eq!(
            ProtocolError::SignatureMismatch.to_string(),
            "message integrity compromised"
        );
    }
}
