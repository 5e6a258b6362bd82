use serde::{Deserialize, Serialize};

use sealpost_crypto::bulk::{BULK_KEY_BITS, BULK_MAX_KEY_BITS};
use sealpost_crypto::{Algorithm, DeviceClient};

use crate::error::ProtocolError;
use crate::messaging::batch;

/// Envelope and identity settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Suite new device identities are generated for.
    #[serde(default)]
    pub algorithm: Algorithm,
    /// RSA modulus size for new bulk keypairs.
    #[serde(default = "default_bulk_key_bits")]
    pub bulk_key_bits: usize,
    /// Largest batch frame accepted by [`EnvelopeConfig::split_batch`].
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: u64,
}

fn default_bulk_key_bits() -> usize {
    BULK_KEY_BITS
}

fn default_max_frame_len() -> u64 {
    64 * 1024 * 1024
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            bulk_key_bits: default_bulk_key_bits(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

impl EnvelopeConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ProtocolError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !(BULK_KEY_BITS..=BULK_MAX_KEY_BITS).contains(&self.bulk_key_bits) {
            return Err(ProtocolError::Config(format!(
                "bulk_key_bits must be between {BULK_KEY_BITS} and {BULK_MAX_KEY_BITS}, got {}",
                self.bulk_key_bits
            )));
        }
        if self.max_frame_len == 0 {
            return Err(ProtocolError::Config("max_frame_len must be non-zero".into()));
        }
        Ok(())
    }

    /// Split a relay batch response, refusing frames over `max_frame_len`.
    pub fn split_batch(&self, data: &[u8]) -> Result<Vec<Vec<u8>>, ProtocolError> {
        batch::split_limited(data, self.max_frame_len)
    }

    /// Generate the local device identity with these settings.
    pub fn generate_device_client(
        &self,
        profile_uid: impl Into<String>,
    ) -> Result<DeviceClient, ProtocolError> {
        self.validate()?;
        Ok(DeviceClient::generate_with(
            profile_uid,
            self.algorithm,
            self.bulk_key_bits,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(
            EnvelopeConfig::from_json("{}").unwrap(),
            EnvelopeConfig::default()
        );
    }

    #[test]
    fn fields_override_defaults() {
        let config =
            EnvelopeConfig::from_json(r#"{"algorithm":"ED25519","max_frame_len":1024}"#).unwrap();
        assert_eq!(config.algorithm, Algorithm::Ed25519);
        assert_eq!(config.bulk_key_bits, 2048);
        assert_eq!(config.max_frame_len, 1024);
    }

    #[test]
    fn weak_bulk_key_rejected() {
        assert!(matches!(
            EnvelopeConfig::from_json(r#"{"bulk_key_bits":1024}"#),
            Err(ProtocolError::Config(_))
        ));
    }

    #[test]
    fn oversized_bulk_key_rejected() {
        assert!(EnvelopeConfig::from_json(r#"{"bulk_key_bits":4096}"#).is_ok());
        assert!(matches!(
            EnvelopeConfig::from_json(r#"{"bulk_key_bits":4160}"#),
            Err(ProtocolError::Config(_))
        ));
    }

    #[test]
    fn batch_split_honours_frame_limit() {
        let config = EnvelopeConfig::from_json(r#"{"max_frame_len":4}"#).unwrap();
        let within = batch::join(&[b"abcd".as_slice(), b"".as_slice()]);
        assert_eq!(config.split_batch(&within).unwrap(), [b"abcd".to_vec(), Vec::new()]);

        let over = batch::join(&[b"abcde"]);
        assert!(matches!(
            config.split_batch(&over),
            Err(ProtocolError::TruncatedFrame { declared: 5, .. })
        ));
        assert_eq!(
            EnvelopeConfig::default().split_batch(&over).unwrap(),
            [b"abcde".to_vec()]
        );
    }

    #[test]
    fn unknown_algorithm_rejected() {
        assert!(EnvelopeConfig::from_json(r#"{"algorithm":"RSA"}"#).is_err());
    }

    #[test]
    fn zero_frame_limit_rejected() {
        let config = EnvelopeConfig {
            max_frame_len: 0,
            ..EnvelopeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
