use sealpost_crypto::{Algorithm, SymmetricSuite};

use crate::error::ProtocolError;
use crate::messaging::content::{self, Attachments};
use crate::messaging::part::{ContentKind, MessagePart};

/// Wire unit sent to the relay: `u8 algorithm | recipient signing key | payload`.
///
/// The recipient key lets the receiving device pick the identity the envelope
/// was sealed for. Its length is fixed by the algorithm; the payload runs to
/// the end of the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub algorithm_code: u8,
    pub recipient_signing_key: Vec<u8>,
    /// Bulk-wrapped routing blocks followed by the AEAD ciphertext.
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data =
            Vec::with_capacity(1 + self.recipient_signing_key.len() + self.payload.len());
        data.push(self.algorithm_code);
        data.extend_from_slice(&self.recipient_signing_key);
        data.extend_from_slice(&self.payload);
        data
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        let (&algorithm_code, rest) = data
            .split_first()
            .ok_or_else(|| ProtocolError::Framing("empty envelope".into()))?;
        let algorithm = Algorithm::from_code(algorithm_code)
            .ok_or(ProtocolError::UnsupportedAlgorithm(algorithm_code))?;

        let key_len = algorithm.signing_key_len();
        if rest.len() < key_len {
            return Err(ProtocolError::Framing(format!(
                "envelope of {} bytes is shorter than its {key_len}-byte header key",
                data.len()
            )));
        }
        let (key, payload) = rest.split_at(key_len);
        Ok(Self {
            algorithm_code,
            recipient_signing_key: key.to_vec(),
            payload: payload.to_vec(),
        })
    }

    pub fn algorithm(&self) -> Result<Algorithm, ProtocolError> {
        Algorithm::from_code(self.algorithm_code)
            .ok_or(ProtocolError::UnsupportedAlgorithm(self.algorithm_code))
    }
}

/// Marker bulk-wrapped at the start of every envelope payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    Content = 0,
    KeyExchange = 1,
    ProfileUpdate = 2,
    DeleteMessage = 3,
    DeleteProfile = 4,
}

impl MessageType {
    pub fn ordinal(self) -> u16 {
        self as u16
    }

    pub fn from_ordinal(ordinal: u16) -> Result<Self, ProtocolError> {
        Ok(match ordinal {
            0 => Self::Content,
            1 => Self::KeyExchange,
            2 => Self::ProfileUpdate,
            3 => Self::DeleteMessage,
            4 => Self::DeleteProfile,
            other => {
                return Err(ProtocolError::Framing(format!(
                    "unknown message type {other}"
                )))
            }
        })
    }
}

/// A verified, decrypted envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub sender_uid: String,
    pub message_type: MessageType,
    /// Sender's clock, unix seconds.
    pub timestamp: u64,
    pub parts: Vec<MessagePart>,
}

impl ParsedMessage {
    /// Text of the first `Message` part.
    pub fn text(&self) -> Result<Option<&str>, ProtocolError> {
        content::first_utf8(&self.parts, ContentKind::Message).transpose()
    }

    /// Identifier carried in the first `Uid` part.
    pub fn message_uid(&self) -> Result<Option<&str>, ProtocolError> {
        content::first_utf8(&self.parts, ContentKind::Uid).transpose()
    }

    pub fn attachments(&self) -> Result<Option<Attachments>, ProtocolError> {
        content::collect_attachments(&self.parts)
    }

    /// Payload of a key-exchange envelope (an encoded shared profile).
    pub fn key_exchange_payload(&self) -> Option<&[u8]> {
        if self.message_type != MessageType::KeyExchange {
            return None;
        }
        self.parts
            .iter()
            .find(|p| p.kind == ContentKind::None)
            .map(|p| p.content.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let envelope = Envelope {
            algorithm_code: 0,
            recipient_signing_key: vec![7u8; 32],
            payload: vec![1, 2, 3],
        };
        let bytes = envelope.to_bytes();
        assert_eq!(bytes.len(), 1 + 32 + 3);
        assert_eq!(bytes[0], 0);
        assert_eq!(&bytes[33..], [1, 2, 3]);
        assert_eq!(Envelope::from_bytes(&bytes).unwrap(), envelope);
    }

    #[test]
    fn unknown_algorithm_rejected() {
        let mut bytes = vec![9u8];
        bytes.extend_from_slice(&[0u8; 40]);
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(ProtocolError::UnsupportedAlgorithm(9))
        ));
    }

    #[test]
    fn short_header_rejected() {
        assert!(matches!(
            Envelope::from_bytes(&[]),
            Err(ProtocolError::Framing(_))
        ));
        assert!(matches!(
            Envelope::from_bytes(&[0u8; 20]),
            Err(ProtocolError::Framing(_))
        ));
    }

    #[test]
    fn message_type_ordinals() {
        for ordinal in 0..5 {
            assert_eq!(MessageType::from_ordinal(ordinal).unwrap().ordinal(), ordinal);
        }
        assert!(MessageType::from_ordinal(5).is_err());
    }

    #[test]
    fn accessors_read_parts() {
        let parsed = ParsedMessage {
            sender_uid: "11111111-1111-1111-1111-111111111111".into(),
            message_type: MessageType::Content,
            timestamp: 0,
            parts: content::build_content_parts_with_uid("m-1", "hello", None).unwrap(),
        };
        assert_eq!(parsed.text().unwrap(), Some("hello"));
        assert_eq!(parsed.message_uid().unwrap(), Some("m-1"));
        assert_eq!(parsed.attachments().unwrap(), None);
        assert_eq!(parsed.key_exchange_payload(), None);
    }
}
