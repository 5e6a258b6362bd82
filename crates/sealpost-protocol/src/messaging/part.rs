//! Length-prefixed message part framing.
//!
//! Each part is `kind (u16 BE) | length (u32 BE) | content`. Parts are
//! concatenated with no separator or count; a buffer is decoded until it is
//! exhausted.

use bytes::{Buf, BufMut};

use crate::error::ProtocolError;

/// Separates the file name from the file bytes in attachment parts.
pub const SEPARATOR_BYTE: u8 = 0xFF;
/// `kind` + `length` header size.
pub const PART_HEADER_LEN: usize = 6;

/// What a [`MessagePart`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ContentKind {
    /// Control payload (key-exchange profile, profile update).
    None = 0,
    /// Message identifier.
    Uid = 1,
    /// UTF-8 text.
    Message = 2,
    ImageAndVideo = 3,
    File = 4,
}

impl ContentKind {
    pub fn ordinal(self) -> u16 {
        self as u16
    }

    pub fn from_ordinal(ordinal: u16) -> Result<Self, ProtocolError> {
        Ok(match ordinal {
            0 => Self::None,
            1 => Self::Uid,
            2 => Self::Message,
            3 => Self::ImageAndVideo,
            4 => Self::File,
            other => return Err(ProtocolError::Framing(format!("unknown part kind {other}"))),
        })
    }

    /// Whether the content is `file_name | 0xFF | bytes`.
    pub fn is_attachment(self) -> bool {
        matches!(self, Self::ImageAndVideo | Self::File)
    }
}

/// One tagged chunk of an envelope's authenticated payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePart {
    pub kind: ContentKind,
    pub content: Vec<u8>,
}

impl MessagePart {
    pub fn new(kind: ContentKind, content: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(ContentKind::Message, text.as_bytes())
    }

    /// Build an attachment part. The file name may not contain [`SEPARATOR_BYTE`].
    pub fn attachment(
        kind: ContentKind,
        file_name: &[u8],
        bytes: &[u8],
    ) -> Result<Self, ProtocolError> {
        if !kind.is_attachment() {
            return Err(ProtocolError::Framing(format!(
                "{kind:?} is not an attachment kind"
            )));
        }
        if file_name.contains(&SEPARATOR_BYTE) {
            return Err(ProtocolError::Framing(
                "attachment file name contains the 0xFF separator".into(),
            ));
        }
        let mut content = Vec::with_capacity(file_name.len() + 1 + bytes.len());
        content.extend_from_slice(file_name);
        content.push(SEPARATOR_BYTE);
        content.extend_from_slice(bytes);
        Ok(Self { kind, content })
    }

    /// Split an attachment part into `(file_name, bytes)` at the first separator.
    pub fn split_attachment(&self) -> Result<(&[u8], &[u8]), ProtocolError> {
        if !self.kind.is_attachment() {
            return Err(ProtocolError::Framing(format!(
                "{:?} part is not an attachment",
                self.kind
            )));
        }
        let at = self
            .content
            .iter()
            .position(|&b| b == SEPARATOR_BYTE)
            .ok_or_else(|| ProtocolError::Framing("attachment has no separator".into()))?;
        Ok((&self.content[..at], &self.content[at + 1..]))
    }

    pub fn encoded_len(&self) -> usize {
        PART_HEADER_LEN + self.content.len()
    }

    pub fn encode_into(&self, out: &mut impl BufMut) -> Result<(), ProtocolError> {
        out.put_slice(&encode_header(self.kind, self.content.len())?);
        out.put_slice(&self.content);
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out)?;
        Ok(out)
    }
}

/// Encode a part header. Fails if `len` does not fit the u32 length field.
pub fn encode_header(kind: ContentKind, len: usize) -> Result<[u8; PART_HEADER_LEN], ProtocolError> {
    let len = u32::try_from(len).map_err(|_| {
        ProtocolError::Framing(format!("part of {len} bytes exceeds the u32 length field"))
    })?;
    let mut header = [0u8; PART_HEADER_LEN];
    let mut out = &mut header[..];
    out.put_u16(kind.ordinal());
    out.put_u32(len);
    Ok(header)
}

pub fn encode_all(parts: &[MessagePart]) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::with_capacity(parts.iter().map(MessagePart::encoded_len).sum());
    for part in parts {
        part.encode_into(&mut out)?;
    }
    Ok(out)
}

/// Decode parts until `data` is exhausted.
pub fn decode_all(mut data: &[u8]) -> Result<Vec<MessagePart>, ProtocolError> {
    let mut parts = Vec::new();
    while data.has_remaining() {
        if data.remaining() < PART_HEADER_LEN {
            return Err(ProtocolError::Framing(format!(
                "{} trailing bytes are too short for a part header",
                data.remaining()
            )));
        }
        let kind = ContentKind::from_ordinal(data.get_u16())?;
        let len = data.get_u32() as usize;
        if len > data.remaining() {
            return Err(ProtocolError::Framing(format!(
                "part declares {len} bytes but only {} remain",
                data.remaining()
            )));
        }
        tracing::trace!(?kind, len, "decoded part");
        parts.push(MessagePart::new(kind, &data[..len]));
        data.advance(len);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_wire_layout() {
        let encoded = MessagePart::text("Hi").encode().unwrap();
        assert_eq!(encoded, [0, 2, 0, 0, 0, 2, b'H', b'i']);
    }

    #[test]
    fn decode_preserves_order_and_empty_content() {
        let parts = vec![
            MessagePart::new(ContentKind::Uid, b"abc".to_vec()),
            MessagePart::text(""),
            MessagePart::new(ContentKind::None, Vec::new()),
            MessagePart::attachment(ContentKind::File, b"a.txt", b"data").unwrap(),
        ];
        let encoded = encode_all(&parts).unwrap();
        assert_eq!(decode_all(&encoded).unwrap(), parts);
        assert!(decode_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn every_kind_and_length_survives_decoding() {
        const KINDS: [ContentKind; 5] = [
            ContentKind::None,
            ContentKind::Uid,
            ContentKind::Message,
            ContentKind::ImageAndVideo,
            ContentKind::File,
        ];
        let mut parts = Vec::new();
        for kind in KINDS {
            for len in [0usize, 1, 5, 255, 256, 65_535, 65_536, 70_001] {
                let content: Vec<u8> = (0..len).map(|i| (i * 31 + len) as u8).collect();
                let part = MessagePart::new(kind, content);

                let encoded = part.encode().unwrap();
                assert_eq!(encoded.len(), PART_HEADER_LEN + len);
                assert_eq!(&encoded[..2], kind.ordinal().to_be_bytes());
                assert_eq!(&encoded[2..6], (len as u32).to_be_bytes());
                assert_eq!(decode_all(&encoded).unwrap(), [part.clone()], "{kind:?} {len}");
                parts.push(part);
            }
        }

        assert_eq!(decode_all(&encode_all(&parts).unwrap()).unwrap(), parts);
        parts.reverse();
        assert_eq!(decode_all(&encode_all(&parts).unwrap()).unwrap(), parts);
    }

    #[test]
    fn max_length_is_representable() {
        let header = encode_header(ContentKind::File, u32::MAX as usize).unwrap();
        assert_eq!(header, [0, 4, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn length_beyond_u32_rejected() {
        assert!(matches!(
            encode_header(ContentKind::File, u32::MAX as usize + 1),
            Err(ProtocolError::Framing(_))
        ));
    }

    #[test]
    fn declared_length_past_end_rejected() {
        let mut data = encode_header(ContentKind::Message, u32::MAX as usize)
            .unwrap()
            .to_vec();
        data.extend_from_slice(b"abc");
        assert!(matches!(decode_all(&data), Err(ProtocolError::Framing(_))));

        let mut data = MessagePart::text("hello").encode().unwrap();
        data.pop();
        assert!(matches!(decode_all(&data), Err(ProtocolError::Framing(_))));
    }

    #[test]
    fn partial_header_rejected() {
        assert!(matches!(
            decode_all(&[0, 2, 0]),
            Err(ProtocolError::Framing(_))
        ));
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(matches!(
            decode_all(&[0, 9, 0, 0, 0, 0]),
            Err(ProtocolError::Framing(_))
        ));
    }

    #[test]
    fn attachment_split_at_first_separator() {
        let part =
            MessagePart::attachment(ContentKind::ImageAndVideo, b"cat.png", &[1, 0xFF, 2]).unwrap();
        let (name, bytes) = part.split_attachment().unwrap();
        assert_eq!(name, b"cat.png");
        assert_eq!(bytes, [1, 0xFF, 2]);
    }

    #[test]
    fn separator_in_file_name_rejected() {
        assert!(MessagePart::attachment(ContentKind::File, b"bad\xFFname", b"x").is_err());
        assert!(MessagePart::attachment(ContentKind::Message, b"a.txt", b"x").is_err());
        assert!(MessagePart::text("plain").split_attachment().is_err());
    }
}
