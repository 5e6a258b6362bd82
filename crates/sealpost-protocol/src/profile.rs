//! Shared profile: what a key-exchange envelope carries.
//!
//! Layout (big-endian, lengths in bytes):
//! `uid(36) | u32 + name | u32 + picture (0 = none) | u32 + description |
//! u8 allow_sharing | public keys | u64 timestamp`, where the public keys are
//! three u32-prefixed fields (signing, exchange, bulk SPKI DER).

use bytes::{Buf, BufMut};

use sealpost_crypto::{Algorithm, DeviceClient, PublicKeys, UID_LEN};

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedProfile {
    pub uid: String,
    pub name: String,
    pub picture: Option<Vec<u8>>,
    pub description: String,
    pub allow_sharing: bool,
    pub keys: PublicKeys,
    /// When the profile was last changed, unix seconds.
    pub timestamp: u64,
}

impl SharedProfile {
    /// Profile for `client` with no picture or description.
    pub fn from_client(client: &DeviceClient, name: impl Into<String>, timestamp: u64) -> Self {
        Self {
            uid: client.profile_uid().to_owned(),
            name: name.into(),
            picture: None,
            description: String::new(),
            allow_sharing: true,
            keys: client.public_keys().clone(),
            timestamp,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.uid.len() != UID_LEN {
            return Err(ProtocolError::Framing(format!(
                "profile uid must be {UID_LEN} bytes"
            )));
        }
        let keys = self.keys.to_bytes()?;
        let picture = self.picture.as_deref().unwrap_or_default();

        let mut out = Vec::with_capacity(
            UID_LEN + 12 + self.name.len() + picture.len() + self.description.len() + 1 + keys.len() + 8,
        );
        out.put_slice(self.uid.as_bytes());
        put_field(&mut out, self.name.as_bytes())?;
        put_field(&mut out, picture)?;
        put_field(&mut out, self.description.as_bytes())?;
        out.put_u8(u8::from(self.allow_sharing));
        out.put_slice(&keys);
        out.put_u64(self.timestamp);
        Ok(out)
    }

    pub fn decode(mut data: &[u8]) -> Result<Self, ProtocolError> {
        let uid = utf8(take(&mut data, UID_LEN, "uid")?.to_vec(), "uid")?;
        let name = utf8(get_field(&mut data, "name")?, "name")?;
        let picture = Some(get_field(&mut data, "picture")?).filter(|p| !p.is_empty());
        let description = utf8(get_field(&mut data, "description")?, "description")?;
        let allow_sharing = take(&mut data, 1, "allow_sharing")?[0] != 0;

        let (keys, used) = PublicKeys::read_from(data)
            .map_err(|e| ProtocolError::Framing(format!("profile keys: {e}")))?;
        data.advance(used);

        let timestamp = take(&mut data, 8, "timestamp")?.get_u64();
        if data.has_remaining() {
            return Err(ProtocolError::Framing(format!(
                "{} trailing bytes after shared profile",
                data.remaining()
            )));
        }

        Ok(Self {
            uid,
            name,
            picture,
            description,
            allow_sharing,
            keys,
            timestamp,
        })
    }

    /// The public-only identity to persist for this peer.
    pub fn to_remote_client(&self, algorithm: Algorithm) -> Result<DeviceClient, ProtocolError> {
        Ok(DeviceClient::remote(
            self.uid.clone(),
            algorithm,
            self.keys.clone(),
        )?)
    }
}

fn put_field(out: &mut Vec<u8>, field: &[u8]) -> Result<(), ProtocolError> {
    let len = u32::try_from(field.len())
        .map_err(|_| ProtocolError::Framing("profile field exceeds u32 length".into()))?;
    out.put_u32(len);
    out.put_slice(field);
    Ok(())
}

fn take<'a>(data: &mut &'a [u8], len: usize, what: &str) -> Result<&'a [u8], ProtocolError> {
    if data.len() < len {
        return Err(ProtocolError::Framing(format!(
            "shared profile truncated in {what}"
        )));
    }
    let (head, tail) = data.split_at(len);
    *data = tail;
    Ok(head)
}

fn get_field(data: &mut &[u8], what: &str) -> Result<Vec<u8>, ProtocolError> {
    let len = take(data, 4, what)?.get_u32() as usize;
    Ok(take(data, len, what)?.to_vec())
}

fn utf8(bytes: Vec<u8>, what: &str) -> Result<String, ProtocolError> {
    String::from_utf8(bytes)
        .map_err(|_| ProtocolError::Framing(format!("profile {what} is not UTF-8")))
}
