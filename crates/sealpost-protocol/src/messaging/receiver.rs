use std::collections::HashMap;

use sealpost_crypto::{Algorithm, DeviceClient, SessionKey, SymmetricSuite, UID_LEN};

use crate::error::ProtocolError;
use crate::messaging::envelope::{Envelope, MessageType, ParsedMessage};
use crate::messaging::part::{self, ContentKind};

const TIMESTAMP_LEN: usize = 8;

/// Looks up a sender's public identity by profile uid.
///
/// `Ok(None)` means the sender is not known (yet); the envelope is rejected
/// with [`ProtocolError::UnknownSender`] and the caller may retry it once the
/// sender's key exchange has been processed.
pub trait IdentityResolver {
    fn resolve(&self, profile_uid: &str) -> Result<Option<DeviceClient>, ProtocolError>;
}

impl IdentityResolver for HashMap<String, DeviceClient> {
    fn resolve(&self, profile_uid: &str) -> Result<Option<DeviceClient>, ProtocolError> {
        Ok(self.get(profile_uid).cloned())
    }
}

/// Parse full envelope bytes addressed to `local`.
pub fn parse_envelope(
    wire: &[u8],
    local: &DeviceClient,
    resolver: &dyn IdentityResolver,
) -> Result<ParsedMessage, ProtocolError> {
    let envelope = Envelope::from_bytes(wire)?;
    if envelope.algorithm()? != local.algorithm() {
        return Err(ProtocolError::UnsupportedAlgorithm(envelope.algorithm_code));
    }
    if envelope.recipient_signing_key != local.signing_public_bytes() {
        tracing::debug!(
            recipient = hex::encode(&envelope.recipient_signing_key),
            local = %local.signing_public_hex(),
            "envelope addressed to another identity"
        );
        return Err(ProtocolError::Misrouted);
    }
    parse(&envelope.payload, local, resolver)
}

/// Open an envelope payload with the local identity.
///
/// Tampered or forged payloads fail with a security error
/// ([`ProtocolError::is_security_event`]) and release nothing.
pub fn parse(
    payload: &[u8],
    local: &DeviceClient,
    resolver: &dyn IdentityResolver,
) -> Result<ParsedMessage, ProtocolError> {
    match open(payload, local, resolver) {
        Err(e) if e.is_security_event() => {
            tracing::warn!(
                recipient = %local.signing_public_hex(),
                error = %e,
                "envelope rejected"
            );
            Err(e)
        }
        result => result,
    }
}

fn open(
    payload: &[u8],
    local: &DeviceClient,
    resolver: &dyn IdentityResolver,
) -> Result<ParsedMessage, ProtocolError> {
    let bulk = &local.secret_keys()?.bulk;
    let block_len = bulk.block_len();

    let (uid_block, rest) = take(payload, block_len, "sender uid block")?;
    let sender_uid = decode_uid(&bulk.decrypt(uid_block)?)?;

    let (type_block, rest) = take(rest, block_len, "message type block")?;
    let type_bytes: [u8; 2] = bulk
        .decrypt(type_block)?
        .as_slice()
        .try_into()
        .map_err(|_| ProtocolError::Framing("message type marker must be 2 bytes".into()))?;
    let message_type = MessageType::from_ordinal(u16::from_be_bytes(type_bytes))?;

    if message_type == MessageType::KeyExchange {
        let (key_block, ciphertext) = take(rest, block_len, "session key block")?;
        let key = SessionKey::from_bytes(&bulk.decrypt(key_block)?)?;
        return open_key_exchange(ciphertext, &key, local.algorithm(), sender_uid);
    }

    let remote = resolver
        .resolve(&sender_uid)?
        .ok_or_else(|| ProtocolError::UnknownSender(sender_uid.clone()))?;
    open_signed(rest, local, &remote, sender_uid, message_type)
}

fn open_signed(
    ciphertext: &[u8],
    local: &DeviceClient,
    remote: &DeviceClient,
    sender_uid: String,
    message_type: MessageType,
) -> Result<ParsedMessage, ProtocolError> {
    let algorithm = local.algorithm();
    let key = algorithm.derive_key(remote, local)?;
    let plaintext = algorithm.decrypt(ciphertext, &key)?;

    let signature_len = algorithm.signature_len();
    if plaintext.len() < signature_len + TIMESTAMP_LEN + UID_LEN {
        return Err(ProtocolError::Integrity(format!(
            "authenticated payload of {} bytes is too short",
            plaintext.len()
        )));
    }
    let (signature, rest) = plaintext.split_at(signature_len);
    let (timestamp, body) = rest.split_at(TIMESTAMP_LEN);

    algorithm
        .verify(signature, body, remote)
        .map_err(|_| ProtocolError::SignatureMismatch)?;

    let (claimed_uid, parts) = body.split_at(UID_LEN);
    check_uid(claimed_uid, &sender_uid)?;
    let parts = part::decode_all(parts)?;
    let timestamp = read_timestamp(timestamp)?;

    tracing::debug!(
        sender = %remote.signing_public_hex(),
        ?message_type,
        parts = parts.len(),
        timestamp,
        "envelope parsed"
    );

    Ok(ParsedMessage {
        sender_uid,
        message_type,
        timestamp,
        parts,
    })
}

fn open_key_exchange(
    ciphertext: &[u8],
    key: &SessionKey,
    algorithm: Algorithm,
    sender_uid: String,
) -> Result<ParsedMessage, ProtocolError> {
    let plaintext = algorithm.decrypt(ciphertext, key)?;
    if plaintext.len() < TIMESTAMP_LEN + UID_LEN {
        return Err(ProtocolError::Integrity(format!(
            "key exchange payload of {} bytes is too short",
            plaintext.len()
        )));
    }
    let (timestamp, rest) = plaintext.split_at(TIMESTAMP_LEN);
    let (claimed_uid, parts) = rest.split_at(UID_LEN);
    check_uid(claimed_uid, &sender_uid)?;

    let parts = part::decode_all(parts)?;
    if parts.len() != 1 || parts[0].kind != ContentKind::None {
        return Err(ProtocolError::Framing(
            "key exchange must carry exactly one control part".into(),
        ));
    }
    let timestamp = read_timestamp(timestamp)?;

    tracing::debug!(sender_uid = %sender_uid, timestamp, "key exchange parsed");

    Ok(ParsedMessage {
        sender_uid,
        message_type: MessageType::KeyExchange,
        timestamp,
        parts,
    })
}

fn take<'a>(data: &'a [u8], len: usize, what: &str) -> Result<(&'a [u8], &'a [u8]), ProtocolError> {
    if data.len() < len {
        return Err(ProtocolError::Framing(format!(
            "payload too short for {what}: {} of {len} bytes",
            data.len()
        )));
    }
    Ok(data.split_at(len))
}

fn decode_uid(bytes: &[u8]) -> Result<String, ProtocolError> {
    if bytes.len() != UID_LEN || !bytes.is_ascii() {
        return Err(ProtocolError::Integrity(format!(
            "sender uid must be {UID_LEN} ASCII bytes"
        )));
    }
    String::from_utf8(bytes.to_vec())
        .map_err(|_| ProtocolError::Integrity("sender uid is not UTF-8".into()))
}

fn check_uid(claimed: &[u8], sender_uid: &str) -> Result<(), ProtocolError> {
    if claimed != sender_uid.as_bytes() {
        return Err(ProtocolError::Integrity(
            "sender uid inside the payload does not match the routing block".into(),
        ));
    }
    Ok(())
}

fn read_timestamp(bytes: &[u8]) -> Result<u64, ProtocolError> {
    let bytes: [u8; TIMESTAMP_LEN] = bytes
        .try_into()
        .map_err(|_| ProtocolError::Framing("timestamp must be 8 bytes".into()))?;
    Ok(u64::from_be_bytes(bytes))
}
