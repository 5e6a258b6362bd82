use sealpost_crypto::{DeviceClient, SymmetricSuite};

use crate::error::ProtocolError;
use crate::messaging::envelope::{Envelope, MessageType};
use crate::messaging::part::{self, ContentKind, MessagePart};

/// Seal a content message from `local` to `remote`.
pub fn build(
    local: &DeviceClient,
    remote: &DeviceClient,
    parts: &[MessagePart],
    now: u64,
) -> Result<Envelope, ProtocolError> {
    build_typed(local, remote, MessageType::Content, parts, now)
}

/// Seal a signed envelope of any type except [`MessageType::KeyExchange`].
///
/// Payload: `bulk(sender_uid) | bulk(u16 type) | aead(signature | timestamp | sender_uid | parts)`.
/// The signature covers `sender_uid | parts`; the timestamp is protected by
/// the AEAD tag only.
pub fn build_typed(
    local: &DeviceClient,
    remote: &DeviceClient,
    message_type: MessageType,
    parts: &[MessagePart],
    now: u64,
) -> Result<Envelope, ProtocolError> {
    if message_type == MessageType::KeyExchange {
        return Err(ProtocolError::Framing(
            "key exchange envelopes are built with build_key_exchange".into(),
        ));
    }
    let algorithm = local.algorithm();

    let mut body = local.uid_bytes().to_vec();
    body.extend_from_slice(&part::encode_all(parts)?);

    let signature = algorithm.sign(&body, local)?;
    let key = algorithm.derive_key(remote, local)?;

    let mut plaintext = Vec::with_capacity(signature.len() + 8 + body.len());
    plaintext.extend_from_slice(&signature);
    plaintext.extend_from_slice(&now.to_be_bytes());
    plaintext.extend_from_slice(&body);
    let ciphertext = algorithm.encrypt(&plaintext, &key)?;

    let mut payload = routing_blocks(local, remote, message_type)?;
    payload.extend_from_slice(&ciphertext);

    tracing::debug!(
        sender = %local.signing_public_hex(),
        recipient = %remote.signing_public_hex(),
        ?message_type,
        parts = parts.len(),
        payload_len = payload.len(),
        "envelope built"
    );

    Ok(Envelope {
        algorithm_code: algorithm.code(),
        recipient_signing_key: remote.signing_public_bytes().to_vec(),
        payload,
    })
}

/// Seal a key-exchange envelope carrying `exchange_payload` (an encoded shared
/// profile).
///
/// The recipient does not know the sender yet, so nothing is signed and the
/// session key travels bulk-wrapped:
/// `bulk(sender_uid) | bulk(u16 KeyExchange) | bulk(aes_key) | aead(timestamp | sender_uid | part)`.
pub fn build_key_exchange(
    local: &DeviceClient,
    remote: &DeviceClient,
    exchange_payload: &[u8],
    now: u64,
) -> Result<Envelope, ProtocolError> {
    let algorithm = local.algorithm();
    let key = algorithm.derive_key(remote, local)?;

    let mut plaintext = now.to_be_bytes().to_vec();
    plaintext.extend_from_slice(local.uid_bytes());
    MessagePart::new(ContentKind::None, exchange_payload).encode_into(&mut plaintext)?;
    let ciphertext = algorithm.encrypt(&plaintext, &key)?;

    let mut payload = routing_blocks(local, remote, MessageType::KeyExchange)?;
    payload.extend_from_slice(&remote.public_keys().bulk.encrypt(key.as_bytes())?);
    payload.extend_from_slice(&ciphertext);

    tracing::debug!(
        sender = %local.signing_public_hex(),
        recipient = %remote.signing_public_hex(),
        payload_len = payload.len(),
        "key exchange envelope built"
    );

    Ok(Envelope {
        algorithm_code: algorithm.code(),
        recipient_signing_key: remote.signing_public_bytes().to_vec(),
        payload,
    })
}

fn routing_blocks(
    local: &DeviceClient,
    remote: &DeviceClient,
    message_type: MessageType,
) -> Result<Vec<u8>, ProtocolError> {
    let bulk = &remote.public_keys().bulk;
    let mut blocks = bulk.encrypt(local.uid_bytes())?;
    blocks.extend_from_slice(&bulk.encrypt(&message_type.ordinal().to_be_bytes())?);
    Ok(blocks)
}
