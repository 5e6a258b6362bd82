use std::sync::OnceLock;

use sealpost_crypto::signing;
use sealpost_crypto::{Algorithm, CryptoError, DeviceClient, SessionKey, SymmetricSuite};

fn pair() -> &'static (DeviceClient, DeviceClient) {
    static PAIR: OnceLock<(DeviceClient, DeviceClient)> = OnceLock::new();
    PAIR.get_or_init(|| {
        (
            DeviceClient::generate("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa").unwrap(),
            DeviceClient::generate("bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb").unwrap(),
        )
    })
}

#[test]
fn shared_key_is_symmetric() {
    let (alice, bob) = pair();
    let suite = Algorithm::Ed25519;

    let ab = suite.derive_key(&bob.public_view(), alice).unwrap();
    let ba = suite.derive_key(&alice.public_view(), bob).unwrap();
    assert_eq!(ab.as_bytes(), ba.as_bytes());
}

#[test]
fn ciphertext_crosses_between_parties() {
    let (alice, bob) = pair();
    let suite = Algorithm::Ed25519;

    let sent = suite
        .encrypt(b"over the relay", &suite.derive_key(bob, alice).unwrap())
        .unwrap();
    let key = suite.derive_key(alice, bob).unwrap();
    assert_eq!(suite.decrypt(&sent, &key).unwrap(), b"over the relay");
}

#[test]
fn signature_verifies_only_for_signer() {
    let (alice, bob) = pair();
    let suite = Algorithm::Ed25519;

    let signature = suite.sign(b"body", alice).unwrap();
    assert_eq!(signature.len(), suite.signature_len());
    assert!(suite.verify(&signature, b"body", &alice.public_view()).is_ok());
    assert!(suite.verify(&signature, b"body", bob).is_err());
    assert!(suite.verify(&signature, b"other", alice).is_err());
}

#[test]
fn public_only_client_cannot_sign_or_derive() {
    let (alice, bob) = pair();
    let suite = Algorithm::Ed25519;
    let remote = alice.public_view();

    assert!(matches!(
        suite.sign(b"body", &remote),
        Err(CryptoError::IdentityState(_))
    ));
    assert!(matches!(
        suite.derive_key(bob, &remote),
        Err(CryptoError::IdentityState(_))
    ));
}

#[test]
fn wrapped_session_key_restores() {
    let (alice, bob) = pair();
    let key = Algorithm::Ed25519.derive_key(bob, alice).unwrap();

    let secrets = bob.secret_keys().unwrap();
    let block = bob.public_keys().bulk.encrypt(key.as_bytes()).unwrap();
    let restored = SessionKey::from_bytes(&secrets.bulk.decrypt(&block).unwrap()).unwrap();
    assert_eq!(restored.as_bytes(), key.as_bytes());
}

#[test]
fn agreement_is_symmetric_for_generated_keys() {
    let parties: Vec<_> = (0..8)
        .map(|_| {
            let secret = signing::derive_exchange_secret(&signing::generate_signing_keypair());
            let public = signing::derive_exchange_public(&secret);
            (secret, public)
        })
        .collect();

    for (i, (secret_a, public_a)) in parties.iter().enumerate() {
        for (secret_b, public_b) in &parties[i + 1..] {
            let ab = SessionKey::derive(public_b, secret_a).unwrap();
            let ba = SessionKey::derive(public_a, secret_b).unwrap();
            assert_eq!(ab.as_bytes(), ba.as_bytes());

            let ciphertext = ab.encrypt(b"either direction").unwrap();
            assert_eq!(ba.decrypt(&ciphertext).unwrap(), b"either direction");
        }
    }
}
