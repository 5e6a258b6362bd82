use crate::bulk::BulkPublicKey;
use crate::identity::{DeviceClient, PublicKeys};
use crate::signing::{self, KEY_LEN};
use crate::suite::Algorithm;
use crate::CryptoError;

/// Key storage backend.
///
/// The host application implements this on top of its secure store; this
/// crate only decides what gets stored under which name.
pub trait Keychain: Send + Sync {
    /// Store a key under a vault/key pair.
    fn store_key(&self, vault: &str, key: &str, data: &[u8]) -> Result<(), CryptoError>;

    /// Retrieve a key from a vault/key pair.
    fn load_key(&self, vault: &str, key: &str) -> Result<Option<Vec<u8>>, CryptoError>;

    /// Delete a key from a vault/key pair.
    fn delete_key(&self, vault: &str, key: &str) -> Result<(), CryptoError>;

    /// Check if a key exists.
    fn key_exists(&self, vault: &str, key: &str) -> Result<bool, CryptoError>;
}

/// The six key fields of an identity, as named in storage and directories.
///
/// The local device persists only its two private fields. Peers are stored as
/// their three public fields. `PrivateX25519` is never written: it is derived
/// from the Ed25519 seed, and [`DeviceClient::save`] clears any stored copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    PublicEd25519,
    PrivateEd25519,
    PublicX25519,
    PrivateX25519,
    PublicRsa,
    PrivateRsa,
}

impl KeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyType::PublicEd25519 => "ed25519_public",
            KeyType::PrivateEd25519 => "ed25519_private",
            KeyType::PublicX25519 => "x25519_public",
            KeyType::PrivateX25519 => "x25519_private",
            KeyType::PublicRsa => "rsa_public",
            KeyType::PrivateRsa => "rsa_private",
        }
    }
}

// Vault and key constants.

/// Vault for the local device identity.
pub const VAULT_IDENTITY: &str = "identity";
/// Profile uid of the local device.
pub const KEY_PROFILE_UID: &str = "profile_uid";
/// Suite name of the local device.
pub const KEY_ALGORITHM: &str = "algorithm";

/// Vault for peers' public keys.
pub const VAULT_PEERS: &str = "peers";

/// Storage key name for one of a peer's public key fields.
pub fn peer_key_name(profile_uid: &str, key: KeyType) -> String {
    format!("{}_{profile_uid}", key.as_str())
}

impl DeviceClient {
    /// Persist the local device identity.
    ///
    /// Only the Ed25519 seed and the RSA private key are stored; everything else
    /// is re-derived by [`DeviceClient::load`].
    pub fn save(&self, keychain: &dyn Keychain) -> Result<(), CryptoError> {
        store_device_client(keychain, self)
    }

    /// Load the local device identity, or `None` if none was stored yet.
    pub fn load(keychain: &dyn Keychain) -> Result<Option<Self>, CryptoError> {
        load_device_client(keychain)
    }
}

fn store_device_client(keychain: &dyn Keychain, client: &DeviceClient) -> Result<(), CryptoError> {
    let secrets = client.secret_keys()?;
    keychain.store_key(VAULT_IDENTITY, KEY_PROFILE_UID, client.uid_bytes())?;
    keychain.store_key(
        VAULT_IDENTITY,
        KEY_ALGORITHM,
        client.algorithm().to_string().as_bytes(),
    )?;
    keychain.store_key(
        VAULT_IDENTITY,
        KeyType::PrivateEd25519.as_str(),
        secrets.signing.as_bytes(),
    )?;
    keychain.store_key(
        VAULT_IDENTITY,
        KeyType::PrivateRsa.as_str(),
        &secrets.bulk.to_der()?,
    )?;
    if keychain.key_exists(VAULT_IDENTITY, KeyType::PrivateX25519.as_str())? {
        keychain.delete_key(VAULT_IDENTITY, KeyType::PrivateX25519.as_str())?;
    }
    tracing::debug!(uid = client.profile_uid(), "device identity stored");
    Ok(())
}

fn load_device_client(keychain: &dyn Keychain) -> Result<Option<DeviceClient>, CryptoError> {
    let Some(uid) = keychain.load_key(VAULT_IDENTITY, KEY_PROFILE_UID)? else {
        return Ok(None);
    };
    let uid = String::from_utf8(uid)
        .map_err(|_| CryptoError::StorageError("stored profile uid is not UTF-8".into()))?;

    let algorithm = match keychain.load_key(VAULT_IDENTITY, KEY_ALGORITHM)? {
        Some(name) => std::str::from_utf8(&name)
            .ok()
            .and_then(Algorithm::from_name)
            .ok_or_else(|| CryptoError::StorageError("unknown stored algorithm".into()))?,
        None => Algorithm::default(),
    };

    let signing = require(keychain, KeyType::PrivateEd25519)?;
    let signing: [u8; KEY_LEN] = signing
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::StorageError("stored Ed25519 key has wrong length".into()))?;
    let bulk = require(keychain, KeyType::PrivateRsa)?;

    DeviceClient::from_secrets(uid, algorithm, &signing, &bulk).map(Some)
}

fn require(keychain: &dyn Keychain, key: KeyType) -> Result<Vec<u8>, CryptoError> {
    keychain
        .load_key(VAULT_IDENTITY, key.as_str())?
        .ok_or_else(|| CryptoError::StorageError(format!("missing {}", key.as_str())))
}

/// Persist a peer's public keys, one entry per field.
pub fn save_peer(keychain: &dyn Keychain, peer: &DeviceClient) -> Result<(), CryptoError> {
    let uid = peer.profile_uid();
    let keys = peer.public_keys();
    keychain.store_key(
        VAULT_PEERS,
        &peer_key_name(uid, KeyType::PublicEd25519),
        keys.signing.as_bytes(),
    )?;
    keychain.store_key(
        VAULT_PEERS,
        &peer_key_name(uid, KeyType::PublicX25519),
        keys.exchange.as_bytes(),
    )?;
    keychain.store_key(
        VAULT_PEERS,
        &peer_key_name(uid, KeyType::PublicRsa),
        &keys.bulk.to_der()?,
    )?;
    tracing::debug!(uid, "peer keys stored");
    Ok(())
}

/// Load a peer as a public-only client, or `None` if it was never saved.
pub fn load_peer(
    keychain: &dyn Keychain,
    profile_uid: &str,
    algorithm: Algorithm,
) -> Result<Option<DeviceClient>, CryptoError> {
    let Some(signing_key) =
        keychain.load_key(VAULT_PEERS, &peer_key_name(profile_uid, KeyType::PublicEd25519))?
    else {
        return Ok(None);
    };
    let exchange = require_peer(keychain, profile_uid, KeyType::PublicX25519)?;
    let bulk = require_peer(keychain, profile_uid, KeyType::PublicRsa)?;

    let keys = PublicKeys {
        signing: signing::signing_public_from_bytes(&signing_key)?,
        exchange: signing::exchange_public_from_bytes(&exchange)?,
        bulk: BulkPublicKey::from_der(&bulk)?,
    };
    DeviceClient::remote(profile_uid, algorithm, keys).map(Some)
}

fn require_peer(
    keychain: &dyn Keychain,
    profile_uid: &str,
    key: KeyType,
) -> Result<Vec<u8>, CryptoError> {
    keychain
        .load_key(VAULT_PEERS, &peer_key_name(profile_uid, key))?
        .ok_or_else(|| {
            CryptoError::StorageError(format!("peer {profile_uid} is missing {}", key.as_str()))
        })
}
