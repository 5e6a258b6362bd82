use ed25519_dalek::{SigningKey, VerifyingKey};
use x25519_dalek::{PublicKey as ExchangePublicKey, StaticSecret};

use crate::bulk::{generate_bulk_keypair, BulkPrivateKey, BulkPublicKey, BULK_KEY_BITS};
use crate::error::CryptoError;
use crate::signing::{
    derive_exchange_public, derive_exchange_secret, exchange_public_from_bytes,
    generate_signing_keypair, signing_public_from_bytes, KEY_LEN,
};
use crate::suite::Algorithm;

/// Encoded length of a profile uid (a hyphenated UUID string).
pub const UID_LEN: usize = 36;

/// The three public keys a peer publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeys {
    pub signing: VerifyingKey,
    pub exchange: ExchangePublicKey,
    pub bulk: BulkPublicKey,
}

/// Private counterparts of [`PublicKeys`]. Present on the local device only.
///
/// Each key type zeroizes itself on drop.
#[derive(Clone)]
pub struct SecretKeys {
    pub signing: SigningKey,
    pub exchange: StaticSecret,
    pub bulk: BulkPrivateKey,
}

/// One party's key material plus its profile uid.
///
/// Either **full** (the local device: public and private keys) or
/// **public-only** (a remote peer). There is no in-between state: private keys
/// are all present or all absent, and operations that need one on a
/// public-only client fail with [`CryptoError::IdentityState`].
#[derive(Clone)]
pub struct DeviceClient {
    profile_uid: String,
    algorithm: Algorithm,
    public: PublicKeys,
    secret: Option<SecretKeys>,
}

impl DeviceClient {
    /// Generate a full identity for `profile_uid` with the default suite.
    pub fn generate(profile_uid: impl Into<String>) -> Result<Self, CryptoError> {
        Self::generate_with(profile_uid, Algorithm::default(), BULK_KEY_BITS)
    }

    /// Generate a full identity under a freshly allocated random uid.
    pub fn generate_new_profile() -> Result<Self, CryptoError> {
        Self::generate(uuid::Uuid::new_v4().hyphenated().to_string())
    }

    /// Generate a full identity with an explicit suite and RSA modulus size.
    pub fn generate_with(
        profile_uid: impl Into<String>,
        algorithm: Algorithm,
        bulk_key_bits: usize,
    ) -> Result<Self, CryptoError> {
        let profile_uid = validate_uid(profile_uid.into())?;
        let signing = generate_signing_keypair();
        let (bulk_public, bulk) = generate_bulk_keypair(bulk_key_bits)?;
        let client = Self::assemble(profile_uid, algorithm, signing, bulk_public, bulk);
        tracing::debug!(
            uid = %client.profile_uid,
            signing_key = %client.signing_public_hex(),
            "device identity generated"
        );
        Ok(client)
    }

    /// Restore a full identity from its persisted secrets.
    ///
    /// The exchange keypair is re-derived from the signing key and the bulk
    /// public key from the private one, so only two secrets are stored.
    pub fn from_secrets(
        profile_uid: impl Into<String>,
        algorithm: Algorithm,
        signing_secret: &[u8; KEY_LEN],
        bulk_private_der: &[u8],
    ) -> Result<Self, CryptoError> {
        let profile_uid = validate_uid(profile_uid.into())?;
        let signing = SigningKey::from_bytes(signing_secret);
        let bulk = BulkPrivateKey::from_der(bulk_private_der)?;
        let bulk_public = bulk.public_key();
        Ok(Self::assemble(profile_uid, algorithm, signing, bulk_public, bulk))
    }

    /// Materialize a public-only view of a remote peer.
    pub fn remote(
        profile_uid: impl Into<String>,
        algorithm: Algorithm,
        public: PublicKeys,
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            profile_uid: validate_uid(profile_uid.into())?,
            algorithm,
            public,
            secret: None,
        })
    }

    fn assemble(
        profile_uid: String,
        algorithm: Algorithm,
        signing: SigningKey,
        bulk_public: BulkPublicKey,
        bulk: BulkPrivateKey,
    ) -> Self {
        let exchange = derive_exchange_secret(&signing);
        let public = PublicKeys {
            signing: signing.verifying_key(),
            exchange: derive_exchange_public(&exchange),
            bulk: bulk_public,
        };
        Self {
            profile_uid,
            algorithm,
            public,
            secret: Some(SecretKeys {
                signing,
                exchange,
                bulk,
            }),
        }
    }

    /// The public-only view of this identity, as a peer would hold it.
    pub fn public_view(&self) -> Self {
        Self {
            profile_uid: self.profile_uid.clone(),
            algorithm: self.algorithm,
            public: self.public.clone(),
            secret: None,
        }
    }

    pub fn profile_uid(&self) -> &str {
        &self.profile_uid
    }

    /// The uid as it appears on the wire (always [`UID_LEN`] ASCII bytes).
    pub fn uid_bytes(&self) -> &[u8] {
        self.profile_uid.as_bytes()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn public_keys(&self) -> &PublicKeys {
        &self.public
    }

    pub fn signing_public_bytes(&self) -> [u8; KEY_LEN] {
        self.public.signing.to_bytes()
    }

    /// Hex of the signing public key (for logs and display).
    pub fn signing_public_hex(&self) -> String {
        hex::encode(self.signing_public_bytes())
    }

    pub fn is_full(&self) -> bool {
        self.secret.is_some()
    }

    /// Private keys, or `IdentityState` for a public-only client.
    pub fn secret_keys(&self) -> Result<&SecretKeys, CryptoError> {
        self.secret
            .as_ref()
            .ok_or_else(|| CryptoError::IdentityState(self.profile_uid.clone()))
    }
}

impl std::fmt::Debug for DeviceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("profile_uid", &self.profile_uid)
            .field("algorithm", &self.algorithm)
            .field("signing_key", &self.signing_public_hex())
            .field("full", &self.is_full())
            .finish()
    }
}

fn validate_uid(uid: String) -> Result<String, CryptoError> {
    if uid.len() != UID_LEN || !uid.is_ascii() {
        return Err(CryptoError::InvalidKey(format!(
            "profile uid must be {UID_LEN} ASCII bytes, got {uid:?}"
        )));
    }
    Ok(uid)
}

impl PublicKeys {
    /// Length-prefixed encoding: `u32 len | signing | u32 len | exchange | u32 len | bulk (SPKI DER)`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        let bulk = self.bulk.to_der()?;
        let mut out = Vec::with_capacity(12 + 2 * KEY_LEN + bulk.len());
        for field in [
            self.signing.as_bytes().as_slice(),
            self.exchange.as_bytes().as_slice(),
            bulk.as_slice(),
        ] {
            let len = u32::try_from(field.len())
                .map_err(|_| CryptoError::InvalidKey("public key too large".into()))?;
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(field);
        }
        Ok(out)
    }

    /// Decode [`PublicKeys::to_bytes`] output, returning the keys and the bytes consumed.
    pub fn read_from(data: &[u8]) -> Result<(Self, usize), CryptoError> {
        let mut offset = 0;
        let signing = signing_public_from_bytes(read_field(data, &mut offset)?)?;
        let exchange = exchange_public_from_bytes(read_field(data, &mut offset)?)?;
        let bulk = BulkPublicKey::from_der(read_field(data, &mut offset)?)?;
        Ok((
            Self {
                signing,
                exchange,
                bulk,
            },
            offset,
        ))
    }
}

fn read_field<'a>(data: &'a [u8], offset: &mut usize) -> Result<&'a [u8], CryptoError> {
    let truncated = || CryptoError::InvalidKey("truncated public key encoding".into());
    let len_end = offset.checked_add(4).ok_or_else(truncated)?;
    let len_bytes: [u8; 4] = data
        .get(*offset..len_end)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(truncated)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let end = len_end.checked_add(len).ok_or_else(truncated)?;
    let field = data.get(len_end..end).ok_or_else(truncated)?;
    *offset = end;
    Ok(field)
}
