pub mod bulk;
pub mod error;
pub mod identity;
pub mod keychain;
pub mod session;
pub mod signing;
pub mod suite;

pub use bulk::{BulkPrivateKey, BulkPublicKey};
pub use error::CryptoError;
pub use identity::{DeviceClient, PublicKeys, SecretKeys, UID_LEN};
pub use keychain::Keychain;
pub use session::SessionKey;
pub use suite::{Algorithm, Ed25519Suite, SymmetricSuite};
