pub mod config;
pub mod error;
pub mod messaging;
pub mod profile;
pub mod relay;

pub use config::EnvelopeConfig;
pub use error::ProtocolError;
pub use messaging::envelope::{Envelope, MessageType, ParsedMessage};
pub use messaging::part::{ContentKind, MessagePart};
pub use messaging::receiver::IdentityResolver;
pub use profile::SharedProfile;
pub use relay::AuthRequest;
