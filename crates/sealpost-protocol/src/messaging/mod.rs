pub mod batch;
pub mod content;
pub mod envelope;
pub mod part;
pub mod receiver;
pub mod sender;
