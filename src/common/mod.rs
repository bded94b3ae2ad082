//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;

pub use error::LookupError;
pub use messages::{DiscordMessage, DiscordUser};
