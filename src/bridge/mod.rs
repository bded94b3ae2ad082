//! Bridge coordination between the Discord side and the IRC side.
//!
//! ## Module Structure
//!
//! - `channels`: handoff queue structures
//! - `state`: shared relay identity state

pub mod channels;
pub mod state;

pub use channels::{ChannelBundle, DiscordSideChannels};
pub use state::RelayIdentity;
