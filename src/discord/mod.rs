//! Discord side of the bridge.
//!
//! Event handling, markup translation, message classification,
//! presence reconciliation and avatar lookup for one Discord guild.

pub mod avatar;
pub mod classifier;
pub mod handler;
pub mod presence;
pub mod state;
pub mod translator;

pub use avatar::find_avatar;
pub use handler::BridgeHandler;
pub use translator::Translator;
