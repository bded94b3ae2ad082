//! Interface to the IRC half of the bridge.
//!
//! The connection pool, nick collision handling and actual IRC traffic
//! live outside this crate half; what remains here is the nickname
//! alphabet and the identity queries the Discord side depends on.

pub mod identities;
pub mod nick;

pub use identities::{IdentityMap, NickRegistry};
pub use nick::is_nick_char;
