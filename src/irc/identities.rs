//! Identity mapping between Discord users and IRC nicks.
//!
//! The IRC connection pool lives outside this half of the bridge; the
//! translator only needs the two read-only queries captured by
//! [`IdentityMap`]. `NickRegistry` is the in-process implementation
//! the connection manager keeps up to date.

use std::collections::HashMap;
use std::sync::RwLock;

use serenity::model::id::UserId;

use crate::common::DiscordUser;
use crate::irc::nick::sanitize_nick;

/// Default suffix appended to derived nicks so Discord users are
/// distinguishable from native IRC users.
pub const DEFAULT_NICK_SUFFIX: &str = "~d";

/// Read-only identity queries the translator needs from the IRC side.
pub trait IdentityMap: Send + Sync {
    /// Nick of an already-connected IRC identity for this Discord
    /// user, if one exists.
    fn connected_nick(&self, id: UserId) -> Option<String>;

    /// Derive a nickname for a user with no IRC connection yet.
    fn derive_nick(&self, user: &DiscordUser) -> String;
}

/// In-process identity registry.
///
/// The connection manager registers a nick when it opens a connection
/// for a user and unregisters it when the connection drops; collision
/// handling against the IRC server is the manager's problem, not ours.
pub struct NickRegistry {
    nicks: RwLock<HashMap<UserId, String>>,
    suffix: String,
}

impl NickRegistry {
    pub fn new(suffix: Option<String>) -> Self {
        Self {
            nicks: RwLock::new(HashMap::new()),
            suffix: suffix.unwrap_or_else(|| DEFAULT_NICK_SUFFIX.to_string()),
        }
    }

    /// Record the nick in use for a connected user.
    #[allow(dead_code)]
    pub fn register(&self, id: UserId, nick: String) {
        if let Ok(mut nicks) = self.nicks.write() {
            nicks.insert(id, nick);
        }
    }

    /// Forget a user's nick when its connection drops.
    #[allow(dead_code)]
    pub fn unregister(&self, id: UserId) {
        if let Ok(mut nicks) = self.nicks.write() {
            nicks.remove(&id);
        }
    }
}

impl IdentityMap for NickRegistry {
    fn connected_nick(&self, id: UserId) -> Option<String> {
        self.nicks.read().ok()?.get(&id).cloned()
    }

    fn derive_nick(&self, user: &DiscordUser) -> String {
        let base = if user.nick.is_empty() {
            &user.username
        } else {
            &user.nick
        };

        let mut nick = sanitize_nick(base);
        if nick.is_empty() {
            // Nothing survived sanitization; fall back to the id.
            nick = format!("discord{}", user.id.get());
        }

        nick.push_str(&self.suffix);
        nick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, username: &str, nick: &str) -> DiscordUser {
        DiscordUser {
            id: UserId::new(id),
            username: username.to_string(),
            discriminator: None,
            nick: nick.to_string(),
            bot: false,
            online: true,
        }
    }

    #[test]
    fn test_connected_nick_round_trip() {
        let registry = NickRegistry::new(None);
        assert_eq!(registry.connected_nick(UserId::new(1)), None);

        registry.register(UserId::new(1), "alice".to_string());
        assert_eq!(
            registry.connected_nick(UserId::new(1)),
            Some("alice".to_string())
        );

        registry.unregister(UserId::new(1));
        assert_eq!(registry.connected_nick(UserId::new(1)), None);
    }

    #[test]
    fn test_derive_prefers_nick_over_username() {
        let registry = NickRegistry::new(None);
        assert_eq!(registry.derive_nick(&user(1, "alice", "Ally")), "Ally~d");
        assert_eq!(registry.derive_nick(&user(1, "alice", "")), "alice~d");
    }

    #[test]
    fn test_derive_sanitizes_and_applies_suffix() {
        let registry = NickRegistry::new(Some("|irc".to_string()));
        assert_eq!(
            registry.derive_nick(&user(1, "bob", "Bob the Builder")),
            "BobtheBuilder|irc"
        );
    }

    #[test]
    fn test_derive_falls_back_to_id_when_nothing_survives() {
        let registry = NickRegistry::new(None);
        assert_eq!(registry.derive_nick(&user(42, "😀😀", "")), "discord42~d");
    }
}
