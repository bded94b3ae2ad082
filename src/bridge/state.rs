//! Shared bridge state.

use std::sync::RwLock;

use serenity::model::id::UserId;

/// The bridge's outbound relay identity.
///
/// Messages the bridge itself posts to Discord arrive through a
/// webhook with its own user id; every inbound message-class path
/// checks against it so relayed traffic is never relayed back. The id
/// is unknown until the external transmitter has been created, which
/// happens after the gateway session opens.
#[derive(Debug, Default)]
pub struct RelayIdentity {
    webhook_user: RwLock<Option<UserId>>,
}

impl RelayIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the transmitter's user id once it is known.
    #[allow(dead_code)] // called by the external webhook transmitter
    pub fn set(&self, id: UserId) {
        if let Ok(mut webhook_user) = self.webhook_user.write() {
            *webhook_user = Some(id);
        }
    }

    /// Whether `author` is the bridge's own relay identity.
    pub fn matches(&self, author: UserId) -> bool {
        self.webhook_user
            .read()
            .map(|webhook_user| *webhook_user == Some(author))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_identity_matches_nothing() {
        let relay = RelayIdentity::new();
        assert!(!relay.matches(UserId::new(1)));
    }

    #[test]
    fn test_set_identity_matches_only_itself() {
        let relay = RelayIdentity::new();
        relay.set(UserId::new(42));
        assert!(relay.matches(UserId::new(42)));
        assert!(!relay.matches(UserId::new(43)));
    }
}
