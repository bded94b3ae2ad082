//! Configuration type definitions.

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    pub irc: Option<IrcConfig>,
    /// Skip membership/presence tracking; messages only.
    pub simple_mode: Option<bool>,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    /// The one guild this bridge relays.
    pub guild_id: u64,
}

/// IRC-side settings that the Discord half needs.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    /// Suffix appended to nicks derived for Discord users.
    pub nick_suffix: Option<String>,
}

impl Config {
    pub fn simple_mode(&self) -> bool {
        self.simple_mode.unwrap_or(false)
    }

    pub fn nick_suffix(&self) -> Option<String> {
        self.irc.as_ref().and_then(|irc| irc.nick_suffix.clone())
    }
}
