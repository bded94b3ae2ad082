//! Discord markup to plain text translation.
//!
//! Converts raw message content (user/role/channel mention tokens,
//! custom emotes) into text an IRC client can display. Lookups go
//! through the injected [`GuildState`] and [`IdentityMap`] seams; the
//! translator itself performs no I/O.

use fancy_regex::{Captures, Regex};
use serenity::model::id::{ChannelId, RoleId, UserId};
use serenity::model::user::User;
use tracing::debug;

use crate::common::{DiscordUser, LookupError};
use crate::discord::state::{ChannelKind, GuildState};
use crate::irc::IdentityMap;

/// Placeholder emitted for a channel mention whose channel is gone.
pub const DELETED_CHANNEL: &str = "#deleted-channel";
/// Placeholder emitted for a role mention whose role is gone.
pub const DELETED_ROLE: &str = "@deleted-role";

/// A user mentioned in a message, as carried by the message itself.
#[derive(Debug, Clone)]
pub struct Mention {
    pub id: UserId,
    pub username: String,
    pub discriminator: Option<u16>,
    pub bot: bool,
}

impl From<&User> for Mention {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.name.clone(),
            discriminator: user.discriminator.map(|d| d.get()),
            bot: user.bot,
        }
    }
}

/// Markup translator with its compiled patterns.
#[derive(Debug)]
pub struct Translator {
    /// Pattern for Discord channel mentions (<#123>).
    channel_pattern: Regex,
    /// Pattern for Discord role mentions (<@&123>).
    role_pattern: Regex,
    /// Pattern for custom emotes (<:name:id> or <a:name:id>).
    emote_pattern: Regex,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self {
            channel_pattern: Regex::new(r"<#(\d+)>").unwrap(),
            role_pattern: Regex::new(r"<@&(\d+)>").unwrap(),
            emote_pattern: Regex::new(r"<a?(:\w+:)\d+>").unwrap(),
        }
    }

    /// Translate raw Discord content to IRC-ready plain text.
    ///
    /// Pass order matters: user mentions first, then the mentionable
    /// role shorthand, then channel and role tokens, then line-ending
    /// normalization, emotes last. Later passes can re-match text the
    /// earlier ones exposed, never the other way round, which also
    /// makes the whole translation idempotent on its own output.
    ///
    /// A channel or role token that fails to resolve for any reason
    /// other than confirmed deletion aborts this translation; wrong
    /// text must not be relayed silently.
    pub fn translate(
        &self,
        raw: &str,
        mentions: &[Mention],
        mention_roles: &[RoleId],
        state: &dyn GuildState,
        identities: &dyn IdentityMap,
    ) -> Result<String, LookupError> {
        let mut content = raw.to_string();

        for user in mentions {
            let nick = self.resolve_mention_nick(user, state, identities);
            content = content
                .replace(&format!("<@{}>", user.id), &nick)
                .replace(&format!("<@!{}>", user.id), &nick);
        }

        for role_id in mention_roles {
            // Unresolvable or non-mentionable roles stay untouched.
            if let Ok(role) = state.role(*role_id) {
                if role.mentionable {
                    content =
                        content.replace(&format!("<&{}>", role_id), &format!("@{}", role.name));
                }
            }
        }

        content = self.replace_channel_tokens(&content, state)?;
        content = self.replace_role_tokens(&content, state)?;

        // Break down malformed newlines so single-line IRC consumers
        // never see a bare carriage return.
        content = content.replace("\r\n", "\n").replace('\r', "\n");

        Ok(self.emote_pattern.replace_all(&content, "$1").to_string())
    }

    /// Pick the IRC-side display name for a mentioned user.
    ///
    /// An existing IRC connection wins; otherwise a nick is derived
    /// from the member's guild nickname when the cache has it, falling
    /// back to the raw username.
    fn resolve_mention_nick(
        &self,
        user: &Mention,
        state: &dyn GuildState,
        identities: &dyn IdentityMap,
    ) -> String {
        if let Some(nick) = identities.connected_nick(user.id) {
            debug!(
                "Converted mention of {} ({}) using existing IRC connection: {}",
                user.username, user.id, nick
            );
            return nick;
        }

        let display = state
            .member(user.id)
            .map(|member| member.effective_nick().to_string())
            .unwrap_or_else(|_| user.username.clone());

        let nick = identities.derive_nick(&DiscordUser {
            id: user.id,
            username: user.username.clone(),
            discriminator: user.discriminator,
            nick: display,
            bot: user.bot,
            online: false,
        });
        debug!(
            "No IRC connection for mentioned user {} ({}), derived nick {}",
            user.username, user.id, nick
        );
        nick
    }

    fn replace_channel_tokens(
        &self,
        content: &str,
        state: &dyn GuildState,
    ) -> Result<String, LookupError> {
        let mut failure: Option<LookupError> = None;

        let replaced = self
            .channel_pattern
            .replace_all(content, |caps: &Captures| -> String {
                let token = caps[0].to_string();
                let id = match caps[1].parse::<u64>() {
                    Ok(id) if id != 0 => ChannelId::new(id),
                    _ => return token,
                };

                match state.channel(id) {
                    // Voice channels are not bridged; keep the raw token.
                    Ok(channel) if channel.kind == ChannelKind::Voice => token,
                    Ok(channel) => format!("#{}", channel.name),
                    Err(LookupError::Deleted) => DELETED_CHANNEL.to_string(),
                    Err(error) => {
                        failure.get_or_insert(error);
                        token
                    }
                }
            })
            .to_string();

        match failure {
            Some(error) => Err(error),
            None => Ok(replaced),
        }
    }

    fn replace_role_tokens(
        &self,
        content: &str,
        state: &dyn GuildState,
    ) -> Result<String, LookupError> {
        let mut failure: Option<LookupError> = None;

        let replaced = self
            .role_pattern
            .replace_all(content, |caps: &Captures| -> String {
                let token = caps[0].to_string();
                let id = match caps[1].parse::<u64>() {
                    Ok(id) if id != 0 => RoleId::new(id),
                    _ => return token,
                };

                match state.role(id) {
                    Ok(role) => format!("@{}", role.name),
                    Err(LookupError::Deleted) => DELETED_ROLE.to_string(),
                    Err(error) => {
                        failure.get_or_insert(error);
                        token
                    }
                }
            })
            .to_string();

        match failure {
            Some(error) => Err(error),
            None => Ok(replaced),
        }
    }
}
