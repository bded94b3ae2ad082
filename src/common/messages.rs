//! Canonical message types for bridge communication.
//!
//! This module defines the single source of truth for the items that
//! flow out of the Discord side: normalized chat messages for the IRC
//! relay manager and user facts for the identity-mapping subsystem.

use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};

/// A Discord message normalized for relay to IRC.
///
/// Immutable once built. One extra message is emitted per attachment,
/// carrying the attachment URL as its entire content and inheriting
/// the action and PM-target flags of the parent.
#[derive(Debug, Clone)]
#[allow(dead_code)] // consumed field-by-field on the IRC side
pub struct DiscordMessage {
    /// Source message id. `None` for reaction-derived relay items,
    /// which have no message of their own.
    pub id: Option<MessageId>,
    /// Channel the message arrived on.
    pub channel_id: ChannelId,
    /// Guild, if any. `None` marks a direct (one-to-one) channel.
    pub guild_id: Option<GuildId>,
    /// Author's Discord id, used by the IRC side to pick a connection.
    pub author_id: UserId,
    /// Author's plain username.
    pub author_name: String,
    /// Translated, classification-framed content.
    pub content: String,
    /// Third-person narration ("* nick does something" on IRC).
    pub is_action: bool,
    /// The source event was an edit of an earlier message.
    pub is_edit: bool,
    /// Target nick when the message is a private message to one IRC
    /// user; `None` relays to the bridged channel.
    pub pm_target: Option<String>,
    /// Attachment URLs carried by the source message.
    pub attachment_urls: Vec<String>,
}

/// The bridge's belief about one Discord user at a point in time.
///
/// Produced by the presence reconciler; the next fact for the same id
/// supersedes this one (last write wins at the consumer). An
/// offline-only fact carries just the id and `online = false`; the
/// consumer treats empty name fields as "unchanged".
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)] // consumed field-by-field on the IRC side
pub struct DiscordUser {
    pub id: UserId,
    pub username: String,
    /// Legacy discriminator tag, absent on migrated accounts.
    pub discriminator: Option<u16>,
    /// Effective display name: guild nickname, else username.
    pub nick: String,
    pub bot: bool,
    pub online: bool,
}

impl DiscordUser {
    /// Minimal fact marking a user offline without touching its names.
    pub fn offline(id: UserId) -> Self {
        Self {
            id,
            username: String::new(),
            discriminator: None,
            nick: String::new(),
            bot: false,
            online: false,
        }
    }
}
