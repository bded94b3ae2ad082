//! Read-only view of live guild state.
//!
//! The membership/presence/role/channel cache is owned and mutated by
//! serenity's gateway layer; this module narrows it to the handful of
//! lookups the bridge core performs, with miss classification the
//! callers can act on. The trait boundary keeps the translator,
//! reconciler and avatar lookup testable against a fake cache.

use serenity::cache::Cache;
use serenity::model::channel::ChannelType;
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::model::user::OnlineStatus;

use crate::common::LookupError;

/// Snapshot of one guild member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub id: UserId,
    pub username: String,
    pub discriminator: Option<u16>,
    pub nick: Option<String>,
    pub bot: bool,
    pub avatar_url: Option<String>,
}

impl MemberInfo {
    /// Display name: guild nickname when set, else username.
    pub fn effective_nick(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.username)
    }
}

impl From<&Member> for MemberInfo {
    fn from(member: &Member) -> Self {
        Self {
            id: member.user.id,
            username: member.user.name.clone(),
            discriminator: member.user.discriminator.map(|d| d.get()),
            nick: member.nick.clone(),
            bot: member.user.bot,
            avatar_url: member.user.avatar_url(),
        }
    }
}

/// What kind of channel a channel mention points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
    Other,
}

/// Snapshot of one guild channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
}

/// Snapshot of one guild role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    pub id: RoleId,
    pub name: String,
    pub mentionable: bool,
}

/// A user's presence as tracked by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Online,
    Idle,
    DoNotDisturb,
    Offline,
}

impl PresenceStatus {
    pub fn is_offline(self) -> bool {
        matches!(self, PresenceStatus::Offline)
    }
}

impl From<OnlineStatus> for PresenceStatus {
    fn from(status: OnlineStatus) -> Self {
        match status {
            OnlineStatus::Online => PresenceStatus::Online,
            OnlineStatus::Idle => PresenceStatus::Idle,
            OnlineStatus::DoNotDisturb => PresenceStatus::DoNotDisturb,
            // Invisible users look offline to everyone else.
            _ => PresenceStatus::Offline,
        }
    }
}

/// Read-only lookups against the bridged guild's live state.
///
/// Every lookup may fail; translation and reconciliation must degrade
/// per the [`LookupError`] class, never abort the process.
pub trait GuildState {
    fn member(&self, id: UserId) -> Result<MemberInfo, LookupError>;
    fn presence(&self, id: UserId) -> Result<PresenceStatus, LookupError>;
    fn role(&self, id: RoleId) -> Result<RoleInfo, LookupError>;
    fn channel(&self, id: ChannelId) -> Result<ChannelInfo, LookupError>;
    fn members(&self) -> Result<Vec<MemberInfo>, LookupError>;
}

/// [`GuildState`] backed by the serenity cache for one guild.
///
/// Miss classification: the guild itself being absent means the
/// gateway has not caught up (`NotSynced`). A channel or role absent
/// from a cached guild is gone (`Deleted`); an absent member or
/// presence just has not been chunked or is offline (`NotSynced`).
pub struct CacheState<'a> {
    cache: &'a Cache,
    guild_id: GuildId,
}

impl<'a> CacheState<'a> {
    pub fn new(cache: &'a Cache, guild_id: GuildId) -> Self {
        Self { cache, guild_id }
    }
}

impl GuildState for CacheState<'_> {
    fn member(&self, id: UserId) -> Result<MemberInfo, LookupError> {
        let guild = self
            .cache
            .guild(self.guild_id)
            .ok_or(LookupError::NotSynced)?;
        guild
            .members
            .get(&id)
            .map(MemberInfo::from)
            .ok_or(LookupError::NotSynced)
    }

    fn presence(&self, id: UserId) -> Result<PresenceStatus, LookupError> {
        let guild = self
            .cache
            .guild(self.guild_id)
            .ok_or(LookupError::NotSynced)?;
        guild
            .presences
            .get(&id)
            .map(|p| PresenceStatus::from(p.status))
            .ok_or(LookupError::NotSynced)
    }

    fn role(&self, id: RoleId) -> Result<RoleInfo, LookupError> {
        let guild = self
            .cache
            .guild(self.guild_id)
            .ok_or(LookupError::NotSynced)?;
        guild
            .roles
            .get(&id)
            .map(|role| RoleInfo {
                id,
                name: role.name.clone(),
                mentionable: role.mentionable,
            })
            .ok_or(LookupError::Deleted)
    }

    fn channel(&self, id: ChannelId) -> Result<ChannelInfo, LookupError> {
        let guild = self
            .cache
            .guild(self.guild_id)
            .ok_or(LookupError::NotSynced)?;
        guild
            .channels
            .get(&id)
            .map(|channel| ChannelInfo {
                id,
                name: channel.name.clone(),
                kind: match channel.kind {
                    ChannelType::Voice => ChannelKind::Voice,
                    ChannelType::Text => ChannelKind::Text,
                    _ => ChannelKind::Other,
                },
            })
            .ok_or(LookupError::Deleted)
    }

    fn members(&self) -> Result<Vec<MemberInfo>, LookupError> {
        let guild = self
            .cache
            .guild(self.guild_id)
            .ok_or(LookupError::NotSynced)?;
        Ok(guild.members.values().map(MemberInfo::from).collect())
    }
}
