//! Discord event handling.
//!
//! Registers for upstream gateway events, filters self-originated and
//! echoed traffic, and forwards normalized messages and user facts to
//! the outbound queues. Each callback runs on its own task; nothing
//! here holds state across events beyond the injected seams.

use std::sync::Arc;

use serenity::async_trait;
use serenity::gateway::ChunkGuildFilter;
use serenity::model::channel::{Message, Reaction, ReactionType};
use serenity::model::event::{
    GuildMemberUpdateEvent, GuildMembersChunkEvent, MessageUpdateEvent, TypingStartEvent,
};
use serenity::model::gateway::{Presence, Ready};
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId};
use serenity::model::user::User;
use serenity::prelude::*;
use tracing::{debug, error, info, warn};

use crate::bridge::{DiscordSideChannels, RelayIdentity};
use crate::common::DiscordMessage;
use crate::discord::classifier::{classify, pm_target_from_content, truncate, PM_TARGET_HELP};
use crate::discord::presence::PresenceReconciler;
use crate::discord::state::{CacheState, MemberInfo, PresenceStatus};
use crate::discord::translator::{Mention, Translator};
use crate::irc::IdentityMap;

/// Maximum reacted-to message excerpt carried as reaction context.
const REACTION_CONTEXT_LEN: usize = 40;

/// The slice of a gateway message the relay path needs.
///
/// Message create events carry a full [`Message`]; update events only
/// carry one when the edited message happens to sit in the message
/// cache, which is empty under default cache settings. The update
/// event itself still supplies these fields, so edits are
/// reconstructed from it instead of being dropped.
struct InboundMessage {
    id: MessageId,
    channel_id: ChannelId,
    guild_id: Option<GuildId>,
    author: User,
    content: String,
    mentions: Vec<Mention>,
    mention_roles: Vec<RoleId>,
    attachment_urls: Vec<String>,
}

impl From<&Message> for InboundMessage {
    fn from(msg: &Message) -> Self {
        Self {
            id: msg.id,
            channel_id: msg.channel_id,
            guild_id: msg.guild_id,
            author: msg.author.clone(),
            content: msg.content.clone(),
            mentions: msg.mentions.iter().map(Mention::from).collect(),
            mention_roles: msg.mention_roles.clone(),
            attachment_urls: msg.attachments.iter().map(|a| a.url.clone()).collect(),
        }
    }
}

impl InboundMessage {
    /// Build the relayable view of an edit.
    ///
    /// Prefers the cached message when the gateway supplied one;
    /// otherwise falls back to the partial fields on the event. An
    /// edit whose event carries neither author nor content (embed
    /// resolution, pin changes) has nothing to relay.
    fn from_edit(new: Option<Message>, event: MessageUpdateEvent) -> Option<Self> {
        if let Some(msg) = &new {
            return Some(Self::from(msg));
        }

        let author = event.author?;
        let content = event.content?;
        Some(Self {
            id: event.id,
            channel_id: event.channel_id,
            guild_id: event.guild_id,
            author,
            content,
            mentions: event
                .mentions
                .unwrap_or_default()
                .iter()
                .map(Mention::from)
                .collect(),
            mention_roles: event.mention_roles.unwrap_or_default(),
            attachment_urls: event
                .attachments
                .unwrap_or_default()
                .iter()
                .map(|a| a.url.clone())
                .collect(),
        })
    }
}

/// Discord event handler for the bridge.
pub struct BridgeHandler {
    /// The one guild this bridge relays.
    guild_id: GuildId,
    /// Simple mode skips membership/presence tracking entirely.
    simple_mode: bool,
    translator: Translator,
    identities: Arc<dyn IdentityMap>,
    relay: Arc<RelayIdentity>,
    messages_tx: tokio::sync::mpsc::UnboundedSender<DiscordMessage>,
    reconciler: PresenceReconciler,
}

impl BridgeHandler {
    pub fn new(
        guild_id: GuildId,
        simple_mode: bool,
        identities: Arc<dyn IdentityMap>,
        relay: Arc<RelayIdentity>,
        channels: DiscordSideChannels,
    ) -> Self {
        Self {
            guild_id,
            simple_mode,
            translator: Translator::new(),
            identities,
            relay,
            reconciler: PresenceReconciler::new(channels.updates_tx, channels.removals_tx),
            messages_tx: channels.messages_tx,
        }
    }

    /// Shared guard for every message-class event (creates, updates,
    /// reactions): never relay our own session's messages, never relay
    /// messages our webhook transmitter sent.
    fn should_relay(&self, ctx: &Context, author: &User) -> bool {
        if author.id == ctx.cache.current_user().id {
            return false;
        }
        if self.relay.matches(author.id) {
            debug!("ignoring echo of relayed message from {}", author.id);
            return false;
        }
        true
    }

    async fn publish_message(&self, ctx: &Context, msg: &InboundMessage, was_edit: bool) {
        if !self.should_relay(ctx, &msg.author) {
            return;
        }

        if msg.content == "ping" {
            // Liveness check; the message still relays normally below.
            if let Err(error) = msg.channel_id.say(&ctx.http, "Pong!").await {
                warn!("Could not respond to Discord ping message: {}", error);
            }
        }

        let translated = {
            let state = CacheState::new(&ctx.cache, self.guild_id);
            self.translator.translate(
                &msg.content,
                &msg.mentions,
                &msg.mention_roles,
                &state,
                self.identities.as_ref(),
            )
        };
        let translated = match translated {
            Ok(text) => text,
            Err(error) => {
                error!(
                    "dropping message {}: mention resolution failed: {}",
                    msg.id, error
                );
                return;
            }
        };

        let classified = classify(&translated, &msg.content, was_edit);
        let mut content = classified.text;
        let mut pm_target = None;

        // A message without a guild arrived on a direct channel and is
        // a PM to one IRC user.
        if msg.guild_id.is_none() {
            match pm_target_from_content(&content) {
                Some((target, body)) => {
                    pm_target = Some(target);
                    content = body;
                }
                None => {
                    if let Err(error) = msg.channel_id.say(&ctx.http, PM_TARGET_HELP).await {
                        warn!("Could not send PM rejection reply: {}", error);
                    }
                    return;
                }
            }
        }

        let relayed = DiscordMessage {
            id: Some(msg.id),
            channel_id: msg.channel_id,
            guild_id: msg.guild_id,
            author_id: msg.author.id,
            author_name: msg.author.name.clone(),
            content,
            is_action: classified.is_action,
            is_edit: classified.is_edit,
            pm_target,
            attachment_urls: msg.attachment_urls.clone(),
        };

        if self.messages_tx.send(relayed.clone()).is_err() {
            warn!("IRC relay queue closed, dropping message");
            return;
        }

        // Each attachment becomes its own relay item, carrying the URL
        // as its entire body and inheriting the parent's flags.
        for url in msg.attachment_urls.clone() {
            let _ = self.messages_tx.send(DiscordMessage {
                content: url,
                attachment_urls: Vec::new(),
                ..relayed.clone()
            });
        }
    }

    async fn publish_reaction(&self, ctx: &Context, reaction: &Reaction) {
        let Some(user_id) = reaction.user_id else {
            return;
        };

        let user = match ctx.http.get_user(user_id).await {
            Ok(user) => user,
            Err(error) => {
                error!("could not fetch reacting user {}: {}", user_id, error);
                return;
            }
        };
        if !self.should_relay(ctx, &user) {
            return;
        }

        // Best-effort context from the reacted-to message; failure
        // only shrinks the relayed text.
        let mut reaction_target = String::new();
        match ctx
            .http
            .get_message(reaction.channel_id, reaction.message_id)
            .await
        {
            Ok(original) => {
                let translated = {
                    let state = CacheState::new(&ctx.cache, self.guild_id);
                    let mentions: Vec<Mention> =
                        original.mentions.iter().map(Mention::from).collect();
                    self.translator.translate(
                        &original.content,
                        &mentions,
                        &original.mention_roles,
                        &state,
                        self.identities.as_ref(),
                    )
                };
                if let Ok(text) = translated {
                    reaction_target = format!(
                        " to <{}> {}",
                        original.author.name,
                        truncate(REACTION_CONTEXT_LEN, &text)
                    );
                }
            }
            Err(error) => debug!("could not fetch reacted-to message: {}", error),
        }

        let emote = match &reaction.emoji {
            ReactionType::Unicode(name) => name.clone(),
            ReactionType::Custom { name, .. } => {
                format!(":{}:", name.clone().unwrap_or_default())
            }
            _ => return,
        };

        let _ = self.messages_tx.send(DiscordMessage {
            id: None,
            channel_id: reaction.channel_id,
            guild_id: reaction.guild_id,
            author_id: user.id,
            author_name: user.name.clone(),
            content: format!("reacted with {}{}", emote, reaction_target),
            is_action: true,
            is_edit: false,
            pm_target: None,
            attachment_urls: Vec::new(),
        });
    }
}

#[async_trait]
impl EventHandler for BridgeHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);

        if self.simple_mode {
            return;
        }
        // Ask the gateway for the full roster, presences included, so
        // the reconciler has something to work from.
        ctx.shard
            .chunk_guild(self.guild_id, None, true, ChunkGuildFilter::None, None);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        self.publish_message(&ctx, &InboundMessage::from(&msg), false)
            .await;
    }

    async fn message_update(
        &self,
        ctx: Context,
        _old: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let id = event.id;
        match InboundMessage::from_edit(new, event) {
            Some(msg) => self.publish_message(&ctx, &msg, true).await,
            None => debug!("edit of message {} carried no content, dropped", id),
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        self.publish_reaction(&ctx, &reaction).await;
    }

    async fn guild_members_chunk(&self, ctx: Context, chunk: GuildMembersChunkEvent) {
        if self.simple_mode || chunk.guild_id != self.guild_id {
            return;
        }
        debug!(
            "membership chunk {}/{} with {} members",
            chunk.chunk_index + 1,
            chunk.chunk_count,
            chunk.members.len()
        );

        let members: Vec<MemberInfo> = chunk.members.values().map(MemberInfo::from).collect();
        let state = CacheState::new(&ctx.cache, self.guild_id);
        self.reconciler.member_chunk(&state, &members);
    }

    async fn guild_member_update(
        &self,
        ctx: Context,
        _old: Option<Member>,
        new: Option<Member>,
        event: GuildMemberUpdateEvent,
    ) {
        if self.simple_mode || event.guild_id != self.guild_id {
            return;
        }

        let member = match &new {
            Some(member) => MemberInfo::from(member),
            None => MemberInfo {
                id: event.user.id,
                username: event.user.name.clone(),
                discriminator: event.user.discriminator.map(|d| d.get()),
                nick: event.nick.clone(),
                bot: event.user.bot,
                avatar_url: event.user.avatar_url(),
            },
        };

        let state = CacheState::new(&ctx.cache, self.guild_id);
        self.reconciler.member_update(&state, &member);
    }

    async fn guild_member_removal(
        &self,
        _ctx: Context,
        guild_id: GuildId,
        user: User,
        _member: Option<Member>,
    ) {
        if self.simple_mode || guild_id != self.guild_id {
            return;
        }
        self.reconciler.member_leave(user.id);
    }

    async fn presence_update(&self, ctx: Context, new_data: Presence) {
        if self.simple_mode {
            return;
        }
        if new_data.guild_id.is_some_and(|guild_id| guild_id != self.guild_id) {
            return;
        }

        let state = CacheState::new(&ctx.cache, self.guild_id);
        self.reconciler.presence_update(
            &state,
            new_data.user.id,
            PresenceStatus::from(new_data.status),
            false,
        );
    }

    async fn presence_replace(&self, ctx: Context, presences: Vec<Presence>) {
        if self.simple_mode {
            return;
        }

        let state = CacheState::new(&ctx.cache, self.guild_id);
        for presence in &presences {
            self.reconciler.presence_update(
                &state,
                presence.user.id,
                PresenceStatus::from(presence.status),
                false,
            );
        }
    }

    async fn typing_start(&self, ctx: Context, event: TypingStartEvent) {
        if self.simple_mode {
            return;
        }
        if event.guild_id.is_some_and(|guild_id| guild_id != self.guild_id) {
            return;
        }

        let state = CacheState::new(&ctx.cache, self.guild_id);
        self.reconciler.typing_start(&state, event.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Deserialize an update event the way the gateway dispatch does;
    /// MESSAGE_UPDATE payloads are partial and omit most fields.
    fn update_event(payload: serde_json::Value) -> MessageUpdateEvent {
        serde_json::from_value(payload).unwrap()
    }

    #[test]
    fn test_edit_without_cached_message_reconstructed_from_event() {
        // The message cache is empty by default, so `new` is `None`
        // for every edit; the event fields alone must carry it.
        let event = update_event(json!({
            "id": "100",
            "channel_id": "200",
            "guild_id": "300",
            "content": "hello edited",
            "author": {
                "id": "7",
                "username": "alice",
                "discriminator": "0001",
                "avatar": null
            },
            "mentions": [{
                "id": "8",
                "username": "bob",
                "discriminator": "0002",
                "avatar": null
            }],
            "mention_roles": ["9"]
        }));

        let msg = InboundMessage::from_edit(None, event).unwrap();
        assert_eq!(msg.id.get(), 100);
        assert_eq!(msg.channel_id.get(), 200);
        assert_eq!(msg.guild_id, Some(GuildId::new(300)));
        assert_eq!(msg.author.name, "alice");
        assert_eq!(msg.content, "hello edited");
        assert_eq!(msg.mentions.len(), 1);
        assert_eq!(msg.mentions[0].username, "bob");
        assert_eq!(msg.mention_roles, vec![RoleId::new(9)]);
        assert!(msg.attachment_urls.is_empty());
    }

    #[test]
    fn test_edit_without_content_yields_nothing() {
        // Embed resolution and pin changes arrive as updates with no
        // content; there is nothing to relay.
        let event = update_event(json!({
            "id": "100",
            "channel_id": "200",
            "author": {
                "id": "7",
                "username": "alice",
                "discriminator": "0001",
                "avatar": null
            }
        }));

        assert!(InboundMessage::from_edit(None, event).is_none());
    }

    #[test]
    fn test_edit_without_author_yields_nothing() {
        let event = update_event(json!({
            "id": "100",
            "channel_id": "200",
            "content": "who said this"
        }));

        assert!(InboundMessage::from_edit(None, event).is_none());
    }

    #[test]
    fn test_edit_of_direct_message_keeps_missing_guild() {
        let event = update_event(json!({
            "id": "100",
            "channel_id": "200",
            "content": "alice, psst",
            "author": {
                "id": "7",
                "username": "alice",
                "discriminator": "0001",
                "avatar": null
            }
        }));

        let msg = InboundMessage::from_edit(None, event).unwrap();
        assert_eq!(msg.guild_id, None);
    }
}
