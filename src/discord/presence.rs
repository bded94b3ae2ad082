//! Presence reconciliation.
//!
//! Merges membership chunks, member updates, presence updates and
//! typing signals into one canonical "user is online with name X"
//! fact stream, plus a separate removal signal for members who leave.
//! All state consulted here is per-event and read-only; facts are
//! handed off on unbounded queues and never retried.

use serenity::model::id::UserId;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::common::{DiscordUser, LookupError};
use crate::discord::state::{GuildState, MemberInfo, PresenceStatus};

/// Reconciles presence/membership events into user facts.
pub struct PresenceReconciler {
    /// User fact queue, consumed by the identity-mapping subsystem.
    updates_tx: mpsc::UnboundedSender<DiscordUser>,
    /// Removal queue; distinct from an offline fact so the consumer
    /// drops the identity mapping entirely.
    removals_tx: mpsc::UnboundedSender<UserId>,
}

impl PresenceReconciler {
    pub fn new(
        updates_tx: mpsc::UnboundedSender<DiscordUser>,
        removals_tx: mpsc::UnboundedSender<UserId>,
    ) -> Self {
        Self {
            updates_tx,
            removals_tx,
        }
    }

    /// A bulk membership snapshot: each entry is reconciled exactly
    /// like a targeted member update, with online state derived from
    /// the live presence cache rather than assumed.
    pub fn member_chunk<'a>(
        &self,
        state: &dyn GuildState,
        members: impl IntoIterator<Item = &'a MemberInfo>,
    ) {
        for member in members {
            self.publish_member(state, member, false);
        }
    }

    pub fn member_update(&self, state: &dyn GuildState, member: &MemberInfo) {
        self.publish_member(state, member, false);
    }

    /// A presence change for one user.
    ///
    /// Offline and not forced online: emit a minimal fact carrying
    /// only the id, leaving the consumer's name fields unchanged.
    /// Otherwise resolve the full member record and publish it.
    pub fn presence_update(
        &self,
        state: &dyn GuildState,
        user_id: UserId,
        status: PresenceStatus,
        force_online: bool,
    ) {
        if !force_online && status.is_offline() {
            debug!("PRESENCE offline for {}", user_id);
            let _ = self.updates_tx.send(DiscordUser::offline(user_id));
            return;
        }
        debug!("PRESENCE {:?} for {}", status, user_id);

        match state.member(user_id) {
            Ok(member) => self.publish_member(state, &member, force_online),
            Err(LookupError::NotSynced) => {
                debug!("member {} not yet synced, dropping presence fact", user_id);
            }
            Err(error) => {
                error!("member lookup for presence update of {} failed: {}", user_id, error);
            }
        }
    }

    /// Typing implies the user is active regardless of stale presence
    /// data, so reconcile with the offline fast path skipped. The
    /// presence lookup is best effort; a miss defaults to offline.
    pub fn typing_start(&self, state: &dyn GuildState, user_id: UserId) {
        let status = match state.presence(user_id) {
            Ok(status) => status,
            Err(error) => {
                debug!("presence lookup on typing start for {} failed: {}", user_id, error);
                PresenceStatus::Offline
            }
        };

        self.presence_update(state, user_id, status, true);
    }

    /// Triggered when a user is removed from the guild (leave, kick or
    /// ban).
    pub fn member_leave(&self, user_id: UserId) {
        let _ = self.removals_tx.send(user_id);
    }

    fn publish_member(&self, state: &dyn GuildState, member: &MemberInfo, force_online: bool) {
        let online = if force_online {
            true
        } else {
            match state.presence(member.id) {
                Ok(status) if status.is_offline() => return,
                Ok(_) => true,
                // Absent presence usually means offline on first run.
                Err(LookupError::NotSynced) => {
                    debug!("no presence for member {}, dropping fact", member.id);
                    return;
                }
                Err(error) => {
                    error!("presence retrieval for {} failed: {}", member.id, error);
                    return;
                }
            }
        };

        let _ = self.updates_tx.send(DiscordUser {
            id: member.id,
            username: member.username.clone(),
            discriminator: member.discriminator,
            nick: member.effective_nick().to_string(),
            bot: member.bot,
            online,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::discord::state::{ChannelInfo, RoleInfo};
    use serenity::model::id::{ChannelId, RoleId};

    #[derive(Default)]
    struct FakeState {
        members: HashMap<UserId, MemberInfo>,
        presences: HashMap<UserId, PresenceStatus>,
        presence_failure: Option<String>,
    }

    impl GuildState for FakeState {
        fn member(&self, id: UserId) -> Result<MemberInfo, LookupError> {
            self.members.get(&id).cloned().ok_or(LookupError::NotSynced)
        }

        fn presence(&self, id: UserId) -> Result<PresenceStatus, LookupError> {
            if let Some(message) = &self.presence_failure {
                return Err(LookupError::Other(message.clone()));
            }
            self.presences.get(&id).copied().ok_or(LookupError::NotSynced)
        }

        fn role(&self, _id: RoleId) -> Result<RoleInfo, LookupError> {
            Err(LookupError::NotSynced)
        }

        fn channel(&self, _id: ChannelId) -> Result<ChannelInfo, LookupError> {
            Err(LookupError::NotSynced)
        }

        fn members(&self) -> Result<Vec<MemberInfo>, LookupError> {
            Ok(self.members.values().cloned().collect())
        }
    }

    fn member(id: u64, username: &str, nick: Option<&str>) -> MemberInfo {
        MemberInfo {
            id: UserId::new(id),
            username: username.to_string(),
            discriminator: Some(1234),
            nick: nick.map(str::to_string),
            bot: false,
            avatar_url: None,
        }
    }

    fn reconciler() -> (
        PresenceReconciler,
        mpsc::UnboundedReceiver<DiscordUser>,
        mpsc::UnboundedReceiver<UserId>,
    ) {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (removals_tx, removals_rx) = mpsc::unbounded_channel();
        (
            PresenceReconciler::new(updates_tx, removals_tx),
            updates_rx,
            removals_rx,
        )
    }

    #[test]
    fn test_offline_presence_emits_minimal_fact() {
        let (reconciler, mut updates, _removals) = reconciler();
        let state = FakeState::default();

        reconciler.presence_update(&state, UserId::new(5), PresenceStatus::Offline, false);

        let fact = updates.try_recv().unwrap();
        assert_eq!(fact, DiscordUser::offline(UserId::new(5)));
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn test_forced_online_resolves_full_member() {
        let (reconciler, mut updates, _removals) = reconciler();
        let mut state = FakeState::default();
        state
            .members
            .insert(UserId::new(5), member(5, "alice", Some("Ally")));
        // Stale cache still says offline; the force must win.
        state
            .presences
            .insert(UserId::new(5), PresenceStatus::Offline);

        reconciler.presence_update(&state, UserId::new(5), PresenceStatus::Offline, true);

        let fact = updates.try_recv().unwrap();
        assert_eq!(fact.username, "alice");
        assert_eq!(fact.nick, "Ally");
        assert_eq!(fact.discriminator, Some(1234));
        assert!(fact.online);
    }

    #[test]
    fn test_member_update_drops_when_presence_offline() {
        let (reconciler, mut updates, _removals) = reconciler();
        let mut state = FakeState::default();
        state
            .members
            .insert(UserId::new(5), member(5, "alice", None));
        state
            .presences
            .insert(UserId::new(5), PresenceStatus::Offline);

        reconciler.member_update(&state, &member(5, "alice", None));
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn test_member_update_drops_when_presence_not_synced() {
        let (reconciler, mut updates, _removals) = reconciler();
        let state = FakeState::default();

        reconciler.member_update(&state, &member(5, "alice", None));
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn test_member_update_publishes_when_online() {
        let (reconciler, mut updates, _removals) = reconciler();
        let mut state = FakeState::default();
        state.presences.insert(UserId::new(5), PresenceStatus::Idle);

        reconciler.member_update(&state, &member(5, "alice", None));

        let fact = updates.try_recv().unwrap();
        assert!(fact.online);
        assert_eq!(fact.nick, "alice");
    }

    #[test]
    fn test_unexpected_presence_failure_drops_without_panic() {
        let (reconciler, mut updates, _removals) = reconciler();
        let state = FakeState {
            presence_failure: Some("cache poisoned".to_string()),
            ..FakeState::default()
        };

        reconciler.member_update(&state, &member(5, "alice", None));
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn test_typing_with_missing_presence_still_publishes_online() {
        let (reconciler, mut updates, _removals) = reconciler();
        let mut state = FakeState::default();
        state
            .members
            .insert(UserId::new(5), member(5, "alice", Some("Ally")));

        reconciler.typing_start(&state, UserId::new(5));

        let fact = updates.try_recv().unwrap();
        assert!(fact.online);
        assert_eq!(fact.nick, "Ally");
    }

    #[test]
    fn test_member_leave_uses_removal_queue() {
        let (reconciler, mut updates, mut removals) = reconciler();

        reconciler.member_leave(UserId::new(5));

        assert_eq!(removals.try_recv().unwrap(), UserId::new(5));
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn test_member_chunk_reconciles_each_entry() {
        let (reconciler, mut updates, _removals) = reconciler();
        let mut state = FakeState::default();
        state.presences.insert(UserId::new(1), PresenceStatus::Online);
        // User 2 has no presence entry and must be dropped.

        let roster = [member(1, "alice", None), member(2, "bob", None)];
        reconciler.member_chunk(&state, &roster);

        let fact = updates.try_recv().unwrap();
        assert_eq!(fact.username, "alice");
        assert!(updates.try_recv().is_err());
    }
}
