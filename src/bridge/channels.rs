//! Bridge channel management.
//!
//! Groups the handoff queues between the Discord side and its two
//! downstream consumers: the IRC relay manager (normalized messages)
//! and the identity-mapping subsystem (user facts and removals). All
//! queues are unbounded; the Discord side never blocks on a consumer
//! beyond the send itself and never retries a send.

use serenity::model::id::UserId;
use tokio::sync::mpsc;

use crate::common::{DiscordMessage, DiscordUser};

/// Senders held by the Discord event handler.
pub struct DiscordSideChannels {
    /// Normalized messages bound for the IRC relay manager.
    pub messages_tx: mpsc::UnboundedSender<DiscordMessage>,
    /// User facts bound for the identity-mapping subsystem.
    pub updates_tx: mpsc::UnboundedSender<DiscordUser>,
    /// Removal signals, keyed by Discord user id.
    pub removals_tx: mpsc::UnboundedSender<UserId>,
}

/// Receivers handed to the IRC-side consumers.
pub struct IrcSideChannels {
    pub messages_rx: mpsc::UnboundedReceiver<DiscordMessage>,
    pub updates_rx: mpsc::UnboundedReceiver<DiscordUser>,
    pub removals_rx: mpsc::UnboundedReceiver<UserId>,
}

/// Bundle of all channels created at startup.
pub struct ChannelBundle {
    pub discord: DiscordSideChannels,
    pub irc: IrcSideChannels,
}

impl ChannelBundle {
    pub fn new() -> Self {
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (removals_tx, removals_rx) = mpsc::unbounded_channel();

        Self {
            discord: DiscordSideChannels {
                messages_tx,
                updates_tx,
                removals_tx,
            },
            irc: IrcSideChannels {
                messages_rx,
                updates_rx,
                removals_rx,
            },
        }
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new()
    }
}
