//! Ferryman - Discord-IRC chat bridge, Discord-facing half
//!
//! Connects to a Discord guild and normalizes its traffic for relay:
//! messages are translated to IRC-ready plain text and queued for the
//! IRC connection manager; membership and presence events are
//! reconciled into user facts for the identity-mapping subsystem.

mod bridge;
mod common;
mod config;
mod discord;
mod irc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use backon::BackoffBuilder;
use serenity::model::gateway::GatewayIntents;
use serenity::model::id::GuildId;
use serenity::Client;
use tokio::signal;
use tracing::{debug, error, info, warn};

use bridge::channels::IrcSideChannels;
use bridge::{ChannelBundle, RelayIdentity};
use config::env::get_config_path;
use discord::BridgeHandler;
use irc::NickRegistry;

/// Exponential backoff for Discord reconnection.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn discord_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Ferryman v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = config::load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!(
            "Please ensure {} exists and is properly formatted.",
            config_path
        );
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Guild: {}", config.discord.guild_id);
    info!("  Simple mode: {}", config.simple_mode());

    let guild_id = GuildId::new(config.discord.guild_id);

    // ============================================================
    // Create channels and shared state
    // ============================================================
    let channels = ChannelBundle::new();
    let identities = Arc::new(NickRegistry::new(config.nick_suffix()));
    let relay = Arc::new(RelayIdentity::new());

    // ============================================================
    // Spawn IRC-side consumers
    // ============================================================
    // The IRC connection manager and identity mapper attach to these
    // receivers; until they are wired in, drain and log so the queues
    // never pile up.
    let IrcSideChannels {
        mut messages_rx,
        mut updates_rx,
        mut removals_rx,
    } = channels.irc;

    let message_consumer = tokio::spawn(async move {
        while let Some(msg) = messages_rx.recv().await {
            let rendered = if msg.is_action {
                format!("* {} {}", msg.author_name, msg.content)
            } else {
                format!("<{}> {}", msg.author_name, msg.content)
            };
            match &msg.pm_target {
                Some(target) => info!("Discord -> IRC pm {}: {}", target, rendered),
                None => info!("Discord -> IRC [{}]: {}", msg.channel_id, rendered),
            }
        }
        warn!("Discord -> IRC forwarding task ended");
    });

    let fact_consumer = tokio::spawn(async move {
        loop {
            tokio::select! {
                fact = updates_rx.recv() => match fact {
                    Some(user) => debug!(
                        "user fact: {} online={} nick={}",
                        user.id, user.online, user.nick
                    ),
                    None => break,
                },
                removal = removals_rx.recv() => match removal {
                    Some(id) => debug!("user removed: {}", id),
                    None => break,
                },
            }
        }
        warn!("Identity fact consumer ended");
    });

    // ============================================================
    // Start Discord client with reconnect loop
    // ============================================================
    let handler = Arc::new(BridgeHandler::new(
        guild_id,
        config.simple_mode(),
        identities,
        relay,
        channels.discord,
    ));

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_PRESENCES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::GUILD_MESSAGE_TYPING
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::DIRECT_MESSAGE_TYPING
        | GatewayIntents::MESSAGE_CONTENT;

    let token = config.discord.token.clone();
    let mut discord_task = tokio::spawn(async move {
        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");
            match Client::builder(&token, intents)
                .event_handler_arc(handler.clone())
                .await
            {
                Ok(mut client) => {
                    backoff = discord_backoff();
                    match client.start().await {
                        Ok(()) => info!("Discord client stopped"),
                        Err(e) => error!("Discord client error: {}", e),
                    }
                }
                Err(e) => error!("Failed to build Discord client: {}", e),
            }

            let delay = backoff.next().unwrap_or(Duration::from_secs(300));
            info!("Reconnecting in {:.1} seconds...", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    });

    // ============================================================
    // Run until shutdown
    // ============================================================
    tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - exiting...");
        }
        _ = &mut discord_task => warn!("Discord task exited"),
        _ = message_consumer => warn!("Message consumer exited"),
        _ = fact_consumer => warn!("Fact consumer exited"),
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
