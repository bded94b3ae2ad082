//! Configuration validation.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a parsed configuration.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.discord.token.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            message: "discord.token must not be empty".to_string(),
        });
    }

    if config.discord.guild_id == 0 {
        return Err(ConfigError::ValidationError {
            message: "discord.guild_id must be a non-zero guild id".to_string(),
        });
    }

    if let Some(suffix) = config.nick_suffix() {
        if suffix.bytes().any(|b| !crate::irc::is_nick_char(b)) {
            return Err(ConfigError::ValidationError {
                message: "irc.nick_suffix contains characters illegal in IRC nicks".to_string(),
            });
        }
    }

    Ok(())
}
