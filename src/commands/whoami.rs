//! Validate the configured token and show the acting identity

use crate::config::Config;
use crate::discord::DiscordClient;
use crate::error::Result;

/// Resolve the identity plus display names for the configured channels.
/// Returns the report as printable lines.
pub async fn report(discord: &DiscordClient, channels: &[String]) -> Result<Vec<String>> {
    let identity = discord.current_user().await?;

    let mut lines = vec![format!(
        "Logged in as {}#{} (id {})",
        identity.username, identity.discriminator, identity.id
    )];

    for channel_id in channels {
        let (server_name, channel_name) = discord.channel_info(channel_id).await;
        lines.push(format!(
            "  {} -> \"{}\" in {}",
            channel_id, channel_name, server_name
        ));
    }

    Ok(lines)
}

pub async fn run(config: &Config) -> Result<()> {
    let discord = DiscordClient::new(config.token.clone())?;
    for line in report(&discord, &config.channels).await? {
        println!("{}", line);
    }
    Ok(())
}
