//! Defines and implements custom bot functionality.

mod config;
mod framework;

use crate::data::HttpKey;
use crate::serenity;
use crate::DigestError;

pub use config::Config;

/// Constructs a [serenity::Client] with an initialized [reqwest::Client].
pub(super) async fn client(config: Config) -> Result<serenity::Client, DigestError> {
    // Get discord token from config file
    let token = config.token()?.to_owned();

    // Intents we wish to use
    // See https://discord.com/developers/docs/topics/gateway#gateway-intents
    // Message content is privileged but required to digest channel history.
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    // Shared by link previews and the summarizer.
    let http_client = reqwest::Client::new();

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework::framework(config, http_client.clone()))
        .type_map_insert::<HttpKey>(http_client)
        .await?;

    Ok(client)
}
