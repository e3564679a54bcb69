//! A bot that posts a daily digest of a server's discussions.
//!
//! Once a day (and on demand via `/digest`) the bot collects the last 24
//! hours of messages from every readable text channel, asks a language
//! model for a summary, gathers the links that were shared, and posts
//! both to the configured digest channel.

mod commands;
mod data;
mod digest;
mod error;
mod log;
mod openai;
mod schedule;
mod setup;

/// Only interface with serenity through poise's re-export.
pub use poise::serenity_prelude as serenity;

pub use data::Data;
pub use error::DigestError;
pub use setup::Config;

/// Convenient type alias, only this [poise::Context] type is used.
pub type Context<'a> = poise::Context<'a, Data, DigestError>;

#[tokio::main]
async fn main() {
    // Config is read before tracing installs so logging settings apply
    // from the first trace.
    let config = match Config::read() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    // The guard must live until shutdown so file logs keep flushing.
    let _guard = log::install_tracing(&config);

    if let Err(e) = run(config).await {
        tracing::error!("{e}");
    }
}

/// Builds the discord client and runs it until shutdown.
async fn run(config: Config) -> Result<(), DigestError> {
    let mut client = setup::client(config).await?;
    client.start().await?;
    Ok(())
}
