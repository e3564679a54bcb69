//! The digest pipeline: collect messages, summarize them, gather shared
//! links, and post both to the digest channel.

pub mod collect;
pub mod format;
pub mod links;
pub mod publish;

use std::collections::HashSet;

use chrono::DateTime;
use chrono::Utc;
use tracing::instrument;

use crate::data::Digester;
use crate::error::UserError;
use crate::serenity;
use crate::DigestError;

/// Read-only settings every digest run shares. Built once from config,
/// never mutated at runtime.
#[derive(Debug, Clone)]
pub struct DigestSettings {
    /// Name of the channel digests are posted to.
    pub channel_name: String,
    /// Channels skipped during collection and link extraction, by exact name.
    pub excluded: HashSet<String>,
}

/// Runs the whole pipeline once for one guild over the window `[from, to)`.
///
/// Failures inside a stage (unreadable channels, link fetches, the summary
/// call) are handled per item and never abort the run; the only hard errors
/// are a missing digest channel and being unable to list channels at all.
#[instrument(skip(ctx, http_client, digester), fields(guild = %guild_id))]
pub async fn run_for_guild(
    ctx: &serenity::Context,
    http_client: &reqwest::Client,
    digester: &Digester,
    guild_id: serenity::GuildId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<(), DigestError> {
    let mut text_channels: Vec<serenity::GuildChannel> = guild_id
        .channels(&ctx.http)
        .await?
        .into_values()
        .filter(|channel| channel.kind == serenity::ChannelType::Text)
        .collect();
    // Channel maps have no order; sort so digests are reproducible.
    text_channels.sort_by(|a, b| a.name.cmp(&b.name));

    let collected = collect::collect(
        &ctx.http,
        &text_channels,
        &digester.settings.excluded,
        from,
        to,
    )
    .await;

    if collected.is_empty() {
        tracing::info!("No messages found between {from} and {to}.");
        return Ok(());
    }

    // Resolve the destination before spending a summary call on a guild
    // that has nowhere to post.
    let channel_name = &digester.settings.channel_name;
    let digest_channel = match text_channels.iter().find(|c| &c.name == channel_name) {
        Some(channel) => channel,
        None => {
            tracing::error!("No channel named '{channel_name}' found.");
            return Err(UserError::NoDigestChannel {
                name: channel_name.clone(),
            }
            .into());
        }
    };

    let daily_text = format::render(&collected);
    let message_count: usize = collected.iter().map(|ch| ch.messages.len()).sum();
    tracing::info!(
        "Collected {message_count} messages. Formatted text length is {} characters.",
        daily_text.len()
    );

    let summary = digester.summarizer.summarize_or_fallback(&daily_text).await;

    let urls = links::extract(&collected);
    let links_text = links::render(http_client, urls).await;

    publish::send_chunks(
        &ctx.http,
        digest_channel.id,
        &format!("**Daily Summary:**\n{summary}"),
    )
    .await;
    publish::send_chunks(
        &ctx.http,
        digest_channel.id,
        &format!("**Links Shared Today:**\n{links_text}"),
    )
    .await;

    tracing::info!("Posted daily digest to '{channel_name}'.");
    Ok(())
}
