//! Implements the `/digest` command.
//!
//! Runs the digest pipeline immediately for the invoking guild, covering
//! the previous 24 hours. Normally the daily schedule does this.

use chrono::TimeDelta;
use chrono::Utc;
use tracing::instrument;

use crate::data::GetData;
use crate::error::UserError;
use crate::log;
use crate::Context;
use crate::DigestError;

/// Post a digest of the last 24 hours to the digest channel.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, guild_cooldown = 60)]
pub async fn digest(
    ctx: Context<'_>,
    #[description = "Raise console log verbosity for this run"] verbose: Option<bool>,
) -> Result<(), DigestError> {
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;

    // Held for the whole run; drops (and restores the filter) on every
    // exit path below, including `?`.
    let _verbosity = verbose.unwrap_or(false).then(log::verbose_scope);

    ctx.reply("Generating a digest of the last 24 hours...")
        .await?;

    let to = Utc::now();
    let from = to - TimeDelta::hours(24);

    let http_client = ctx.http_client().await;
    let digester = ctx.data().digester.clone();

    crate::digest::run_for_guild(
        ctx.serenity_context(),
        &http_client,
        &digester,
        guild_id,
        from,
        to,
    )
    .await?;

    Ok(())
}
