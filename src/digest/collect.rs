//! Message collection.
//!
//! Walks a guild's text channels and pulls every qualifying message inside
//! the window, reduced to the fields the rest of the pipeline needs.
//! Unreadable channels are skipped, not errors: private channels are
//! expected and a digest should survive a flaky history fetch.

use std::collections::HashSet;

use chrono::DateTime;
use chrono::Utc;

use crate::serenity;

/// How many messages one history page may hold, discord's maximum.
const HISTORY_PAGE: u8 = 100;

/// First second of 2015, the discord epoch.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// One channel's qualifying messages, oldest first.
#[derive(Debug, Clone)]
pub struct ChannelMessages {
    /// The channel's name.
    pub channel: String,
    /// Messages in chronological order.
    pub messages: Vec<CollectedMessage>,
}

/// A message reduced to what the digest needs.
#[derive(Debug, Clone)]
pub struct CollectedMessage {
    /// Author display name.
    pub author: String,
    /// Trimmed message text, may be empty for embed-only messages.
    pub content: String,
    /// Quoted original, present only when this message replies to one
    /// outside the collected window.
    pub reply_context: Option<ReplyContext>,
    /// Rich content attached to the message.
    pub embeds: Vec<EmbedInfo>,
}

/// The message a reply points at.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    pub author: String,
    pub content: String,
}

/// The readable parts of an embed.
#[derive(Debug, Clone, Default)]
pub struct EmbedInfo {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Collect qualifying messages from every non-excluded channel within
/// `[from, to)`, grouped by channel. Channels that yield nothing are left
/// out of the result.
pub async fn collect(
    http: &serenity::Http,
    channels: &[serenity::GuildChannel],
    excluded: &HashSet<String>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<ChannelMessages> {
    let mut collected = Vec::new();

    for channel in channels {
        if excluded.contains(&channel.name) {
            tracing::info!("Skipping excluded channel '{}'.", channel.name);
            continue;
        }

        let history = match channel_history(http, channel.id, from, to).await {
            Ok(history) => history,
            // Usually a private channel the bot can't read.
            Err(e) => {
                tracing::info!("Ignoring unreadable channel '{}': {e}", channel.name);
                continue;
            }
        };

        // Everything fetched in the window, for reply lookups.
        let window_ids: HashSet<serenity::MessageId> = history.iter().map(|m| m.id).collect();

        let mut messages = Vec::new();
        for msg in &history {
            if !qualifies(&msg.content, msg.author.bot, msg.embeds.len()) {
                continue;
            }
            messages.push(CollectedMessage {
                author: display_name(&msg.author),
                content: msg.content.trim().to_string(),
                reply_context: reply_context(http, msg, &window_ids).await,
                embeds: msg
                    .embeds
                    .iter()
                    .map(|embed| EmbedInfo {
                        title: embed.title.clone(),
                        description: embed.description.clone(),
                    })
                    .collect(),
            });
        }

        if !messages.is_empty() {
            collected.push(ChannelMessages {
                channel: channel.name.clone(),
                messages,
            });
        }
    }

    collected
}

/// A message makes it into the digest if a human wrote it and it carries
/// text or at least one embed.
fn qualifies(content: &str, author_is_bot: bool, embed_count: usize) -> bool {
    !author_is_bot && (!content.trim().is_empty() || embed_count > 0)
}

/// Global name if the user set one, account name otherwise.
fn display_name(user: &serenity::User) -> String {
    user.global_name
        .as_deref()
        .unwrap_or(&user.name)
        .to_string()
}

/// The smallest message id that could have been created at `time`.
/// History endpoints filter by id, not timestamp.
fn snowflake_at(time: DateTime<Utc>) -> u64 {
    let ms = (time.timestamp_millis() - DISCORD_EPOCH_MS).max(1) as u64;
    ms << 22
}

/// Fetch every message in `[from, to)` for one channel, oldest first.
/// Pages forward through history until the window is exhausted.
async fn channel_history(
    http: &serenity::Http,
    channel_id: serenity::ChannelId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<serenity::Message>, serenity::Error> {
    let to_id = snowflake_at(to);
    let mut cursor = serenity::MessageId::new(snowflake_at(from));
    let mut history = Vec::new();

    loop {
        let filter = serenity::GetMessages::new()
            .after(cursor)
            .limit(HISTORY_PAGE);
        let mut batch = channel_id.messages(http, filter).await?;
        if batch.is_empty() {
            break;
        }

        // Discord returns newest first; the digest wants chronological order.
        batch.reverse();
        let full_page = batch.len() == usize::from(HISTORY_PAGE);
        cursor = batch.last().expect("batch is non-empty").id;

        for msg in batch {
            // Half-open window: anything at or past `to` ends the walk.
            if msg.id.get() >= to_id {
                return Ok(history);
            }
            history.push(msg);
        }

        if !full_page {
            break;
        }
    }

    Ok(history)
}

/// Resolve the quoted original for a reply whose target sits outside the
/// collected window. A failed lookup drops the annotation, nothing else.
async fn reply_context(
    http: &serenity::Http,
    msg: &serenity::Message,
    window_ids: &HashSet<serenity::MessageId>,
) -> Option<ReplyContext> {
    let reference = msg.message_reference.as_ref()?;
    let original_id = reference.message_id?;
    if window_ids.contains(&original_id) {
        // The original is already part of the digest, no quote needed.
        return None;
    }

    // Discord attaches the referenced message when it still exists.
    if let Some(original) = msg.referenced_message.as_deref() {
        return Some(ReplyContext {
            author: display_name(&original.author),
            content: original.content.trim().to_string(),
        });
    }

    match reference.channel_id.message(http, original_id).await {
        Ok(original) => Some(ReplyContext {
            author: display_name(&original.author),
            content: original.content.trim().to_string(),
        }),
        Err(e) => {
            tracing::info!("Couldn't resolve reply target {original_id}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_messages_never_qualify() {
        assert!(!qualifies("hello", true, 0));
        assert!(!qualifies("hello", true, 2));
    }

    #[test]
    fn blank_messages_without_embeds_never_qualify() {
        assert!(!qualifies("", false, 0));
        assert!(!qualifies("   \n\t", false, 0));
    }

    #[test]
    fn embed_only_messages_qualify() {
        assert!(qualifies("", false, 1));
    }

    #[test]
    fn plain_messages_qualify() {
        assert!(qualifies("good morning", false, 0));
    }

    #[test]
    fn snowflakes_preserve_time_order() {
        let earlier = Utc::now();
        let later = earlier + chrono::TimeDelta::seconds(30);
        assert!(snowflake_at(earlier) < snowflake_at(later));
    }

    #[test]
    fn snowflake_before_the_epoch_is_still_a_valid_id() {
        let ancient = DateTime::from_timestamp(0, 0).expect("valid timestamp");
        assert!(snowflake_at(ancient) > 0);
    }
}
