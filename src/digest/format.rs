//! Turns collected messages into the text block the summarizer reads.
//!
//! Pure functions only; everything here is reproducible from its input.

use std::fmt::Write;

use super::collect::ChannelMessages;
use super::collect::EmbedInfo;

/// Render all collected channels as one block: a header per channel, one
/// `author: content` line per message, with reply and embed annotations
/// beneath the message they belong to. Channel blocks are separated by a
/// blank line.
pub fn render(channels: &[ChannelMessages]) -> String {
    let mut out = String::new();

    for channel in channels {
        if !out.is_empty() {
            out.push('\n');
        }
        writeln!(out, "[#{}]", channel.channel).expect("write to string buffer can't fail");

        for msg in &channel.messages {
            writeln!(out, "{}: {}", msg.author, msg.content)
                .expect("write to string buffer can't fail");

            if let Some(reply) = &msg.reply_context {
                writeln!(out, "[In reply to {}: {}]", reply.author, reply.content)
                    .expect("write to string buffer can't fail");
            }

            for embed in &msg.embeds {
                if let Some(line) = embed_line(embed) {
                    writeln!(out, "{line}").expect("write to string buffer can't fail");
                }
            }
        }
    }

    out.trim_end().to_string()
}

/// Annotation for one embed. The ` - ` joiner only appears when both
/// parts are present; an embed with neither yields nothing.
fn embed_line(embed: &EmbedInfo) -> Option<String> {
    let title = embed
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let description = embed
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    match (title, description) {
        (Some(title), Some(description)) => Some(format!("[Embed: {title} - {description}]")),
        (Some(title), None) => Some(format!("[Embed: {title}]")),
        (None, Some(description)) => Some(format!("[Embed: {description}]")),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::collect::CollectedMessage;
    use super::super::collect::ReplyContext;
    use super::*;

    fn message(author: &str, content: &str) -> CollectedMessage {
        CollectedMessage {
            author: author.to_string(),
            content: content.to_string(),
            reply_context: None,
            embeds: vec![],
        }
    }

    #[test]
    fn renders_headers_and_one_line_per_message() {
        let channels = vec![
            ChannelMessages {
                channel: "general".to_string(),
                messages: (0..5).map(|i| message("ana", &format!("msg {i}"))).collect(),
            },
            ChannelMessages {
                channel: "projects".to_string(),
                messages: (0..3).map(|i| message("ben", &format!("msg {i}"))).collect(),
            },
        ];

        let text = render(&channels);

        let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("[#")).collect();
        assert_eq!(headers, vec!["[#general]", "[#projects]"]);

        let message_lines = text.lines().filter(|l| l.contains(": msg")).count();
        assert_eq!(message_lines, 8);
    }

    #[test]
    fn identical_input_renders_identically() {
        let channels = vec![ChannelMessages {
            channel: "general".to_string(),
            messages: vec![message("ana", "hello")],
        }];
        assert_eq!(render(&channels), render(&channels));
    }

    #[test]
    fn reply_outside_the_window_gets_one_quote_line() {
        let mut reply = message("ben", "I agree");
        reply.reply_context = Some(ReplyContext {
            author: "ana".to_string(),
            content: "original point".to_string(),
        });
        let channels = vec![ChannelMessages {
            channel: "general".to_string(),
            messages: vec![reply],
        }];

        let text = render(&channels);
        let quotes = text
            .lines()
            .filter(|l| l.starts_with("[In reply to "))
            .count();
        assert_eq!(quotes, 1);
        assert!(text.contains("[In reply to ana: original point]"));
    }

    #[test]
    fn reply_inside_the_window_gets_no_quote_line() {
        // The collector leaves reply_context empty for in-window targets.
        let channels = vec![ChannelMessages {
            channel: "general".to_string(),
            messages: vec![message("ana", "original point"), message("ben", "I agree")],
        }];

        let text = render(&channels);
        assert!(!text.contains("[In reply to"));
    }

    #[test]
    fn embed_joiner_depends_on_present_parts() {
        let both = EmbedInfo {
            title: Some("A Title".to_string()),
            description: Some("a description".to_string()),
        };
        let title_only = EmbedInfo {
            title: Some("A Title".to_string()),
            description: None,
        };
        let description_only = EmbedInfo {
            title: None,
            description: Some("a description".to_string()),
        };
        let neither = EmbedInfo::default();

        assert_eq!(
            embed_line(&both).as_deref(),
            Some("[Embed: A Title - a description]")
        );
        assert_eq!(embed_line(&title_only).as_deref(), Some("[Embed: A Title]"));
        assert_eq!(
            embed_line(&description_only).as_deref(),
            Some("[Embed: a description]")
        );
        assert_eq!(embed_line(&neither), None);
    }

    #[test]
    fn channel_blocks_are_separated_by_a_blank_line() {
        let channels = vec![
            ChannelMessages {
                channel: "a".to_string(),
                messages: vec![message("ana", "one")],
            },
            ChannelMessages {
                channel: "b".to_string(),
                messages: vec![message("ben", "two")],
            },
        ];

        let text = render(&channels);
        assert!(text.contains("ana: one\n\n[#b]"));
    }
}
