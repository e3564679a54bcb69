//! Posting digests in message-sized chunks.

use crate::serenity;
use serenity::ChannelId;
use serenity::CreateMessage;
use serenity::MessageFlags;

/// Discord's message length limit.
pub const MESSAGE_LIMIT: usize = 2000;

/// Send text to the channel in chunks, with link previews suppressed on
/// every chunk. A chunk that fails to send is logged and the rest are
/// still attempted.
pub async fn send_chunks(http: &serenity::Http, channel_id: ChannelId, text: &str) {
    for chunk in split_chunks(text, MESSAGE_LIMIT) {
        if chunk.trim().is_empty() {
            continue;
        }

        let message = CreateMessage::new()
            .content(chunk)
            .flags(MessageFlags::SUPPRESS_EMBEDS);

        if let Err(e) = channel_id.send_message(http, message).await {
            tracing::error!("Failed to send digest chunk to {channel_id}: {e}");
        }
    }
}

/// Split text into chunks of at most `limit` bytes.
///
/// Splits on paragraph boundaries where possible, greedily packing
/// paragraphs into each chunk. A single paragraph longer than the limit is
/// sliced at the nearest character boundary. Paragraph separators stay
/// with their paragraph, so concatenating the chunks reproduces the input
/// exactly.
pub fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for segment in text.split_inclusive("\n\n") {
        if !buffer.is_empty() && buffer.len() + segment.len() > limit {
            chunks.push(std::mem::take(&mut buffer));
        }

        if segment.len() > limit {
            // Oversized paragraph: hard-slice it.
            let mut rest = segment;
            while rest.len() > limit {
                let at = slice_point(rest, limit);
                let (head, tail) = rest.split_at(at);
                chunks.push(head.to_string());
                rest = tail;
            }
            buffer.push_str(rest);
        } else {
            buffer.push_str(segment);
        }
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }

    chunks
}

/// Largest index at most `limit` that sits on a character boundary.
fn slice_point(s: &str, limit: usize) -> usize {
    let mut at = limit;
    while at > 0 && !s.is_char_boundary(at) {
        at -= 1;
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_chunks("hello world", 2000);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn paragraphs_pack_greedily_and_concatenate_back() {
        let text = (0..20)
            .map(|i| format!("paragraph number {i}, with a bit of padding text"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let limit = 120;

        let chunks = split_chunks(&text, limit);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= limit));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn oversized_paragraph_is_hard_sliced() {
        let text = "a".repeat(4500);
        let chunks = split_chunks(&text, 2000);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= 2000));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn oversized_paragraph_between_normal_ones_reassembles() {
        let text = format!("intro\n\n{}\n\noutro", "b".repeat(5000));
        let chunks = split_chunks(&text, 2000);

        assert!(chunks.iter().all(|c| c.len() <= 2000));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn slicing_respects_character_boundaries() {
        // Multibyte characters must not be split down the middle.
        let text = "é".repeat(3000);
        let chunks = split_chunks(&text, 2000);

        assert!(chunks.iter().all(|c| c.len() <= 2000));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn exact_limit_is_a_single_chunk() {
        let text = "c".repeat(2000);
        let chunks = split_chunks(&text, 2000);
        assert_eq!(chunks.len(), 1);
    }
}
