//! Link extraction and preview-title resolution.
//!
//! Resolution is strictly best effort: whatever goes wrong with a fetch or
//! a parse, the caller always gets a title back, worst case the url itself.

use std::collections::BTreeSet;
use std::sync::OnceLock;
use std::time::Duration;

use itertools::Itertools;
use regex::Regex;
use scraper::Html;
use scraper::Selector;

use super::collect::ChannelMessages;

/// Hosts whose pages don't yield useful titles (login walls, scripted
/// pages). The url is shown as-is, no fetch attempted.
const SOCIAL_DOMAINS: &[&str] = &[
    "twitter.com",
    "x.com",
    "instagram.com",
    "facebook.com",
    "tiktok.com",
    "discord.com",
    "discord.gg",
];

/// How long a preview fetch may take before it's abandoned.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// A shared link with its resolved display title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPreview {
    pub title: String,
    pub url: String,
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").expect("url regex is valid"))
}

/// Every url shared in the collected messages, deduplicated across
/// channels and sorted for stable output.
pub fn extract(channels: &[ChannelMessages]) -> Vec<String> {
    let mut urls = BTreeSet::new();
    for channel in channels {
        for msg in &channel.messages {
            for found in url_regex().find_iter(&msg.content) {
                urls.insert(found.as_str().to_string());
            }
        }
    }
    urls.into_iter().collect()
}

/// Resolve titles for every url and render the links block for posting.
/// Urls are resolved one at a time; a digest has no reason to hurry.
pub async fn render(client: &reqwest::Client, urls: Vec<String>) -> String {
    if urls.is_empty() {
        return "No links were shared today.".to_string();
    }

    let mut lines = Vec::with_capacity(urls.len());
    for url in urls {
        let preview = resolve_title(client, &url).await;
        if preview.title == preview.url {
            lines.push(format!("- {}", preview.url));
        } else {
            lines.push(format!("- [{}]({})", preview.title, preview.url));
        }
    }
    lines.join("\n")
}

/// Best-effort display title for a url. Never fails.
pub async fn resolve_title(client: &reqwest::Client, url: &str) -> LinkPreview {
    if is_social_link(url) {
        return LinkPreview {
            title: url.to_string(),
            url: url.to_string(),
        };
    }

    let title = match fetch_title(client, url).await {
        Some(title) => title_case(&title),
        None => url.to_string(),
    };

    LinkPreview {
        title,
        url: url.to_string(),
    }
}

/// Exact host match against [SOCIAL_DOMAINS], ignoring a `www.` prefix.
/// A string that doesn't parse as a url isn't social, it's just broken,
/// and resolution falls through to the fetch path.
fn is_social_link(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    SOCIAL_DOMAINS.contains(&host)
}

/// Download the page and pull a title out of it.
async fn fetch_title(client: &reqwest::Client, url: &str) -> Option<String> {
    let response = match client.get(url).timeout(FETCH_TIMEOUT).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Preview fetch failed for {url}: {e}");
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::debug!("Preview fetch for {url} returned {}.", response.status());
        return None;
    }

    let body = response.text().await.ok()?;
    parse_title(&body)
}

/// Pull a title out of an html document: the `og:title` meta tag is the
/// curated title, the `<title>` element the raw fallback. Non-html bodies
/// parse to documents containing neither.
fn parse_title(body: &str) -> Option<String> {
    let document = Html::parse_document(body);

    let og_title = Selector::parse(r#"meta[property="og:title"]"#).expect("selector is valid");
    if let Some(element) = document.select(&og_title).next() {
        if let Some(content) = element.value().attr("content") {
            let content = content.trim();
            if !content.is_empty() {
                return Some(content.to_string());
            }
        }
    }

    let title = Selector::parse("title").expect("selector is valid");
    let text: String = document.select(&title).next()?.text().collect();
    let text = text.split_whitespace().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Uppercase the first letter of every word, lowercase the rest.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let rest: String = chars.as_str().to_lowercase();
                    first.to_uppercase().chain(rest.chars()).collect::<String>()
                }
                None => String::new(),
            }
        })
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::super::collect::CollectedMessage;
    use super::*;

    fn channel_with(contents: &[&str]) -> ChannelMessages {
        ChannelMessages {
            channel: "general".to_string(),
            messages: contents
                .iter()
                .map(|content| CollectedMessage {
                    author: "ana".to_string(),
                    content: content.to_string(),
                    reply_context: None,
                    embeds: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn extraction_deduplicates_across_channels() {
        let channels = vec![
            channel_with(&[
                "look at https://example.com/article",
                "again: https://example.com/article",
            ]),
            channel_with(&["third time https://example.com/article"]),
        ];

        let urls = extract(&channels);
        assert_eq!(urls, vec!["https://example.com/article".to_string()]);
    }

    #[test]
    fn extraction_finds_multiple_urls_in_one_message() {
        let channels = vec![channel_with(&[
            "both https://a.example.com and http://b.example.com here",
        ])];

        let urls = extract(&channels);
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn extraction_ignores_plain_text() {
        let channels = vec![channel_with(&["no links here, just example.com prose"])];
        assert!(extract(&channels).is_empty());
    }

    #[test]
    fn social_hosts_match_exactly_with_and_without_www() {
        assert!(is_social_link("https://twitter.com/someone/status/1"));
        assert!(is_social_link("https://www.instagram.com/p/abc/"));
        assert!(!is_social_link("https://nottwitter.com/page"));
        assert!(!is_social_link("https://example.com/twitter.com"));
        assert!(!is_social_link("not a url at all"));
    }

    #[test]
    fn parse_title_prefers_og_title() {
        let body = r#"<html><head>
            <meta property="og:title" content="curated title" />
            <title>raw title</title>
        </head><body></body></html>"#;
        assert_eq!(parse_title(body).as_deref(), Some("curated title"));
    }

    #[test]
    fn parse_title_falls_back_to_title_tag() {
        let body = "<html><head><title>  raw\n  title  </title></head></html>";
        assert_eq!(parse_title(body).as_deref(), Some("raw title"));
    }

    #[test]
    fn parse_title_handles_non_html() {
        assert_eq!(parse_title("{\"json\": true}"), None);
        assert_eq!(parse_title(""), None);
    }

    #[test]
    fn title_case_matches_word_by_word() {
        assert_eq!(title_case("hello WORLD"), "Hello World");
        assert_eq!(title_case("  spaced   out  "), "Spaced Out");
        assert_eq!(title_case(""), "");
    }

    #[tokio::test]
    async fn unresolvable_urls_fall_back_to_themselves() {
        let client = reqwest::Client::new();
        // Reserved domain, nothing listens there.
        let url = "https://url.invalid/nothing";
        let preview = resolve_title(&client, url).await;
        assert_eq!(preview.title, url);
        assert_eq!(preview.url, url);
    }

    #[tokio::test]
    async fn malformed_urls_fall_back_to_themselves() {
        let client = reqwest::Client::new();
        let url = "https://:not-a-host:/";
        let preview = resolve_title(&client, url).await;
        assert_eq!(preview.title, url);
    }
}
