//! Interfacing with the openai chat-completions api for summaries.

use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::DigestError;

/// Fixed reply when summary generation fails for any reason.
const FALLBACK_SUMMARY: &str = "Unable to generate summary for today.";

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Enough for a few paragraphs, which is all the prompt asks for.
const MAX_TOKENS: u32 = 300;

const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = "You are an objective summarizer. Your output should be clear, \
    readable paragraphs that detail the topics and factual content discussed, without adding \
    any concluding or wrap-up sentences. Do not mention phrases like 'overall' or 'in \
    conclusion' or offer any extra commentary.";

const TASK_PROMPT: &str = "Summarize the following day's discussion on the server in a few \
    succinct paragraphs that focus strictly on the topics and factual points discussed. Do \
    not add any overall concluding statements, interpretations, or editorial remarks at the \
    end. Simply describe the conversation without summarizing its overall tone or drawing \
    conclusions.";

/// Client for generating digest summaries.
pub struct SummaryClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl SummaryClient {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }

    /// Summarize the day's text, prefixed with a dated header.
    ///
    /// This never fails: any error is logged and replaced with
    /// [FALLBACK_SUMMARY] so the digest still gets posted.
    pub async fn summarize_or_fallback(&self, daily_text: &str) -> String {
        match self.summarize(daily_text).await {
            Ok(summary) => {
                let date = Utc::now().format("%Y-%m-%d");
                format!("Server Digest for {date}\n\n{summary}")
            }
            Err(e) => {
                tracing::error!("Error generating summary: {e}");
                FALLBACK_SUMMARY.to_string()
            }
        }
    }

    async fn summarize(&self, daily_text: &str) -> Result<String, DigestError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("{TASK_PROMPT}\n\n{daily_text}\n\nSummary:"),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        // Check status before parsing
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DigestError::SummaryApi(format!("{status}: {body}")));
        }

        let response = response.json::<ChatResponse>().await?;

        if let Some(error) = response.error {
            return Err(DigestError::SummaryApi(error.message));
        }

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| DigestError::SummaryApi("response contained no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_with_a_choice_deserializes() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "  a summary  "}}]
        }"#;
        let response: ChatResponse = serde_json::from_str(body).expect("valid response body");
        assert!(response.error.is_none());
        assert_eq!(
            response.choices[0].message.content.trim(),
            "a summary"
        );
    }

    #[test]
    fn error_payload_deserializes() {
        let body = r#"{"error": {"message": "quota exceeded", "type": "insufficient_quota"}}"#;
        let response: ChatResponse = serde_json::from_str(body).expect("valid error body");
        assert!(response.choices.is_empty());
        assert_eq!(response.error.expect("has error").message, "quota exceeded");
    }
}
