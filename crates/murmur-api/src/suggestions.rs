use std::sync::Arc;

use async_trait::async_trait;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use tracing::warn;

use murmur_types::api::SuggestionsResponse;

use crate::auth::AppState;
use crate::config::SuggestConfig;
use crate::error::ApiError;

pub const SUGGESTION_PROMPT: &str = "Create a list of three open-ended and engaging questions \
    formatted as a single string. Each question should be separated by '||'. These questions are \
    for an anonymous social messaging platform and should be suitable for a diverse audience. \
    Avoid personal or sensitive topics, focusing instead on universal themes that encourage \
    friendly interaction.";

pub const DEFAULT_SUGGESTIONS: [&str; 3] = [
    "What's your favorite movie?",
    "Do you have any pets?",
    "What's your dream job?",
];

const SUGGESTION_COUNT: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("provider returned no text")]
    Empty,
}

/// Opaque text generator. Best-effort: nothing in the core depends on it.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Always answers with the built-in openers.
pub struct StaticSuggestions;

#[async_trait]
impl SuggestionProvider for StaticSuggestions {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        Ok(DEFAULT_SUGGESTIONS.join("||"))
    }
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Serialize)]
struct GenerateParameters {
    temperature: f32,
    top_p: f32,
    do_sample: bool,
    max_new_tokens: u32,
}

/// Hosted text-generation endpoint (inference-API style).
pub struct HttpSuggestionProvider {
    client: reqwest::Client,
    config: SuggestConfig,
}

impl HttpSuggestionProvider {
    pub fn new(config: SuggestConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SuggestionProvider for HttpSuggestionProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = GenerateBody {
            inputs: prompt,
            parameters: GenerateParameters {
                temperature: 0.9,
                top_p: 0.9,
                do_sample: true,
                max_new_tokens: 100,
            },
        };

        let resp = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let value: serde_json::Value = resp.json().await?;
        generated_text(&value).ok_or(ProviderError::Empty)
    }
}

/// Pull the generated text out of either `[{"generated_text": ..}]`,
/// `{"generated_text": ..}` or a bare JSON string.
fn generated_text(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => Some(s.as_str()),
        serde_json::Value::Array(items) => items
            .first()
            .and_then(|item| item.get("generated_text"))
            .and_then(|v| v.as_str()),
        serde_json::Value::Object(_) => value.get("generated_text").and_then(|v| v.as_str()),
        _ => None,
    }?;
    Some(text.to_string()).filter(|t| !t.trim().is_empty())
}

/// Split provider output on `||`, strip list markers, keep at most three.
pub fn parse_suggestions(text: &str) -> Vec<String> {
    text.split("||")
        .map(|s| {
            s.trim()
                .trim_start_matches(|c: char| c == '-' || c == '–' || c == '•' || c.is_whitespace())
                .trim()
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .take(SUGGESTION_COUNT)
        .collect()
}

/// One bounded provider call.
pub async fn suggest(
    provider: &Arc<dyn SuggestionProvider>,
    timeout: std::time::Duration,
) -> Result<Vec<String>, ApiError> {
    let text = match tokio::time::timeout(timeout, provider.generate(SUGGESTION_PROMPT)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return Err(ApiError::Provider(e.to_string())),
        Err(_) => return Err(ApiError::Provider("suggestion provider timed out".into())),
    };

    let suggestions = parse_suggestions(&text);
    if suggestions.is_empty() {
        return Err(ApiError::Provider(ProviderError::Empty.to_string()));
    }
    Ok(suggestions)
}

/// POST /api/suggest-messages never fails and falls back to the built-in openers.
pub async fn suggest_messages(State(state): State<AppState>) -> impl IntoResponse {
    let (suggestions, fallback) =
        match suggest(&state.suggestions, state.config.external_timeout).await {
            Ok(s) => (s, false),
            Err(e) => {
                warn!("Suggestion provider unavailable, using defaults: {}", e);
                (DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(), true)
            }
        };

    Json(SuggestionsResponse {
        success: true,
        suggestions,
        fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowProvider;

    #[async_trait]
    impl SuggestionProvider for SlowProvider {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok("too late".into())
        }
    }

    #[test]
    fn parse_strips_markers_and_caps_count() {
        let parsed = parse_suggestions("- What's new?|| • Best trip ever? ||– Favorite book?|| extra?");
        assert_eq!(parsed, vec!["What's new?", "Best trip ever?", "Favorite book?"]);
        assert!(parse_suggestions(" || ").is_empty());
    }

    #[test]
    fn generated_text_shapes() {
        let arr = serde_json::json!([{ "generated_text": "a||b" }]);
        let obj = serde_json::json!({ "generated_text": "c" });
        let err = serde_json::json!({ "error": "loading" });
        assert_eq!(generated_text(&arr).as_deref(), Some("a||b"));
        assert_eq!(generated_text(&obj).as_deref(), Some("c"));
        assert_eq!(generated_text(&err), None);
    }

    #[tokio::test]
    async fn static_provider_yields_defaults() {
        let provider: Arc<dyn SuggestionProvider> = Arc::new(StaticSuggestions);
        let out = suggest(&provider, std::time::Duration::from_secs(1)).await.unwrap();
        assert_eq!(out, DEFAULT_SUGGESTIONS);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let provider: Arc<dyn SuggestionProvider> = Arc::new(SlowProvider);
        let err = suggest(&provider, std::time::Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "provider");
    }
}
