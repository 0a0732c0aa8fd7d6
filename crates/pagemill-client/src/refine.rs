use std::time::Duration;

use pagemill_core::config::LlmConfig;
use pagemill_core::error::AppError;
use pagemill_core::record::ExtractionRecord;
use pagemill_core::traits::Refiner;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::transport::classify_transport;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// System prompt for the Markdown-cleanup pass.
///
/// Kept as a constant so tests can inspect it and behaviour changes happen
/// in exactly one place.
const MARKDOWN_SYSTEM_PROMPT: &str = r#"You are an expert in HTML-to-Markdown conversion. You will be given Markdown that was mechanically extracted from a web page; improve its quality and fix its defects. Follow these rules:

1. Preserve the structure and hierarchy of the original content
2. Handle headings, lists, tables, links and images correctly
3. Remove unnecessary blank lines and duplicated content
4. Fix formatting mistakes such as skipped heading levels or badly nested lists
5. Keep code blocks intact, including their language identifiers
6. Preserve the original link URLs and image URLs

Return only the improved Markdown, without explanations or commentary."#;

/// Build the user message embedding the extracted Markdown and the raw
/// HTML as reference context.
fn build_user_prompt(markdown: &str, html: &str) -> String {
    format!(
        "Review and improve the following Markdown.\n\n\
         Original extracted Markdown:\n```\n{markdown}\n```\n\n\
         Raw HTML for reference, where needed:\n```\n{html}\n```\n\n\
         Return the improved Markdown:"
    )
}

/// Construct a refiner for the configured provider.
///
/// Only the OpenAI-style chat API is currently functional; any other
/// provider identifier is rejected so the caller can fall back to running
/// without refinement.
pub fn refiner_for(config: &LlmConfig, api_key: &str) -> Result<OpenAiRefiner, AppError> {
    match config.provider.as_str() {
        "openai" => OpenAiRefiner::new(api_key, config),
        other => {
            tracing::error!(provider = %other, "Unsupported LLM provider");
            Err(AppError::ConfigError(format!(
                "Unsupported LLM provider: {other}"
            )))
        }
    }
}

/// Markdown refiner backed by an OpenAI-compatible chat completion API.
///
/// Works with any OpenAI-compatible deployment via [`with_base_url`]
/// (OpenAI directly, or a compatibility layer in front of another model).
///
/// [`with_base_url`]: OpenAiRefiner::with_base_url
#[derive(Clone, Debug)]
pub struct OpenAiRefiner {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

impl OpenAiRefiner {
    pub fn new(api_key: &str, config: &LlmConfig) -> Result<Self, AppError> {
        Self::with_base_url(api_key, config, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: &str,
        config: &LlmConfig,
        base_url: &str,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(DEFAULT_LLM_TIMEOUT)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: DEFAULT_LLM_TIMEOUT.as_secs(),
        })
    }
}

impl Refiner for OpenAiRefiner {
    async fn refine(&self, record: &ExtractionRecord) -> Result<ExtractionRecord, AppError> {
        let endpoint = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: MARKDOWN_SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(&record.markdown, &record.html),
                },
            ],
        };

        tracing::debug!(url = %record.url(), model = %self.model, "Requesting Markdown refinement");

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();

            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));

            return Err(AppError::LlmError {
                message,
                status_code,
                retryable: status_code == 429 || status_code >= 500,
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| AppError::LlmError {
            message: format!("Failed to parse LLM response: {e}"),
            status_code: 200,
            retryable: false,
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::LlmError {
                message: "Empty response from LLM".into(),
                status_code: 200,
                retryable: false,
            })?;

        Ok(record.clone().with_optimized_markdown(content))
    }
}

// ---- Chat API wire types ----

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}
