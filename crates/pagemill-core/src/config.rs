use std::time::Duration;

/// Per-backend extraction settings.
///
/// Passed to every extractor at construction time; environment lookups
/// happen at the CLI boundary, never here.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Request deadline for each HTTP call.
    pub timeout: Duration,
    /// Maximum attempts for transient failures.
    pub retry_count: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_count: 3,
        }
    }
}

impl ExtractorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

/// Settings for the Markdown refinement pass.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider identifier. Only "openai" (OpenAI-compatible chat API) is
    /// currently functional; anything else is rejected at construction.
    pub provider: String,
    pub model: String,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.1,
        }
    }
}

impl LlmConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}
