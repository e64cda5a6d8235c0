mod anthropic;
mod factory;
mod ollama;
mod open_ai;
mod prompt;
pub mod schema;

pub use anthropic::AnthropicProvider;
pub use factory::ProviderFactory;
pub use ollama::OllamaProvider;
pub use open_ai::OpenAIProvider;
pub use prompt::{CANONICALIZE_PROMPT, EXTRACTION_PROMPT};
pub use schema::{
    CanonCandidate, CanonMapped, CanonRequest, CanonResponse, ExtractionRequest,
    ExtractionResponse, LlmItem,
};

use crate::error::PlannerError;
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Unified trait for all LLM providers
///
/// Implementors only provide the raw chat round-trip; the two structured
/// operations are built on top of it and decode the model's JSON answer.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn provider_name(&self) -> &str;

    /// Send a system and a user message, return the text content of the answer.
    async fn complete(&self, system: &str, user: &str) -> Result<String, PlannerError>;

    /// Extract title, servings and ingredient items from recipe text
    async fn parse_ingredients(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResponse, PlannerError> {
        let payload = serde_json::to_string(request)?;
        let content = self.complete(EXTRACTION_PROMPT, &payload).await?;
        decode_content(self.provider_name(), &content)
    }

    /// Pick a catalog entry among the candidates of each item
    async fn canonicalize(&self, request: &CanonRequest) -> Result<CanonResponse, PlannerError> {
        let payload = serde_json::to_string(request)?;
        let content = self.complete(CANONICALIZE_PROMPT, &payload).await?;
        decode_content(self.provider_name(), &content)
    }
}

/// Turn a non-2xx answer into [`PlannerError::Provider`], otherwise parse the body.
pub(crate) async fn read_json(
    provider: &str,
    response: reqwest::Response,
) -> Result<Value, PlannerError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(PlannerError::Provider {
            provider: provider.to_string(),
            status: status.as_u16(),
            message,
        });
    }
    let body: Value = response.json().await?;
    debug!("{} response: {:?}", provider, body);
    Ok(body)
}

/// Decode the model's message content, tolerating a markdown code fence around it.
pub(crate) fn decode_content<T: DeserializeOwned>(
    provider: &str,
    content: &str,
) -> Result<T, PlannerError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced).map_err(|e| {
        PlannerError::InvalidResponse(format!("{} returned unusable JSON: {}", provider, e))
    })
}
