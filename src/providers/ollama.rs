use crate::config::ProviderConfig;
use crate::error::PlannerError;
use crate::providers::{read_json, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Local model served by Ollama. No API key.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, PlannerError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(OllamaProvider {
            client: Client::new(),
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(base_url: String, model: String) -> Self {
        OllamaProvider {
            client: Client::new(),
            base_url,
            model,
            temperature: 0.0,
            max_tokens: 2000,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, PlannerError> {
        // Ollama uses OpenAI-compatible API
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&json!({
                "model": self.model,
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
                "response_format": {"type": "json_object"},
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user}
                ]
            }))
            .send()
            .await?;

        let response_body = read_json(self.provider_name(), response).await?;

        // Some Ollama builds report failures in a 200 body
        if let Some(error) = response_body.get("error") {
            let message = error
                .as_str()
                .or_else(|| error["message"].as_str())
                .unwrap_or("Unknown error");
            return Err(PlannerError::InvalidResponse(format!(
                "Ollama API error: {}",
                message
            )));
        }

        let content = response_body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                PlannerError::InvalidResponse(
                    "Failed to extract content from Ollama response".to_string(),
                )
            })?
            .to_string();

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_complete() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"{\"mapped\":[]}"}}]}"#)
            .create_async()
            .await;

        let provider = OllamaProvider::with_base_url(server.url(), "llama3.1".to_string());
        let content = provider.complete("system", "user").await.unwrap();
        assert_eq!(content, r#"{"mapped":[]}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_in_success_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"message":"model not found"}}"#)
            .create_async()
            .await;

        let provider = OllamaProvider::with_base_url(server.url(), "missing".to_string());
        match provider.complete("system", "user").await {
            Err(PlannerError::InvalidResponse(message)) => {
                assert!(message.contains("model not found"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
