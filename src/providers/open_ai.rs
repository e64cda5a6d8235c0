use crate::config::ProviderConfig;
use crate::error::PlannerError;
use crate::providers::{read_json, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration
    pub fn new(config: &ProviderConfig) -> Result<Self, PlannerError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                PlannerError::MissingApiKey(
                    "OPENAI_API_KEY not found in config or environment".to_string(),
                )
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        Ok(OpenAIProvider {
            client: Client::new(),
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn with_api_key(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com".to_string(), model)
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        OpenAIProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
            temperature: 0.0,
            max_tokens: 2000,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, PlannerError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
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
        let content = response_body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                PlannerError::InvalidResponse("Failed to extract content from response".to_string())
            })?
            .to_string();

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CanonRequest, ExtractionRequest};
    use mockito::{Matcher, Server};
    use std::collections::BTreeMap;

    fn chat_body(content: &str) -> String {
        json!({"choices": [{"message": {"content": content}}]}).to_string()
    }

    #[tokio::test]
    async fn test_parse_ingredients() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer fake_api_key")
            .match_body(Matcher::PartialJson(json!({
                "response_format": {"type": "json_object"},
                "temperature": 0.0
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_body(
                r#"{"r":"crepes","s":4,"i":[{"n":"farine","q":250,"u":"g"},{"n":"sel","q":null,"u":null}],"p":null}"#,
            ))
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );
        let request = ExtractionRequest {
            t: "Crepes\n250 g farine\nsel".to_string(),
            s: Some(4),
        };

        let response = provider.parse_ingredients(&request).await.unwrap();
        assert_eq!(response.r.as_deref(), Some("crepes"));
        assert_eq!(response.s, Some(4));
        assert_eq!(response.i.len(), 2);
        assert_eq!(response.i[0].q, Some(250.0));
        assert_eq!(response.i[1].u, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_canonicalize() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_body(
                r#"{"mapped":[{"idx":0,"canonical_id":99,"canonical_name":"Viande hachee","confidence":0.96}]}"#,
            ))
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );
        let request = CanonRequest {
            items: vec![],
            candidates: BTreeMap::new(),
        };

        let response = provider.canonicalize(&request).await.unwrap();
        assert_eq!(response.mapped[0].canonical_id, Some(99));
        assert!((response.mapped[0].confidence - 0.96).abs() < 1e-9);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_carries_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "rate limited"}"#)
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );

        let result = provider.complete("system", "user").await;
        match result {
            Err(PlannerError::Provider {
                provider,
                status,
                message,
            }) => {
                assert_eq!(provider, "openai");
                assert_eq!(status, 429);
                assert!(message.contains("rate limited"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_content_is_invalid_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );
        let result = provider.complete("system", "user").await;
        assert!(matches!(result, Err(PlannerError::InvalidResponse(_))));
    }

    #[test]
    fn test_provider_name() {
        let provider =
            OpenAIProvider::with_api_key("fake_api_key".to_string(), "gpt-4o-mini".to_string());
        assert_eq!(provider.provider_name(), "openai");
    }
}
