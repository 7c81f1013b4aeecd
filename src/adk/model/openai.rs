// SPDX-License-Identifier: MIT

//! OpenAI Model - chat completions API implementation

use super::{Content, GenerationConfig, Model, Role};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenAI chat model implementation
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAIModel {
    /// Create a new OpenAIModel from the environment
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    /// Optionally uses `OPENAI_BASE_URL` for custom endpoints.
    pub fn new(model_name: String) -> Result<Self, ModelError> {
        let api_key =
            env::var("OPENAI_API_KEY").map_err(|_| ModelError::ApiKeyMissing("OpenAI".into()))?;
        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_settings(model_name, api_key, base_url, DEFAULT_TIMEOUT)
    }

    /// Create a model with explicit settings
    ///
    /// Requests that take longer than `timeout` fail with [`ModelError::Timeout`].
    pub fn with_settings(
        model_name: String,
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Convert internal Content to OpenAI message format
    fn content_to_openai_message(content: &Content) -> serde_json::Value {
        let role = match content.role {
            Role::System => "system",
            Role::User => "user",
            Role::Model => "assistant",
        };
        json!({
            "role": role,
            "content": content.text
        })
    }

    /// Build the request body
    fn request_body(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = history
            .iter()
            .map(Self::content_to_openai_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        body
    }

    /// Parse OpenAI response into Content
    fn parse_openai_response(response: &serde_json::Value) -> Result<Content, ModelError> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".to_string()))?;

        let text = choice["message"]["content"]
            .as_str()
            .ok_or_else(|| ModelError::InvalidResponse("choice has no text content".to_string()))?;

        Ok(Content::model(text))
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            ModelError::Timeout(self.timeout.as_secs())
        } else {
            ModelError::Http(err)
        }
    }
}

#[async_trait]
impl Model for OpenAIModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(history, config);

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ModelError::api("OpenAI", format!("{}: {}", status, text)));
        }

        let resp_json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        log::debug!("OpenAI response: {}", resp_json);

        Self::parse_openai_response(&resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OpenAIModel {
        OpenAIModel::with_settings(
            "gpt-4o-mini".to_string(),
            "test-key".to_string(),
            "http://localhost:9/v1/".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_content_to_openai_messages() {
        let msg = OpenAIModel::content_to_openai_message(&Content::system("You are helpful"));
        assert_eq!(msg["role"], "system");
        assert_eq!(msg["content"], "You are helpful");

        let msg = OpenAIModel::content_to_openai_message(&Content::user("Hello"));
        assert_eq!(msg["role"], "user");

        let msg = OpenAIModel::content_to_openai_message(&Content::model("I can help"));
        assert_eq!(msg["role"], "assistant");
        assert_eq!(msg["content"], "I can help");
    }

    #[test]
    fn test_request_body_includes_config() {
        let model = model();
        let config = GenerationConfig {
            temperature: Some(0.0),
            max_output_tokens: Some(512),
            top_p: None,
        };
        let body = model.request_body(&[Content::user("hi")], Some(&config));

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["temperature"], json!(0.0));
        assert_eq!(body["max_tokens"], json!(512));
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        assert_eq!(model().base_url, "http://localhost:9/v1");
    }

    #[test]
    fn test_parse_openai_response() {
        let response = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Recommendation: BUY"}
            }]
        });
        let content = OpenAIModel::parse_openai_response(&response).unwrap();
        assert_eq!(content, Content::model("Recommendation: BUY"));
    }

    #[test]
    fn test_parse_openai_response_without_choices() {
        let err = OpenAIModel::parse_openai_response(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
