//! External model clients.
//!
//! Both providers return the reply as one string; no streaming. Anthropic's
//! Messages API and OpenAI-style chat completions differ in auth headers,
//! where the system prompt goes, and the response shape.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::LLMConfig;
use crate::prompt::{system_prompt, user_message};
use crate::types::LLMProvider;
use crashdesk_core::{Error, Result};
use crashdesk_triage::HeaderTable;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PING_MAX_TOKENS: u32 = 16;

/// Anything that turns report text into a templated reply.
///
/// Futures are boxed so the server can hold an `Arc<dyn ReplySource>`.
pub trait ReplySource: Send + Sync {
    /// Provider name for logs and health output.
    fn name(&self) -> String;

    /// Extract the template fields from `report_text`.
    fn analyze<'a>(&'a self, report_text: &'a str) -> BoxFuture<'a, Result<String>>;

    /// Cheap round trip to confirm the key and endpoint work.
    fn ping(&self) -> BoxFuture<'_, Result<()>>;
}

/// Sampling settings shared by both clients.
#[derive(Debug, Clone)]
struct Request {
    model: String,
    api_key: String,
    system: String,
    max_tokens: u32,
    temperature: f64,
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    client: Client,
    request: Request,
}

impl AnthropicClient {
    pub fn new(client: Client, config: &LLMConfig, api_key: &str, headers: &HeaderTable) -> Self {
        Self {
            client,
            request: Request {
                model: config.anthropic_model.clone(),
                api_key: api_key.to_string(),
                system: system_prompt(headers),
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        }
    }

    fn body(&self, user: &str, max_tokens: u32) -> Value {
        json!({
            "model": self.request.model,
            "max_tokens": max_tokens,
            "temperature": self.request.temperature,
            "system": self.request.system,
            "messages": [{"role": "user", "content": user}],
        })
    }

    async fn send(&self, body: &Value) -> Result<String> {
        debug!("Calling Anthropic with model {}", self.request.model);
        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.request.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;
        let parsed = read_json(response).await?;
        anthropic_text(&parsed)
    }
}

impl ReplySource for AnthropicClient {
    fn name(&self) -> String {
        format!("{}:{}", LLMProvider::Anthropic, self.request.model)
    }

    fn analyze<'a>(&'a self, report_text: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let body = self.body(&user_message(report_text), self.request.max_tokens);
            self.send(&body).await
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let body = self.body("Hi", PING_MAX_TOKENS);
            self.send(&body).await.map(|_| ())
        })
    }
}

/// OpenAI-compatible chat completions client.
pub struct OpenAICompatClient {
    client: Client,
    url: String,
    request: Request,
}

impl OpenAICompatClient {
    pub fn new(client: Client, config: &LLMConfig, api_key: &str, headers: &HeaderTable) -> Self {
        Self {
            client,
            url: format!(
                "{}/chat/completions",
                config.openai_base_url.trim_end_matches('/')
            ),
            request: Request {
                model: config.openai_model.clone(),
                api_key: api_key.to_string(),
                system: system_prompt(headers),
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        }
    }

    fn body(&self, user: &str, max_tokens: u32) -> Value {
        json!({
            "model": self.request.model,
            "max_tokens": max_tokens,
            "temperature": self.request.temperature,
            "messages": [
                {"role": "system", "content": self.request.system},
                {"role": "user", "content": user},
            ],
        })
    }

    async fn send(&self, body: &Value) -> Result<String> {
        debug!("Calling {} with model {}", self.url, self.request.model);
        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.request.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;
        let parsed = read_json(response).await?;
        openai_text(&parsed)
    }
}

impl ReplySource for OpenAICompatClient {
    fn name(&self) -> String {
        format!("{}:{}", LLMProvider::OpenAI, self.request.model)
    }

    fn analyze<'a>(&'a self, report_text: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let body = self.body(&user_message(report_text), self.request.max_tokens);
            self.send(&body).await
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let body = self.body("Hi", PING_MAX_TOKENS);
            self.send(&body).await.map(|_| ())
        })
    }
}

/// Build the client for whichever provider the config resolves to.
pub fn reply_source_from_config(
    config: &LLMConfig,
    headers: &HeaderTable,
) -> Option<Arc<dyn ReplySource>> {
    let (provider, _model, api_key) = config.resolve_provider()?;
    let client = Client::new();
    let source: Arc<dyn ReplySource> = match provider {
        LLMProvider::Anthropic => Arc::new(AnthropicClient::new(client, config, &api_key, headers)),
        LLMProvider::OpenAI => Arc::new(OpenAICompatClient::new(client, config, &api_key, headers)),
    };
    Some(source)
}

async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("Model API error {}: {}", status, body);
        return Err(Error::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| Error::Http(format!("Invalid response body: {}", e)))
}

/// Concatenate the text blocks of a Messages API response.
fn anthropic_text(response: &Value) -> Result<String> {
    let blocks = response["content"]
        .as_array()
        .ok_or_else(|| Error::Internal("Anthropic response has no content".into()))?;
    let text: String = blocks
        .iter()
        .filter(|b| b["type"].as_str() == Some("text"))
        .filter_map(|b| b["text"].as_str())
        .collect();
    Ok(text)
}

fn openai_text(response: &Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Internal("completion response has no message content".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LLMConfig {
        LLMConfig {
            anthropic_api_key: Some("sk-a".into()),
            openai_api_key: Some("sk-o".into()),
            openai_base_url: "http://localhost:8080/v1/".into(),
            ..LLMConfig::default()
        }
    }

    #[test]
    fn test_anthropic_body() {
        let client = AnthropicClient::new(Client::new(), &config(), "sk-a", &HeaderTable::default());
        let body = client.body("report", 4096);
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["temperature"], 0.0);
        assert!(body["system"].as_str().unwrap().contains("VEHICLE 1:"));
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_openai_body_and_url() {
        let client =
            OpenAICompatClient::new(Client::new(), &config(), "sk-o", &HeaderTable::default());
        assert_eq!(client.url, "http://localhost:8080/v1/chat/completions");
        let body = client.body("report", 16);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "report");
        assert_eq!(body["max_tokens"], 16);
    }

    #[test]
    fn test_response_text_extraction() {
        let anthropic = json!({
            "content": [
                {"type": "text", "text": "INCIDENT SUMMARY:\n"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "A crash."}
            ]
        });
        assert_eq!(anthropic_text(&anthropic).unwrap(), "INCIDENT SUMMARY:\nA crash.");
        assert!(anthropic_text(&json!({"error": {}})).is_err());

        let openai = json!({"choices": [{"message": {"role": "assistant", "content": "CRASH DATE: 01/01/2024"}}]});
        assert_eq!(openai_text(&openai).unwrap(), "CRASH DATE: 01/01/2024");
        assert!(openai_text(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_source_from_config() {
        assert!(reply_source_from_config(&LLMConfig::default(), &HeaderTable::default()).is_none());

        let source = reply_source_from_config(&config(), &HeaderTable::default()).unwrap();
        assert!(source.name().starts_with("anthropic:"));

        let mut openai = config();
        openai.preferred_provider = "openai".into();
        let source = reply_source_from_config(&openai, &HeaderTable::default()).unwrap();
        assert_eq!(source.name(), "openai:gpt-4o-mini");
    }
}
