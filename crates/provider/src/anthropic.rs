//! Anthropic Messages API node

use crate::*;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const API_VERSION: &str = "2023-06-01";

/// Messages API client
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl AnthropicProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        Self::with_client(Client::new(), api_key, api_base, default_model)
    }

    /// Client with a per-request timeout
    pub fn with_timeout(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_key, api_base, default_model))
    }

    fn with_client(
        client: Client,
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_base = api_base
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let default_model = default_model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            default_model,
        }
    }

    fn build_request(&self, params: &ChatParams) -> Result<serde_json::Value> {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let mut body = json!({
            "model": model,
            "max_tokens": params.max_tokens,
            "messages": serde_json::to_value(&params.messages)?,
        });

        if !params.system.is_empty() {
            body["system"] = json!([{ "type": "text", "text": &params.system }]);
        }

        if let Some(temperature) = params.temperature {
            body["temperature"] = json!(temperature);
        }

        if !params.tools.is_empty() {
            body["tools"] = serde_json::to_value(&params.tools)?;
            body["tool_choice"] = match &params.tool_choice {
                ToolChoice::Auto => json!({"type": "auto"}),
                ToolChoice::Required(name) => json!({"type": "tool", "name": name}),
                ToolChoice::None => json!({"type": "none"}),
            };
        }

        Ok(body)
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let blocks = json["content"]
            .as_array()
            .ok_or(ProviderError::InvalidResponse)?;
        let content = parse_content_blocks(blocks);

        let usage = match json.get("usage") {
            Some(usage) => serde_json::from_value(usage.clone()).unwrap_or_default(),
            None => Usage::default(),
        };

        Ok(ChatResponse {
            content,
            stop_reason: json["stop_reason"].as_str().map(|s| s.to_string()),
            usage,
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }
        trace!("◆ CONTACTING MODEL AT {}", self.api_base);

        let url = format!("{}/messages", self.api_base);
        let body = self.build_request(&params)?;

        let mut request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json");
        if !params.betas.is_empty() {
            request = request.header("anthropic-beta", params.betas.join(","));
        }

        let response = request.json(&body).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), text.trim()));
            return Err(ProviderError::Api(message));
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;

        let parsed = self.parse_response(json)?;
        debug!(
            "◆ MODEL RESPONSE: {} BLOCKS, {} TOOL CALLS, STOP {:?}",
            parsed.content.len(),
            parsed.tool_calls().len(),
            parsed.stop_reason
        );
        Ok(parsed)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
