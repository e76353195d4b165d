//! LLM Gateway: one atomic, cancellable call to the Anthropic Messages API.
//!
//! No streaming, no retries. The pipeline decides what to do with a failure;
//! the gateway only maps it onto `GatewayError`.

use super::types::{PromptPart, RequestOptions};
use crate::error::GatewayError;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anything that can turn a prompt into model text.
///
/// Implementations must check `cancel` before touching the network and
/// abandon the in-flight call when it fires.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn send(
        &self,
        parts: Vec<PromptPart>,
        options: RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<String, GatewayError>;
}

/// Gateway backed by the Anthropic Messages API.
pub struct AnthropicGateway {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    url: String,
}

impl AnthropicGateway {
    /// Build the gateway. The credential is captured once; a missing key is
    /// not an error here, every `send` reports it as `Configuration` instead.
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model: model.into(),
            url: url.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmGateway for AnthropicGateway {
    async fn send(
        &self,
        parts: Vec<PromptPart>,
        options: RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<String, GatewayError> {
        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => {
                log::warn!("[LLM] No API key set — refusing to call the model");
                return Err(GatewayError::Configuration);
            }
        };
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let image_count = parts
            .iter()
            .filter(|p| matches!(p, PromptPart::Image(_)))
            .count();
        log::info!(
            "[LLM] Model: {}, images: {}, max_tokens: {}, temperature: {}",
            self.model,
            image_count,
            options.max_tokens,
            options.temperature
        );

        let body = build_request_body(&self.model, &parts, &options);
        let start = std::time::Instant::now();

        let exchange = async {
            let response = self
                .client
                .post(&self.url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(transport_error)?;
            let status = response.status().as_u16();
            let text = response.text().await.map_err(transport_error)?;
            Ok::<_, GatewayError>((status, text))
        };

        let (status, body) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("[LLM] Call cancelled after {}ms", start.elapsed().as_millis());
                return Err(GatewayError::Cancelled);
            }
            result = exchange => result?,
        };

        log::info!("[LLM] API latency: {}ms (status {})", start.elapsed().as_millis(), status);

        if !(200..300).contains(&status) {
            log::error!("[LLM] API returned {}: {}", status, head(&body, 200));
            return Err(classify_status(status, body));
        }

        collect_text(&body).ok_or_else(|| GatewayError::Transport {
            status: Some(status),
            body: format!("Unexpected response shape: {}", head(&body, 500)),
        })
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
pub fn classify_status(status: u16, body: String) -> GatewayError {
    match status {
        401 | 403 => GatewayError::Auth { status, body },
        429 => GatewayError::RateLimit { status, body },
        _ => GatewayError::Transport {
            status: Some(status),
            body,
        },
    }
}

fn head(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    log::error!("[LLM] HTTP request failed: {}", e);
    GatewayError::Transport {
        status: e.status().map(|s| s.as_u16()),
        body: e.to_string(),
    }
}

/// Messages API request body: one user turn with ordered content blocks.
pub fn build_request_body(
    model: &str,
    parts: &[PromptPart],
    options: &RequestOptions,
) -> serde_json::Value {
    let content: Vec<serde_json::Value> = parts
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => serde_json::json!({
                "type": "text",
                "text": text,
            }),
            PromptPart::Image(image) => serde_json::json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.media_type,
                    "data": image.data,
                },
            }),
        })
        .collect();

    serde_json::json!({
        "model": model,
        "max_tokens": options.max_tokens,
        "temperature": options.temperature,
        "system": options.system_prompt,
        "messages": [{"role": "user", "content": content}],
    })
}

/// Concatenate every text block of a Messages API response, in order.
pub fn collect_text(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    let content = parsed.get("content")?.as_array()?;
    Some(
        content
            .iter()
            .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
            .collect(),
    )
}
