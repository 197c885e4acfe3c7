//! HTTP client for an OpenAI-compatible chat completions API
//!
//! One reqwest client serves both ports: free-form completions for the
//! chat service and JSON-schema constrained completions for routing
//! decisions. Rate limits are retried with exponential backoff; decision
//! calls can be aborted mid-flight through a cancellation token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::agents::AgentKind;
use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatResponse, LlmResponse, Message, ResponseFormat};
use super::{CompletionPort, DecisionPort, NextAgent, RoutingDecision};

/// Retry ceiling for rate-limited requests
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// First backoff step in milliseconds; doubles per attempt
const BACKOFF_BASE_MS: u64 = 1000;

/// Chat completions client
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
}

// Manual impl so the API key never reaches log output.
impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("default_model", &self.config.default_model)
            .finish()
    }
}

/// Builder for [`LlmClient`]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl Default for LlmClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            api_key: None,
            base_url: None,
            timeout_secs: None,
        }
    }

    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the endpoint from the config (useful against local servers)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .ok_or_else(|| Error::LLMError("API key is required".to_string()))?;

        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(config.timeout_secs));
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self.base_url.unwrap_or_else(|| config.base_url.clone());

        Ok(LlmClient {
            http_client,
            config,
            api_key,
            base_url,
        })
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        LlmClientBuilder::new()
            .config(config)
            .api_key(api_key)
            .build()
    }

    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Run one free-form completion with the configured model and sampling
    pub async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = ChatRequest::new(&self.config.default_model, messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        self.execute_request(&request).await
    }

    /// Send with retry: rate limits back off and try again, everything else
    /// fails through on the first attempt
    async fn execute_request(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.send_request(request).await {
                Ok(response) => return Ok(response),
                Err(Error::RateLimited(wait_secs)) if attempt < MAX_RETRY_ATTEMPTS => {
                    let backoff = calculate_backoff(attempt, wait_secs);
                    warn!(attempt, wait_ms = backoff, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            structured = request.response_format.is_some(),
            "Posting chat completion"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://github.com/mealgraph/mealgraph")
            .header("X-Title", "Mealgraph")
            .json(request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            return self.handle_error_response(status, response).await;
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse response: {}", e)))?;

        LlmResponse::from_chat_response(chat_response)
            .ok_or_else(|| Error::LLMError("Empty response from API".to_string()))
    }

    /// Map non-2xx statuses onto the error taxonomy
    async fn handle_error_response<T>(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(Error::LLMError(
                "Unauthorized: Invalid API key. Set MEALGRAPH_API_KEY or OPENROUTER_API_KEY environment variable.".to_string(),
            )),
            429 => {
                let wait_secs = extract_retry_after(&body).unwrap_or(60);
                Err(Error::RateLimited(wait_secs))
            }
            400 => Err(Error::LLMError(format!("Bad request: {}", body))),
            402 => Err(Error::LLMError(
                "Payment required: Insufficient credits on the provider account".to_string(),
            )),
            403 => Err(Error::LLMError(format!("Forbidden: {}", body))),
            404 => Err(Error::LLMError(format!(
                "Model not found or endpoint unavailable: {}",
                body
            ))),
            500..=599 => Err(Error::LLMError(format!("Server error ({}): {}", status, body))),
            _ => Err(Error::LLMError(format!("HTTP error {}: {}", status, body))),
        }
    }
}

#[async_trait]
impl CompletionPort for LlmClient {
    async fn complete_text(&self, messages: Vec<Message>) -> Result<String> {
        let response = self.complete(messages).await?;
        Ok(response.content)
    }
}

/// Decision port backed by structured chat completions
///
/// Asks the model for a JSON object naming the reply text, the next agent
/// (constrained to the caller's legal targets plus "finish"), and an
/// optional topic label.
#[derive(Debug, Clone)]
pub struct DecisionClient {
    llm: LlmClient,
}

impl DecisionClient {
    /// Create a decision client on top of an existing LLM client
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl DecisionPort for DecisionClient {
    async fn decide(
        &self,
        agent: AgentKind,
        prompt: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<RoutingDecision> {
        let schema = decision_schema(agent);
        let request = ChatRequest::new(self.llm.default_model(), prompt)
            .with_temperature(self.llm.config.temperature)
            .with_max_tokens(self.llm.config.max_tokens)
            .with_response_format(ResponseFormat::json_schema("routing_decision", schema));

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = self.llm.execute_request(&request) => result?,
        };

        parse_decision(agent, &response.content)
    }
}

/// JSON schema for one routing decision, constrained to the agent's legal targets
fn decision_schema(agent: AgentKind) -> serde_json::Value {
    let mut targets: Vec<&str> = agent
        .handoff_targets()
        .iter()
        .map(|t| t.wire_name())
        .collect();
    targets.push("finish");

    serde_json::json!({
        "type": "object",
        "properties": {
            "response": {
                "type": "string",
                "description": "Your reply to the user"
            },
            "goto": {
                "type": "string",
                "enum": targets,
                "description": "Agent to hand off to, or finish to return to the user"
            },
            "topic": {
                "type": "string",
                "description": "Short label for the conversation's current subject"
            }
        },
        "required": ["response", "goto"],
        "additionalProperties": false
    })
}

/// Raw decision object as the model emits it
#[derive(Debug, Deserialize)]
struct DecisionPayload {
    response: String,
    goto: String,
    #[serde(default)]
    topic: Option<String>,
}

/// Parse and validate the model's decision content
///
/// A schema-constrained response should never name an illegal target, but
/// the membership check stays because not every provider enforces strict
/// mode.
fn parse_decision(agent: AgentKind, content: &str) -> Result<RoutingDecision> {
    let payload: DecisionPayload = serde_json::from_str(content).map_err(|e| {
        Error::DecisionRejected(format!("decision payload was not valid JSON: {}", e))
    })?;

    let next_agent = if payload.goto == "finish" {
        NextAgent::Finish
    } else {
        let target = AgentKind::from_wire_name(&payload.goto).ok_or_else(|| {
            Error::DecisionRejected(format!("unknown handoff target '{}'", payload.goto))
        })?;
        if !agent.handoff_targets().contains(&target) {
            return Err(Error::DecisionRejected(format!(
                "agent '{}' may not hand off to '{}'",
                agent, target
            )));
        }
        NextAgent::Agent(target)
    };

    let topic = payload.topic.filter(|t| !t.trim().is_empty());

    Ok(RoutingDecision {
        response_text: payload.response,
        next_agent,
        topic,
    })
}

/// Backoff delay: doubling base or the server's requested wait, whichever
/// is longer, plus up to 10% jitter
fn calculate_backoff(attempt: u32, suggested_wait_secs: u64) -> u64 {
    let doubled = BACKOFF_BASE_MS * 2u64.pow(attempt - 1);
    let requested = suggested_wait_secs * 1000;
    let delay = doubled.max(requested);

    let jitter_ceiling = (delay / 10).max(1);
    delay + (rand_jitter() % jitter_ceiling)
}

// Clock-derived jitter; not uniform, but good enough to spread retries.
fn rand_jitter() -> u64 {
    use std::time::SystemTime;
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64 % 1000)
        .unwrap_or(0)
}

/// Pull a `retry_after` hint out of a 429 body, top-level or nested
fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;

    if let Some(retry_after) = json.get("retry_after").and_then(|v| v.as_u64()) {
        return Some(retry_after);
    }

    json.get("error")
        .and_then(|error| error.get("retry_after"))
        .and_then(|v| v.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            api_key: None,
            base_url: "https://example.com/api/v1".to_string(),
            default_model: "test/model".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_builder_overrides_win_over_config() {
        let client = LlmClient::builder()
            .config(test_config())
            .api_key("test-key")
            .base_url("https://override.example.com")
            .timeout_secs(60)
            .build()
            .unwrap();

        assert_eq!(client.default_model(), "test/model");
        assert_eq!(client.base_url, "https://override.example.com");
    }

    #[test]
    fn test_builder_requires_api_key() {
        assert!(LlmClient::builder().config(test_config()).build().is_err());
    }

    #[test]
    fn test_base_url_defaults_from_config() {
        let client = LlmClient::new(test_config(), "test-key").unwrap();
        assert_eq!(client.base_url, "https://example.com/api/v1");
    }

    #[test]
    fn test_client_debug_omits_api_key() {
        let client = LlmClient::new(test_config(), "secret-key").unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("LlmClient"));
        assert!(!debug.contains("secret-key"));
    }

    #[test]
    fn test_client_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LlmClient>();
        assert_send_sync::<DecisionClient>();
    }

    #[test]
    fn test_decision_schema_constrains_targets() {
        let schema = decision_schema(AgentKind::RecipeSuggester);
        let targets = schema["properties"]["goto"]["enum"].as_array().unwrap();

        let names: Vec<&str> = targets.iter().filter_map(|v| v.as_str()).collect();
        assert!(names.contains(&"dietaryAdvisor"));
        assert!(names.contains(&"groceryListBuilder"));
        assert!(names.contains(&"foodInventory"));
        assert!(names.contains(&"finish"));
        assert!(!names.contains(&"recipeSuggester"));
    }

    #[test]
    fn test_parse_decision_handoff() {
        let content = r#"{"response": "Let me hand you over.", "goto": "groceryListBuilder", "topic": "weekly shop"}"#;
        let decision = parse_decision(AgentKind::RecipeSuggester, content).unwrap();

        assert_eq!(decision.response_text, "Let me hand you over.");
        assert_eq!(
            decision.next_agent,
            NextAgent::Agent(AgentKind::GroceryListBuilder)
        );
        assert_eq!(decision.topic.as_deref(), Some("weekly shop"));
    }

    #[test]
    fn test_parse_decision_finish() {
        let content = r#"{"response": "Here are three recipes.", "goto": "finish"}"#;
        let decision = parse_decision(AgentKind::RecipeSuggester, content).unwrap();

        assert_eq!(decision.next_agent, NextAgent::Finish);
        assert!(decision.topic.is_none());
    }

    #[test]
    fn test_parse_decision_blank_topic_dropped() {
        let content = r#"{"response": "ok", "goto": "finish", "topic": "  "}"#;
        let decision = parse_decision(AgentKind::FoodInventory, content).unwrap();
        assert!(decision.topic.is_none());
    }

    #[test]
    fn test_parse_decision_rejects_unknown_target() {
        let content = r#"{"response": "ok", "goto": "weatherBot"}"#;
        let result = parse_decision(AgentKind::RecipeSuggester, content);
        assert!(matches!(result, Err(Error::DecisionRejected(_))));
    }

    #[test]
    fn test_parse_decision_rejects_self_handoff() {
        let content = r#"{"response": "ok", "goto": "recipeSuggester"}"#;
        let result = parse_decision(AgentKind::RecipeSuggester, content);
        assert!(matches!(result, Err(Error::DecisionRejected(_))));
    }

    #[test]
    fn test_parse_decision_rejects_non_json() {
        let result = parse_decision(AgentKind::RecipeSuggester, "I think we should finish");
        assert!(matches!(result, Err(Error::DecisionRejected(_))));
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        assert!(calculate_backoff(1, 0) >= BACKOFF_BASE_MS);
        assert!(calculate_backoff(2, 0) >= BACKOFF_BASE_MS * 2);
        assert!(calculate_backoff(3, 0) >= BACKOFF_BASE_MS * 4);
    }

    #[test]
    fn test_backoff_honors_server_requested_wait() {
        // A 5 second retry_after beats the 1 second first step.
        assert!(calculate_backoff(1, 5) >= 5000);
    }

    #[test]
    fn test_extract_retry_after_top_level_and_nested() {
        assert_eq!(extract_retry_after(r#"{"retry_after": 30}"#), Some(30));
        assert_eq!(
            extract_retry_after(r#"{"error": {"retry_after": 60}}"#),
            Some(60)
        );
        assert_eq!(extract_retry_after(r#"{"message": "rate limited"}"#), None);
        assert_eq!(extract_retry_after("not json"), None);
    }
}
