//! Wire types for the OpenAI-compatible chat completions API
//!
//! Only the subset the decision client and chat service actually send and
//! receive, including the `response_format` extension for structured output.

use serde::{Deserialize, Serialize};

/// Speaker role attached to a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One chat message as the API expects it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// `response_format` request field (OpenAI `json_schema` flavor)
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub json_schema: JsonSchemaFormat,
}

/// Named schema the model output must conform to
#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: serde_json::Value,
}

impl ResponseFormat {
    /// Strict JSON output constrained to `schema`
    pub fn json_schema(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            format_type: "json_schema".to_string(),
            json_schema: JsonSchemaFormat {
                name: name.into(),
                strict: true,
                schema,
            },
        }
    }
}

/// Chat completions request body
///
/// Optional fields are omitted from the JSON entirely when unset rather
/// than sent as null, which some OpenAI-compatible backends reject.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            response_format: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// Token accounting block of a completion response
///
/// `total_tokens` defaults to zero because some providers omit it.
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Why the model stopped generating
///
/// `Unknown` absorbs any value this enum does not list, so a new provider
/// string never fails deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
    #[serde(other)]
    Unknown,
}

/// One completion choice; the APIs used here always return exactly one
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub index: usize,
    pub message: Message,
    pub finish_reason: Option<FinishReason>,
}

/// Chat completions response body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

/// Flattened view of a completion: the first choice plus bookkeeping
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub tokens_used: u32,
    pub finish_reason: FinishReason,
}

impl LlmResponse {
    /// `None` when the response carries no choices at all
    pub fn from_chat_response(response: ChatResponse) -> Option<Self> {
        let choice = response.choices.first()?;

        Some(Self {
            content: choice.message.content.clone(),
            model: response.model,
            tokens_used: response
                .usage
                .as_ref()
                .map(|usage| usage.total_tokens)
                .unwrap_or(0),
            finish_reason: choice.finish_reason.clone().unwrap_or(FinishReason::Unknown),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors_set_roles() {
        let system = Message::system("You are the recipe suggester.");
        assert_eq!(system.role, MessageRole::System);
        assert_eq!(system.content, "You are the recipe suggester.");

        assert_eq!(Message::user("dinner ideas?").role, MessageRole::User);
        assert_eq!(
            Message::assistant("Try a stir-fry.").role,
            MessageRole::Assistant
        );
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(MessageRole::System.to_string(), "system");
        assert_eq!(MessageRole::User.to_string(), "user");
        assert_eq!(MessageRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_request_omits_unset_options() {
        let request = ChatRequest::new("test-model", vec![Message::user("hi")]);
        let json = serde_json::to_string(&request).unwrap();

        assert!(json.contains("\"model\":\"test-model\""));
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
        assert!(!json.contains("response_format"));
    }

    #[test]
    fn test_request_builder_applies_options() {
        let request = ChatRequest::new("test-model", vec![])
            .with_temperature(0.7)
            .with_max_tokens(1024);

        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(1024));
        assert!(request.response_format.is_none());
    }

    #[test]
    fn test_json_schema_format_serializes_as_strict() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "response": { "type": "string" } },
            "required": ["response"]
        });
        let request = ChatRequest::new("test-model", vec![])
            .with_response_format(ResponseFormat::json_schema("routing_decision", schema));

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"type\":\"json_schema\""));
        assert!(json.contains("\"name\":\"routing_decision\""));
        assert!(json.contains("\"strict\":true"));
    }

    #[test]
    fn test_response_parses_choice_and_usage() {
        let json = r#"{
            "id": "gen-42",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "openai/gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Baked salmon with quinoa."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content, "Baked salmon with quinoa.");
        assert_eq!(response.choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.as_ref().unwrap().total_tokens, 19);
    }

    #[test]
    fn test_unrecognized_finish_reason_is_unknown() {
        let json = r#"{"index": 0, "message": {"role": "assistant", "content": "x"},
            "finish_reason": "some_new_reason"}"#;
        let choice: Choice = serde_json::from_str(json).unwrap();
        assert_eq!(choice.finish_reason, Some(FinishReason::Unknown));
    }

    #[test]
    fn test_flattened_response_takes_first_choice() {
        let response = ChatResponse {
            id: "gen-1".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model: "test-model".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant("Grilled chicken with broccoli."),
                finish_reason: Some(FinishReason::Stop),
            }],
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        };

        let flattened = LlmResponse::from_chat_response(response).unwrap();
        assert_eq!(flattened.content, "Grilled chicken with broccoli.");
        assert_eq!(flattened.tokens_used, 15);
        assert_eq!(flattened.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn test_flattened_response_requires_a_choice() {
        let response = ChatResponse {
            id: "gen-1".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model: "test-model".to_string(),
            choices: vec![],
            usage: None,
        };

        assert!(LlmResponse::from_chat_response(response).is_none());
    }
}
