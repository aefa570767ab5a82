use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use weft_common::config::GeneratorConfig;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEEPSEEK_ENDPOINT: &str = "https://api.deepseek.com/chat/completions";

#[derive(Debug, Error)]
pub enum GenError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),
    #[error("API key for model {0} is missing")]
    MissingApiKey(String),
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error, status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Model reply carried no content")]
    EmptyReply,
    #[error("Failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode log: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Resolved connection settings for one chat model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProfile {
    pub endpoint: String,
    pub model: String,
    /// Some endpoints need streaming pinned off explicitly.
    pub stream: Option<bool>,
}

impl ModelProfile {
    /// Built-in profile table, keyed by the names the config file uses.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "gpt4" => Some(Self {
                endpoint: OPENAI_ENDPOINT.to_string(),
                model: "gpt-4".to_string(),
                stream: None,
            }),
            "gpt3.5" => Some(Self {
                endpoint: OPENAI_ENDPOINT.to_string(),
                model: "gpt-3.5-turbo".to_string(),
                stream: None,
            }),
            "deepseek" => Some(Self {
                endpoint: DEEPSEEK_ENDPOINT.to_string(),
                model: "deepseek-chat".to_string(),
                stream: Some(false),
            }),
            _ => None,
        }
    }

    /// Look up the active profile and its API key. Per-model config entries
    /// may override the endpoint and model id, for OpenAI-compatible APIs.
    pub fn resolve(config: &GeneratorConfig) -> Result<(Self, String), GenError> {
        let name = config.active_model.as_str();
        let mut profile =
            Self::builtin(name).ok_or_else(|| GenError::UnsupportedModel(name.to_string()))?;
        let settings = config.models.get(name);
        let api_key = settings.map(|s| s.api_key.clone()).unwrap_or_default();
        if api_key.is_empty() {
            return Err(GenError::MissingApiKey(name.to_string()));
        }
        if let Some(settings) = settings {
            if let Some(endpoint) = &settings.endpoint {
                profile.endpoint = endpoint.clone();
            }
            if let Some(model) = &settings.model {
                profile.model = model.clone();
            }
        }
        Ok((profile, api_key))
    }
}

/// One chat message in OpenAI wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Thin chat-completions client. One blocking POST per generation, no
/// streaming.
pub struct ChatClient {
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Send the messages and return the assistant's reply text.
    pub async fn complete(
        &self,
        profile: &ModelProfile,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<String, GenError> {
        let request = ChatRequest {
            model: &profile.model,
            messages,
            stream: profile.stream,
        };
        debug!(endpoint = %profile.endpoint, model = %profile.model, "sending chat request");
        let response = self
            .http
            .post(&profile.endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GenError::Api { status, message });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(GenError::EmptyReply);
        }
        Ok(content)
    }
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_common::config::ModelSettings;

    fn config(active: &str) -> GeneratorConfig {
        GeneratorConfig {
            active_model: active.to_string(),
            ..GeneratorConfig::default()
        }
    }

    fn with_key(active: &str, key: &str) -> GeneratorConfig {
        let mut cfg = config(active);
        cfg.models.insert(
            active.to_string(),
            ModelSettings {
                api_key: key.to_string(),
                ..ModelSettings::default()
            },
        );
        cfg
    }

    #[test]
    fn builtin_table_covers_the_shipped_models() {
        let gpt4 = ModelProfile::builtin("gpt4").unwrap();
        assert_eq!(gpt4.endpoint, OPENAI_ENDPOINT);
        assert_eq!(gpt4.model, "gpt-4");
        assert_eq!(gpt4.stream, None);

        let gpt35 = ModelProfile::builtin("gpt3.5").unwrap();
        assert_eq!(gpt35.model, "gpt-3.5-turbo");

        let deepseek = ModelProfile::builtin("deepseek").unwrap();
        assert_eq!(deepseek.endpoint, DEEPSEEK_ENDPOINT);
        assert_eq!(deepseek.model, "deepseek-chat");
        assert_eq!(deepseek.stream, Some(false));

        assert!(ModelProfile::builtin("claude").is_none());
    }

    #[test]
    fn resolve_rejects_unknown_model() {
        let err = ModelProfile::resolve(&with_key("llama", "k")).unwrap_err();
        assert!(matches!(err, GenError::UnsupportedModel(name) if name == "llama"));
    }

    #[test]
    fn resolve_requires_an_api_key() {
        // no models entry at all
        let err = ModelProfile::resolve(&config("gpt4")).unwrap_err();
        assert!(matches!(err, GenError::MissingApiKey(_)));
        // entry present but key empty
        let err = ModelProfile::resolve(&with_key("gpt4", "")).unwrap_err();
        assert!(matches!(err, GenError::MissingApiKey(_)));
    }

    #[test]
    fn resolve_applies_config_overrides() {
        let mut cfg = with_key("gpt4", "sk-1");
        {
            let settings = cfg.models.get_mut("gpt4").unwrap();
            settings.endpoint = Some("http://localhost:9999/v1".to_string());
            settings.model = Some("gpt-4-turbo".to_string());
        }
        let (profile, key) = ModelProfile::resolve(&cfg).unwrap();
        assert_eq!(profile.endpoint, "http://localhost:9999/v1");
        assert_eq!(profile.model, "gpt-4-turbo");
        assert_eq!(profile.stream, None);
        assert_eq!(key, "sk-1");
    }

    #[test]
    fn request_serializes_stream_only_when_pinned() {
        let messages = vec![ChatMessage::user("hi")];
        let plain = serde_json::to_value(ChatRequest {
            model: "gpt-4",
            messages: &messages,
            stream: None,
        })
        .unwrap();
        assert!(plain.get("stream").is_none());
        assert_eq!(plain["messages"][0]["role"], "user");

        let pinned = serde_json::to_value(ChatRequest {
            model: "deepseek-chat",
            messages: &messages,
            stream: Some(false),
        })
        .unwrap();
        assert_eq!(pinned["stream"], false);
    }

    #[test]
    fn reply_parsing_takes_the_first_choice() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}},
                {"index": 1, "message": {"role": "assistant", "content": "second"}}
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);
        assert_eq!(content.as_deref(), Some("first"));
    }
}
