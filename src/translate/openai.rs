use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TranslateConfig;
use crate::error::{Result, AlignError};
use super::{Translator, TranslationError, common::{BaseTranslator, clean_translation_response}};

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Translation through an OpenAI-compatible chat-completions endpoint
pub struct OpenAiTranslator {
    base: BaseTranslator,
    api_key: Option<String>,
}

impl OpenAiTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                AlignError::Config(format!("Environment variable {} is not set", var))
            })?),
            None => None,
        };

        Ok(Self {
            base: BaseTranslator::new(config)?,
            api_key,
        })
    }

    async fn complete_once(&self, prompt: &str) -> std::result::Result<String, TranslationError> {
        let request = ChatRequest {
            model: self.base.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.0,
        };

        let url = format!("{}/v1/chat/completions", self.base.config.endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let mut builder = self.base.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TranslationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Api { status, body });
        }

        let chat: ChatResponse = response.json().await
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;

        let content = chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(TranslationError::EmptyResponse)?;

        clean_translation_response(&content)
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, source_text: &str) -> std::result::Result<String, TranslationError> {
        let prompt = self.base.build_translation_prompt(source_text);
        self.base.with_retries(|| self.complete_once(&prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslationProvider;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chat_completion_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Peace be with you." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("BITEXT_ALIGN_TEST_OPENAI_KEY", "sk-test") };
        let config = TranslateConfig {
            provider: TranslationProvider::OpenAi,
            endpoint: server.uri(),
            api_key_env: Some("BITEXT_ALIGN_TEST_OPENAI_KEY".to_string()),
            max_retries: 0,
            ..TranslateConfig::default()
        };

        let translator = OpenAiTranslator::new(config).unwrap();
        assert_eq!(translator.translate("שלום עליכם.").await.unwrap(), "Peace be with you.");
    }

    #[tokio::test]
    async fn test_no_choices_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let config = TranslateConfig {
            endpoint: server.uri(),
            max_retries: 0,
            ..TranslateConfig::default()
        };
        let translator = OpenAiTranslator::new(config).unwrap();
        assert_eq!(translator.translate("x").await, Err(TranslationError::EmptyResponse));
    }

    #[test]
    fn test_missing_key_variable() {
        let config = TranslateConfig {
            api_key_env: Some("BITEXT_ALIGN_TEST_UNSET_KEY".to_string()),
            ..TranslateConfig::default()
        };
        assert!(matches!(OpenAiTranslator::new(config), Err(AlignError::Config(_))));
    }
}
