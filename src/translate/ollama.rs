use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::error::{Result, AlignError};
use super::{Translator, TranslationError, common::{BaseTranslator, clean_translation_response}};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Translation through an ollama server
pub struct OllamaTranslator {
    base: BaseTranslator,
}

impl OllamaTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        Ok(Self {
            base: BaseTranslator::new(config)?,
        })
    }

    async fn generate_once(&self, prompt: &str) -> std::result::Result<String, TranslationError> {
        let request = GenerateRequest {
            model: self.base.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let url = format!("{}/api/generate", self.base.config.endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let response = self.base.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Api { status, body });
        }

        let generated: GenerateResponse = response.json().await
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;

        debug!("Raw Ollama response: {}", generated.response);
        clean_translation_response(&generated.response)
    }
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate(&self, source_text: &str) -> std::result::Result<String, TranslationError> {
        let prompt = self.base.build_translation_prompt(source_text);
        self.base.with_retries(|| self.generate_once(&prompt)).await
    }

    async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/api/show", self.base.config.endpoint.trim_end_matches('/'));
        let model = &self.base.config.model;

        let response = self.base.client
            .post(&url)
            .json(&json!({ "name": model }))
            .send()
            .await
            .map_err(|e| AlignError::Translation(format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", model);
            Ok(())
        } else {
            Err(AlignError::Translation(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                model, model
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, max_retries: u32) -> TranslateConfig {
        TranslateConfig {
            endpoint: server.uri(),
            model: "test-model".to_string(),
            max_retries,
            timeout_secs: 5,
            ..TranslateConfig::default()
        }
    }

    #[tokio::test]
    async fn test_translate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({ "model": "test-model", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "The cat sat.\nIt was happy.\n",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let translator = OllamaTranslator::new(config_for(&server, 0)).unwrap();
        let translated = translator.translate("החתול ישב. הוא היה שמח.").await.unwrap();

        assert_eq!(translated, "The cat sat.\nIt was happy.");
    }

    #[tokio::test]
    async fn test_server_error_is_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .expect(2)
            .mount(&server)
            .await;

        let translator = OllamaTranslator::new(config_for(&server, 1)).unwrap();
        let err = translator.translate("שלום").await.unwrap_err();

        assert_eq!(
            err,
            TranslationError::Api { status: 500, body: "model crashed".to_string() }
        );
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Good morning.",
                "done": true
            })))
            .mount(&server)
            .await;

        let translator = OllamaTranslator::new(config_for(&server, 2)).unwrap();
        assert_eq!(translator.translate("בוקר טוב.").await.unwrap(), "Good morning.");
    }

    #[tokio::test]
    async fn test_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "   ",
                "done": true
            })))
            .mount(&server)
            .await;

        let translator = OllamaTranslator::new(config_for(&server, 0)).unwrap();
        assert_eq!(
            translator.translate("שלום").await,
            Err(TranslationError::EmptyResponse)
        );
    }

    #[tokio::test]
    async fn test_check_availability() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let translator = OllamaTranslator::new(config_for(&server, 0)).unwrap();
        assert!(matches!(
            translator.check_availability().await,
            Err(AlignError::Translation(_))
        ));
    }
}
