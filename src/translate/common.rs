use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::TranslateConfig;
use crate::error::Result;
use super::TranslationError;

/// Base translator with the HTTP client and prompt shared by every backend
pub struct BaseTranslator {
    pub client: Client,
    pub config: TranslateConfig,
}

impl BaseTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Build the instruction given to the model.
    ///
    /// The model must keep sentence boundaries: one output line per input
    /// sentence, same order, nothing merged or split.
    pub fn build_translation_prompt(&self, text: &str) -> String {
        let source_name = language_code_to_name(&self.config.source_language);
        let target_name = language_code_to_name(&self.config.target_language);

        format!(
            "You are a professional translator.\n\
             \n\
             Translate the following {} text to {}.\n\
             \n\
             RULES:\n\
             1. Output exactly one line per input sentence, in the same order.\n\
             2. Do not merge sentences and do not split a sentence across lines.\n\
             3. Output ONLY the {} translation. No explanations, notes, or alternatives.\n\
             \n\
             [Text to translate]\n\
             {}\n",
            source_name, target_name, target_name, text
        )
    }

    /// Run `attempt` until it succeeds or the retry budget is spent.
    pub async fn with_retries<F, Fut>(&self, mut attempt: F) -> std::result::Result<String, TranslationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<String, TranslationError>>,
    {
        let mut tries = 0;
        loop {
            match attempt().await {
                Ok(text) => return Ok(text),
                Err(e) if tries < self.config.max_retries => {
                    tries += 1;
                    warn!(
                        "Translation attempt {} failed: {}; retrying ({}/{})",
                        tries, e, tries, self.config.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(250 * tries as u64)).await;
                }
                Err(e) => {
                    warn!("Translation failed after {} attempts: {}", tries + 1, e);
                    return Err(e);
                }
            }
        }
    }
}

/// Reduce a raw model reply to the translated lines.
///
/// Code fences, a leading `Translation:` label and blank lines are dropped;
/// every remaining line is trimmed.
pub fn clean_translation_response(response: &str) -> std::result::Result<String, TranslationError> {
    let lines: Vec<&str> = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .collect();

    let mut cleaned = lines.join("\n");
    for label in ["Translation:", "translation:"] {
        if let Some(rest) = cleaned.strip_prefix(label) {
            cleaned = rest.trim_start().to_string();
        }
    }

    debug!("Cleaned translation: {} lines", cleaned.lines().count());

    if cleaned.is_empty() {
        return Err(TranslationError::EmptyResponse);
    }
    Ok(cleaned)
}

/// Convert language code to full language name for clearer prompts
pub fn language_code_to_name(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "he" => "Hebrew".to_string(),
        "yi" => "Yiddish".to_string(),
        "arc" => "Aramaic".to_string(),
        "en" => "English".to_string(),
        "ar" => "Arabic".to_string(),
        "fr" => "French".to_string(),
        "de" => "German".to_string(),
        "es" => "Spanish".to_string(),
        "ru" => "Russian".to_string(),
        "it" => "Italian".to_string(),
        "pt" => "Portuguese".to_string(),
        "nl" => "Dutch".to_string(),
        "pl" => "Polish".to_string(),
        "uk" => "Ukrainian".to_string(),
        "hu" => "Hungarian".to_string(),
        "ja" => "Japanese".to_string(),
        "ko" => "Korean".to_string(),
        "zh" => "Chinese".to_string(),
        _ => code.to_string(), // Fallback to the code itself if not found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_prompt_demands_line_alignment() {
        let base = BaseTranslator::new(TranslateConfig::default()).unwrap();
        let prompt = base.build_translation_prompt("שלום. מה שלומך?");

        assert!(prompt.contains("Hebrew text to English"));
        assert!(prompt.contains("one line per input sentence"));
        assert!(prompt.contains("שלום. מה שלומך?"));
    }

    #[test]
    fn test_clean_strips_fences_and_label() {
        let raw = "```\nTranslation: Hello.\n\n  How are you?  \n```";
        assert_eq!(clean_translation_response(raw).unwrap(), "Hello.\nHow are you?");
    }

    #[test]
    fn test_clean_rejects_blank() {
        assert_eq!(
            clean_translation_response(" \n```\n```\n"),
            Err(TranslationError::EmptyResponse)
        );
    }

    #[test]
    fn test_language_names() {
        assert_eq!(language_code_to_name("HE"), "Hebrew");
        assert_eq!(language_code_to_name("xx"), "xx");
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let config = TranslateConfig {
            max_retries: 2,
            ..TranslateConfig::default()
        };
        let base = BaseTranslator::new(config).unwrap();
        let calls = AtomicU32::new(0);

        let result = base
            .with_retries(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(TranslationError::EmptyResponse)
                    } else {
                        Ok("done".to_string())
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let config = TranslateConfig {
            max_retries: 1,
            ..TranslateConfig::default()
        };
        let base = BaseTranslator::new(config).unwrap();
        let calls = AtomicU32::new(0);

        let result = base
            .with_retries(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TranslationError::Request("connection refused".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(TranslationError::Request(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
