use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TranslationConfig;

use super::{TranslationError, Translator};

/// Thin binding to the DeepL v2 REST API. The configured endpoint decides
/// free vs pro plan; authentication is the `DeepL-Auth-Key` header scheme.
pub struct DeepLTranslator {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl DeepLTranslator {
    pub fn new(config: &TranslationConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
        }
    }
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: [&'a str; 1],
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translations: Vec<TranslatedText>,
}

#[derive(Deserialize)]
struct TranslatedText {
    text: String,
}

#[async_trait]
impl Translator for DeepLTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        debug!(
            "deepl translate source={} target={} chars={}",
            source_lang,
            target_lang,
            text.chars().count()
        );

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&TranslateRequest {
                text: [text],
                source_lang,
                target_lang,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let payload: TranslateResponse = response.json().await?;
        payload
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or(TranslationError::EmptyResponse)
    }
}
