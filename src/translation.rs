use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::channel::{ChannelDirectory, Side};

pub mod deepl;

pub use self::deepl::DeepLTranslator;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("translation provider returned no translations")]
    EmptyResponse,
}

/// Boundary to the external translation provider. Implementations do not
/// retry; whatever policy the provider binding has is all the engine gets.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub translated_text: String,
    pub source_side: Side,
    pub target_side: Side,
    /// True when the provider was never called (whitespace-only input) and
    /// `translated_text` is the input unchanged.
    pub skipped: bool,
}

/// Maps a side role onto concrete language codes and dispatches to the
/// provider. Whitespace-only input (attachment-only messages, mostly) is
/// passed through untranslated without spending provider quota.
pub struct TranslationService {
    translator: Arc<dyn Translator>,
    directory: ChannelDirectory,
}

impl TranslationService {
    pub fn new(translator: Arc<dyn Translator>, directory: ChannelDirectory) -> Self {
        Self {
            translator,
            directory,
        }
    }

    pub async fn translate_for_side(
        &self,
        text: &str,
        source_side: Side,
    ) -> Result<TranslationOutcome, TranslationError> {
        let target_side = source_side.opposite();

        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!(
                "skipping translation of whitespace-only text source={} target={}",
                source_side, target_side
            );
            return Ok(TranslationOutcome {
                translated_text: text.to_string(),
                source_side,
                target_side,
                skipped: true,
            });
        }

        let translated_text = self
            .translator
            .translate(
                trimmed,
                self.directory.source_lang(source_side),
                self.directory.target_lang(target_side),
            )
            .await?;

        Ok(TranslationOutcome {
            translated_text,
            source_side,
            target_side,
            skipped: false,
        })
    }
}
