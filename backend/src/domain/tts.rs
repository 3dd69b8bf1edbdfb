//! Text-to-speech proxy.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use super::Error;
use super::curriculum::normalize_language_code;
use super::ports::{SpeechCommand, TextToSpeechSource};

/// Longest text accepted, in characters after trimming.
pub const SPEECH_TEXT_MAX: usize = 500;

/// Text to read aloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    #[schema(example = "¿Dónde está la biblioteca?")]
    pub text: String,
    #[schema(example = "es")]
    pub language_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

impl SpeechRequest {
    /// Trim the text and normalise the language code.
    pub fn validated(self) -> Result<Self, Error> {
        let text = self.text.trim();
        if text.is_empty() || text.chars().count() > SPEECH_TEXT_MAX {
            return Err(Error::invalid_field(
                "text",
                "invalid_length",
                format!("text must be between 1 and {SPEECH_TEXT_MAX} characters"),
            ));
        }
        let language_code = normalize_language_code(&self.language_code).ok_or_else(|| {
            Error::invalid_field(
                "languageCode",
                "invalid_language_code",
                "languageCode must look like `es` or `pt-br`",
            )
        })?;
        Ok(Self {
            text: text.to_owned(),
            language_code,
            voice: self
                .voice
                .map(|voice| voice.trim().to_owned())
                .filter(|voice| !voice.is_empty()),
        })
    }
}

/// Audio returned by a speech source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Validates requests and forwards them to a [`TextToSpeechSource`].
#[derive(Clone)]
pub struct SpeechService {
    source: Arc<dyn TextToSpeechSource>,
}

impl SpeechService {
    pub fn new(source: Arc<dyn TextToSpeechSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl SpeechCommand for SpeechService {
    async fn speak(&self, request: SpeechRequest) -> Result<SpeechAudio, Error> {
        let request = request.validated()?;
        let audio = self.source.synthesize(&request).await?;
        debug!(
            language = %request.language_code,
            bytes = audio.bytes.len(),
            "speech synthesised"
        );
        Ok(audio)
    }
}
