//! Ports for speech synthesis.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::Error;
use crate::domain::tts::{SpeechAudio, SpeechRequest};

define_port_error! {
    /// Errors raised by speech sources.
    pub enum TextToSpeechError {
        /// No upstream service is configured.
        NotConfigured => "text-to-speech is not configured",
        /// Upstream refused the request.
        Rejected { message: String } => "text-to-speech request rejected: {message}",
        /// Upstream failed or could not be reached.
        Unavailable { message: String } => "text-to-speech unavailable: {message}",
    }
}

impl From<TextToSpeechError> for Error {
    fn from(error: TextToSpeechError) -> Self {
        match error {
            TextToSpeechError::NotConfigured => {
                Self::service_unavailable("text-to-speech is not configured")
            }
            TextToSpeechError::Rejected { message } => Self::invalid_request(message),
            TextToSpeechError::Unavailable { message } => {
                tracing::warn!(%message, "text-to-speech upstream failed");
                Self::service_unavailable("text-to-speech is temporarily unavailable")
            }
        }
    }
}

/// Driven port: something that turns text into audio.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextToSpeechSource: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, TextToSpeechError>;
}

/// Source used when no upstream is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTextToSpeechSource;

#[async_trait]
impl TextToSpeechSource for FixtureTextToSpeechSource {
    async fn synthesize(&self, _request: &SpeechRequest) -> Result<SpeechAudio, TextToSpeechError> {
        Err(TextToSpeechError::not_configured())
    }
}

/// Driving port used by the HTTP adapter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechCommand: Send + Sync {
    async fn speak(&self, request: SpeechRequest) -> Result<SpeechAudio, Error>;
}
