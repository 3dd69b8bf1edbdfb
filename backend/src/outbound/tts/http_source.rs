//! Reqwest-backed speech source.
//!
//! Posts `{ text, languageCode, voice? }` as JSON and relays the audio body
//! with the upstream content type. Client errors become rejections; server
//! errors and transport failures become unavailability.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};

use crate::domain::ports::{TextToSpeechError, TextToSpeechSource};
use crate::domain::tts::{SpeechAudio, SpeechRequest};

const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";
const USER_AGENT: &str = concat!("lingo-backend/", env!("CARGO_PKG_VERSION"));

/// Speech source calling one HTTP endpoint.
pub struct HttpTextToSpeechSource {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpTextToSpeechSource {
    /// Build a source with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }
}

#[async_trait]
impl TextToSpeechSource for HttpTextToSpeechSource {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, TextToSpeechError> {
        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header(header::ACCEPT, "audio/*")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(map_transport_error)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or_else(|| DEFAULT_CONTENT_TYPE.to_owned(), str::to_owned);
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        if body.is_empty() {
            return Err(TextToSpeechError::unavailable("upstream returned no audio"));
        }
        Ok(SpeechAudio {
            content_type,
            bytes: body.to_vec(),
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> TextToSpeechError {
    if error.is_timeout() {
        TextToSpeechError::unavailable(format!("timed out: {error}"))
    } else {
        TextToSpeechError::unavailable(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> TextToSpeechError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            TextToSpeechError::unavailable(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            TextToSpeechError::unavailable(format!("credentials refused ({message})"))
        }
        _ if status.is_client_error() => TextToSpeechError::rejected(message),
        _ => TextToSpeechError::unavailable(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 120;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        preview.push_str("...");
    }
    preview
}
