//! ElevenLabs speech-to-text implementation.

use super::{segments_from_words, Segment, Transcriber, WordTranscription};
use crate::error::{ChannelChatError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

const SPEECH_TO_TEXT_URL: &str = "https://api.elevenlabs.io/v1/speech-to-text";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// Long recordings take a while to transcribe.
const REQUEST_TIMEOUT_SECS: u64 = 900;

/// Transcriber backed by the ElevenLabs Scribe model.
pub struct ElevenLabsTranscriber {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
}

impl ElevenLabsTranscriber {
    /// Create a transcriber with an explicit API key.
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model_id: model_id.into(),
        })
    }

    /// Create a transcriber using the key from the environment, if set.
    pub fn from_env(model_id: &str) -> Result<Option<Self>> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Self::new(key.trim(), model_id).map(Some),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Transcriber for ElevenLabsTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<Segment>> {
        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();

        info!("Uploading {} bytes for transcription", bytes.len());

        let form = Form::new()
            .text("model_id", self.model_id.clone())
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(SPEECH_TO_TEXT_URL)
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelChatError::Transcription(format!(
                "speech-to-text request failed ({}): {}",
                status, body
            )));
        }

        let transcription: WordTranscription = response.json().await?;
        debug!("Received {} timed words", transcription.words.len());

        Ok(segments_from_words(&transcription))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_audio_fails_before_upload() {
        let transcriber = ElevenLabsTranscriber::new("test-key", "scribe_v1").unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = transcriber
            .transcribe(&dir.path().join("missing.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelChatError::Io(_)));
    }
}
