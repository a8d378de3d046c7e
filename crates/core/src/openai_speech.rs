use crate::stt::{SpeechToText, Utterance};
use crate::tts::{SpeechOptions, SpeechStream, TextToSpeech, mime_type_for};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
pub struct VerboseTranscription {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptionSegment>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionSegment {
    pub avg_logprob: f32,
}

impl VerboseTranscription {
    /// Mean per-segment token probability, in [0, 1]. Zero when nothing was recognized.
    pub fn confidence(&self) -> f32 {
        if self.segments.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.segments.iter().map(|s| s.avg_logprob.exp()).sum();
        (sum / self.segments.len() as f32).clamp(0.0, 1.0)
    }
}

/// Speech client for the OpenAI audio endpoints. Implements both collaborators.
pub struct OpenAiSpeech {
    client: Client,
    base_url: String,
    api_key: SecretString,
    tts_model: String,
    stt_model: String,
}

impl OpenAiSpeech {
    pub fn new(api_key: String, tts_model: String, stt_model: String) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: SecretString::from(api_key),
            tts_model,
            stt_model,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TextToSpeech for OpenAiSpeech {
    async fn generate(&self, text: &str, options: &SpeechOptions) -> Result<SpeechStream> {
        let body = serde_json::json!({
            "model": self.tts_model,
            "input": text,
            "voice": options.voice,
            "response_format": options.format,
            "speed": options.speed,
        });

        let resp = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("Speech request failed")?
            .error_for_status()
            .context("Speech endpoint returned an error status")?;

        let mime_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_else(|| mime_type_for(&options.format))
            .to_string();

        let chunks = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from))
            .boxed();

        Ok(SpeechStream { mime_type, chunks })
    }
}

#[async_trait]
impl SpeechToText for OpenAiSpeech {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<Utterance> {
        let file = reqwest::multipart::Part::bytes(audio)
            .file_name("utterance.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.stt_model.clone())
            .text("response_format", "verbose_json")
            .part("file", file);

        let transcription = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .context("Transcription request failed")?
            .error_for_status()
            .context("Transcription endpoint returned an error status")?
            .json::<VerboseTranscription>()
            .await
            .context("Failed to parse transcription response")?;

        Ok(Utterance {
            confidence: transcription.confidence(),
            text: transcription.text.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_averages_segment_probabilities() {
        let parsed: VerboseTranscription = serde_json::from_str(
            r#"{"text":" hi there","segments":[{"avg_logprob":0.0},{"avg_logprob":-0.6931472}]}"#,
        )
        .unwrap();
        assert!((parsed.confidence() - 0.75).abs() < 1e-4);
    }

    #[test]
    fn missing_segments_mean_no_confidence() {
        let parsed: VerboseTranscription = serde_json::from_str(r#"{"text":""}"#).unwrap();
        assert_eq!(parsed.confidence(), 0.0);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let speech = OpenAiSpeech::new("k".into(), "tts-1".into(), "whisper-1".into())
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(speech.base_url, "http://localhost:8080/v1");
    }

    #[tokio::test]
    #[ignore]
    async fn test_generate_streams_audio() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let speech = OpenAiSpeech::new(api_key, "tts-1".into(), "whisper-1".into());
        let mut stream = speech
            .generate("Hello there.", &SpeechOptions::default())
            .await
            .unwrap();
        assert_eq!(stream.mime_type, "audio/mpeg");
        let first = stream.chunks.next().await.expect("at least one chunk");
        assert!(!first.unwrap().is_empty());
    }
}
