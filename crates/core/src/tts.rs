use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;

/// Voice and format settings passed to the synthesizer with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOptions {
    pub voice: String,
    pub format: String,
    pub speed: f32,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            voice: "alloy".to_string(),
            format: "mp3".to_string(),
            speed: 1.0,
        }
    }
}

/// An incrementally produced audio response.
///
/// Dropping the stream must release the underlying connection; that is how a
/// cancelled generation stops.
pub struct SpeechStream {
    pub mime_type: String,
    pub chunks: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for SpeechStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechStream")
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

// Text-to-speech is consumed only through this trait so the coordinator can be
// driven by scripted streams in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn generate(&self, text: &str, options: &SpeechOptions) -> Result<SpeechStream>;
}

/// Maps a response format name onto the mime type announced in `stream.start`.
pub fn mime_type_for(format: &str) -> &'static str {
    match format {
        "mp3" => "audio/mpeg",
        "opus" => "audio/ogg",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "pcm" => "audio/pcm",
        _ => "application/octet-stream",
    }
}
