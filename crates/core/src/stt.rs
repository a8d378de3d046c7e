use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// A transcribed utterance. Classified once and then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// In [0, 1].
    pub confidence: f32,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<Utterance>;
}
