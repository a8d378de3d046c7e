use crate::audio::Base64EncodedAudioBytes;
use crate::ids::ResponseId;

/// `utterance.started` event
///
/// Voice activity began on the listener side. Carries no confidence.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UtteranceStartedEvent {}

impl UtteranceStartedEvent {
    pub fn new() -> Self {
        Self {}
    }
}

/// `utterance.result` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UtteranceResultEvent {
    /// Transcribed text of the utterance
    text: String,

    /// Speech-to-text confidence in [0, 1]
    confidence: f32,

    /// The response the listener had paused, if it tracked one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    paused_response_id: Option<ResponseId>,
}

impl UtteranceResultEvent {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            paused_response_id: None,
        }
    }
    pub fn with_paused_response_id(mut self, id: ResponseId) -> Self {
        self.paused_response_id = Some(id);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn paused_response_id(&self) -> Option<&ResponseId> {
        self.paused_response_id.as_ref()
    }
}

/// `utterance.audio` event
///
/// Captured audio for an utterance that the server should transcribe itself.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UtteranceAudioEvent {
    audio: Base64EncodedAudioBytes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    paused_response_id: Option<ResponseId>,
}

impl UtteranceAudioEvent {
    pub fn new(audio: Base64EncodedAudioBytes) -> Self {
        Self {
            audio,
            paused_response_id: None,
        }
    }
    pub fn with_paused_response_id(mut self, id: ResponseId) -> Self {
        self.paused_response_id = Some(id);
        self
    }

    pub fn audio(&self) -> &Base64EncodedAudioBytes {
        &self.audio
    }

    pub fn paused_response_id(&self) -> Option<&ResponseId> {
        self.paused_response_id.as_ref()
    }
}

/// `playback.ended` event
///
/// The listener has consumed every buffered byte of a response.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlaybackEndedEvent {
    response_id: ResponseId,
}

impl PlaybackEndedEvent {
    pub fn new(response_id: ResponseId) -> Self {
        Self { response_id }
    }

    pub fn response_id(&self) -> &ResponseId {
        &self.response_id
    }
}

/// `response.speak` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SpeakEvent {
    text: String,
}

impl SpeakEvent {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
