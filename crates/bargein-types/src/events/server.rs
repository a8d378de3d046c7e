use crate::audio::Base64EncodedAudioBytes;
use crate::ids::ResponseId;
use crate::status::{PauseReason, Status};

/// `stream.start` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamStartEvent {
    response_id: ResponseId,
    mime_type: String,
}

impl StreamStartEvent {
    pub fn new(response_id: ResponseId, mime_type: &str) -> Self {
        Self {
            response_id,
            mime_type: mime_type.to_string(),
        }
    }

    pub fn response_id(&self) -> &ResponseId {
        &self.response_id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// `stream.chunk` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamChunkEvent {
    response_id: ResponseId,

    /// A slice of the synthesized audio
    audio: Base64EncodedAudioBytes,
}

impl StreamChunkEvent {
    pub fn new(response_id: ResponseId, audio: Base64EncodedAudioBytes) -> Self {
        Self { response_id, audio }
    }

    pub fn response_id(&self) -> &ResponseId {
        &self.response_id
    }

    pub fn audio(&self) -> &Base64EncodedAudioBytes {
        &self.audio
    }
}

/// `stream.end` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamEndEvent {
    response_id: ResponseId,
}

impl StreamEndEvent {
    pub fn new(response_id: ResponseId) -> Self {
        Self { response_id }
    }

    pub fn response_id(&self) -> &ResponseId {
        &self.response_id
    }
}

/// `pause.changed` event
///
/// The only control signal for suspending or resuming playback. A receiver must
/// ignore it when `response_id` differs from its current stream.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PauseChangedEvent {
    response_id: ResponseId,
    paused: bool,
    reason: PauseReason,
}

impl PauseChangedEvent {
    pub fn new(response_id: ResponseId, paused: bool, reason: PauseReason) -> Self {
        Self {
            response_id,
            paused,
            reason,
        }
    }

    pub fn response_id(&self) -> &ResponseId {
        &self.response_id
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn reason(&self) -> PauseReason {
        self.reason
    }
}

/// `response.interrupted` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseInterruptedEvent {
    response_id: ResponseId,
}

impl ResponseInterruptedEvent {
    pub fn new(response_id: ResponseId) -> Self {
        Self { response_id }
    }

    pub fn response_id(&self) -> &ResponseId {
        &self.response_id
    }
}

/// `status.changed` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StatusChangedEvent {
    status: Status,
}

impl StatusChangedEvent {
    pub fn new(status: Status) -> Self {
        Self { status }
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

/// `user.turn` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserTurnEvent {
    text: String,
}

impl UserTurnEvent {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `error` event
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    message: String,
}

impl ErrorEvent {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
