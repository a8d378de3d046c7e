pub mod client;
pub mod server;

use client::*;
use server::*;

/// Signals a listener sends to the coordinator.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "utterance.started")]
    UtteranceStarted(UtteranceStartedEvent),
    #[serde(rename = "utterance.result")]
    UtteranceResult(UtteranceResultEvent),
    #[serde(rename = "utterance.audio")]
    UtteranceAudio(UtteranceAudioEvent),
    #[serde(rename = "playback.ended")]
    PlaybackEnded(PlaybackEndedEvent),
    #[serde(rename = "response.speak")]
    Speak(SpeakEvent),
}

/// Signals the coordinator emits to a listener.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "stream.start")]
    StreamStart(StreamStartEvent),
    #[serde(rename = "stream.chunk")]
    StreamChunk(StreamChunkEvent),
    #[serde(rename = "stream.end")]
    StreamEnd(StreamEndEvent),
    #[serde(rename = "pause.changed")]
    PauseChanged(PauseChangedEvent),
    #[serde(rename = "response.interrupted")]
    ResponseInterrupted(ResponseInterruptedEvent),
    #[serde(rename = "status.changed")]
    StatusChanged(StatusChangedEvent),
    #[serde(rename = "user.turn")]
    UserTurn(UserTurnEvent),
    #[serde(rename = "error")]
    Error(ErrorEvent),
}

impl ServerEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::StreamStart(_) => "stream.start",
            ServerEvent::StreamChunk(_) => "stream.chunk",
            ServerEvent::StreamEnd(_) => "stream.end",
            ServerEvent::PauseChanged(_) => "pause.changed",
            ServerEvent::ResponseInterrupted(_) => "response.interrupted",
            ServerEvent::StatusChanged(_) => "status.changed",
            ServerEvent::UserTurn(_) => "user.turn",
            ServerEvent::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PauseReason, ResponseId, Status};

    #[test]
    fn pause_changed_wire_shape() {
        let event = ServerEvent::PauseChanged(PauseChangedEvent::new(
            ResponseId::new("resp_1"),
            true,
            PauseReason::SpeechStarted,
        ));
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "pause.changed");
        assert_eq!(json["response_id"], "resp_1");
        assert_eq!(json["paused"], true);
        assert_eq!(json["reason"], "speech_started");
    }

    #[test]
    fn status_serializes_lowercase() {
        let event = ServerEvent::StatusChanged(StatusChangedEvent::new(Status::Listening));
        let text = serde_json::to_string(&event).unwrap();
        assert_eq!(text, r#"{"type":"status.changed","status":"listening"}"#);
    }

    #[test]
    fn utterance_result_without_paused_id_parses() {
        let text = r#"{"type":"utterance.result","text":"hello","confidence":0.5}"#;
        match serde_json::from_str::<ClientEvent>(text).unwrap() {
            ClientEvent::UtteranceResult(data) => {
                assert_eq!(data.text(), "hello");
                assert_eq!(data.confidence(), 0.5);
                assert!(data.paused_response_id().is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn utterance_started_has_empty_body() {
        let text = r#"{"type":"utterance.started"}"#;
        assert!(matches!(
            serde_json::from_str::<ClientEvent>(text).unwrap(),
            ClientEvent::UtteranceStarted(_)
        ));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let text = r#"{"type":"session.update"}"#;
        assert!(serde_json::from_str::<ClientEvent>(text).is_err());
    }
}
