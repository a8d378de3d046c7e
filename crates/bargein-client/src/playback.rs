//! Listener-side model of the audio being played back.
//!
//! [`PlaybackSurface`] applies coordinator events to a local buffer, decides
//! which locally detected speech-starts are forwarded, and tells the caller
//! when a response has been played to the end.

use crate::suppression::SuppressionTimer;
use crate::types::events::client::{PlaybackEndedEvent, UtteranceStartedEvent};
use crate::types::{ClientEvent, ResponseId, ServerEvent, Status, audio};
use bytes::{Bytes, BytesMut};
use std::time::Instant;

#[derive(Debug)]
struct LocalStream {
    response_id: ResponseId,
    mime_type: String,
    buffer: BytesMut,
    stream_ended: bool,
    paused: bool,
}

/// Audio released by one [`PlaybackSurface::drain`] call.
#[derive(Debug, Default)]
pub struct Played {
    pub audio: Bytes,
    /// Set once the response has been played completely; forward it to the coordinator.
    pub finished: Option<ClientEvent>,
}

#[derive(Debug, Default)]
pub struct PlaybackSurface {
    stream: Option<LocalStream>,
    suppression: SuppressionTimer,
    status: Option<Status>,
}

impl PlaybackSurface {
    pub fn new(suppression: SuppressionTimer) -> Self {
        Self {
            stream: None,
            suppression,
            status: None,
        }
    }

    pub fn current_response(&self) -> Option<&ResponseId> {
        self.stream.as_ref().map(|s| &s.response_id)
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.stream.as_ref().map(|s| s.mime_type.as_str())
    }

    pub fn is_paused(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.paused)
    }

    /// The response to name when reporting an utterance captured during a pause.
    pub fn paused_response_id(&self) -> Option<ResponseId> {
        self.stream
            .as_ref()
            .filter(|s| s.paused)
            .map(|s| s.response_id.clone())
    }

    pub fn buffered(&self) -> usize {
        self.stream.as_ref().map_or(0, |s| s.buffer.len())
    }

    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.suppression.is_suppressed(now)
    }

    fn matching(&mut self, id: &ResponseId) -> Option<&mut LocalStream> {
        self.stream.as_mut().filter(|s| &s.response_id == id)
    }

    /// Applies one coordinator event.
    pub fn apply(&mut self, event: &ServerEvent, now: Instant) {
        match event {
            ServerEvent::StreamStart(data) => {
                // A resync for the stream already playing keeps its buffer.
                if self.current_response() == Some(data.response_id()) {
                    return;
                }
                tracing::debug!("stream {} started ({})", data.response_id(), data.mime_type());
                self.stream = Some(LocalStream {
                    response_id: data.response_id().clone(),
                    mime_type: data.mime_type().to_string(),
                    buffer: BytesMut::new(),
                    stream_ended: false,
                    paused: false,
                });
            }
            ServerEvent::StreamChunk(data) => {
                let Some(stream) = self.matching(data.response_id()) else {
                    tracing::debug!("dropping chunk for stale stream {}", data.response_id());
                    return;
                };
                match audio::decode(data.audio()) {
                    Ok(bytes) => stream.buffer.extend_from_slice(&bytes),
                    Err(e) => tracing::warn!("undecodable audio chunk: {}", e),
                }
            }
            ServerEvent::StreamEnd(data) => {
                if let Some(stream) = self.matching(data.response_id()) {
                    stream.stream_ended = true;
                }
            }
            ServerEvent::PauseChanged(data) => {
                let Some(stream) = self.matching(data.response_id()) else {
                    tracing::debug!("ignoring pause change for {}", data.response_id());
                    return;
                };
                stream.paused = data.paused();
                if !data.paused() && data.reason().arms_suppression() {
                    self.suppression.arm(now);
                }
            }
            ServerEvent::ResponseInterrupted(data) => {
                if self.matching(data.response_id()).is_some() {
                    tracing::debug!("flushing interrupted stream {}", data.response_id());
                    self.stream = None;
                }
            }
            ServerEvent::StatusChanged(data) => self.status = Some(data.status()),
            ServerEvent::UserTurn(_) | ServerEvent::Error(_) => {}
        }
    }

    /// Local voice activity detected.
    ///
    /// Returns the signal to forward to the coordinator, or `None` when the
    /// suppression window swallows it. A forwarded start also pauses local
    /// playback right away instead of waiting for the round trip.
    pub fn on_local_speech_start(&mut self, now: Instant) -> Option<ClientEvent> {
        if self.suppression.is_suppressed(now) {
            tracing::debug!("speech start suppressed");
            return None;
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.paused = true;
        }
        Some(ClientEvent::UtteranceStarted(UtteranceStartedEvent::new()))
    }

    /// Plays up to `max_bytes` of buffered audio.
    pub fn drain(&mut self, max_bytes: usize) -> Played {
        let Some(stream) = self.stream.as_mut() else {
            return Played::default();
        };
        if stream.paused {
            return Played::default();
        }

        let take = max_bytes.min(stream.buffer.len());
        let audio = stream.buffer.split_to(take).freeze();
        if !(stream.stream_ended && stream.buffer.is_empty()) {
            return Played {
                audio,
                finished: None,
            };
        }

        let response_id = stream.response_id.clone();
        self.stream = None;
        tracing::debug!("playback of {} finished", response_id);
        Played {
            audio,
            finished: Some(ClientEvent::PlaybackEnded(PlaybackEndedEvent::new(
                response_id,
            ))),
        }
    }
}
