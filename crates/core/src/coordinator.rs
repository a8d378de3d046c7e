//! The barge-in state machine.
//!
//! Every session owns one [`SessionSlot`] behind its own async mutex. All
//! signals for a session (voice activity, utterance results, generation
//! lifecycle, playback end) take that lock, so they are applied one at a time
//! in arrival order while unrelated sessions proceed independently. Outbound
//! events are pushed onto an unbounded channel while the lock is held, which
//! keeps their order and never waits on the listener.

use crate::confidence::{Classification, ConfidenceClassifier, UncertainPolicy};
use crate::directory::SessionDirectory;
use crate::error::CoordinatorError;
use crate::pending::PendingBargeIn;
use crate::registry::{PauseTarget, ResponseRegistry, SessionState, StreamEndOutcome};
use crate::stt::{SpeechToText, Utterance};
use crate::tts::{SpeechOptions, SpeechStream, TextToSpeech};
use bargein_types::events::server::*;
use bargein_types::{
    ChannelId, ClientEvent, PauseReason, ResponseId, ServerEvent, SessionId, Status, audio,
};
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    pub classifier: ConfidenceClassifier,
    pub uncertain_policy: UncertainPolicy,
    pub speech_options: SpeechOptions,
}

/// Text of genuine speech handed to the conversation layer as a new turn.
#[derive(Debug, Clone, PartialEq)]
pub struct UserTurn {
    pub session_id: SessionId,
    pub text: String,
}

/// A listener's handle on a session's outbound events.
#[derive(Debug)]
pub struct Attachment {
    pub id: u64,
    pub events: mpsc::UnboundedReceiver<ServerEvent>,
}

#[derive(Debug)]
struct Outbound {
    attachment: u64,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

#[derive(Debug, Default)]
struct SessionSlot {
    registry: ResponseRegistry,
    pending: PendingBargeIn,
    outbound: Option<Outbound>,
    closed: bool,
}

impl SessionSlot {
    fn emit(&self, event: ServerEvent) {
        let Some(outbound) = &self.outbound else {
            debug!("No listener attached, dropping {}", event.kind());
            return;
        };
        if outbound.tx.send(event).is_err() {
            debug!("Listener {} went away", outbound.attachment);
        }
    }

    fn emit_pause(&self, response_id: ResponseId, paused: bool, reason: PauseReason) {
        self.emit(ServerEvent::PauseChanged(PauseChangedEvent::new(
            response_id,
            paused,
            reason,
        )));
    }

    fn emit_status(&self, status: Status) {
        self.emit(ServerEvent::StatusChanged(StatusChangedEvent::new(status)));
    }
}

type SharedSlot = Arc<Mutex<SessionSlot>>;

/// What an utterance classification asks the coordinator to do.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Decision {
    Resume(PauseReason),
    Interrupt,
    Hold,
}

pub struct Coordinator {
    sessions: DashMap<SessionId, SharedSlot>,
    directory: Arc<dyn SessionDirectory>,
    tts: Arc<dyn TextToSpeech>,
    stt: Arc<dyn SpeechToText>,
    config: CoordinatorConfig,
    turn_tx: mpsc::UnboundedSender<UserTurn>,
    next_attachment: AtomicU64,
}

impl Coordinator {
    /// Creates a coordinator and the receiver on which accepted user turns arrive.
    pub fn new(
        config: CoordinatorConfig,
        directory: Arc<dyn SessionDirectory>,
        tts: Arc<dyn TextToSpeech>,
        stt: Arc<dyn SpeechToText>,
    ) -> (Self, mpsc::UnboundedReceiver<UserTurn>) {
        let (turn_tx, turn_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            sessions: DashMap::new(),
            directory,
            tts,
            stt,
            config,
            turn_tx,
            next_attachment: AtomicU64::new(1),
        };
        (coordinator, turn_rx)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn slot(&self, session: &SessionId) -> Option<SharedSlot> {
        self.sessions.get(session).map(|entry| entry.value().clone())
    }

    /// Attaches a listener to `session`, replacing any previous one.
    ///
    /// If a response is being streamed, the new listener is told about it
    /// (and about its paused state) straight away.
    pub async fn attach(&self, session: &SessionId) -> Attachment {
        loop {
            let shared = self.sessions.entry(session.clone()).or_default().clone();
            let mut slot = shared.lock().await;
            if slot.closed {
                continue;
            }

            let (tx, events) = mpsc::unbounded_channel();
            let id = self.next_attachment.fetch_add(1, Ordering::Relaxed);
            if slot.outbound.replace(Outbound { attachment: id, tx }).is_some() {
                info!("Session {} reattached by listener {}", session, id);
            } else {
                info!("Session {} attached by listener {}", session, id);
            }

            let resync = slot
                .registry
                .generating()
                .filter(|record| record.started())
                .map(|record| {
                    (
                        record.response_id().clone(),
                        record.mime_type().unwrap_or_default().to_string(),
                        record.paused(),
                    )
                });
            if let Some((response_id, mime_type, paused)) = resync {
                slot.emit(ServerEvent::StreamStart(StreamStartEvent::new(
                    response_id.clone(),
                    &mime_type,
                )));
                if paused {
                    slot.emit_pause(response_id, true, PauseReason::Resync);
                }
            }

            return Attachment { id, events };
        }
    }

    /// Detaches `attachment`. When it is the session's current listener the
    /// session is closed and any running generation is cancelled.
    pub async fn detach(&self, session: &SessionId, attachment: u64) -> bool {
        let Some(shared) = self.slot(session) else {
            return false;
        };
        let mut slot = shared.lock().await;
        if slot.outbound.as_ref().map(|o| o.attachment) != Some(attachment) {
            debug!("Listener {} is no longer current for {}", attachment, session);
            return false;
        }
        slot.outbound = None;
        slot.registry.clear();
        slot.closed = true;
        self.sessions.remove(session);
        info!("Session {} closed", session);
        true
    }

    pub async fn state(&self, session: &SessionId) -> SessionState {
        match self.slot(session) {
            Some(shared) => shared.lock().await.registry.state(),
            None => SessionState::Idle,
        }
    }

    pub async fn active_response(&self, session: &SessionId) -> Option<ResponseId> {
        let shared = self.slot(session)?;
        let slot = shared.lock().await;
        slot.registry.active().map(|r| r.response_id().clone())
    }

    pub async fn is_barge_in_pending(&self, session: &SessionId) -> bool {
        match self.slot(session) {
            Some(shared) => shared.lock().await.pending.is_set(),
            None => false,
        }
    }

    /// Routes a listener signal received on `channel`.
    ///
    /// Signals for channels without a session are dropped.
    pub async fn handle(&self, channel: &ChannelId, event: ClientEvent) {
        let Some(session) = self.directory.lookup_session_id(channel) else {
            debug!("No session for channel {}, ignoring signal", channel);
            return;
        };

        match event {
            ClientEvent::UtteranceStarted(_) => self.speech_started(&session).await,
            ClientEvent::UtteranceResult(data) => {
                let utterance = Utterance {
                    text: data.text().to_string(),
                    confidence: data.confidence(),
                };
                self.utterance_result(&session, utterance, data.paused_response_id().cloned())
                    .await;
            }
            ClientEvent::UtteranceAudio(data) => {
                self.utterance_audio(&session, data.audio(), data.paused_response_id().cloned())
                    .await;
            }
            ClientEvent::PlaybackEnded(data) => {
                self.playback_ended(&session, data.response_id()).await;
            }
            ClientEvent::Speak(data) => {
                if let Err(e) = self.begin_response(&session, data.text()).await {
                    warn!("Could not start response for {}: {}", session, e);
                    self.emit_error(&session, &e.to_string()).await;
                }
            }
        }
    }

    async fn emit_error(&self, session: &SessionId, message: &str) {
        if let Some(shared) = self.slot(session) {
            shared
                .lock()
                .await
                .emit(ServerEvent::Error(ErrorEvent::new(message)));
        }
    }

    /// Voice activity started on the listener side.
    pub async fn speech_started(&self, session: &SessionId) {
        let Some(shared) = self.slot(session) else {
            debug!("Speech start for unknown session {}", session);
            return;
        };
        let mut slot = shared.lock().await;
        match slot.registry.pause() {
            PauseTarget::Active(response_id) => {
                info!("Speech started, pausing response {}", response_id);
                slot.emit_pause(response_id, true, PauseReason::SpeechStarted);
                slot.emit_status(Status::Interrupting);
            }
            PauseTarget::Carryover(response_id) => {
                info!("Speech started, pausing buffered playback of {}", response_id);
                slot.emit_pause(response_id, true, PauseReason::SpeechStarted);
                slot.emit_status(Status::Interrupting);
            }
            PauseTarget::Nothing => {
                debug!("Speech started with nothing playing, barge-in pending for {}", session);
                slot.pending.set();
            }
        }
    }

    fn decide(&self, confidence: f32) -> Decision {
        match self.config.classifier.classify(confidence) {
            Classification::Noise => Decision::Resume(PauseReason::Noise),
            Classification::Speech => Decision::Interrupt,
            Classification::Uncertain => match self.config.uncertain_policy {
                UncertainPolicy::Resume => Decision::Resume(PauseReason::Uncertain),
                UncertainPolicy::Interrupt => Decision::Interrupt,
                UncertainPolicy::Hold => Decision::Hold,
            },
        }
    }

    /// Applies a classified utterance: resume on noise, interrupt on speech.
    pub async fn utterance_result(
        &self,
        session: &SessionId,
        utterance: Utterance,
        paused_response_id: Option<ResponseId>,
    ) {
        let Some(shared) = self.slot(session) else {
            debug!("Utterance for unknown session {}", session);
            return;
        };
        let decision = self.decide(utterance.confidence);
        debug!(
            "Utterance {:?} (confidence {:.2}) -> {:?}",
            utterance.text, utterance.confidence, decision
        );

        let mut slot = shared.lock().await;
        match decision {
            Decision::Resume(reason) => {
                // The barge-in this utterance belonged to turned out not to be speech.
                slot.pending.take_and_clear();
                match slot.registry.resume(paused_response_id.as_ref()) {
                    Some(response_id) => {
                        info!("Resuming response {} ({:?})", response_id, reason);
                        slot.emit_pause(response_id, false, reason);
                    }
                    None => warn!("No active response to resume for {}", session),
                }
            }
            Decision::Interrupt => {
                slot.pending.take_and_clear();
                if let Some(response_id) = slot.registry.interrupt() {
                    info!("Genuine speech, interrupting response {}", response_id);
                    slot.emit(ServerEvent::ResponseInterrupted(
                        ResponseInterruptedEvent::new(response_id),
                    ));
                }
                slot.emit_status(Status::Listening);

                let text = utterance.text.trim();
                if !text.is_empty() {
                    slot.emit(ServerEvent::UserTurn(UserTurnEvent::new(text)));
                    let turn = UserTurn {
                        session_id: session.clone(),
                        text: text.to_string(),
                    };
                    if self.turn_tx.send(turn).is_err() {
                        debug!("Turn receiver dropped, discarding user turn");
                    }
                }
            }
            Decision::Hold => {
                info!("Uncertain utterance, holding playback state for {}", session);
            }
        }
    }

    /// Transcribes captured audio and applies the result.
    ///
    /// A failed transcription counts as an utterance that never happened, so a
    /// paused response is resumed rather than left paused.
    pub async fn utterance_audio(
        &self,
        session: &SessionId,
        encoded: &str,
        paused_response_id: Option<ResponseId>,
    ) {
        let transcribed = match audio::decode(encoded) {
            Ok(bytes) => self.stt.transcribe(bytes).await,
            Err(e) => Err(anyhow::Error::from(e).context("Utterance audio is not valid base64")),
        };
        let utterance = transcribed.unwrap_or_else(|e| {
            error!("Transcription failed for {}: {:?}", session, e);
            Utterance {
                text: String::new(),
                confidence: 0.0,
            }
        });
        self.utterance_result(session, utterance, paused_response_id)
            .await;
    }

    /// The listener finished playing everything it buffered for `response_id`.
    pub async fn playback_ended(&self, session: &SessionId, response_id: &ResponseId) {
        let Some(shared) = self.slot(session) else {
            return;
        };
        let mut slot = shared.lock().await;
        let had_active = slot.registry.active().is_some();
        if slot.registry.playback_ended(response_id) {
            info!("Playback of {} ended", response_id);
            if had_active {
                slot.emit_status(Status::Listening);
            }
        } else {
            debug!("Ignoring playback end for unknown response {}", response_id);
        }
    }

    /// Starts generating spoken audio for `text`.
    ///
    /// If a barge-in is pending the response starts paused.
    pub async fn begin_response(
        &self,
        session: &SessionId,
        text: &str,
    ) -> Result<ResponseId, CoordinatorError> {
        if text.trim().is_empty() {
            return Err(CoordinatorError::EmptyText);
        }
        let shared = self
            .slot(session)
            .ok_or_else(|| CoordinatorError::NotAttached(session.clone()))?;

        let response_id = ResponseId::generate();
        let cancel = CancellationToken::new();
        {
            let mut slot = shared.lock().await;
            let paused = slot.pending.is_set();
            slot.registry
                .begin(response_id.clone(), paused, cancel.clone())
                .map_err(|in_flight| CoordinatorError::ResponseInFlight {
                    session: session.clone(),
                    response: in_flight,
                })?;
            slot.pending.take_and_clear();
            info!(
                "Generating response {} for {}{}",
                response_id,
                session,
                if paused { " (starts paused)" } else { "" }
            );
        }

        let generation = Generation {
            slot: shared,
            tts: self.tts.clone(),
            options: self.config.speech_options.clone(),
            response_id: response_id.clone(),
            text: text.to_string(),
            cancel,
        };
        tokio::spawn(generation.run());
        Ok(response_id)
    }
}

/// One spawned text-to-speech run, feeding chunks into a session.
struct Generation {
    slot: SharedSlot,
    tts: Arc<dyn TextToSpeech>,
    options: SpeechOptions,
    response_id: ResponseId,
    text: String,
    cancel: CancellationToken,
}

impl Generation {
    async fn run(self) {
        let requested = tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("Response {} cancelled before audio arrived", self.response_id);
                return;
            }
            result = self.tts.generate(&self.text, &self.options) => result,
        };
        let SpeechStream {
            mime_type,
            mut chunks,
        } = match requested {
            Ok(stream) => stream,
            Err(e) => {
                error!("Speech generation failed for {}: {:?}", self.response_id, e);
                self.abandon().await;
                return;
            }
        };

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Response {} cancelled mid-stream", self.response_id);
                    return;
                }
                next = chunks.next() => next,
            };
            match next {
                Some(Ok(bytes)) if bytes.is_empty() => continue,
                Some(Ok(bytes)) => {
                    if !self.deliver(&mime_type, &bytes).await {
                        return;
                    }
                }
                Some(Err(e)) => {
                    error!("Speech stream failed for {}: {:?}", self.response_id, e);
                    self.abandon().await;
                    return;
                }
                None => break,
            }
        }
        drop(chunks);
        self.finish().await;
    }

    /// Forwards one chunk; on the first one also announces the stream.
    async fn deliver(&self, mime_type: &str, bytes: &[u8]) -> bool {
        let mut slot = self.slot.lock().await;
        if self.cancel.is_cancelled() {
            return false;
        }
        if let Some(paused) = slot.registry.mark_started(&self.response_id, mime_type) {
            slot.emit(ServerEvent::StreamStart(StreamStartEvent::new(
                self.response_id.clone(),
                mime_type,
            )));
            if paused {
                let reason = match slot.registry.active() {
                    Some(record) if record.began_paused() => PauseReason::PendingBargeIn,
                    _ => PauseReason::SpeechStarted,
                };
                slot.emit_pause(self.response_id.clone(), true, reason);
            }
        }
        slot.emit(ServerEvent::StreamChunk(StreamChunkEvent::new(
            self.response_id.clone(),
            audio::encode(bytes),
        )));
        true
    }

    async fn finish(&self) {
        let mut slot = self.slot.lock().await;
        if self.cancel.is_cancelled() {
            return;
        }
        let started = slot
            .registry
            .active()
            .is_some_and(|r| r.response_id() == &self.response_id && r.started());
        if !started {
            debug!("Response {} produced no audio", self.response_id);
            if slot.registry.abandon(&self.response_id) {
                slot.emit_status(Status::Listening);
            }
            return;
        }

        match slot.registry.end_stream(&self.response_id) {
            Some(outcome) => {
                slot.emit(ServerEvent::StreamEnd(StreamEndEvent::new(
                    self.response_id.clone(),
                )));
                match outcome {
                    StreamEndOutcome::Retained => {
                        debug!("Response {} ended while paused, keeping it", self.response_id);
                    }
                    StreamEndOutcome::Cleared => {
                        debug!("Response {} ended", self.response_id);
                        slot.emit_status(Status::Listening);
                    }
                }
            }
            None => debug!("Response {} ended after being replaced", self.response_id),
        }
    }

    /// Returns the session to idle after a collaborator failure.
    async fn abandon(&self) {
        let mut slot = self.slot.lock().await;
        let started = slot
            .registry
            .active()
            .is_some_and(|r| r.response_id() == &self.response_id && r.started());
        if !slot.registry.abandon(&self.response_id) {
            return;
        }
        if started {
            slot.emit(ServerEvent::StreamEnd(StreamEndEvent::new(
                self.response_id.clone(),
            )));
        }
        slot.emit_status(Status::Listening);
    }
}
