//! Per-session bookkeeping of the response being generated and of the one
//! whose generation finished while the listener may still be playing it.

use bargein_types::ResponseId;
use tokio_util::sync::CancellationToken;

/// One in-flight generated audio response.
#[derive(Debug)]
pub struct ResponseRecord {
    response_id: ResponseId,
    mime_type: Option<String>,
    started: bool,
    paused: bool,
    began_paused: bool,
    interrupted: bool,
    cancel: CancellationToken,
}

impl ResponseRecord {
    fn new(response_id: ResponseId, paused: bool, cancel: CancellationToken) -> Self {
        Self {
            response_id,
            mime_type: None,
            started: false,
            paused,
            began_paused: paused,
            interrupted: false,
            cancel,
        }
    }

    pub fn response_id(&self) -> &ResponseId {
        &self.response_id
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Whether the record was created paused because a barge-in was pending.
    pub fn began_paused(&self) -> bool {
        self.began_paused
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }
}

/// A response whose generation finished but whose playback may not have.
#[derive(Debug, Clone, PartialEq)]
pub struct CarryoverRecord {
    response_id: ResponseId,
    stream_ended: bool,
}

impl CarryoverRecord {
    pub fn response_id(&self) -> &ResponseId {
        &self.response_id
    }

    pub fn stream_ended(&self) -> bool {
        self.stream_ended
    }
}

/// Session state derived from the registry contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A record exists and is not paused. Includes a response whose first chunk
    /// has not been delivered yet.
    Streaming,
    Paused,
    DrainedPendingResume,
}

/// Where a speech-start lands.
#[derive(Debug, Clone, PartialEq)]
pub enum PauseTarget {
    /// The active record, now marked paused.
    Active(ResponseId),
    /// Generation already ended; only the listener's buffered audio can be paused.
    Carryover(ResponseId),
    /// Nothing to pause.
    Nothing,
}

/// Result of the generation stream finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEndOutcome {
    /// The record was paused and is kept so that a late resume still lands.
    Retained,
    /// The record was removed; the session is idle apart from the carryover.
    Cleared,
}

#[derive(Debug, Default)]
pub struct ResponseRegistry {
    active: Option<ResponseRecord>,
    carryover: Option<CarryoverRecord>,
}

impl ResponseRegistry {
    pub fn active(&self) -> Option<&ResponseRecord> {
        self.active.as_ref()
    }

    pub fn carryover(&self) -> Option<&CarryoverRecord> {
        self.carryover.as_ref()
    }

    pub fn state(&self) -> SessionState {
        let drained = self.carryover.as_ref().filter(|c| c.stream_ended);
        match (&self.active, drained) {
            (Some(record), Some(carry)) if record.response_id == carry.response_id => {
                SessionState::DrainedPendingResume
            }
            (Some(record), _) if record.paused => SessionState::Paused,
            (Some(_), _) => SessionState::Streaming,
            (None, Some(_)) => SessionState::DrainedPendingResume,
            (None, None) => SessionState::Idle,
        }
    }

    /// The active record whose generation is still running, if any.
    pub fn generating(&self) -> Option<&ResponseRecord> {
        self.active.as_ref().filter(|record| {
            !record.interrupted && !self.is_drained(&record.response_id)
        })
    }

    fn is_drained(&self, id: &ResponseId) -> bool {
        self.carryover
            .as_ref()
            .is_some_and(|c| c.stream_ended && &c.response_id == id)
    }

    /// Registers a new response. Fails with the in-flight id while another
    /// generation is still running.
    ///
    /// A retained record and the carryover of a previous response are dropped.
    pub fn begin(
        &mut self,
        response_id: ResponseId,
        paused: bool,
        cancel: CancellationToken,
    ) -> Result<(), ResponseId> {
        if let Some(record) = self.generating() {
            return Err(record.response_id.clone());
        }
        self.carryover = None;
        self.active = Some(ResponseRecord::new(response_id, paused, cancel));
        Ok(())
    }

    /// Marks the first chunk as delivered. Returns the record's paused flag when
    /// this call performed the transition.
    pub fn mark_started(&mut self, id: &ResponseId, mime_type: &str) -> Option<bool> {
        let record = self
            .active
            .as_mut()
            .filter(|r| &r.response_id == id && !r.interrupted && !r.started)?;
        record.started = true;
        record.mime_type = Some(mime_type.to_string());
        Some(record.paused)
    }

    pub fn pause(&mut self) -> PauseTarget {
        if let Some(record) = self.active.as_mut() {
            record.paused = true;
            return PauseTarget::Active(record.response_id.clone());
        }
        match &self.carryover {
            Some(carry) if carry.stream_ended => PauseTarget::Carryover(carry.response_id.clone()),
            _ => PauseTarget::Nothing,
        }
    }

    /// Resolves which response a resume applies to and clears its paused flag.
    ///
    /// Candidates in order: the id the listener said it paused, the registry's
    /// paused record, the carryover. An explicit id only counts when it names a
    /// response this session still knows about.
    pub fn resume(&mut self, explicit: Option<&ResponseId>) -> Option<ResponseId> {
        let known = |id: &ResponseId| {
            self.active.as_ref().is_some_and(|r| &r.response_id == id)
                || self.carryover.as_ref().is_some_and(|c| &c.response_id == id)
        };
        let resolved = explicit
            .filter(|id| known(*id))
            .cloned()
            .or_else(|| {
                self.active
                    .as_ref()
                    .filter(|r| r.paused)
                    .map(|r| r.response_id.clone())
            })
            .or_else(|| {
                self.carryover
                    .as_ref()
                    .filter(|c| c.stream_ended)
                    .map(|c| c.response_id.clone())
            })?;

        if let Some(record) = self.active.as_mut() {
            if record.response_id == resolved {
                record.paused = false;
            }
        }
        Some(resolved)
    }

    /// Records that generation of `id` finished. `None` if `id` is not the active record.
    pub fn end_stream(&mut self, id: &ResponseId) -> Option<StreamEndOutcome> {
        let record = self.active.as_ref().filter(|r| &r.response_id == id)?;
        let paused = record.paused;
        self.carryover = Some(CarryoverRecord {
            response_id: id.clone(),
            stream_ended: true,
        });
        if paused {
            return Some(StreamEndOutcome::Retained);
        }
        self.active = None;
        Some(StreamEndOutcome::Cleared)
    }

    /// Cancels generation and forgets everything about the current response.
    ///
    /// Returns the id the listener may still be playing, if any.
    pub fn interrupt(&mut self) -> Option<ResponseId> {
        let active = self.active.take().map(|mut record| {
            record.interrupted = true;
            record.cancel.cancel();
            record.response_id
        });
        let carried = self.carryover.take().map(|c| c.response_id);
        active.or(carried)
    }

    /// Clears both records when `id` matches either of them.
    pub fn playback_ended(&mut self, id: &ResponseId) -> bool {
        let matches_active = self.active.as_ref().is_some_and(|r| &r.response_id == id);
        let matches_carry = self.carryover.as_ref().is_some_and(|c| &c.response_id == id);
        if !matches_active && !matches_carry {
            return false;
        }
        if let Some(record) = self.active.take() {
            record.cancel.cancel();
        }
        self.carryover = None;
        true
    }

    /// Drops the active record after its generation failed.
    pub fn abandon(&mut self, id: &ResponseId) -> bool {
        if self.active.as_ref().is_some_and(|r| &r.response_id == id) {
            self.active = None;
            self.carryover = None;
            return true;
        }
        false
    }

    /// Cancels any running generation and empties the registry.
    pub fn clear(&mut self) {
        if let Some(record) = self.active.take() {
            record.cancel.cancel();
        }
        self.carryover = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResponseId {
        ResponseId::new(s)
    }

    fn begun(name: &str, paused: bool) -> ResponseRegistry {
        let mut registry = ResponseRegistry::default();
        registry
            .begin(id(name), paused, CancellationToken::new())
            .unwrap();
        registry
    }

    #[test]
    fn empty_registry_is_idle() {
        let registry = ResponseRegistry::default();
        assert_eq!(registry.state(), SessionState::Idle);
        assert_eq!(ResponseRegistry::default().pause(), PauseTarget::Nothing);
    }

    #[test]
    fn unannounced_response_counts_as_streaming() {
        let mut registry = begun("a", false);
        assert!(!registry.active().unwrap().started());
        assert_eq!(registry.state(), SessionState::Streaming);

        registry.mark_started(&id("a"), "audio/mpeg");
        assert_eq!(registry.state(), SessionState::Streaming);
        assert_eq!(begun("b", true).state(), SessionState::Paused);
    }

    #[test]
    fn second_generation_is_rejected_while_first_runs() {
        let mut registry = begun("a", false);
        let err = registry
            .begin(id("b"), false, CancellationToken::new())
            .unwrap_err();
        assert_eq!(err, id("a"));
        assert_eq!(registry.active().unwrap().response_id(), &id("a"));
    }

    #[test]
    fn new_generation_replaces_drained_response() {
        let mut registry = begun("a", false);
        registry.mark_started(&id("a"), "audio/mpeg");
        registry.pause();
        assert_eq!(registry.end_stream(&id("a")), Some(StreamEndOutcome::Retained));

        registry
            .begin(id("b"), false, CancellationToken::new())
            .unwrap();
        assert_eq!(registry.active().unwrap().response_id(), &id("b"));
        assert!(registry.carryover().is_none());
    }

    #[test]
    fn mark_started_happens_once() {
        let mut registry = begun("a", true);
        assert_eq!(registry.mark_started(&id("a"), "audio/mpeg"), Some(true));
        assert_eq!(registry.mark_started(&id("a"), "audio/mpeg"), None);
        assert_eq!(registry.mark_started(&id("other"), "audio/mpeg"), None);
        assert_eq!(registry.active().unwrap().mime_type(), Some("audio/mpeg"));
    }

    #[test]
    fn pause_then_resume_active() {
        let mut registry = begun("a", false);
        registry.mark_started(&id("a"), "audio/mpeg");
        assert_eq!(registry.state(), SessionState::Streaming);
        assert_eq!(registry.pause(), PauseTarget::Active(id("a")));
        assert_eq!(registry.state(), SessionState::Paused);
        assert_eq!(registry.resume(None), Some(id("a")));
        assert_eq!(registry.state(), SessionState::Streaming);
    }

    #[test]
    fn resume_without_paused_record_finds_nothing() {
        let mut registry = begun("a", false);
        assert_eq!(registry.resume(None), None);
    }

    #[test]
    fn unpaused_stream_end_leaves_only_carryover() {
        let mut registry = begun("a", false);
        assert_eq!(registry.end_stream(&id("a")), Some(StreamEndOutcome::Cleared));
        assert!(registry.active().is_none());
        assert_eq!(registry.carryover().unwrap().response_id(), &id("a"));
        assert_eq!(registry.state(), SessionState::DrainedPendingResume);

        // speech-start during drained playback pauses by carryover id
        assert_eq!(registry.pause(), PauseTarget::Carryover(id("a")));
        assert!(registry.carryover().unwrap().stream_ended());
        // and a noise classification resumes it
        assert_eq!(registry.resume(None), Some(id("a")));
    }

    #[test]
    fn paused_stream_end_retains_record() {
        let mut registry = begun("a", true);
        assert_eq!(registry.end_stream(&id("a")), Some(StreamEndOutcome::Retained));
        assert!(registry.active().unwrap().paused());
        assert_eq!(registry.state(), SessionState::DrainedPendingResume);
        assert!(registry.generating().is_none());
    }

    #[test]
    fn explicit_id_wins_only_when_known() {
        let mut registry = begun("a", true);
        assert_eq!(registry.resume(Some(&id("stale"))), Some(id("a")));

        registry.pause();
        assert_eq!(registry.resume(Some(&id("a"))), Some(id("a")));
        assert!(!registry.active().unwrap().paused());
    }

    #[test]
    fn playback_ended_clears_everything_for_matching_id() {
        let mut registry = begun("a", true);
        registry.end_stream(&id("a"));
        assert!(!registry.playback_ended(&id("zzz")));
        assert!(registry.active().is_some());
        assert!(registry.playback_ended(&id("a")));
        assert!(registry.active().is_none());
        assert!(registry.carryover().is_none());
        assert_eq!(registry.state(), SessionState::Idle);
    }

    #[test]
    fn interrupt_cancels_generation() {
        let token = CancellationToken::new();
        let mut registry = ResponseRegistry::default();
        registry.begin(id("a"), false, token.clone()).unwrap();
        assert_eq!(registry.interrupt(), Some(id("a")));
        assert!(token.is_cancelled());
        assert_eq!(registry.state(), SessionState::Idle);
        assert_eq!(registry.interrupt(), None);
    }
}
