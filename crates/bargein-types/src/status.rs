/// Coarse-grained status shown to the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Interrupting,
    Listening,
}

/// Why a `pause.changed` event was emitted.
///
/// The playback surface only arms its suppression window for resumes caused by
/// a low-confidence classification (`noise` or `uncertain`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// Voice activity started while audio was playing.
    SpeechStarted,
    /// The response began while a barge-in was already pending.
    PendingBargeIn,
    /// The utterance was classified as noise.
    Noise,
    /// The utterance fell in the uncertain band and policy resumed playback.
    Uncertain,
    /// Re-sent to a listener that reattached to a paused stream.
    Resync,
}

impl PauseReason {
    pub fn arms_suppression(&self) -> bool {
        matches!(self, PauseReason::Noise | PauseReason::Uncertain)
    }
}
