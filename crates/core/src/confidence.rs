//! Maps speech-to-text confidence scores onto the three barge-in outcomes.

/// Scores below this are treated as noise by default.
pub const DEFAULT_LOW_THRESHOLD: f32 = 0.65;
/// Scores at or above this are treated as genuine speech by default.
pub const DEFAULT_HIGH_THRESHOLD: f32 = 0.80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Noise,
    Uncertain,
    Speech,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ThresholdError {
    #[error("confidence thresholds must satisfy 0 <= low < high <= 1 (got low={low}, high={high})")]
    OutOfOrder { low: f32, high: f32 },
}

/// The `LOW`/`HIGH` pair used by [`ConfidenceClassifier::classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceClassifier {
    low: f32,
    high: f32,
}

impl Default for ConfidenceClassifier {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_THRESHOLD,
            high: DEFAULT_HIGH_THRESHOLD,
        }
    }
}

impl ConfidenceClassifier {
    pub fn new(low: f32, high: f32) -> Result<Self, ThresholdError> {
        // Written so that NaN fails the check too.
        let valid = (0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high) && low < high;
        if !valid {
            return Err(ThresholdError::OutOfOrder { low, high });
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f32 {
        self.low
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    /// Classifies a confidence score.
    ///
    /// Total over `f32`: NaN and negative scores are noise, anything above 1 is speech.
    pub fn classify(&self, score: f32) -> Classification {
        if score.is_nan() || score < self.low {
            Classification::Noise
        } else if score < self.high {
            Classification::Uncertain
        } else {
            Classification::Speech
        }
    }
}

/// What to do with an utterance that lands in the uncertain band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UncertainPolicy {
    /// Resume playback as for noise.
    #[default]
    Resume,
    /// Interrupt as for genuine speech.
    Interrupt,
    /// Leave playback paused and wait for the next signal.
    Hold,
}

impl std::str::FromStr for UncertainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resume" => Ok(UncertainPolicy::Resume),
            "interrupt" => Ok(UncertainPolicy::Interrupt),
            "hold" => Ok(UncertainPolicy::Hold),
            other => Err(format!("'{}' is not one of resume, interrupt, hold", other)),
        }
    }
}
