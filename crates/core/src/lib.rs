//! Barge-in coordination for spoken responses.
//!
//! The [`coordinator::Coordinator`] decides whether a listener's voice activity
//! pauses, resumes or cancels the audio response being streamed to it.

pub mod confidence;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod openai_speech;
pub mod pending;
pub mod registry;
pub mod stt;
pub mod tts;

pub use confidence::{Classification, ConfidenceClassifier, UncertainPolicy};
pub use coordinator::{Attachment, Coordinator, CoordinatorConfig, UserTurn};
pub use directory::{InMemorySessionDirectory, SessionDirectory};
pub use error::CoordinatorError;
pub use registry::SessionState;
pub use stt::{SpeechToText, Utterance};
pub use tts::{SpeechOptions, SpeechStream, TextToSpeech};
