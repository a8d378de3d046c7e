use bargein_types::{ResponseId, SessionId};

/// Errors surfaced by [`crate::coordinator::Coordinator`] to its caller.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CoordinatorError {
    #[error("session {session} already has response {response} in flight")]
    ResponseInFlight {
        session: SessionId,
        response: ResponseId,
    },
    #[error("no listener attached to session {0}")]
    NotAttached(SessionId),
    #[error("nothing to speak: response text is empty")]
    EmptyText,
}
