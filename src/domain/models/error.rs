use thiserror::Error;

/// Errors a session turn can end with. Malformed interrupt payloads are not
/// represented here; they degrade to an `unknown` interrupt instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No story selected")]
    NoStory,

    #[error("A turn is already in progress")]
    TurnInProgress,

    #[error("No interrupt is waiting for approval")]
    NoInterruptPending,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}
