use super::InterruptRequest;
use super::MessageHandle;
use super::Role;
use super::SessionPhase;

/// Observable changes to a session, emitted by the controller in the order
/// they happen.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    MessageAppended(MessageHandle, Role),
    AssistantText(MessageHandle, String),
    InterruptPending(InterruptRequest),
    TurnComplete(),
    TurnFailed(String),
    Rejected(String),
    Closed(),
}
