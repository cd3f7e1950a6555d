#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use uuid::Uuid;

use super::InterruptRequest;
use super::Message;
use super::MessageHandle;
use super::Role;

#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionPhase {
    Idle,
    Sending,
    Streaming,
    AwaitingApproval,
    Error,
}

/// In-memory record of one conversation. The controller is the only writer.
///
/// `streaming` and `interrupt_pending` are derived from the phase, and the
/// pending interrupt is only ever stored together with the
/// `AwaitingApproval` phase, so an interrupt can never be pending while a
/// turn is streaming.
#[derive(Debug)]
pub struct SessionState {
    messages: Vec<Message>,
    handles: Vec<MessageHandle>,
    next_handle: u64,
    open: Option<MessageHandle>,
    thread_id: String,
    phase: SessionPhase,
    pending_interrupt: Option<InterruptRequest>,
    last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> SessionState {
        return SessionState::new(Uuid::new_v4().to_string());
    }
}

impl SessionState {
    pub fn new(thread_id: String) -> SessionState {
        return SessionState {
            messages: vec![],
            handles: vec![],
            next_handle: 0,
            open: None,
            thread_id,
            phase: SessionPhase::Idle,
            pending_interrupt: None,
            last_error: None,
        };
    }

    pub fn messages(&self) -> &[Message] {
        return &self.messages;
    }

    pub fn thread_id(&self) -> &str {
        return &self.thread_id;
    }

    pub fn phase(&self) -> SessionPhase {
        return self.phase;
    }

    pub fn is_streaming(&self) -> bool {
        return self.phase == SessionPhase::Sending || self.phase == SessionPhase::Streaming;
    }

    pub fn interrupt_pending(&self) -> bool {
        return self.phase == SessionPhase::AwaitingApproval;
    }

    pub fn image_approval_pending(&self) -> bool {
        if !self.interrupt_pending() {
            return false;
        }

        return self
            .pending_interrupt
            .as_ref()
            .map(|interrupt| return interrupt.is_image_generation())
            .unwrap_or(false);
    }

    pub fn pending_interrupt(&self) -> Option<&InterruptRequest> {
        return self.pending_interrupt.as_ref();
    }

    pub fn last_error(&self) -> Option<&str> {
        return self.last_error.as_deref();
    }

    pub fn get(&self, handle: MessageHandle) -> Option<&Message> {
        let idx = self.position(handle)?;
        return self.messages.get(idx);
    }

    fn position(&self, handle: MessageHandle) -> Option<usize> {
        return self.handles.iter().rposition(|e| return *e == handle);
    }

    /// Commits a finished message, such as the user's prompt.
    pub fn push_message(&mut self, message: Message) -> MessageHandle {
        let handle = MessageHandle(self.next_handle);
        self.next_handle += 1;
        self.messages.push(message);
        self.handles.push(handle);

        return handle;
    }

    /// Opens an empty assistant message that receives streamed text. Any
    /// previously open message is closed first.
    pub fn open_assistant_message(&mut self) -> MessageHandle {
        self.close_open_message();
        let handle = self.push_message(Message::new(Role::Assistant, ""));
        self.open = Some(handle);

        return handle;
    }

    /// Appends text to the message behind `handle`. Only the open message
    /// accepts text; returns false otherwise.
    pub fn append_to(&mut self, handle: MessageHandle, text: &str) -> bool {
        if self.open != Some(handle) {
            return false;
        }

        if let Some(idx) = self.position(handle) {
            self.messages[idx].append(text);
            return true;
        }

        return false;
    }

    pub fn close_open_message(&mut self) {
        self.open = None;
    }

    /// Drops the open message if nothing was ever written to it, then closes
    /// it. Committed messages are never touched.
    pub fn discard_open_message_if_empty(&mut self) {
        if let Some(handle) = self.open.take() {
            if let Some(idx) = self.position(handle) {
                if self.messages[idx].content.is_empty() {
                    self.messages.remove(idx);
                    self.handles.remove(idx);
                }
            }
        }
    }

    pub fn set_phase(&mut self, phase: SessionPhase) {
        if phase != SessionPhase::AwaitingApproval {
            self.pending_interrupt = None;
        }
        self.phase = phase;
    }

    /// Starts a turn: clears the previous error and any pending interrupt.
    pub fn begin_turn(&mut self) {
        self.last_error = None;
        self.set_phase(SessionPhase::Sending);
    }

    pub fn await_approval(&mut self, interrupt: InterruptRequest) {
        self.close_open_message();
        self.phase = SessionPhase::AwaitingApproval;
        self.pending_interrupt = Some(interrupt);
    }

    /// Ends the turn after a failure. Partial output stays where it is.
    pub fn fail(&mut self, err: &str) {
        self.close_open_message();
        self.last_error = Some(err.to_string());
        self.set_phase(SessionPhase::Idle);
    }

    pub fn set_error(&mut self, err: &str) {
        self.last_error = Some(err.to_string());
    }

    pub fn complete(&mut self) {
        self.close_open_message();
        self.set_phase(SessionPhase::Idle);
    }

    /// Empties the conversation and starts a fresh backend thread.
    pub fn reset(&mut self) {
        *self = SessionState::default();
    }
}
