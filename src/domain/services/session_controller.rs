#[cfg(test)]
#[path = "session_controller_test.rs"]
mod tests;

use futures::StreamExt;
use tokio::sync::mpsc;

use super::InterruptPayloadParser;
use super::SentinelSplitter;
use super::SplitEvent;
use super::StreamDecoder;
use crate::domain::models::BackendBox;
use crate::domain::models::ByteStream;
use crate::domain::models::InterruptRequest;
use crate::domain::models::Message;
use crate::domain::models::MessageHandle;
use crate::domain::models::ResumeRequest;
use crate::domain::models::Role;
use crate::domain::models::SessionError;
use crate::domain::models::SessionEvent;
use crate::domain::models::SessionPhase;
use crate::domain::models::SessionState;
use crate::domain::models::Story;
use crate::domain::models::TurnRequest;

/// Drives one story conversation against the backend.
///
/// A turn moves `Idle -> Sending -> Streaming` and ends either back in `Idle`
/// or in `AwaitingApproval` when the backend paused for a tool call. Every
/// read from the response body is awaited in order, and a new turn is refused
/// while one is still streaming.
pub struct SessionController {
    backend: BackendBox,
    state: SessionState,
    story: Option<Story>,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionController {
    pub fn new(
        backend: BackendBox,
        story: Option<Story>,
        tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> SessionController {
        return SessionController {
            backend,
            state: SessionState::default(),
            story,
            tx,
        };
    }

    /// Attaches to an existing backend thread instead of a freshly generated
    /// one.
    pub fn with_thread_id(mut self, thread_id: &str) -> SessionController {
        self.state = SessionState::new(thread_id.to_string());
        return self;
    }

    pub fn state(&self) -> &SessionState {
        return &self.state;
    }

    pub fn open_story(&mut self, story: Story) {
        tracing::debug!(story_id = story.id, "Opening story");
        self.story = Some(story);
        self.new_conversation();
    }

    pub fn new_conversation(&mut self) {
        self.state.reset();
        tracing::debug!(thread_id = self.state.thread_id(), "Started new conversation");
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Idle));
    }

    pub fn close(&mut self) {
        self.story = None;
        self.state.reset();
        self.emit(SessionEvent::Closed());
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.tx.send(event) {
            tracing::debug!(event = ?err.0, "No session observer left");
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        self.state.set_phase(phase);
        self.emit(SessionEvent::PhaseChanged(phase));
    }

    fn current_story(&mut self) -> Result<Story, SessionError> {
        if let Some(story) = &self.story {
            return Ok(story.clone());
        }

        let err = SessionError::NoStory;
        self.state.set_error(&err.to_string());
        return Err(err);
    }

    fn open_assistant_message(&mut self) -> MessageHandle {
        let handle = self.state.open_assistant_message();
        self.emit(SessionEvent::MessageAppended(handle, Role::Assistant));
        return handle;
    }

    /// Sends a user message and streams the assistant's reply into a new
    /// message.
    pub async fn send(&mut self, text: &str) -> Result<(), SessionError> {
        if self.state.is_streaming() {
            return Err(SessionError::TurnInProgress);
        }
        let story = self.current_story()?;
        if let Some(err) = self.state.last_error() {
            tracing::debug!(previous_error = err, "Starting turn after a failure");
        }

        self.state.begin_turn();
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Sending));

        let user = self.state.push_message(Message::new(Role::User, text));
        self.emit(SessionEvent::MessageAppended(user, Role::User));

        let req = TurnRequest {
            messages: self.state.messages().to_vec(),
            thread_id: self.state.thread_id().to_string(),
            story,
        };
        let handle = self.open_assistant_message();

        tracing::debug!(
            thread_id = req.thread_id,
            messages = req.messages.len(),
            "Starting turn"
        );
        let opened = self.backend.start_turn(req).await;

        return self.drive(handle, opened).await;
    }

    /// Answers the pending interrupt and streams the continuation into a new
    /// assistant message. `chapter_id` is where an approved image is filed.
    pub async fn resume(
        &mut self,
        approved: bool,
        chapter_id: Option<i64>,
    ) -> Result<(), SessionError> {
        if self.state.is_streaming() {
            return Err(SessionError::TurnInProgress);
        }
        if !self.state.interrupt_pending() {
            return Err(SessionError::NoInterruptPending);
        }
        let story = self.current_story()?;
        if approved && chapter_id.is_none() && self.state.image_approval_pending() {
            tracing::warn!("Approving image without a chapter id");
        }
        let tool_name = self
            .state
            .pending_interrupt()
            .map(|interrupt| return interrupt.tool_name.to_string())
            .unwrap_or_default();

        self.state.begin_turn();
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Sending));

        let req = ResumeRequest {
            thread_id: self.state.thread_id().to_string(),
            story,
            approved,
            chapter_id,
        };
        let handle = self.open_assistant_message();

        tracing::debug!(
            thread_id = req.thread_id,
            tool_name = tool_name,
            approved = approved,
            chapter_id = ?chapter_id,
            "Resuming turn"
        );
        let opened = self.backend.resume_turn(req).await;

        return self.drive(handle, opened).await;
    }

    async fn drive(
        &mut self,
        handle: MessageHandle,
        opened: anyhow::Result<ByteStream>,
    ) -> Result<(), SessionError> {
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                return self.fail(SessionError::Transport(err.to_string()));
            }
        };
        self.set_phase(SessionPhase::Streaming);

        let mut decoder = StreamDecoder::default();
        let mut splitter = SentinelSplitter::default();
        let mut payload = String::new();
        let mut failure: Option<SessionError> = None;

        while let Some(chunk) = stream.next().await {
            let decoded = match chunk {
                Ok(bytes) => decoder.decode(&bytes),
                Err(err) => Err(SessionError::Transport(err.to_string())),
            };

            match decoded {
                Ok(text) => {
                    if let Some(event) = splitter.push(&text) {
                        self.apply(handle, event, &mut payload);
                    }
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if failure.is_none() {
            if let Err(err) = decoder.finish() {
                failure = Some(err);
            }
        }
        if let Some(event) = splitter.finish() {
            self.apply(handle, event, &mut payload);
        }

        if splitter.marker_found() {
            if let Some(err) = &failure {
                tracing::error!(error = %err, "Stream failed after interrupt marker");
                self.state.set_error(&err.to_string());
                self.emit(SessionEvent::TurnFailed(err.to_string()));
            }
            self.await_approval(InterruptRequest::from(InterruptPayloadParser::parse(&payload)));

            if let Some(err) = failure {
                return Err(err);
            }
            return Ok(());
        }

        if let Some(err) = failure {
            return self.fail(err);
        }

        tracing::debug!(
            reply_len = self.state.get(handle).map(|msg| return msg.content.len()),
            "Turn complete"
        );
        self.state.complete();
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Idle));
        self.emit(SessionEvent::TurnComplete());

        return Ok(());
    }

    fn apply(&mut self, handle: MessageHandle, event: SplitEvent, payload: &mut String) {
        match event {
            SplitEvent::PlainText(text) => {
                self.append(handle, &text);
            }
            SplitEvent::MarkerFound { before, payload: rest } => {
                tracing::debug!("Interrupt marker detected");
                self.append(handle, &before);
                payload.push_str(&rest);
            }
            SplitEvent::Payload(text) => {
                payload.push_str(&text);
            }
        }
    }

    fn append(&mut self, handle: MessageHandle, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.state.append_to(handle, text) {
            self.emit(SessionEvent::AssistantText(handle, text.to_string()));
        }
    }

    fn await_approval(&mut self, interrupt: InterruptRequest) {
        tracing::debug!(
            tool_name = interrupt.tool_name,
            message = ?interrupt.message,
            "Waiting for approval"
        );

        // An assistant message that got nothing before the marker is dropped.
        self.state.discard_open_message_if_empty();
        self.state.await_approval(interrupt.clone());
        self.emit(SessionEvent::PhaseChanged(SessionPhase::AwaitingApproval));
        self.emit(SessionEvent::InterruptPending(interrupt));
    }

    fn fail(&mut self, err: SessionError) -> Result<(), SessionError> {
        tracing::error!(error = %err, "Turn failed");
        let msg = err.to_string();

        self.state.discard_open_message_if_empty();
        self.state.set_phase(SessionPhase::Error);
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Error));
        self.state.fail(&msg);
        self.emit(SessionEvent::TurnFailed(msg));
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Idle));

        return Err(err);
    }
}
