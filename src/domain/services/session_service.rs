#[cfg(test)]
#[path = "session_service_test.rs"]
mod tests;

use std::future::Future;

use anyhow::Result;
use tokio::sync::mpsc;

use super::SessionController;
use crate::domain::models::Action;
use crate::domain::models::SessionError;
use crate::domain::models::SessionEvent;

fn report(res: Result<(), SessionError>, tx: &mpsc::UnboundedSender<SessionEvent>) -> Result<()> {
    match res {
        Ok(()) => {}
        // Already surfaced as TurnFailed.
        Err(SessionError::Transport(_)) | Err(SessionError::Decode(_)) => {}
        Err(err) => {
            tracing::debug!(error = %err, "Rejected action");
            tx.send(SessionEvent::Rejected(err.to_string()))?;
        }
    }

    return Ok(());
}

/// Polls a turn until it finishes, answering actions that arrive meanwhile.
/// Returns the action that abandoned the turn, if any.
async fn drive_turn<F>(
    turn: F,
    tx: &mpsc::UnboundedSender<SessionEvent>,
    rx: &mut mpsc::UnboundedReceiver<Action>,
) -> Result<Option<Action>>
where
    F: Future<Output = Result<(), SessionError>>,
{
    tokio::pin!(turn);

    loop {
        tokio::select! {
            biased;

            res = &mut turn => {
                report(res, tx)?;
                return Ok(None);
            }
            action = rx.recv() => {
                match action {
                    Some(Action::Send(_)) | Some(Action::Resume { .. }) => {
                        report(Err(SessionError::TurnInProgress), tx)?;
                    }
                    Some(action) => {
                        tracing::debug!(action = ?action, "Abandoning in-flight turn");
                        return Ok(Some(action));
                    }
                    None => {
                        let res = (&mut turn).await;
                        report(res, tx)?;
                        return Ok(None);
                    }
                }
            }
        }
    }
}

pub struct SessionService {}

impl SessionService {
    pub async fn start(
        mut controller: SessionController,
        tx: mpsc::UnboundedSender<SessionEvent>,
        rx: &mut mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        let mut next: Option<Action> = None;

        loop {
            let action = match next.take() {
                Some(action) => action,
                None => match rx.recv().await {
                    Some(action) => action,
                    None => {
                        tracing::debug!("Action channel closed");
                        return Ok(());
                    }
                },
            };

            match action {
                Action::Send(text) => {
                    next = drive_turn(controller.send(&text), &tx, rx).await?;
                }
                Action::Resume {
                    approved,
                    chapter_id,
                } => {
                    next = drive_turn(controller.resume(approved, chapter_id), &tx, rx).await?;
                }
                Action::NewConversation() => {
                    controller.new_conversation();
                }
                Action::OpenStory(story) => {
                    controller.open_story(story);
                }
                Action::Close() => {
                    let state = controller.state();
                    tracing::debug!(
                        thread_id = state.thread_id(),
                        phase = %state.phase(),
                        messages = state.messages().len(),
                        "Closing session"
                    );
                    controller.close();
                    return Ok(());
                }
            }
        }
    }
}
