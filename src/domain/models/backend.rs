use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use strum::EnumString;
use strum::EnumVariantNames;

use super::Message;
use super::Story;

/// Raw response body fragments in arrival order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

pub struct TurnRequest {
    pub messages: Vec<Message>,
    pub thread_id: String,
    pub story: Story,
}

pub struct ResumeRequest {
    pub thread_id: String,
    pub story: Story,
    pub approved: bool,
    pub chapter_id: Option<i64>,
}

/// Known shapes of the resume request body. `Approval` carries the chapter
/// an approved image is attached to, `UserApproval` only the decision.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumString, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ResumeProtocol {
    Approval,
    UserApproval,
}

#[async_trait]
pub trait Backend {
    /// Used at startup to verify the backend is reachable.
    async fn health_check(&self) -> Result<()>;

    /// Starts a generation turn for the full message history. The response
    /// body is returned unread so the caller controls every read.
    async fn start_turn(&self, req: TurnRequest) -> Result<ByteStream>;

    /// Resumes a paused generation on the same thread with the user's
    /// decision. The response body uses the same marker protocol as
    /// `start_turn`.
    async fn resume_turn(&self, req: ResumeRequest) -> Result<ByteStream>;
}

pub type BackendBox = Box<dyn Backend + Send + Sync>;
