#[cfg(test)]
#[path = "talemachine_test.rs"]
mod tests;

use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Backend;
use crate::domain::models::ByteStream;
use crate::domain::models::Genre;
use crate::domain::models::Message;
use crate::domain::models::ResumeProtocol;
use crate::domain::models::ResumeRequest;
use crate::domain::models::Story;
use crate::domain::models::StoryLength;
use crate::domain::models::TurnRequest;

/// Sent when an approval carries no chapter.
const NO_CHAPTER: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoryParams {
    story_name: String,
    story_id: i64,
    story_length: StoryLength,
    chapter_length: StoryLength,
    genre: Genre,
    additional_notes: Option<String>,
    main_characters: Option<String>,
    plot_ideas: Option<String>,
}

impl From<&Story> for StoryParams {
    fn from(story: &Story) -> StoryParams {
        return StoryParams {
            story_name: story.title.to_string(),
            story_id: story.id,
            story_length: story.story_length,
            chapter_length: story.chapter_length,
            genre: story.genre,
            additional_notes: story.additional_notes.clone(),
            main_characters: story.main_characters.clone(),
            plot_ideas: story.plot_ideas.clone(),
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SendRequest {
    messages: Vec<Message>,
    thread_id: String,
    #[serde(flatten)]
    story: StoryParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ApprovalRequest {
    thread_id: String,
    approval: bool,
    chapter_id: i64,
    #[serde(flatten)]
    story: StoryParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct UserApprovalRequest {
    story_name: String,
    thread_id: String,
    story_id: i64,
    user_approval: bool,
}

pub struct TaleMachine {
    url: String,
    timeout: String,
    protocol: ResumeProtocol,
}

impl Default for TaleMachine {
    fn default() -> TaleMachine {
        let protocol = Config::get(ConfigKey::ResumeProtocol);

        return TaleMachine {
            url: Config::get(ConfigKey::BackendURL),
            timeout: Config::get(ConfigKey::BackendHealthCheckTimeout),
            protocol: ResumeProtocol::from_str(&protocol).unwrap_or(ResumeProtocol::Approval),
        };
    }
}

impl TaleMachine {
    fn endpoint(&self, path: &str) -> String {
        return format!("{url}{path}", url = self.url.trim_end_matches('/'));
    }

    /// Posts `body` and hands back the response body as it arrives.
    async fn post_stream<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<ByteStream> {
        let res = reqwest::Client::new()
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;

        let status = res.status().as_u16();
        if !res.status().is_success() {
            tracing::error!(status = status, path = path, "TaleMachine request failed");
            bail!(format!("TaleMachine returned status {status}"));
        }

        let stream = res
            .bytes_stream()
            .map_ok(|bytes| return bytes.to_vec())
            .map_err(|err| return anyhow!(err));

        return Ok(Box::pin(stream));
    }
}

#[async_trait]
impl Backend for TaleMachine {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("TaleMachine URL is not defined");
        }

        let res = reqwest::Client::new()
            .get(self.endpoint("/health"))
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "TaleMachine is not reachable");
                bail!("TaleMachine is not reachable");
            }
        };

        let status = res.status().as_u16();
        if status >= 400 {
            tracing::error!(status = status, "TaleMachine health check failed");
            bail!("TaleMachine health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn start_turn(&self, req: TurnRequest) -> Result<ByteStream> {
        let body = SendRequest {
            messages: req.messages,
            thread_id: req.thread_id,
            story: StoryParams::from(&req.story),
        };

        return self.post_stream("/messages/send", &body).await;
    }

    #[allow(clippy::implicit_return)]
    async fn resume_turn(&self, req: ResumeRequest) -> Result<ByteStream> {
        let path = "/messages/resume_after_interrupt";

        match self.protocol {
            ResumeProtocol::Approval => {
                let body = ApprovalRequest {
                    thread_id: req.thread_id,
                    approval: req.approved,
                    chapter_id: req.chapter_id.unwrap_or(NO_CHAPTER),
                    story: StoryParams::from(&req.story),
                };
                return self.post_stream(path, &body).await;
            }
            ResumeProtocol::UserApproval => {
                let body = UserApprovalRequest {
                    story_name: req.story.title.to_string(),
                    thread_id: req.thread_id,
                    story_id: req.story.id,
                    user_approval: req.approved,
                };
                return self.post_stream(path, &body).await;
            }
        }
    }
}
