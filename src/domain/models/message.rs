#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Message {
        return Message {
            role,
            content: content.to_string(),
            title: None,
        };
    }

    pub fn append(&mut self, text: &str) {
        self.content += text;
    }
}

/// Refers to one message inside a `SessionState`. A handle keeps pointing at
/// the same message no matter how many messages are appended after it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub(super) u64);
