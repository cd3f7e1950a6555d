use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Separates generated story text from the trailing approval payload.
pub const INTERRUPT_MARKER: &str = "__interrupt__:";
pub const IMAGE_GENERATION_TOOL: &str = "generate_image";
pub const UNKNOWN_TOOL: &str = "unknown";

/// A paused side-effecting action the backend wants a human to approve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterruptRequest {
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InterruptRequest {
    pub fn is_image_generation(&self) -> bool {
        return self.tool_name == IMAGE_GENERATION_TOOL;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InterruptPayload {
    Recognized {
        tool_name: String,
        args: Option<Map<String, Value>>,
        message: Option<String>,
    },
    Unrecognized {
        raw: String,
        reason: String,
    },
}

impl From<InterruptPayload> for InterruptRequest {
    fn from(payload: InterruptPayload) -> InterruptRequest {
        match payload {
            InterruptPayload::Recognized {
                tool_name,
                args,
                message,
            } => {
                return InterruptRequest {
                    tool_name,
                    args,
                    message,
                };
            }
            InterruptPayload::Unrecognized { reason, .. } => {
                return InterruptRequest {
                    tool_name: UNKNOWN_TOOL.to_string(),
                    args: None,
                    message: Some(reason),
                };
            }
        }
    }
}
