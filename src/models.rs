use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// POST /{feature}/start body
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct StartRequest {
    #[serde(default, alias = "message")]
    pub seed: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ErrorBody {
    pub error: String,
}

// One chat turn, in the shape OpenAI-compatible APIs expect
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

// Upstream chat completion request (always streamed)
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

// Upstream stream chunk: only the fields the relay reads
#[derive(Deserialize, Debug, Default)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionChunk {
    pub fn into_content(self) -> Option<String> {
        self.choices.into_iter().next()?.delta.content
    }
}

// Append-only journal records
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct VisitRecord {
    pub time: DateTime<Utc>,
    pub ip: String,
    pub path: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub business_type: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Inquiry {
    pub ts: DateTime<Utc>,
    pub ip: String,
    pub name: String,
    pub email: String,
    pub business_type: String,
    pub product: String,
    pub message: String,
}

// GET /admin body
#[derive(Serialize, Debug)]
pub struct AdminView {
    pub features: Vec<String>,
    pub rate_buckets: usize,
    pub pending_grants: usize,
    pub conversations: usize,
    pub visits_total: usize,
    pub visits: Vec<VisitRecord>,
    pub inquiries: Vec<Inquiry>,
}
