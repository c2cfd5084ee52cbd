use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetRequest {
    pub preset: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilteringRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub scenario: String,
}

/// Body returned by every control endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StatusReply {
    pub fn ok(detail: impl Into<String>) -> Self {
        Self {
            status: "ok".into(),
            detail: Some(detail.into()),
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            detail: Some(detail.into()),
        }
    }
}
