//! Health and capability descriptor DTOs

use serde::{Deserialize, Serialize};

/// Number of jobs in each state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub queued: u64,
    pub running: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub jobs: JobCounts,
}

/// Static tool descriptor served at `/.well-known/tool.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub publisher: String,
    pub url: String,
    #[serde(rename = "apiSpecUrl")]
    pub api_spec_url: String,
}
