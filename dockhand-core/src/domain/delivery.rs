//! Callback delivery annotations
//!
//! Delivery outcomes are recorded next to a job but are never part of its
//! state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

/// Result of notifying a job's callback URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub status: DeliveryStatus,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub at: DateTime<Utc>,
}

impl DeliveryOutcome {
    pub fn delivered(attempts: u32) -> Self {
        Self {
            status: DeliveryStatus::Delivered,
            attempts,
            last_error: None,
            at: Utc::now(),
        }
    }

    pub fn failed(attempts: u32, error: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            attempts,
            last_error: Some(error.into()),
            at: Utc::now(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}
