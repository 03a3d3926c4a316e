//! Job domain types
//!
//! The job state machine lives here so every store applies the same rules:
//! `Queued -> Running -> Succeeded | Failed`, with no way back out of a
//! terminal state.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::delivery::DeliveryOutcome;
use crate::domain::failure::JobFailure;
use crate::domain::result::DockingResult;

/// Docking job record
///
/// Owned by the job store; the store is the only writer of `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub state: JobState,
    pub input_ref: String,
    pub payload_ref: String,
    pub callback_url: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Worker that claimed the job
    pub worker_id: Option<String>,
    /// Last lease renewal by the owning worker
    pub heartbeat_at: Option<DateTime<Utc>>,
    pub result: Option<DockingResult>,
    pub error: Option<JobFailure>,
    /// Callback delivery annotation, written after the terminal transition
    pub delivery: Option<DeliveryOutcome>,
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobState::Queued),
            "running" => Ok(JobState::Running),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state '{}'", other)),
        }
    }
}

/// Terminal outcome of running a job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded(DockingResult),
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Succeeded(_) => JobState::Succeeded,
            JobOutcome::Failed(_) => JobState::Failed,
        }
    }
}

/// A transition the state machine does not allow
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("job {id} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub id: Uuid,
    pub from: JobState,
    pub to: JobState,
}

impl Job {
    /// Creates a fresh `Queued` job with a new identifier
    pub fn new(input_ref: String, payload_ref: String, callback_url: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: JobState::Queued,
            input_ref,
            payload_ref,
            callback_url,
            created_at: now_micros(),
            started_at: None,
            finished_at: None,
            worker_id: None,
            heartbeat_at: None,
            result: None,
            error: None,
            delivery: None,
        }
    }

    /// Claims a queued job for `worker_id`
    pub fn start(&mut self, worker_id: &str, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.state != JobState::Queued {
            return Err(self.transition_error(JobState::Running));
        }

        let started_at = strictly_after(self.created_at, now);
        self.state = JobState::Running;
        self.started_at = Some(started_at);
        self.heartbeat_at = Some(started_at);
        self.worker_id = Some(worker_id.to_string());
        Ok(())
    }

    /// Moves a running job into its terminal state
    pub fn finish(&mut self, outcome: JobOutcome, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.state != JobState::Running {
            return Err(self.transition_error(outcome.state()));
        }

        let floor = self.started_at.unwrap_or(self.created_at);
        self.finished_at = Some(strictly_after(floor, now));
        self.state = outcome.state();
        match outcome {
            JobOutcome::Succeeded(result) => self.result = Some(result),
            JobOutcome::Failed(failure) => self.error = Some(failure),
        }
        Ok(())
    }

    /// Timestamp the lease is measured from
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.heartbeat_at.or(self.started_at)
    }

    fn transition_error(&self, to: JobState) -> TransitionError {
        TransitionError {
            id: self.id,
            from: self.state,
            to,
        }
    }
}

/// Current time truncated to the microsecond precision stores keep
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Returns `now` if it is later than `previous`, otherwise one microsecond past it.
pub fn strictly_after(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}
