//! PostgreSQL job store
//!
//! Every transition is a single conditional `UPDATE`, so the database decides
//! races: claims use `FOR UPDATE SKIP LOCKED` and terminal updates only match
//! rows that are still `running`. Timestamps are clamped with `GREATEST` to
//! stay strictly after the previous one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dockhand_core::domain::{
    DeliveryOutcome, Job, JobFailure, JobOutcome, JobState, now_micros,
};
use dockhand_core::dto::health::JobCounts;
use sqlx::PgPool;
use uuid::Uuid;

use super::{JobStore, StoreError, StoreResult};

const JOB_COLUMNS: &str = "id, state, input_ref, payload_ref, callback_url, created_at, \
     started_at, finished_at, worker_id, heartbeat_at, result, error, delivery";

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current state of `id`, used to explain why a conditional update matched nothing
    async fn current_state(&self, id: Uuid) -> StoreResult<JobState> {
        let state: Option<String> = sqlx::query_scalar("SELECT state FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match state {
            Some(state) => parse_state(id, &state),
            None => Err(StoreError::NotFound(id)),
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: &Job) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, state, input_ref, payload_ref, callback_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(job.id)
        .bind(job.state.as_str())
        .bind(&job.input_ref)
        .bind(&job.payload_ref)
        .bind(&job.callback_url)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn claim_next(&self, worker_id: &str) -> StoreResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs
            SET state = 'running',
                worker_id = $1,
                started_at = GREATEST($2, created_at + INTERVAL '1 microsecond'),
                heartbeat_at = GREATEST($2, created_at + INTERVAL '1 microsecond')
            WHERE id = (
                SELECT id FROM jobs
                WHERE state = 'queued'
                ORDER BY created_at ASC, id ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(worker_id)
        .bind(now_micros())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn heartbeat(&self, id: Uuid, worker_id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET heartbeat_at = GREATEST($3, heartbeat_at + INTERVAL '1 microsecond')
            WHERE id = $1 AND worker_id = $2 AND state = 'running'
            "#,
        )
        .bind(id)
        .bind(worker_id)
        .bind(now_micros())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        self.current_state(id).await.map(|_| false)
    }

    async fn finish(&self, id: Uuid, outcome: JobOutcome) -> StoreResult<Job> {
        let state = outcome.state();
        let (result, error) = match &outcome {
            JobOutcome::Succeeded(result) => (Some(serde_json::to_value(result)?), None),
            JobOutcome::Failed(failure) => (None, Some(serde_json::to_value(failure)?)),
        };

        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs
            SET state = $2,
                finished_at = GREATEST($3, started_at + INTERVAL '1 microsecond'),
                result = $4,
                error = $5
            WHERE id = $1 AND state = 'running'
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(id)
        .bind(state.as_str())
        .bind(now_micros())
        .bind(result)
        .bind(error)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Job::try_from(row),
            None => {
                let from = self.current_state(id).await?;
                Err(StoreError::InvalidTransition { id, from })
            }
        }
    }

    async fn fail_stale(&self, before: DateTime<Utc>, failure: &JobFailure) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs
            SET state = 'failed',
                finished_at = GREATEST($2, started_at + INTERVAL '1 microsecond'),
                error = $3
            WHERE state = 'running'
              AND COALESCE(heartbeat_at, started_at, created_at) < $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(before)
        .bind(now_micros())
        .bind(serde_json::to_value(failure)?)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn record_delivery(&self, id: Uuid, outcome: &DeliveryOutcome) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET delivery = $2
            WHERE id = $1 AND state IN ('succeeded', 'failed')
            "#,
        )
        .bind(id)
        .bind(serde_json::to_value(outcome)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let from = self.current_state(id).await?;
        Err(StoreError::InvalidTransition { id, from })
    }

    async fn counts(&self) -> StoreResult<JobCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM jobs GROUP BY state")
                .fetch_all(&self.pool)
                .await?;

        fold_counts(rows)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_state(id: Uuid, raw: &str) -> StoreResult<JobState> {
    raw.parse().map_err(|reason| StoreError::Corrupt { id, reason })
}

fn decode_field<T: serde::de::DeserializeOwned>(
    id: Uuid,
    name: &str,
    value: Option<serde_json::Value>,
) -> StoreResult<Option<T>> {
    value
        .map(|v| {
            serde_json::from_value(v).map_err(|e| StoreError::Corrupt {
                id,
                reason: format!("invalid {}: {}", name, e),
            })
        })
        .transpose()
}

fn fold_counts(rows: Vec<(String, i64)>) -> StoreResult<JobCounts> {
    let mut counts = JobCounts::default();
    for (state, count) in rows {
        let count = u64::try_from(count).unwrap_or(0);
        match state.parse::<JobState>() {
            Ok(JobState::Queued) => counts.queued += count,
            Ok(JobState::Running) => counts.running += count,
            Ok(JobState::Succeeded) => counts.succeeded += count,
            Ok(JobState::Failed) => counts.failed += count,
            Err(reason) => {
                return Err(StoreError::Corrupt {
                    id: Uuid::nil(),
                    reason,
                });
            }
        }
    }
    Ok(counts)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    state: String,
    input_ref: String,
    payload_ref: String,
    callback_url: String,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    worker_id: Option<String>,
    heartbeat_at: Option<DateTime<Utc>>,
    result: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
    delivery: Option<serde_json::Value>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = row.id;
        Ok(Job {
            id,
            state: parse_state(id, &row.state)?,
            input_ref: row.input_ref,
            payload_ref: row.payload_ref,
            callback_url: row.callback_url,
            created_at: row.created_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
            worker_id: row.worker_id,
            heartbeat_at: row.heartbeat_at,
            result: decode_field(id, "result", row.result)?,
            error: decode_field(id, "error", row.error)?,
            delivery: decode_field(id, "delivery", row.delivery)?,
        })
    }
}
