use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create jobs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id UUID PRIMARY KEY,
            state VARCHAR(16) NOT NULL,
            input_ref VARCHAR(128) NOT NULL,
            payload_ref TEXT NOT NULL,
            callback_url TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            started_at TIMESTAMPTZ,
            finished_at TIMESTAMPTZ,
            worker_id VARCHAR(255),
            heartbeat_at TIMESTAMPTZ,
            result JSONB,
            error JSONB,
            delivery JSONB
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Claim order scan
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_jobs_queued ON jobs(created_at, id) WHERE state = 'queued'",
    )
    .execute(pool)
    .await?;

    // Supervisor lease sweep
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_jobs_running_heartbeat ON jobs(heartbeat_at) WHERE state = 'running'",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
