use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dockhand_core::validation::SmilesValidator;
use dockhand_orchestrator::config::Config;
use dockhand_orchestrator::notifier::CallbackNotifier;
use dockhand_orchestrator::repository::{JobStore, MemoryJobStore, PgJobStore};
use dockhand_orchestrator::scheduler::{PoolSettings, WorkerPool};
use dockhand_orchestrator::service::{JobService, StandardExecutionService};
use dockhand_orchestrator::state::{self, AppState};
use dockhand_orchestrator::{api, db};
use dockhand_runner::{ComputeRunner, DiffDockBackend, InputPreparer, LocalStructureStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dockhand_orchestrator=info,dockhand_runner=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Dockhand Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let store: Arc<dyn JobStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(url)
                .await
                .context("Failed to create database pool")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            Arc::new(PgJobStore::new(pool))
        }
        None => {
            tracing::info!("DATABASE_URL not set, keeping jobs in memory");
            Arc::new(MemoryJobStore::with_retention(config.memory_retained_jobs))
        }
    };

    let preparer: Arc<dyn InputPreparer> =
        Arc::new(LocalStructureStore::new(config.structure_dir.clone()));

    let mut backend = DiffDockBackend::new(config.diffdock_program.clone(), config.diffdock_args.clone());
    if let Some(dir) = &config.diffdock_workdir {
        backend = backend.with_working_dir(dir.clone());
    }
    let runner = ComputeRunner::new(Arc::new(backend), config.scratch_dir.clone(), config.job_timeout);

    let notifier = CallbackNotifier::new(config.callback_timeout, config.callback_max_attempts)
        .context("Failed to build callback client")?;

    let wake = Arc::new(Notify::new());

    let pool = WorkerPool::new(
        PoolSettings::from_config(&config),
        Arc::clone(&store),
        Arc::new(StandardExecutionService::new(Arc::clone(&preparer), runner)),
        notifier,
        Arc::clone(&wake),
    )
    .start()
    .await
    .context("Failed to start worker pool")?;

    let jobs = JobService::new(store, preparer, Arc::new(SmilesValidator), wake);
    let app = api::create_router(AppState::new(jobs, state::tool_descriptor(&config.public_url)));

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    pool.shutdown().await;
    tracing::info!("Dockhand Orchestrator stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
