//! Scheduler module
//!
//! Runs claimed jobs on a fixed pool of workers and sweeps for jobs whose
//! worker stopped renewing its lease.

mod pool;
mod supervisor;
mod worker;

pub use pool::{PoolError, PoolHandle, PoolSettings, WorkerPool};
pub use supervisor::Supervisor;
