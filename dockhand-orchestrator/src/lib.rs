//! Dockhand Orchestrator
//!
//! Accepts docking jobs over HTTP, runs them on an in-process worker pool
//! and reports results to caller callbacks.

pub mod api;
pub mod config;
pub mod db;
pub mod notifier;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod state;
