//! Configuration module
//!
//! Handles CLI configuration including the orchestrator URL.

use dockhand_client::DockhandClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,
}

impl Config {
    pub fn client(&self) -> DockhandClient {
        DockhandClient::new(&self.orchestrator_url)
    }
}
