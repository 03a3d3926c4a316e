use dockhand_core::dto::health::ToolDescriptor;
use std::sync::Arc;

use crate::service::JobService;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobService,
    pub tool: Arc<ToolDescriptor>,
}

impl AppState {
    pub fn new(jobs: JobService, tool: ToolDescriptor) -> Self {
        Self {
            jobs,
            tool: Arc::new(tool),
        }
    }
}

/// Descriptor advertised at `/.well-known/tool.json`
pub fn tool_descriptor(public_url: &str) -> ToolDescriptor {
    let url = public_url.trim_end_matches('/').to_string();
    ToolDescriptor {
        id: "dockhand-diffdock".to_string(),
        name: "DiffDock docking".to_string(),
        description: "Docks a ligand (SMILES) against a protein structure and reports the \
                      top-ranked pose with its confidence"
            .to_string(),
        publisher: "Dockhand".to_string(),
        api_spec_url: format!("{}/openapi.json", url),
        url,
    }
}
