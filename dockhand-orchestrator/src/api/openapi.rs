//! OpenAPI document
//!
//! Hand-written description of the public endpoints, served at
//! `/openapi.json` and advertised as the tool descriptor's `apiSpecUrl`.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /openapi.json
pub async fn openapi(State(state): State<AppState>) -> Json<Value> {
    Json(document(&state.tool.name, &state.tool.description, &state.tool.url))
}

pub fn document(title: &str, description: &str, server_url: &str) -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": title,
            "description": description,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{ "url": server_url }],
        "paths": paths(),
        "components": {
            "schemas": {
                "SubmitJob": submit_job_schema(),
                "JobView": job_view_schema(),
                "Error": {
                    "type": "object",
                    "required": ["error"],
                    "properties": { "error": { "type": "string" } }
                },
            }
        }
    })
}

fn json_body(schema: Value) -> Value {
    json!({ "application/json": { "schema": schema } })
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": json_body(json!({ "$ref": "#/components/schemas/Error" })),
    })
}

fn paths() -> Value {
    let submitted = json!({
        "type": "object",
        "required": ["job_id"],
        "properties": { "job_id": { "type": "string", "format": "uuid" } }
    });
    let job_id = json!({
        "name": "job_id",
        "in": "path",
        "required": true,
        "schema": { "type": "string", "format": "uuid" }
    });

    json!({
        "/jobs": {
            "post": {
                "summary": "Queue a docking job",
                "requestBody": {
                    "required": true,
                    "content": json_body(json!({ "$ref": "#/components/schemas/SubmitJob" })),
                },
                "responses": {
                    "200": { "description": "Job queued", "content": json_body(submitted) },
                    "400": error_response("Invalid request"),
                    "404": error_response("Unknown input reference"),
                }
            }
        },
        "/jobs/{job_id}": {
            "get": {
                "summary": "Current status of a job",
                "parameters": [job_id],
                "responses": {
                    "200": {
                        "description": "Job view",
                        "content": json_body(json!({ "$ref": "#/components/schemas/JobView" })),
                    },
                    "404": error_response("Unknown job"),
                }
            }
        },
        "/health": {
            "get": {
                "summary": "Liveness and job counts",
                "responses": { "200": { "description": "Service is up" } }
            }
        },
    })
}

fn submit_job_schema() -> Value {
    json!({
        "type": "object",
        "required": ["input_ref", "payload", "callback_url"],
        "properties": {
            "input_ref": { "type": "string", "example": "P12345" },
            "payload": { "type": "string", "description": "Ligand SMILES", "example": "CCO" },
            "callback_url": { "type": "string", "format": "uri" },
        }
    })
}

fn job_view_schema() -> Value {
    let timestamp = json!({ "type": "string", "format": "date-time" });
    let result = json!({
        "type": "object",
        "properties": {
            "input_ref": { "type": "string" },
            "payload": { "type": "string" },
            "docking_score": { "type": "number" },
            "docking_confidence": { "type": "string", "enum": ["high", "moderate", "low"] },
            "pose": { "type": "string" },
        }
    });
    let error = json!({
        "type": "object",
        "properties": {
            "error_type": {
                "type": "string",
                "enum": [
                    "no_pose_generated", "execution_failed", "timeout",
                    "worker_crash", "input_not_found", "internal"
                ]
            },
            "message": { "type": "string" },
            "diagnostic": { "type": "string" },
        }
    });
    let delivery = json!({
        "type": "object",
        "properties": {
            "status": { "type": "string", "enum": ["delivered", "failed"] },
            "attempts": { "type": "integer" },
            "last_error": { "type": "string" },
            "at": timestamp.clone(),
        }
    });

    json!({
        "type": "object",
        "required": ["job_id", "status", "created_at"],
        "properties": {
            "job_id": { "type": "string", "format": "uuid" },
            "status": { "type": "string", "enum": ["queued", "running", "succeeded", "failed"] },
            "result": result,
            "error": error,
            "created_at": timestamp.clone(),
            "started_at": timestamp.clone(),
            "finished_at": timestamp,
            "delivery": delivery,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_job_paths() {
        let doc = document("DiffDock docking", "Docks ligands", "http://dock.test");
        assert_eq!(doc["servers"][0]["url"], "http://dock.test");
        assert!(doc["paths"]["/jobs"]["post"].is_object());
        assert!(doc["paths"]["/jobs/{job_id}"]["get"].is_object());
        assert_eq!(
            doc["components"]["schemas"]["JobView"]["properties"]["status"]["enum"][3],
            "failed"
        );
    }
}
