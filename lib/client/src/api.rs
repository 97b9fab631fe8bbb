//! The request surface of the workflow server.

use crate::error::ApiError;
use async_trait::async_trait;
use scanstation_core::{QueuePosition, WorkflowId};
use scanstation_template::{Configuration, Template};
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;

/// A JSON object as sent to or received from the server.
pub type JsonObject = Map<String, JsonValue>;

/// Requests a workflow client can make.
///
/// [`HttpApi`](crate::HttpApi) talks to a real server;
/// [`MockApi`](crate::MockApi) answers from memory so models can be
/// tested without one.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// `GET /plugins`: the configuration template of every plugin.
    async fn fetch_template(&self) -> Result<Template, ApiError>;

    /// `GET /workflow`: every workflow the server knows.
    async fn list_workflows(&self) -> Result<Vec<JsonObject>, ApiError>;

    /// `GET /workflow/{id}`: one workflow.
    async fn fetch_workflow(&self, id: WorkflowId) -> Result<JsonObject, ApiError>;

    /// `POST /workflow`: creates a workflow and returns its id.
    async fn create_workflow(&self, payload: &JsonObject) -> Result<WorkflowId, ApiError>;

    /// `PUT /workflow/{id}/config`: replaces a workflow's configuration.
    async fn update_config(&self, id: WorkflowId, config: &Configuration)
    -> Result<(), ApiError>;

    /// `GET /workflow/{id}/poll`: waits up to `timeout` for a state change.
    async fn poll(&self, id: WorkflowId, timeout: Duration) -> Result<JsonObject, ApiError>;

    /// `POST /workflow/{id}/submit`: requests postprocessing.
    async fn submit(&self, id: WorkflowId) -> Result<(), ApiError>;

    /// `POST /queue`: queues the workflow for processing.
    async fn enqueue(&self, id: WorkflowId) -> Result<QueuePosition, ApiError>;

    /// `DELETE /queue/{position}`: removes a queued workflow.
    async fn dequeue(&self, position: QueuePosition) -> Result<(), ApiError>;

    /// `POST /workflow/{id}/capture`: captures, or retakes, and returns every image.
    async fn capture(&self, id: WorkflowId, retake: bool) -> Result<Vec<String>, ApiError>;

    /// `POST /workflow/{id}/capture/finish`: ends the capture phase.
    async fn finish_capture(&self, id: WorkflowId) -> Result<(), ApiError>;
}
