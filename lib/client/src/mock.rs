//! In-memory [`WorkflowApi`] for tests.
//!
//! Every request is recorded. Poll responses are fed one at a time through
//! [`MockApi::push_poll`]; a poll with nothing queued stays pending, like a
//! long-poll the server has not answered yet.

use crate::api::{JsonObject, WorkflowApi};
use crate::error::ApiError;
use async_trait::async_trait;
use scanstation_core::{QueuePosition, WorkflowId};
use scanstation_template::{Configuration, Template};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

/// A request received by [`MockApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    FetchTemplate,
    ListWorkflows,
    FetchWorkflow(WorkflowId),
    CreateWorkflow(JsonObject),
    UpdateConfig(WorkflowId, Configuration),
    Poll(WorkflowId),
    Submit(WorkflowId),
    Enqueue(WorkflowId),
    Dequeue(QueuePosition),
    Capture { id: WorkflowId, retake: bool },
    FinishCapture(WorkflowId),
}

/// Endpoints whose failure can be scripted with [`MockApi::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Template,
    List,
    Fetch,
    Create,
    UpdateConfig,
    Submit,
    Enqueue,
    Dequeue,
    Capture,
    FinishCapture,
}

type PollResult = Result<JsonObject, ApiError>;

/// Scriptable in-memory workflow server.
pub struct MockApi {
    template: Mutex<Template>,
    workflows: Mutex<Vec<JsonObject>>,
    failures: Mutex<HashMap<Endpoint, ApiError>>,
    calls: Mutex<Vec<ApiCall>>,
    images: Mutex<Vec<String>>,
    next_id: AtomicU64,
    next_position: AtomicU64,
    polls_started: AtomicUsize,
    poll_tx: mpsc::UnboundedSender<PollResult>,
    poll_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<PollResult>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    /// Creates a server with an empty template and no workflows.
    #[must_use]
    pub fn new() -> Self {
        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        Self {
            template: Mutex::new(Template::empty()),
            workflows: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            images: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            next_position: AtomicU64::new(1),
            polls_started: AtomicUsize::new(0),
            poll_tx,
            poll_rx: tokio::sync::Mutex::new(poll_rx),
        }
    }

    /// Serves `template` from `/plugins`.
    #[must_use]
    pub fn with_template(self, template: Template) -> Self {
        *lock(&self.template) = template;
        self
    }

    /// Adds a workflow representation to `/workflow`.
    #[must_use]
    pub fn with_workflow(self, workflow: JsonValue) -> Self {
        if let JsonValue::Object(map) = workflow {
            lock(&self.workflows).push(map);
        }
        self
    }

    /// Replaces every workflow representation served from `/workflow`.
    pub fn set_workflows(&self, workflows: Vec<JsonObject>) {
        *lock(&self.workflows) = workflows;
    }

    /// Makes every request to `endpoint` fail with `error`.
    pub fn fail(&self, endpoint: Endpoint, error: ApiError) {
        lock(&self.failures).insert(endpoint, error);
    }

    /// Lets requests to `endpoint` succeed again.
    pub fn recover(&self, endpoint: Endpoint) {
        lock(&self.failures).remove(&endpoint);
    }

    /// Answers the oldest pending poll, or the next one to arrive.
    pub fn push_poll(&self, result: PollResult) {
        // The receiver lives as long as `self`, so the send cannot fail.
        let _ = self.poll_tx.send(result);
    }

    /// Returns how many polls have been sent, answered or not.
    #[must_use]
    pub fn polls_started(&self) -> usize {
        self.polls_started.load(Ordering::SeqCst)
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        lock(&self.calls).clone()
    }

    /// Returns how many received requests satisfy `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: ApiCall) {
        lock(&self.calls).push(call);
    }

    fn check(&self, endpoint: Endpoint) -> Result<(), ApiError> {
        match lock(&self.failures).get(&endpoint) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// A timeout as the HTTP client reports it.
#[must_use]
pub fn poll_timeout(id: WorkflowId) -> ApiError {
    ApiError::Timeout {
        endpoint: format!("workflow/{id}/poll"),
    }
}

#[async_trait]
impl WorkflowApi for MockApi {
    async fn fetch_template(&self) -> Result<Template, ApiError> {
        self.record(ApiCall::FetchTemplate);
        self.check(Endpoint::Template)?;
        Ok(lock(&self.template).clone())
    }

    async fn list_workflows(&self) -> Result<Vec<JsonObject>, ApiError> {
        self.record(ApiCall::ListWorkflows);
        self.check(Endpoint::List)?;
        Ok(lock(&self.workflows).clone())
    }

    async fn fetch_workflow(&self, id: WorkflowId) -> Result<JsonObject, ApiError> {
        self.record(ApiCall::FetchWorkflow(id));
        self.check(Endpoint::Fetch)?;
        lock(&self.workflows)
            .iter()
            .find(|w| w.get("id").and_then(JsonValue::as_u64) == Some(id.get()))
            .cloned()
            .ok_or_else(|| ApiError::Status {
                endpoint: format!("workflow/{id}"),
                status: 404,
            })
    }

    async fn create_workflow(&self, payload: &JsonObject) -> Result<WorkflowId, ApiError> {
        self.record(ApiCall::CreateWorkflow(payload.clone()));
        self.check(Endpoint::Create)?;
        let id = WorkflowId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut stored = payload.clone();
        stored.insert("id".to_string(), JsonValue::from(id.get()));
        lock(&self.workflows).push(stored);
        Ok(id)
    }

    async fn update_config(
        &self,
        id: WorkflowId,
        config: &Configuration,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::UpdateConfig(id, config.clone()));
        self.check(Endpoint::UpdateConfig)
    }

    async fn poll(&self, id: WorkflowId, _timeout: Duration) -> Result<JsonObject, ApiError> {
        self.record(ApiCall::Poll(id));
        self.polls_started.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.poll_rx.lock().await;
        match rx.recv().await {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn submit(&self, id: WorkflowId) -> Result<(), ApiError> {
        self.record(ApiCall::Submit(id));
        self.check(Endpoint::Submit)
    }

    async fn enqueue(&self, id: WorkflowId) -> Result<QueuePosition, ApiError> {
        self.record(ApiCall::Enqueue(id));
        self.check(Endpoint::Enqueue)?;
        Ok(QueuePosition::new(
            self.next_position.fetch_add(1, Ordering::SeqCst),
        ))
    }

    async fn dequeue(&self, position: QueuePosition) -> Result<(), ApiError> {
        self.record(ApiCall::Dequeue(position));
        self.check(Endpoint::Dequeue)
    }

    /// Every capture shoots both pages of a spread; a retake replaces the last two.
    async fn capture(&self, id: WorkflowId, retake: bool) -> Result<Vec<String>, ApiError> {
        self.record(ApiCall::Capture { id, retake });
        self.check(Endpoint::Capture)?;
        let mut images = lock(&self.images);
        if retake {
            let keep = images.len().saturating_sub(2);
            images.truncate(keep);
        }
        for _ in 0..2 {
            let next = format!("{:03}.jpg", images.len());
            images.push(next);
        }
        Ok(images.clone())
    }

    async fn finish_capture(&self, id: WorkflowId) -> Result<(), ApiError> {
        self.record(ApiCall::FinishCapture(id));
        self.check(Endpoint::FinishCapture)
    }
}
