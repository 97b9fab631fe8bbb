//! [`WorkflowApi`] over HTTP using reqwest.

use crate::api::{JsonObject, WorkflowApi};
use crate::config::ClientConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use scanstation_core::{QueuePosition, WorkflowId};
use scanstation_template::{Configuration, Template};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Tracing target for HTTP client operations.
pub const TRACING_TARGET: &str = "scanstation_client::http";

#[derive(Debug)]
struct HttpApiInner {
    http: Client,
    base_url: Url,
}

/// Workflow server client.
#[derive(Clone, Debug)]
pub struct HttpApi {
    inner: Arc<HttpApiInner>,
}

#[derive(Deserialize)]
struct Created {
    id: WorkflowId,
}

#[derive(Deserialize)]
struct Queued {
    queue_position: QueuePosition,
}

#[derive(Deserialize)]
struct Captured {
    images: Vec<String>,
}

/// The server wraps the list in an object; a bare list is accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum WorkflowList {
    Wrapped { workflows: Vec<JsonObject> },
    Bare(Vec<JsonObject>),
}

impl HttpApi {
    /// Creates a client for the server at `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut raw = config.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw).map_err(|e| ApiError::RequestFailed {
            endpoint: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| ApiError::RequestFailed {
                endpoint: base_url.to_string(),
                reason: e.to_string(),
            })?;

        debug!(target: TRACING_TARGET, base_url = %base_url, "created workflow server client");

        Ok(Self {
            inner: Arc::new(HttpApiInner { http, base_url }),
        })
    }

    /// Returns the server root every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn url(&self, endpoint: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(endpoint)
            .map_err(|e| ApiError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| classify(endpoint, &e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        self.send(request, endpoint)
            .await?
            .json::<T>()
            .await
            .map_err(|e| classify(endpoint, &e))
    }

    async fn post(&self, endpoint: &str) -> Result<(), ApiError> {
        let request = self.inner.http.post(self.url(endpoint)?);
        self.send(request, endpoint).await.map(drop)
    }
}

fn classify(endpoint: &str, e: &reqwest::Error) -> ApiError {
    let endpoint = endpoint.to_string();
    if e.is_timeout() {
        ApiError::Timeout { endpoint }
    } else if e.is_connect() {
        ApiError::ConnectionFailed {
            endpoint,
            reason: e.to_string(),
        }
    } else if e.is_decode() {
        ApiError::InvalidResponse {
            endpoint,
            reason: e.to_string(),
        }
    } else {
        ApiError::RequestFailed {
            endpoint,
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl WorkflowApi for HttpApi {
    #[instrument(skip(self))]
    async fn fetch_template(&self) -> Result<Template, ApiError> {
        let endpoint = "plugins";
        let request = self.inner.http.get(self.url(endpoint)?);
        self.send_json(request, endpoint).await
    }

    #[instrument(skip(self))]
    async fn list_workflows(&self) -> Result<Vec<JsonObject>, ApiError> {
        let endpoint = "workflow";
        let request = self.inner.http.get(self.url(endpoint)?);
        let list: WorkflowList = self.send_json(request, endpoint).await?;
        Ok(match list {
            WorkflowList::Wrapped { workflows } | WorkflowList::Bare(workflows) => workflows,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_workflow(&self, id: WorkflowId) -> Result<JsonObject, ApiError> {
        let endpoint = format!("workflow/{id}");
        let request = self.inner.http.get(self.url(&endpoint)?);
        self.send_json(request, &endpoint).await
    }

    #[instrument(skip(self, payload))]
    async fn create_workflow(&self, payload: &JsonObject) -> Result<WorkflowId, ApiError> {
        let endpoint = "workflow";
        let request = self.inner.http.post(self.url(endpoint)?).json(payload);
        let created: Created = self.send_json(request, endpoint).await?;
        Ok(created.id)
    }

    #[instrument(skip(self, config))]
    async fn update_config(
        &self,
        id: WorkflowId,
        config: &Configuration,
    ) -> Result<(), ApiError> {
        let endpoint = format!("workflow/{id}/config");
        let request = self.inner.http.put(self.url(&endpoint)?).json(config);
        self.send(request, &endpoint).await.map(drop)
    }

    #[instrument(skip(self))]
    async fn poll(&self, id: WorkflowId, timeout: Duration) -> Result<JsonObject, ApiError> {
        let endpoint = format!("workflow/{id}/poll");
        let request = self.inner.http.get(self.url(&endpoint)?).timeout(timeout);
        self.send_json(request, &endpoint).await
    }

    #[instrument(skip(self))]
    async fn submit(&self, id: WorkflowId) -> Result<(), ApiError> {
        self.post(&format!("workflow/{id}/submit")).await
    }

    #[instrument(skip(self))]
    async fn enqueue(&self, id: WorkflowId) -> Result<QueuePosition, ApiError> {
        let endpoint = "queue";
        let request = self
            .inner
            .http
            .post(self.url(endpoint)?)
            .form(&[("id", id.get())]);
        let queued: Queued = self.send_json(request, endpoint).await?;
        Ok(queued.queue_position)
    }

    #[instrument(skip(self))]
    async fn dequeue(&self, position: QueuePosition) -> Result<(), ApiError> {
        let endpoint = format!("queue/{position}");
        let request = self.inner.http.delete(self.url(&endpoint)?);
        self.send(request, &endpoint).await.map(drop)
    }

    #[instrument(skip(self))]
    async fn capture(&self, id: WorkflowId, retake: bool) -> Result<Vec<String>, ApiError> {
        let endpoint = format!("workflow/{id}/capture");
        let mut url = self.url(&endpoint)?;
        if retake {
            url.set_query(Some("retake=true"));
        }
        let captured: Captured = self
            .send_json(self.inner.http.post(url), &endpoint)
            .await?;
        Ok(captured.images)
    }

    #[instrument(skip(self))]
    async fn finish_capture(&self, id: WorkflowId) -> Result<(), ApiError> {
        self.post(&format!("workflow/{id}/capture/finish")).await
    }
}
