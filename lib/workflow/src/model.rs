//! The workflow model.
//!
//! A [`Workflow`] owns its template, the rules compiled from it, its
//! attributes, and a poll task that keeps the attributes in sync with the
//! server. Handles are cheap to clone and share the same state.
//!
//! # Lifecycle
//!
//! ```text
//! unsaved ──save()──▶ saved ──▶ polling ──destroy()──▶ destroyed
//!                      ▲
//!             hydrate(with id)
//! ```
//!
//! Once destroyed, nothing changes the attributes again: late poll responses,
//! command results and `set` calls are all dropped.

use crate::attributes::WorkflowAttributes;
use crate::error::WorkflowError;
use crate::poller;
use rootcause::Report;
use scanstation_client::{JsonObject, PollSettings, WorkflowApi};
use scanstation_core::{QueuePosition, WorkflowId};
use scanstation_template::{
    AttributePath, Configuration, RuleSet, Template, ValidationErrors, compile, defaults_for,
};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, watch};
use tracing::{debug, instrument, warn};

#[derive(Debug)]
struct State {
    attrs: WorkflowAttributes,
    destroyed: bool,
}

pub(crate) struct Inner {
    pub(crate) api: Arc<dyn WorkflowApi>,
    pub(crate) settings: PollSettings,
    pub(crate) wake: Arc<Notify>,
    template: Template,
    rules: RuleSet,
    state: Mutex<State>,
    polling: AtomicBool,
    changes: watch::Sender<u64>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    /// Applies `f` unless the workflow was destroyed. Returns whether it ran.
    fn mutate(&self, f: impl FnOnce(&mut WorkflowAttributes)) -> bool {
        self.try_mutate(|attrs| {
            f(attrs);
            Ok::<_, std::convert::Infallible>(())
        })
        .is_some()
    }

    /// Like [`Inner::mutate`], but a failed `f` announces no change.
    /// Returns `None` once destroyed.
    fn try_mutate<E>(
        &self,
        f: impl FnOnce(&mut WorkflowAttributes) -> Result<(), E>,
    ) -> Option<Result<(), E>> {
        let mut state = self.lock();
        if state.destroyed {
            return None;
        }
        let result = f(&mut state.attrs);
        drop(state);
        if result.is_ok() {
            self.changes.send_modify(|version| *version += 1);
        }
        Some(result)
    }

    /// Merges a server representation. Returns false once destroyed.
    pub(crate) fn apply(&self, update: JsonObject) -> bool {
        match self.try_mutate(|attrs| attrs.merge(update)) {
            None => false,
            Some(Ok(())) => true,
            Some(Err(e)) => {
                warn!(workflow_id = ?self.lock().attrs.id, error = %e, "ignoring malformed workflow update");
                true
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Lets a poll task sleeping in backoff notice the model is gone.
        self.wake.notify_one();
    }
}

/// A workflow and its sync with the server.
#[derive(Clone)]
pub struct Workflow {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Workflow")
            .field("id", &state.attrs.id)
            .field("name", &state.attrs.name)
            .field("destroyed", &state.destroyed)
            .finish_non_exhaustive()
    }
}

async fn load_template(api: &dyn WorkflowApi) -> Template {
    match api.fetch_template().await {
        Ok(template) => template,
        Err(e) => {
            warn!(error = %e, "failed to fetch configuration template");
            Template::empty()
        }
    }
}

impl Workflow {
    /// Creates an unsaved workflow with the template's default configuration.
    pub async fn new(api: Arc<dyn WorkflowApi>, settings: PollSettings) -> Self {
        let template = load_template(api.as_ref()).await;
        let attrs = WorkflowAttributes {
            config: defaults_for(&template),
            ..WorkflowAttributes::default()
        };
        Self::build(api, settings, template, attrs)
    }

    /// Creates a model for a server representation.
    ///
    /// A representation with an id starts polling right away. One without is
    /// treated as a new workflow: its configuration is laid over the
    /// template's defaults.
    pub async fn hydrate(
        api: Arc<dyn WorkflowApi>,
        settings: PollSettings,
        representation: JsonObject,
    ) -> Self {
        let template = load_template(api.as_ref()).await;
        let mut attrs = WorkflowAttributes::from_object(representation).unwrap_or_else(|e| {
            warn!(error = %e, "malformed workflow representation");
            WorkflowAttributes::default()
        });
        if attrs.id.is_none() {
            let mut config = defaults_for(&template);
            config.merge(attrs.config.as_map().clone());
            attrs.config = config;
        }
        let workflow = Self::build(api, settings, template, attrs);
        workflow.start_polling();
        workflow
    }

    fn build(
        api: Arc<dyn WorkflowApi>,
        settings: PollSettings,
        template: Template,
        attrs: WorkflowAttributes,
    ) -> Self {
        let rules = compile(&template);
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                api,
                settings,
                wake: Arc::new(Notify::new()),
                template,
                rules,
                state: Mutex::new(State {
                    attrs,
                    destroyed: false,
                }),
                polling: AtomicBool::new(false),
                changes,
            }),
        }
    }

    /// Returns the server-assigned id, `None` until saved.
    #[must_use]
    pub fn id(&self) -> Option<WorkflowId> {
        self.inner.lock().attrs.id
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.inner.lock().attrs.name.clone()
    }

    #[must_use]
    pub fn config(&self) -> Configuration {
        self.inner.lock().attrs.config.clone()
    }

    #[must_use]
    pub fn images(&self) -> Vec<String> {
        self.inner.lock().attrs.images.clone()
    }

    #[must_use]
    pub fn queue_id(&self) -> Option<QueuePosition> {
        self.inner.lock().attrs.queue_id
    }

    /// Returns a snapshot of every attribute.
    #[must_use]
    pub fn attributes(&self) -> WorkflowAttributes {
        self.inner.lock().attrs.clone()
    }

    /// Returns the outbound representation.
    #[must_use]
    pub fn to_payload(&self) -> JsonObject {
        self.inner.lock().attrs.to_payload()
    }

    /// Returns the template fetched when the model was created.
    #[must_use]
    pub fn template(&self) -> &Template {
        &self.inner.template
    }

    /// Returns the rules compiled from the template.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.inner.rules
    }

    /// Returns whether both handles share one model.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.inner.polling.load(Ordering::SeqCst)
    }

    /// Subscribes to state changes.
    ///
    /// The value is a version counter bumped on every change; only the fact
    /// that it changed is meaningful.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Sets the attribute addressed by `path` (`name` or
    /// `config.<plugin>.<option>`).
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Path`] for any other path,
    /// [`WorkflowError::TypeMismatch`] for a non-string name and
    /// [`WorkflowError::Destroyed`] once destroyed.
    pub fn set(&self, path: &str, value: JsonValue) -> Result<(), WorkflowError> {
        let path: AttributePath = path.parse()?;
        self.set_path(&path, value)
    }

    /// Sets the attribute at an already parsed path.
    ///
    /// # Errors
    ///
    /// See [`Workflow::set`].
    pub fn set_path(&self, path: &AttributePath, value: JsonValue) -> Result<(), WorkflowError> {
        self.inner
            .try_mutate(|attrs| match path {
                AttributePath::Name => match value {
                    JsonValue::String(name) => {
                        attrs.name = Some(name);
                        Ok(())
                    }
                    _ => Err(WorkflowError::TypeMismatch {
                        path: path.to_string(),
                        expected: "string",
                    }),
                },
                AttributePath::Config(config_path) => attrs
                    .config
                    .set(config_path, value)
                    .map(drop)
                    .map_err(WorkflowError::from),
            })
            .unwrap_or(Err(WorkflowError::Destroyed))
    }

    /// Validates the current name and configuration.
    #[must_use]
    pub fn validate(&self) -> ValidationErrors {
        let state = self.inner.lock();
        self.inner
            .rules
            .validate(state.attrs.name.as_deref(), &state.attrs.config)
    }

    /// Validates and stores the workflow on the server.
    ///
    /// A new workflow is created and starts polling; a saved one has its
    /// configuration replaced.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Invalid`] without contacting the server if
    /// validation fails, or the request error.
    #[instrument(skip(self), fields(workflow_id = ?self.id()))]
    pub async fn save(&self) -> Result<WorkflowId, Report<WorkflowError>> {
        let (id, payload, config) = {
            let state = self.inner.lock();
            if state.destroyed {
                return Err(WorkflowError::Destroyed.into());
            }
            let errors = self
                .inner
                .rules
                .validate(state.attrs.name.as_deref(), &state.attrs.config);
            if !errors.is_empty() {
                return Err(WorkflowError::Invalid { errors }.into());
            }
            (
                state.attrs.id,
                state.attrs.to_payload(),
                state.attrs.config.clone(),
            )
        };

        match id {
            Some(id) => {
                self.inner
                    .api
                    .update_config(id, &config)
                    .await
                    .map_err(WorkflowError::from)?;
                debug!(workflow_id = %id, "saved workflow configuration");
                Ok(id)
            }
            None => {
                let id = self
                    .inner
                    .api
                    .create_workflow(&payload)
                    .await
                    .map_err(WorkflowError::from)?;
                if !self.inner.mutate(|attrs| attrs.id = Some(id)) {
                    return Err(WorkflowError::Destroyed.into());
                }
                debug!(workflow_id = %id, "created workflow");
                self.start_polling();
                Ok(id)
            }
        }
    }

    /// Reloads the workflow from the server.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotSaved`] for a new workflow, or the
    /// request error.
    #[instrument(skip(self), fields(workflow_id = ?self.id()))]
    pub async fn refresh(&self) -> Result<(), Report<WorkflowError>> {
        let id = self.id().ok_or(WorkflowError::NotSaved)?;
        let representation = self
            .inner
            .api
            .fetch_workflow(id)
            .await
            .map_err(WorkflowError::from)?;
        self.inner.apply(representation);
        Ok(())
    }

    /// Starts the poll task. Does nothing for a new workflow, a destroyed one,
    /// or when already polling.
    pub fn start_polling(&self) {
        let Some(id) = self.id() else {
            return;
        };
        if self.is_destroyed() || self.inner.polling.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(workflow_id = %id, "starting to poll");
        poller::spawn(Arc::downgrade(&self.inner), id);
    }

    /// Stops polling and freezes the model. Safe to call repeatedly.
    ///
    /// An in-flight poll request is not cancelled; its response is dropped.
    pub fn destroy(&self) {
        {
            let mut state = self.inner.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
        }
        self.inner.wake.notify_one();
        self.inner.changes.send_modify(|version| *version += 1);
        debug!(workflow_id = ?self.id(), "destroyed workflow");
    }

    /// Merges a server representation, as the poll task does.
    pub(crate) fn apply(&self, representation: JsonObject) {
        self.inner.apply(representation);
    }

    /// Returns the id to address a command to, or logs why there is none.
    fn command_target(&self, command: &'static str) -> Option<WorkflowId> {
        let state = self.inner.lock();
        if state.destroyed {
            debug!(command, "ignoring command on destroyed workflow");
            return None;
        }
        if state.attrs.id.is_none() {
            warn!(command, "workflow has not been saved");
        }
        state.attrs.id
    }

    /// Requests postprocessing.
    #[instrument(skip(self))]
    pub async fn submit(&self) {
        let Some(id) = self.command_target("submit") else {
            return;
        };
        if let Err(e) = self.inner.api.submit(id).await {
            warn!(workflow_id = %id, error = %e, "failed to submit workflow");
        }
    }

    /// Queues the workflow for processing and records its position.
    #[instrument(skip(self))]
    pub async fn enqueue(&self) {
        let Some(id) = self.command_target("enqueue") else {
            return;
        };
        match self.inner.api.enqueue(id).await {
            Ok(position) => {
                self.inner.mutate(|attrs| attrs.queue_id = Some(position));
                debug!(workflow_id = %id, queue_position = %position, "queued workflow");
            }
            Err(e) => warn!(workflow_id = %id, error = %e, "failed to queue workflow"),
        }
    }

    /// Removes the workflow from the processing queue.
    #[instrument(skip(self))]
    pub async fn dequeue(&self) {
        let Some(id) = self.command_target("dequeue") else {
            return;
        };
        let Some(position) = self.queue_id() else {
            warn!(workflow_id = %id, "workflow is not queued");
            return;
        };
        match self.inner.api.dequeue(position).await {
            Ok(()) => {
                self.inner.mutate(|attrs| {
                    if attrs.queue_id == Some(position) {
                        attrs.queue_id = None;
                    }
                });
            }
            Err(e) => warn!(workflow_id = %id, error = %e, "failed to dequeue workflow"),
        }
    }

    /// Captures a spread, or retakes the last one, and replaces the image list.
    #[instrument(skip(self))]
    pub async fn trigger_capture(&self, retake: bool) {
        let Some(id) = self.command_target("capture") else {
            return;
        };
        match self.inner.api.capture(id, retake).await {
            Ok(images) => {
                self.inner.mutate(|attrs| attrs.images = images);
            }
            Err(e) => warn!(workflow_id = %id, retake, error = %e, "failed to capture"),
        }
    }

    /// Ends the capture phase.
    #[instrument(skip(self))]
    pub async fn finish_capture(&self) {
        let Some(id) = self.command_target("finish_capture") else {
            return;
        };
        if let Err(e) = self.inner.api.finish_capture(id).await {
            warn!(workflow_id = %id, error = %e, "failed to finish capture");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanstation_client::{ApiCall, ApiError, Endpoint, MockApi, poll_timeout};
    use scanstation_template::{ConfigPath, OptionDescriptor, PathError};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn binarize() -> Template {
        let mut options = BTreeMap::new();
        options.insert("threshold".to_string(), OptionDescriptor::new(128));
        options.insert(
            "method".to_string(),
            OptionDescriptor::selectable(vec!["otsu".into(), "sauvola".into()]),
        );
        Template::empty().with_plugin("binarize", options)
    }

    fn object(value: JsonValue) -> JsonObject {
        value.as_object().cloned().expect("object")
    }

    fn saved(id: u64) -> JsonObject {
        object(json!({
            "id": id,
            "name": "book",
            "config": {"binarize": {"threshold": 128, "method": "otsu"}}
        }))
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test]
    async fn new_workflow_gets_defaults_and_rules() {
        let api = Arc::new(MockApi::new().with_template(binarize()));
        let wf = Workflow::new(api.clone(), PollSettings::default()).await;

        assert!(wf.is_new());
        assert!(!wf.is_polling());
        assert_eq!(
            wf.config().into_value(),
            json!({"binarize": {"threshold": 128, "method": "otsu"}})
        );
        assert_eq!(wf.rules().len(), 3);
        assert_eq!(api.count(|c| *c == ApiCall::FetchTemplate), 1);
    }

    #[tokio::test]
    async fn template_fetch_failure_leaves_an_empty_template() {
        let api = Arc::new(MockApi::new().with_template(binarize()));
        api.fail(
            Endpoint::Template,
            ApiError::Status {
                endpoint: "plugins".to_string(),
                status: 500,
            },
        );
        let wf = Workflow::new(api.clone(), PollSettings::default()).await;

        assert!(wf.template().is_empty());
        assert!(wf.config().is_empty());
        assert_eq!(wf.rules().len(), 1);
    }

    #[tokio::test]
    async fn set_addresses_name_and_config() {
        let api = Arc::new(MockApi::new().with_template(binarize()));
        let wf = Workflow::new(api, PollSettings::default()).await;

        wf.set("name", json!("scan-01")).expect("name");
        wf.set("config.binarize.method", json!("sauvola"))
            .expect("method");

        assert_eq!(wf.name().as_deref(), Some("scan-01"));
        assert_eq!(
            wf.config().get(&ConfigPath::new("binarize", "method")),
            Some(&json!("sauvola"))
        );
        assert!(wf.validate().is_empty());
    }

    #[tokio::test]
    async fn set_rejects_malformed_paths_and_wrong_types() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::new(api, PollSettings::default()).await;

        assert!(matches!(
            wf.set("config.binarize", json!(1)),
            Err(WorkflowError::Path(PathError::Malformed { .. }))
        ));
        assert!(matches!(
            wf.set("images", json!([])),
            Err(WorkflowError::Path(_))
        ));
        assert!(matches!(
            wf.set("name", json!(5)),
            Err(WorkflowError::TypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn validate_reports_invalid_fields() {
        let api = Arc::new(MockApi::new().with_template(binarize()));
        let wf = Workflow::new(api, PollSettings::default()).await;
        wf.set("name", json!("café")).expect("name");
        wf.set("config.binarize.method", json!("invalid"))
            .expect("method");

        let errors = wf.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.get("name").is_some());
        assert_eq!(
            errors.get("config.binarize.method"),
            Some("Must be one of: otsu, sauvola.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn save_creates_then_polls() {
        let api = Arc::new(MockApi::new().with_template(binarize()));
        let wf = Workflow::new(api.clone(), PollSettings::default()).await;
        wf.set("name", json!("scan-01")).expect("name");

        let id = wf.save().await.expect("save");
        settle().await;

        assert_eq!(wf.id(), Some(id));
        assert!(wf.is_polling());
        assert_eq!(api.polls_started(), 1);

        let created = api
            .calls()
            .into_iter()
            .find_map(|c| match c {
                ApiCall::CreateWorkflow(payload) => Some(payload),
                _ => None,
            })
            .expect("create call");
        assert_eq!(created["name"], "scan-01");
        assert_eq!(created["config"]["binarize"]["method"], "otsu");
        assert!(!created.contains_key("configuration_template"));
        assert!(!created.contains_key("id"));

        wf.save().await.expect("update");
        assert_eq!(
            api.count(|c| matches!(c, ApiCall::UpdateConfig(i, _) if *i == id)),
            1
        );
        wf.destroy();
    }

    #[tokio::test]
    async fn invalid_workflow_is_not_saved() {
        let api = Arc::new(MockApi::new().with_template(binarize()));
        let wf = Workflow::new(api.clone(), PollSettings::default()).await;
        wf.set("name", json!("bad/name")).expect("name");

        assert!(wf.save().await.is_err());
        assert!(wf.is_new());
        assert_eq!(
            api.count(|c| matches!(c, ApiCall::CreateWorkflow(_))),
            0
        );
    }

    #[tokio::test]
    async fn refresh_requires_an_id_and_merges() {
        let api = Arc::new(MockApi::new().with_workflow(json!({
            "id": 1,
            "name": "book",
            "step": "process"
        })));
        let draft = Workflow::new(api.clone(), PollSettings::default()).await;
        assert!(draft.refresh().await.is_err());

        let wf = Workflow::hydrate(
            api.clone(),
            PollSettings::default(),
            object(json!({"id": 1, "name": "book"})),
        )
        .await;
        wf.refresh().await.expect("refresh");
        assert_eq!(wf.attributes().extra["step"], "process");
        wf.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn hydrated_workflow_polls_and_repolls_after_success_or_timeout() {
        let api = Arc::new(MockApi::new().with_template(binarize()));
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;
        settle().await;
        assert_eq!(api.polls_started(), 1);

        api.push_poll(Ok(object(json!({"step": "capture"}))));
        settle().await;
        assert_eq!(api.polls_started(), 2);
        assert_eq!(wf.attributes().extra["step"], "capture");

        api.push_poll(Err(poll_timeout(WorkflowId::new(7))));
        settle().await;
        assert_eq!(api.polls_started(), 3);
        wf.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_backs_off_before_retrying() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;
        settle().await;

        api.push_poll(Err(ApiError::Status {
            endpoint: "workflow/7/poll".to_string(),
            status: 502,
        }));
        settle().await;
        assert_eq!(api.polls_started(), 1);

        tokio::time::sleep(Duration::from_secs(28)).await;
        assert_eq!(api.polls_started(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(api.polls_started(), 2);
        wf.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_wakes_a_backing_off_poller_and_ends_it() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;
        settle().await;
        api.push_poll(Err(ApiError::ConnectionFailed {
            endpoint: "workflow/7/poll".to_string(),
            reason: "refused".to_string(),
        }));
        settle().await;

        wf.destroy();
        wf.destroy();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.polls_started(), 1);
        assert!(wf.is_destroyed());
    }

    #[tokio::test(start_paused = true)]
    async fn response_arriving_after_destroy_is_discarded() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;
        settle().await;
        assert_eq!(api.polls_started(), 1);

        wf.destroy();
        api.push_poll(Ok(object(json!({"step": "done", "name": "renamed"}))));
        settle().await;

        assert_eq!(api.polls_started(), 1);
        assert!(!wf.attributes().extra.contains_key("step"));
        assert_eq!(wf.name().as_deref(), Some("book"));
        assert!(matches!(
            wf.set("name", json!("other")),
            Err(WorkflowError::Destroyed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn later_poll_response_wins() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;
        api.push_poll(Ok(object(json!({"config": {"binarize": {"threshold": 100}}}))));
        api.push_poll(Ok(object(json!({"config": {"binarize": {"threshold": 200}}}))));
        settle().await;

        assert_eq!(
            wf.config().into_value(),
            json!({"binarize": {"threshold": 200, "method": "otsu"}})
        );
        assert_eq!(api.polls_started(), 3);
        wf.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn polling_starts_only_once() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;
        wf.start_polling();
        wf.clone().start_polling();
        settle().await;
        assert_eq!(api.polls_started(), 1);
        wf.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_ends_the_poller() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;
        settle().await;
        drop(wf);

        api.push_poll(Err(poll_timeout(WorkflowId::new(7))));
        settle().await;
        assert_eq!(api.polls_started(), 1);
    }

    #[tokio::test]
    async fn changes_are_announced() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::new(api, PollSettings::default()).await;
        let mut changes = wf.changes();

        wf.set("name", json!("scan-01")).expect("name");
        assert!(changes.has_changed().expect("sender alive"));
        let _ = changes.borrow_and_update();
        assert!(!changes.has_changed().expect("sender alive"));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_updates_are_not_announced() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;
        settle().await;
        let mut changes = wf.changes();
        let _ = changes.borrow_and_update();

        api.push_poll(Ok(object(json!({"name": 42}))));
        settle().await;
        assert_eq!(api.polls_started(), 2);
        assert_eq!(wf.name().as_deref(), Some("book"));
        assert!(!changes.has_changed().expect("sender alive"));

        assert!(wf.set("name", json!(7)).is_err());
        assert!(!changes.has_changed().expect("sender alive"));

        api.push_poll(Ok(object(json!({"name": "renamed"}))));
        settle().await;
        assert!(changes.has_changed().expect("sender alive"));
        wf.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn queue_commands_track_the_position() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;

        wf.dequeue().await;
        assert_eq!(api.count(|c| matches!(c, ApiCall::Dequeue(_))), 0);

        wf.enqueue().await;
        assert_eq!(wf.queue_id(), Some(QueuePosition::new(1)));
        assert_eq!(wf.to_payload()["queue_id"], 1);

        wf.dequeue().await;
        assert_eq!(wf.queue_id(), None);
        assert!(api.calls().contains(&ApiCall::Dequeue(QueuePosition::new(1))));
        wf.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn capture_replaces_images() {
        let api = Arc::new(MockApi::new());
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;

        wf.trigger_capture(false).await;
        wf.trigger_capture(true).await;
        assert_eq!(wf.images(), vec!["000.jpg", "001.jpg"]);
        wf.finish_capture().await;

        assert!(api.calls().contains(&ApiCall::Capture {
            id: WorkflowId::new(7),
            retake: true
        }));
        assert!(api.calls().contains(&ApiCall::FinishCapture(WorkflowId::new(7))));
        wf.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn command_failures_are_absorbed() {
        let api = Arc::new(MockApi::new());
        api.fail(
            Endpoint::Enqueue,
            ApiError::Status {
                endpoint: "queue".to_string(),
                status: 500,
            },
        );
        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;

        wf.enqueue().await;
        wf.submit().await;
        assert_eq!(wf.queue_id(), None);
        assert!(api.calls().contains(&ApiCall::Submit(WorkflowId::new(7))));
        wf.destroy();
    }

    #[tokio::test]
    async fn commands_need_a_saved_live_workflow() {
        let api = Arc::new(MockApi::new());
        let draft = Workflow::new(api.clone(), PollSettings::default()).await;
        draft.submit().await;
        draft.enqueue().await;
        draft.trigger_capture(false).await;
        draft.finish_capture().await;

        let wf = Workflow::hydrate(api.clone(), PollSettings::default(), saved(7)).await;
        wf.destroy();
        wf.submit().await;

        let commands = api.count(|c| !matches!(c, ApiCall::FetchTemplate | ApiCall::Poll(_)));
        assert_eq!(commands, 0);
    }
}
