//! The set of workflows known to a server.

use crate::error::WorkflowError;
use crate::model::Workflow;
use rootcause::Report;
use scanstation_client::{JsonObject, PollSettings, WorkflowApi};
use scanstation_core::WorkflowId;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Workflow models backed by `GET /workflow`.
///
/// Saved workflows are addressable by id. Unsaved drafts added with
/// [`WorkflowCollection::add`] are kept alongside them until saved or removed.
pub struct WorkflowCollection {
    api: Arc<dyn WorkflowApi>,
    settings: PollSettings,
    models: Vec<Workflow>,
}

fn representation_id(representation: &JsonObject) -> Option<WorkflowId> {
    representation
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<WorkflowId>(id).ok())
}

impl WorkflowCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new(api: Arc<dyn WorkflowApi>, settings: PollSettings) -> Self {
        Self {
            api,
            settings,
            models: Vec::new(),
        }
    }

    /// Synchronizes the collection with the server's list.
    ///
    /// New entries are hydrated, known ones merged. Saved models the server no
    /// longer lists are destroyed and dropped.
    ///
    /// # Errors
    ///
    /// Returns the request error; the collection is left unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&mut self) -> Result<(), Report<WorkflowError>> {
        let listed = self
            .api
            .list_workflows()
            .await
            .map_err(WorkflowError::from)?;

        let mut seen = BTreeSet::new();
        for representation in listed {
            let Some(id) = representation_id(&representation) else {
                warn!(
                    id = ?representation.get("id").unwrap_or(&JsonValue::Null),
                    "skipping workflow without a usable id"
                );
                continue;
            };
            seen.insert(id);
            match self.get(id) {
                Some(existing) => existing.apply(representation),
                None => {
                    let workflow = Workflow::hydrate(
                        Arc::clone(&self.api),
                        self.settings,
                        representation,
                    )
                    .await;
                    self.models.push(workflow);
                }
            }
        }

        self.models.retain(|model| match model.id() {
            Some(id) if !seen.contains(&id) => {
                debug!(workflow_id = %id, "workflow no longer listed");
                model.destroy();
                false
            }
            _ => true,
        });
        debug!(count = self.models.len(), "fetched workflows");
        Ok(())
    }

    /// Creates, validates and saves a new workflow named `name`.
    ///
    /// # Errors
    ///
    /// Returns the validation or request error; nothing is added on failure.
    #[instrument(skip(self))]
    pub async fn create(&mut self, name: &str) -> Result<Workflow, Report<WorkflowError>> {
        let workflow = Workflow::new(Arc::clone(&self.api), self.settings).await;
        workflow.set("name", JsonValue::from(name))?;
        workflow.save().await?;
        self.models.push(workflow.clone());
        Ok(workflow)
    }

    /// Adds a model. A different model with the same id is destroyed and
    /// replaced; adding a model the collection already holds does nothing.
    pub fn add(&mut self, workflow: Workflow) {
        if self.models.iter().any(|m| m.ptr_eq(&workflow)) {
            return;
        }
        if let Some(id) = workflow.id()
            && self.remove(id).is_some()
        {
            debug!(workflow_id = %id, "replaced workflow");
        }
        self.models.push(workflow);
    }

    /// Removes and destroys the model for `id`.
    pub fn remove(&mut self, id: WorkflowId) -> Option<Workflow> {
        let index = self.models.iter().position(|m| m.id() == Some(id))?;
        let workflow = self.models.remove(index);
        workflow.destroy();
        Some(workflow)
    }

    #[must_use]
    pub fn get(&self, id: WorkflowId) -> Option<&Workflow> {
        self.models.iter().find(|m| m.id() == Some(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Workflow> {
        self.models.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Destroys every model and empties the collection.
    pub fn clear(&mut self) {
        for model in self.models.drain(..) {
            model.destroy();
        }
    }
}

impl<'a> IntoIterator for &'a WorkflowCollection {
    type Item = &'a Workflow;
    type IntoIter = std::slice::Iter<'a, Workflow>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}
