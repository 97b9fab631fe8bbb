//! The long-poll task behind every saved workflow.
//!
//! One request is outstanding at a time. A response is merged and the next
//! poll goes out at once; a timeout re-polls at once; any other failure
//! waits out the backoff first. Between requests the task holds the model
//! only weakly, so destroying the model or dropping every handle ends it.

use crate::model::Inner;
use scanstation_core::WorkflowId;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

pub(crate) fn spawn(model: Weak<Inner>, id: WorkflowId) {
    tokio::spawn(run(model, id));
}

async fn run(model: Weak<Inner>, id: WorkflowId) {
    loop {
        let (api, settings) = match model.upgrade() {
            Some(inner) if !inner.is_destroyed() => (Arc::clone(&inner.api), inner.settings),
            _ => break,
        };

        let result = api.poll(id, settings.timeout()).await;

        let Some(inner) = model.upgrade() else {
            break;
        };
        match result {
            Ok(update) => {
                if !inner.apply(update) {
                    debug!(workflow_id = %id, "discarding poll response for destroyed workflow");
                    break;
                }
            }
            Err(e) if e.is_timeout() => {}
            Err(e) => {
                warn!(
                    workflow_id = %id,
                    error = %e,
                    backoff_seconds = settings.backoff_seconds,
                    "poll failed, backing off"
                );
                let wake = Arc::clone(&inner.wake);
                drop(inner);
                tokio::select! {
                    () = tokio::time::sleep(settings.backoff()) => {}
                    () = wake.notified() => {}
                }
            }
        }
    }
    debug!(workflow_id = %id, "stopped polling");
}
