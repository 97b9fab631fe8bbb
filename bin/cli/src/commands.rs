//! Subcommand implementations.
//!
//! Each command returns the text to print so it can run against any
//! [`WorkflowApi`].

use crate::error::CliError;
use rootcause::Report;
use scanstation_client::{ApiError, PollSettings, WorkflowApi};
use scanstation_core::{ClientMode, WorkflowId};
use scanstation_form::{ConfigForm, FieldKind, FieldView, FormState};
use scanstation_template::AttributePath;
use scanstation_workflow::{Workflow, WorkflowCollection};
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// What every command needs to reach the server.
#[derive(Clone)]
pub struct Context {
    pub api: Arc<dyn WorkflowApi>,
    pub settings: PollSettings,
    pub mode: ClientMode,
}

/// A remote command on one workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Submit,
    Enqueue,
    Dequeue,
    Capture { retake: bool },
    Finish,
}

/// Parses `path=value`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(path, value)| (path.trim().to_string(), value.to_string()))
        .filter(|(path, _)| !path.is_empty())
        .ok_or_else(|| format!("expected <path>=<value>, got '{raw}'"))
}

fn request_failed(e: impl std::fmt::Display) -> CliError {
    CliError::Request {
        details: e.to_string(),
    }
}

async fn load(ctx: &Context, id: WorkflowId) -> Result<Workflow, Report<CliError>> {
    let representation = ctx.api.fetch_workflow(id).await.map_err(|e| match e {
        ApiError::Status { status: 404, .. } => CliError::NotFound { id: id.to_string() },
        e => request_failed(e),
    })?;
    Ok(Workflow::hydrate(Arc::clone(&ctx.api), ctx.settings, representation).await)
}

/// Stores `raw` at `path`, typed by the field the template declares there.
fn assign(workflow: &Workflow, path: &str, raw: &str) -> Result<(), Report<CliError>> {
    let path: AttributePath = path.parse().map_err(|e| CliError::Usage {
        details: format!("{e}"),
    })?;
    let value = match &path {
        AttributePath::Name => JsonValue::from(raw),
        AttributePath::Config(config_path) => workflow
            .template()
            .option(config_path)
            .map_or(FieldKind::Text, FieldKind::of)
            .parse_input(raw),
    };
    workflow
        .set_path(&path, value)
        .map_err(|e| CliError::Usage {
            details: e.to_string(),
        })?;
    Ok(())
}

fn ensure_valid(workflow: &Workflow) -> Result<(), Report<CliError>> {
    let errors = workflow.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CliError::Invalid {
            details: errors.to_string(),
        }
        .into())
    }
}

/// One line describing a workflow.
#[must_use]
pub fn summary(workflow: &Workflow) -> String {
    let attrs = workflow.attributes();
    let id = attrs
        .id
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    let name = attrs.name.as_deref().unwrap_or("(unnamed)");
    let step = attrs
        .extra
        .get("step")
        .and_then(JsonValue::as_str)
        .unwrap_or("-");
    let mut line = format!("{id}\t{name}\t{step}\t{} images", attrs.images.len());
    if let Some(position) = attrs.queue_id {
        line.push_str(&format!("\tqueued #{position}"));
    }
    line
}

fn render_field(field: &FieldView) -> String {
    let kind = match &field.kind {
        FieldKind::Select { choices } => {
            let choices: Vec<String> = choices.iter().map(ToString::to_string).collect();
            format!("one of {}", choices.join("|"))
        }
        FieldKind::Checkbox => "flag".to_string(),
        FieldKind::Text => "text".to_string(),
        FieldKind::Number => "number".to_string(),
        FieldKind::Unsupported => "list, read-only".to_string(),
    };
    let value = field
        .value
        .as_ref()
        .map_or_else(|| "unset".to_string(), ToString::to_string);
    let mut line = format!("  {} ({}, {kind}) = {value}", field.label, field.path);
    if field.advanced {
        line.push_str(" [advanced]");
    }
    if let Some(error) = &field.error {
        line.push_str(&format!("\n    ! {error}"));
    }
    line
}

/// Renders a configuration form as text.
#[must_use]
pub fn render_form(form: &ConfigForm) -> String {
    let mut out = format!("plugins: {}\n", form.plugins.join(", "));
    if let Some(plugin) = &form.selected {
        out.push_str(&format!("[{}]\n", plugin.plugin));
        for field in &plugin.fields {
            out.push_str(&render_field(field));
            out.push('\n');
        }
    }
    out
}

/// `list`: every workflow on the server.
pub async fn list(ctx: &Context) -> Result<String, Report<CliError>> {
    let mut workflows = WorkflowCollection::new(Arc::clone(&ctx.api), ctx.settings);
    workflows.fetch().await.map_err(request_failed)?;
    let lines: Vec<String> = workflows.iter().map(summary).collect();
    workflows.clear();
    Ok(lines.join("\n"))
}

/// `show`: one workflow and its configuration form.
pub async fn show(
    ctx: &Context,
    id: WorkflowId,
    plugin: Option<String>,
    advanced: bool,
    json: bool,
) -> Result<String, Report<CliError>> {
    let workflow = load(ctx, id).await?;
    let mut state = FormState::new();
    if let Some(plugin) = plugin {
        state.select(plugin);
    }
    if advanced {
        state.toggle_advanced();
    }
    let form = ConfigForm::project(&workflow, &state, ctx.mode);
    let out = if json {
        serde_json::to_string_pretty(&form).map_err(|e| CliError::Output {
            details: e.to_string(),
        })?
    } else {
        format!("{}\n{}", summary(&workflow), render_form(&form))
    };
    workflow.destroy();
    Ok(out)
}

/// `create`: a new workflow with the template defaults and `assignments`.
pub async fn create(
    ctx: &Context,
    name: &str,
    assignments: &[(String, String)],
) -> Result<String, Report<CliError>> {
    let workflow = Workflow::new(Arc::clone(&ctx.api), ctx.settings).await;
    assign(&workflow, "name", name)?;
    for (path, raw) in assignments {
        assign(&workflow, path, raw)?;
    }
    ensure_valid(&workflow)?;
    let id = workflow.save().await.map_err(request_failed)?;
    info!(workflow_id = %id, "created workflow");
    let out = summary(&workflow);
    workflow.destroy();
    Ok(out)
}

/// `set`: updates and saves a workflow's configuration.
pub async fn set(
    ctx: &Context,
    id: WorkflowId,
    assignments: &[(String, String)],
) -> Result<String, Report<CliError>> {
    let workflow = load(ctx, id).await?;
    let result = async {
        for (path, raw) in assignments {
            assign(&workflow, path, raw)?;
        }
        ensure_valid(&workflow)?;
        workflow.save().await.map_err(request_failed)?;
        Ok::<_, Report<CliError>>(summary(&workflow))
    }
    .await;
    workflow.destroy();
    result
}

/// Runs a remote command. Failures are logged by the workflow itself.
pub async fn act(ctx: &Context, id: WorkflowId, action: Action) -> Result<String, Report<CliError>> {
    let workflow = load(ctx, id).await?;
    debug!(workflow_id = %id, ?action, "running command");
    match action {
        Action::Submit => workflow.submit().await,
        Action::Enqueue => workflow.enqueue().await,
        Action::Dequeue => workflow.dequeue().await,
        Action::Capture { retake } => workflow.trigger_capture(retake).await,
        Action::Finish => workflow.finish_capture().await,
    }
    let out = summary(&workflow);
    workflow.destroy();
    Ok(out)
}

/// `watch`: prints the workflow each time it changes until `shutdown`
/// resolves.
pub async fn watch(
    ctx: &Context,
    id: WorkflowId,
    shutdown: impl Future<Output = ()>,
    mut emit: impl FnMut(String),
) -> Result<(), Report<CliError>> {
    let workflow = load(ctx, id).await?;
    let mut changes = workflow.changes();
    emit(summary(&workflow));
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            changed = changes.changed() => {
                if changed.is_err() || workflow.is_destroyed() {
                    break;
                }
                emit(summary(&workflow));
            }
        }
    }
    workflow.destroy();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanstation_client::{ApiCall, MockApi};
    use scanstation_template::{OptionDescriptor, Template};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn template() -> Template {
        Template::empty().with_plugin(
            "binarize",
            BTreeMap::from([
                ("threshold".to_string(), OptionDescriptor::new(128)),
                (
                    "method".to_string(),
                    OptionDescriptor::selectable(vec!["otsu".into(), "sauvola".into()]),
                ),
            ]),
        )
    }

    fn context(api: &Arc<MockApi>) -> Context {
        Context {
            api: api.clone(),
            settings: PollSettings::default(),
            mode: ClientMode::Processor,
        }
    }

    #[test]
    fn assignments_need_a_path() {
        assert_eq!(
            parse_assignment("config.binarize.method=otsu"),
            Ok(("config.binarize.method".to_string(), "otsu".to_string()))
        );
        assert_eq!(
            parse_assignment("name=a=b"),
            Ok(("name".to_string(), "a=b".to_string()))
        );
        assert!(parse_assignment("=otsu").is_err());
        assert!(parse_assignment("otsu").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn create_types_values_by_template() {
        let api = Arc::new(MockApi::new().with_template(template()));
        let ctx = context(&api);
        let assignments = vec![("config.binarize.threshold".to_string(), "90".to_string())];

        let out = create(&ctx, "scan-01", &assignments).await.expect("create");
        assert!(out.starts_with("1\tscan-01"));

        let payload = api
            .calls()
            .into_iter()
            .find_map(|c| match c {
                ApiCall::CreateWorkflow(payload) => Some(payload),
                _ => None,
            })
            .expect("created");
        assert_eq!(payload["config"]["binarize"]["threshold"], 90);
    }

    #[tokio::test]
    async fn invalid_values_are_not_saved() {
        let api = Arc::new(MockApi::new().with_template(template()));
        let ctx = context(&api);
        let assignments = vec![("config.binarize.method".to_string(), "invalid".to_string())];

        assert!(create(&ctx, "scan-01", &assignments).await.is_err());
        assert!(create(&ctx, "bad/name", &[]).await.is_err());
        assert!(create(&ctx, "ok", &[("config.binarize".to_string(), "1".to_string())])
            .await
            .is_err());
        assert_eq!(api.count(|c| matches!(c, ApiCall::CreateWorkflow(_))), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn show_renders_the_selected_plugin() {
        let api = Arc::new(MockApi::new().with_template(template()).with_workflow(json!({
            "id": 3,
            "name": "book",
            "step": "capture",
            "config": {
                "plugins": ["binarize"],
                "binarize": {"threshold": "dark", "method": "otsu"}
            }
        })));
        let ctx = context(&api);

        let out = show(&ctx, WorkflowId::new(3), None, false, false)
            .await
            .expect("show");
        assert!(out.starts_with("3\tbook\tcapture"));
        assert!(out.contains("plugins: binarize\n"));
        assert!(out.contains("Threshold (config.binarize.threshold, number) = \"dark\""));
        assert!(out.contains("! Must be a number."));
    }

    #[tokio::test]
    async fn missing_workflow_is_reported() {
        let api = Arc::new(MockApi::new());
        let ctx = context(&api);
        let err = show(&ctx, WorkflowId::new(9), None, false, false)
            .await
            .expect_err("missing");
        assert!(err.to_string().contains("workflow 9 not found"));
    }

    #[tokio::test(start_paused = true)]
    async fn act_runs_the_command() {
        let api = Arc::new(MockApi::new().with_workflow(json!({"id": 2, "name": "book"})));
        let ctx = context(&api);

        let out = act(&ctx, WorkflowId::new(2), Action::Enqueue)
            .await
            .expect("enqueue");
        assert!(out.ends_with("queued #1"));

        let out = act(&ctx, WorkflowId::new(2), Action::Capture { retake: false })
            .await
            .expect("capture");
        assert!(out.contains("2 images"));
    }

    #[tokio::test(start_paused = true)]
    async fn watch_emits_on_every_change() {
        let api = Arc::new(MockApi::new().with_workflow(json!({"id": 4, "name": "book"})));
        let ctx = context(&api);
        api.push_poll(Ok(json!({"step": "capture"})
            .as_object()
            .cloned()
            .expect("object")));

        let mut lines = Vec::new();
        watch(
            &ctx,
            WorkflowId::new(4),
            tokio::time::sleep(Duration::from_secs(1)),
            |line| lines.push(line),
        )
        .await
        .expect("watch");

        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\tcapture\t"));
    }
}
