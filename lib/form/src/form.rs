//! The plugin configuration form.

use crate::field::FieldView;
use scanstation_core::ClientMode;
use scanstation_template::{ConfigPath, Configuration, Template, ValidationErrors};
use scanstation_workflow::Workflow;
use serde::Serialize;

/// Plugin that configures the capture devices.
pub const DEVICE_PLUGIN: &str = "device";

/// What the user picked in the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    selected: Option<String>,
    show_advanced: bool,
}

impl FormState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the plugin to configure.
    pub fn select(&mut self, plugin: impl Into<String>) {
        self.selected = Some(plugin.into());
    }

    /// Flips the "show advanced options" toggle and returns the new setting.
    pub fn toggle_advanced(&mut self) -> bool {
        self.show_advanced = !self.show_advanced;
        self.show_advanced
    }

    #[must_use]
    pub fn show_advanced(&self) -> bool {
        self.show_advanced
    }

    /// Returns the selected plugin if it is available, else the first
    /// available one.
    #[must_use]
    pub fn selected_plugin<'a>(&self, available: &'a [String]) -> Option<&'a str> {
        self.selected
            .as_deref()
            .and_then(|selected| available.iter().find(|p| *p == selected))
            .or_else(|| available.first())
            .map(String::as_str)
    }
}

/// Plugins the form offers: the workflow's active plugins that declare
/// options, then the device plugin unless the server only processes.
#[must_use]
pub fn available_plugins(
    config: &Configuration,
    template: &Template,
    mode: ClientMode,
) -> Vec<String> {
    let mut plugins: Vec<String> = config
        .active_plugins()
        .into_iter()
        .filter(|plugin| template.has_plugin(plugin))
        .map(str::to_string)
        .collect();
    if mode.has_device() && !plugins.iter().any(|p| p == DEVICE_PLUGIN) {
        plugins.push(DEVICE_PLUGIN.to_string());
    }
    plugins
}

/// The fields of one plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginForm {
    pub plugin: String,
    pub fields: Vec<FieldView>,
}

impl PluginForm {
    /// Projects the options of `plugin`, hiding advanced ones unless
    /// `show_advanced` is set. A plugin without a template has no fields.
    #[must_use]
    pub fn project(
        plugin: &str,
        template: &Template,
        config: &Configuration,
        errors: &ValidationErrors,
        show_advanced: bool,
    ) -> Self {
        let fields = template
            .plugin(plugin)
            .into_iter()
            .flatten()
            .filter(|(_, option)| show_advanced || !option.advanced)
            .map(|(name, option)| {
                let path = ConfigPath::new(plugin, name.as_str());
                let value = config.get(&path).cloned();
                let error = errors.for_option(&path).map(str::to_string);
                FieldView::new(path, option, value, error)
            })
            .collect();
        Self {
            plugin: plugin.to_string(),
            fields,
        }
    }

    /// Returns the field for `option`.
    #[must_use]
    pub fn field(&self, option: &str) -> Option<&FieldView> {
        self.fields.iter().find(|f| f.name == option)
    }
}

/// The whole configuration form of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigForm {
    /// Plugins offered for selection.
    pub plugins: Vec<String>,
    /// The fields of the selected plugin; `None` when nothing is offered.
    pub selected: Option<PluginForm>,
    pub show_advanced: bool,
}

impl ConfigForm {
    /// Projects `workflow` through the current form state.
    #[must_use]
    pub fn project(workflow: &Workflow, state: &FormState, mode: ClientMode) -> Self {
        let template = workflow.template();
        let config = workflow.config();
        let errors = workflow.validate();
        let plugins = available_plugins(&config, template, mode);
        let selected = state.selected_plugin(&plugins).map(|plugin| {
            PluginForm::project(plugin, template, &config, &errors, state.show_advanced())
        });
        Self {
            plugins,
            selected,
            show_advanced: state.show_advanced(),
        }
    }
}
