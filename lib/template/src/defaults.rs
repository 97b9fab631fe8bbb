//! Initial configuration for new workflows.

use crate::config::Configuration;
use crate::template::Template;

/// Derives the configuration a new workflow starts with.
///
/// Selectable options default to their first allowed value, every other
/// option to its declared value. Only meant for workflows the server has not
/// seen yet; a saved workflow's configuration always comes from the server.
#[must_use]
pub fn defaults_for(template: &Template) -> Configuration {
    let mut config = Configuration::new();
    for (path, option) in template.options() {
        let Some(value) = option.default_value() else {
            tracing::warn!(%path, "selectable option declares no values, leaving it unset");
            continue;
        };
        // Sections are created fresh here, so this cannot hit a plain entry.
        if let Err(e) = config.set(&path, value) {
            tracing::warn!(%path, error = %e, "could not apply default");
        }
    }
    config
}
