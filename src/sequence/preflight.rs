//! Startup configuration warnings
//!
//! Capability builders quietly skip a step when a path or profile is
//! missing. Preflight looks at both sequences before anything runs and
//! reports those gaps up front. Warnings never stop a launch.

use std::collections::HashSet;
use std::fmt;
use crate::config::{StepAttributes, EXIT_SEQUENCE, LAUNCH_SEQUENCE};
use crate::plugin::config::{build_plugin_config, resolve_tool_path, AttributeSource};
use super::actions::{Action, ActionTable, Direction, InvalidStep};
use super::context::LauncherContext;

/// One configuration problem found before launch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigWarning {
    pub step: String,
    pub message: String,
}

impl ConfigWarning {
    fn new(step: &str, message: impl Into<String>) -> Self {
        Self { step: step.to_string(), message: message.into() }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// Inspect both sequences; each distinct warning is reported once
pub fn check(context: &LauncherContext, actions: &ActionTable, invalid_steps: &[InvalidStep]) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |warning: ConfigWarning| {
        if seen.insert(warning.clone()) {
            warnings.push(warning);
        }
    };

    for invalid in invalid_steps {
        push(ConfigWarning::new(
            &invalid.step,
            format!("step mapping '{}' is neither plugin:<name> nor app:<prefix>", invalid.target),
        ));
    }

    let attributes = context.config.step_attributes();

    for sequence in [LAUNCH_SEQUENCE, EXIT_SEQUENCE] {
        let direction = Direction::of_sequence(sequence);
        let steps = match context.config.sequence(sequence) {
            Ok(steps) => steps,
            Err(e) => {
                push(ConfigWarning::new(sequence, format!("{:#}", e)));
                continue;
            }
        };

        for raw in &steps {
            let step = raw.trim();
            if step.is_empty() {
                continue;
            }
            match actions.resolve(step, direction) {
                None => push(ConfigWarning::new(step, format!("unknown step in {}", sequence))),
                Some(Action::Generic(prefix)) => {
                    if let Some(warning) = check_generic(step, prefix, &attributes) {
                        push(warning);
                    }
                }
                Some(action) => {
                    if let Some(plugin) = action.plugin_name() {
                        for warning in check_plugin(context, step, plugin, &attributes) {
                            push(warning);
                        }
                    }
                }
            }
        }
    }

    warnings
}

fn check_generic(step: &str, prefix: &str, attributes: &StepAttributes) -> Option<ConfigWarning> {
    let raw = attributes.non_empty_attribute(&format!("{}_path", prefix))?;
    let path = attributes.resolve_path(raw.trim());
    if path.exists() {
        None
    } else {
        Some(ConfigWarning::new(step, format!("{} does not exist", path.display())))
    }
}

fn check_plugin(context: &LauncherContext, step: &str, name: &str, attributes: &StepAttributes) -> Vec<ConfigWarning> {
    let Some(plugin) = context.registry.resolve(name) else {
        return vec![ConfigWarning::new(step, format!("plugin '{}' is not registered", name))];
    };

    let installed = context.manager.get_installed_path(name, 0);
    let mut warnings = Vec::new();

    match resolve_tool_path(plugin.as_ref(), attributes, installed) {
        None => warnings.push(ConfigWarning::new(
            step,
            format!("no tool path for {}; set {}_path or install it under the bin root", plugin.display_name(), name),
        )),
        Some(path) if !path.exists() => warnings.push(ConfigWarning::new(
            step,
            format!("{} not found at {}", plugin.display_name(), path.display()),
        )),
        Some(_) => {}
    }

    match build_plugin_config(plugin.as_ref(), attributes, installed) {
        Ok(config) => {
            if let Err(e) = plugin.validate_config(&config) {
                warnings.push(ConfigWarning::new(step, e.to_string()));
            }
        }
        Err(e) => warnings.push(ConfigWarning::new(step, e.to_string())),
    }

    warnings
}
