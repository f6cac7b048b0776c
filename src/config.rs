use crate::descriptor::{Descriptor, Preference};
use crate::error::{MergeError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_PLUGIN_ID: &str = "cordova-custom-config";

/// Descriptor preferences with this prefix configure the run itself.
const PREFERENCE_PREFIX: &str = "cordova-custom-config-";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Abort the remaining platforms after the first failure
    pub stop_on_error: bool,
    /// Namespaces the backup directory under `plugins/`
    pub plugin_id: String,
    /// Overrides the descriptor's `<name>`
    pub project_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            stop_on_error: false,
            plugin_id: DEFAULT_PLUGIN_ID.to_string(),
            project_name: None,
        }
    }
}

impl Settings {
    pub fn from_toml(path: &Path, source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| MergeError::parse(path, e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
        Self::from_toml(path, &source)
    }

    /// Layers the descriptor's settings preferences over the current values.
    pub fn apply_descriptor(&mut self, descriptor: &Descriptor) {
        self.apply_preferences(&descriptor.setting_preferences());
    }

    /// Applies `cordova-custom-config-<key>` preferences from the descriptor.
    pub fn apply_preferences(&mut self, preferences: &[Preference]) {
        for pref in preferences {
            let Some(key) = pref.name.strip_prefix(PREFERENCE_PREFIX) else {
                continue;
            };
            match key {
                "stoponerror" => self.stop_on_error = pref.value.trim() == "true",
                other => debug!("Ignoring unsupported setting '{}'", other),
            }
        }
    }
}
