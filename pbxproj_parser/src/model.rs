use indexmap::IndexMap;
use std::ops::Range;

/// One `XCBuildConfiguration` object of a project file.
#[derive(Debug, Clone)]
pub struct BuildConfiguration {
    pub id: String,
    pub name: String,
    pub(crate) settings: BuildSettings,
    /// Byte span of the `buildSettings = { ... }` dictionary, braces included.
    pub(crate) span: Range<usize>,
    /// Leading whitespace of the line holding the `buildSettings` key.
    pub(crate) indent: String,
}

impl BuildConfiguration {
    pub fn build_settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub fn build_settings_mut(&mut self) -> &mut BuildSettings {
        &mut self.settings
    }
}

/// Settings map with keys and values kept as raw tokens, quotes included.
#[derive(Debug, Clone, Default)]
pub struct BuildSettings {
    pub(crate) entries: IndexMap<String, String>,
    pub(crate) dirty: bool,
}

impl BuildSettings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Sets `key` to `value`. Returns false when the value was already there.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        if self.entries.get(&key) == Some(&value) {
            return false;
        }
        self.entries.insert(key, value);
        self.dirty = true;
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// A parsed project file. Serializing writes the original text back with
/// only the edited `buildSettings` dictionaries re-rendered.
#[derive(Debug, Clone)]
pub struct PbxProject {
    pub(crate) source: String,
    pub(crate) configurations: Vec<BuildConfiguration>,
}

impl PbxProject {
    pub fn configurations(&self) -> &[BuildConfiguration] {
        &self.configurations
    }

    pub fn configurations_mut(&mut self) -> &mut [BuildConfiguration] {
        &mut self.configurations
    }

    pub fn is_dirty(&self) -> bool {
        self.configurations.iter().any(|c| c.settings.dirty)
    }

    /// Source text with each edited `buildSettings` dict re-rendered in place.
    /// Everything outside those dicts is copied byte for byte.
    pub fn write(&self) -> String {
        let mut dirty: Vec<&BuildConfiguration> = self
            .configurations
            .iter()
            .filter(|c| c.settings.dirty)
            .collect();
        dirty.sort_by_key(|c| c.span.start);

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for config in dirty {
            out.push_str(&self.source[cursor..config.span.start]);
            render_settings(&mut out, config);
            cursor = config.span.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

/// Writes `{ K = V; ... }` from the entries alone. Comments that were inside
/// the original dictionary are not carried over; dictionaries that were not
/// edited keep theirs, since `write` copies them from the source.
fn render_settings(out: &mut String, config: &BuildConfiguration) {
    out.push_str("{\n");
    for (key, value) in &config.settings.entries {
        out.push_str(&config.indent);
        out.push('\t');
        out.push_str(key);
        out.push_str(" = ");
        out.push_str(value);
        out.push_str(";\n");
    }
    out.push_str(&config.indent);
    out.push('}');
}
