//! `config.xml` reading and normalization into directives.

use crate::directive::{Directive, DirectiveKind, Enforce, Payload, Platform, QuoteMode};
use crate::error::{MergeError, Result};
use crate::indexer::index_config_files;
use crate::selector::ROOT_SELECTOR;
use crate::xml::{self, Document, Element};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DESCRIPTOR_FILE: &str = "config.xml";
pub const ANDROID_MANIFEST: &str = "AndroidManifest.xml";
pub const PBXPROJ: &str = "project.pbxproj";

const ANDROID_MANIFEST_PREFIX: &str = "android-manifest/";
const XC_BUILD_CONFIGURATION: &str = "XCBuildConfiguration";

/// Target file name to its directives, in declaration order.
pub type ParsedConfig = IndexMap<String, Vec<Directive>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Preference {
    pub name: String,
    pub value: String,
    pub build_type: Option<String>,
    pub quote: Option<String>,
    pub xcconfig_enforce: Option<String>,
}

impl Preference {
    fn from_element(el: &Element, descriptor: &Path) -> Result<Self> {
        let name = el
            .attr("name")
            .ok_or_else(|| MergeError::parse(descriptor, "<preference> without a name attribute"))?;
        let owned = |key: &str| el.attr(key).map(str::to_string);
        Ok(Preference {
            name: name.to_string(),
            value: el.attr("value").unwrap_or_default().to_string(),
            build_type: owned("buildType"),
            quote: owned("quote"),
            xcconfig_enforce: owned("xcconfigEnforce"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Descriptor {
    path: PathBuf,
    document: Document,
}

impl Descriptor {
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
        Self::parse(path, &source)
    }

    pub fn parse(path: impl AsRef<Path>, source: &str) -> Result<Self> {
        let path = path.as_ref();
        let document = xml::parse(source).map_err(|e| MergeError::parse(path, e))?;
        Ok(Descriptor {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Element {
        &self.document.root
    }

    pub fn project_name(&self) -> Option<String> {
        self.root()
            .child("name")
            .and_then(Element::text)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn platform_blocks(&self, platform: Platform) -> impl Iterator<Item = &Element> {
        self.root()
            .children_named("platform")
            .filter(move |el| el.attr("name") == Some(platform.as_str()))
    }

    pub fn common_preferences(&self) -> Result<Vec<Preference>> {
        self.root()
            .children_named("preference")
            .map(|el| Preference::from_element(el, &self.path))
            .collect()
    }

    /// Named common preferences. Nameless ones are skipped here and
    /// reported per platform by `parse_platform`.
    pub fn setting_preferences(&self) -> Vec<Preference> {
        self.root()
            .children_named("preference")
            .filter_map(|el| Preference::from_element(el, &self.path).ok())
            .collect()
    }

    pub fn platform_preferences(&self, platform: Platform) -> Result<Vec<Preference>> {
        self.platform_blocks(platform)
            .flat_map(|block| block.children_named("preference"))
            .map(|el| Preference::from_element(el, &self.path))
            .collect()
    }

    pub fn config_files(&self, platform: Platform) -> Vec<&Element> {
        self.platform_blocks(platform)
            .flat_map(|block| block.children_named("config-file"))
            .collect()
    }
}

/// Preference lists read once per run and reused for every target file.
#[derive(Debug, Default)]
pub struct PreferenceCache {
    common: Option<Vec<Preference>>,
    platforms: HashMap<Platform, Vec<Preference>>,
}

impl PreferenceCache {
    /// Common preferences followed by the platform's own.
    pub fn resolve(&mut self, descriptor: &Descriptor, platform: Platform) -> Result<Vec<Preference>> {
        if self.common.is_none() {
            self.common = Some(descriptor.common_preferences()?);
        }
        if !self.platforms.contains_key(&platform) {
            let prefs = descriptor.platform_preferences(platform)?;
            self.platforms.insert(platform, prefs);
        }

        let mut prefs = self.common.clone().unwrap_or_default();
        if let Some(platform_prefs) = self.platforms.get(&platform) {
            prefs.extend(platform_prefs.iter().cloned());
        }
        Ok(prefs)
    }
}

fn push(config: &mut ParsedConfig, directive: Directive) {
    config
        .entry(directive.target_file.clone())
        .or_default()
        .push(directive);
}

/// `ios-<type>-<key>` preferences.
fn parse_ios_preferences(config: &mut ParsedConfig, preferences: &[Preference]) {
    let prefix = format!("{}-", Platform::Ios);
    for pref in preferences.iter().filter(|p| p.name.starts_with(&prefix)) {
        let parts: Vec<&str> = pref.name.split('-').collect();
        let (Some(setting_type), Some(key)) = (parts.get(1), parts.get(2)) else {
            debug!("Ignoring preference '{}': no setting type and key", pref.name);
            continue;
        };
        let kind = if *setting_type == XC_BUILD_CONFIGURATION {
            DirectiveKind::BuildSetting
        } else {
            DirectiveKind::TextSetting
        };
        push(
            config,
            Directive {
                platform: Platform::Ios,
                target_file: PBXPROJ.to_string(),
                kind,
                parent_path: setting_type.to_string(),
                destination: key.to_string(),
                payload: Payload::Value(pref.value.clone()),
                build_type: pref.build_type.clone(),
                quote_mode: pref.quote.as_deref().map(QuoteMode::parse),
                enforce: Enforce::parse(pref.xcconfig_enforce.as_deref()),
            },
        );
    }
}

/// `android-manifest/<path>/<attr>` preferences.
fn parse_android_preferences(config: &mut ParsedConfig, preferences: &[Preference]) {
    for pref in preferences
        .iter()
        .filter(|p| p.name.starts_with(ANDROID_MANIFEST_PREFIX))
    {
        let mut parts: Vec<&str> = pref.name.split('/').collect();
        let destination = parts.pop().unwrap_or_default();
        let parent = parts[1..].join("/");
        push(
            config,
            Directive {
                platform: Platform::Android,
                target_file: ANDROID_MANIFEST.to_string(),
                kind: DirectiveKind::AttributePreference,
                parent_path: if parent.is_empty() {
                    ROOT_SELECTOR.to_string()
                } else {
                    parent
                },
                destination: destination.to_string(),
                payload: Payload::Value(pref.value.clone()),
                build_type: None,
                quote_mode: None,
                enforce: Enforce::Unset,
            },
        );
    }
}

fn parse_config_files(config: &mut ParsedConfig, descriptor: &Descriptor, platform: Platform) {
    for block in index_config_files(descriptor.config_files(platform)).into_values() {
        for child in block.element.elements() {
            push(
                config,
                Directive {
                    platform,
                    target_file: block.target.to_string(),
                    kind: DirectiveKind::SubtreeInsert,
                    parent_path: block.parent.to_string(),
                    destination: child.name.clone(),
                    payload: Payload::Subtree(child.clone()),
                    build_type: None,
                    quote_mode: None,
                    enforce: Enforce::Unset,
                },
            );
        }
    }
}

/// Parses the descriptor's preferences and config-file blocks for one platform.
pub fn parse_platform(
    descriptor: &Descriptor,
    cache: &mut PreferenceCache,
    platform: Platform,
) -> Result<ParsedConfig> {
    let mut config = ParsedConfig::new();
    let preferences = cache.resolve(descriptor, platform)?;
    match platform {
        Platform::Ios => parse_ios_preferences(&mut config, &preferences),
        Platform::Android => parse_android_preferences(&mut config, &preferences),
        Platform::Wp8 => {}
    }
    parse_config_files(&mut config, descriptor, platform);
    Ok(config)
}
