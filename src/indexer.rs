use crate::selector::ROOT_SELECTOR;
use crate::xml::Element;
use indexmap::IndexMap;
use tracing::warn;

/// A `<config-file>` block that survived indexing.
#[derive(Debug, Clone, Copy)]
pub struct ConfigFileBlock<'a> {
    pub target: &'a str,
    pub parent: &'a str,
    pub element: &'a Element,
}

/// Absent, empty, `/*` and `*/` parents all mean the document root.
pub fn normalize_parent(parent: Option<&str>) -> &str {
    match parent {
        None | Some("") | Some("/*") | Some("*/") => ROOT_SELECTOR,
        Some(parent) => parent,
    }
}

pub fn group_key(target: &str, parent: &str) -> String {
    format!("{target}|{parent}")
}

/// Indexes config-file blocks by `target|parent`.
///
/// A later block with the same key replaces the earlier block entirely,
/// children included, while keeping the key's original position.
pub fn index_config_files<'a>(
    blocks: impl IntoIterator<Item = &'a Element>,
) -> IndexMap<String, ConfigFileBlock<'a>> {
    let mut index = IndexMap::new();
    for element in blocks {
        let Some(target) = element.attr("target") else {
            warn!("Skipping <config-file> without a target attribute");
            continue;
        };
        let parent = normalize_parent(element.attr("parent"));
        index.insert(
            group_key(target, parent),
            ConfigFileBlock {
                target,
                parent,
                element,
            },
        );
    }
    index
}
