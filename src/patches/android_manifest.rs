use super::{PatchResult, splice_subtree};
use crate::directive::{Directive, DirectiveKind, Payload};
use crate::selector::{ParentLookup, Selector, Substitution, resolve_parent};
use crate::xml::{Document, Element};
use tracing::{debug, warn};

/// Placeholder for the launcher activity in parent paths.
pub const ACTIVITY_PLACEHOLDER: &str = "ActivityName";

/// Launcher activity names: Cordova <= 4.2.0, then >= 4.3.0.
pub const ACTIVITY_NAMES: [&str; 2] = ["CordovaApp", "MainActivity"];

/// Tags that may appear many times under one parent. They are told apart
/// by `android:name` when the payload carries one.
const ROOT_MULTIPLES: [&str; 11] = [
    "uses-permission",
    "permission",
    "permission-tree",
    "permission-group",
    "instrumentation",
    "uses-sdk",
    "uses-configuration",
    "uses-feature",
    "supports-screens",
    "compatible-screens",
    "supports-gl-texture",
];

const NAME_ATTRIBUTE: &str = "android:name";

pub fn patch(mut document: Document, directives: &[&Directive]) -> PatchResult<Document> {
    let substitution = Substitution {
        token: ACTIVITY_PLACEHOLDER,
        candidates: &ACTIVITY_NAMES,
    };

    let mut modified = false;
    for directive in directives {
        let path = match resolve_parent(&document.root, &directive.parent_path, Some(substitution)) {
            Ok(ParentLookup::Resolved(path)) => path,
            Ok(ParentLookup::Unresolved) => {
                debug!(
                    "Parent '{}' not found in AndroidManifest.xml, skipping {}",
                    directive.parent_path, directive.destination
                );
                continue;
            }
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };
        let Some(parent) = document.root.element_at_mut(&path) else {
            continue;
        };
        modified |= apply(parent, directive);
    }

    PatchResult { modified, document }
}

fn apply(parent: &mut Element, directive: &Directive) -> bool {
    match (directive.kind, &directive.payload) {
        (DirectiveKind::AttributePreference, Payload::Value(value)) => {
            let attr = directive
                .destination
                .strip_prefix('@')
                .unwrap_or(&directive.destination);
            debug!("Setting {}=\"{}\" on <{}>", attr, value, parent.name);
            parent.set_attr(attr, value)
        }
        (DirectiveKind::SubtreeInsert, Payload::Subtree(payload)) => {
            let tag = directive.destination.as_str();
            let selector = match payload.attr(NAME_ATTRIBUTE) {
                Some(name) if ROOT_MULTIPLES.contains(&tag) => {
                    Selector::child(tag).with_attr_equals(NAME_ATTRIBUTE, name)
                }
                _ => Selector::child(tag),
            };
            splice_subtree(parent, &selector, tag, payload)
        }
        _ => false,
    }
}
