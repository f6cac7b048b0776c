use super::{PatchResult, splice_subtree};
use crate::directive::{Directive, Payload};
use crate::selector::{ParentLookup, Selector, resolve_parent};
use crate::xml::Document;
use tracing::{debug, warn};

/// Merges config-file children into a Windows Phone manifest. The child to
/// replace is the one carrying every attribute of the payload.
pub fn patch(mut document: Document, directives: &[&Directive]) -> PatchResult<Document> {
    let mut modified = false;
    for directive in directives {
        let Payload::Subtree(payload) = &directive.payload else {
            continue;
        };
        let path = match resolve_parent(&document.root, &directive.parent_path, None) {
            Ok(ParentLookup::Resolved(path)) => path,
            Ok(ParentLookup::Unresolved) => {
                debug!(
                    "Parent '{}' not found in {}, skipping <{}>",
                    directive.parent_path, directive.target_file, directive.destination
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

        let selector = payload
            .attributes
            .iter()
            .fold(Selector::child(&directive.destination), |selector, (attr, value)| {
                selector.with_attr_equals(attr, value)
            });
        modified |= splice_subtree(parent, &selector, &directive.destination, payload);
    }
    PatchResult { modified, document }
}
