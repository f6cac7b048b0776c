//! Merge engines, one per native format, and the table routing directives
//! to them.

pub mod android_manifest;
pub mod build_settings;
pub mod info_plist;
pub mod wp_manifest;
pub mod xcconfig;

use crate::context::RunContext;
use crate::descriptor::{ANDROID_MANIFEST, PBXPROJ};
use crate::directive::{Directive, DirectiveKind, Platform};
use crate::error::{MergeError, Result};
use crate::selector::Selector;
use crate::xml::{self, Element, Node};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Indentation of rewritten manifests.
const XML_INDENT: usize = 4;

/// A patched in-memory document and whether the patch changed it.
#[derive(Debug)]
pub struct PatchResult<D> {
    pub modified: bool,
    pub document: D,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Format {
    AndroidManifest,
    WindowsManifest,
    InfoPlist,
    BuildSettings,
    TextConfig,
}

impl Format {
    fn matches_target(&self, target_file: &str) -> bool {
        match self {
            Format::AndroidManifest => target_file == ANDROID_MANIFEST,
            Format::WindowsManifest => true,
            Format::InfoPlist => target_file.contains("Info.plist"),
            Format::BuildSettings | Format::TextConfig => target_file == PBXPROJ,
        }
    }
}

struct Route {
    platform: Platform,
    kind: DirectiveKind,
    format: Format,
}

const ROUTES: &[Route] = &[
    Route {
        platform: Platform::Android,
        kind: DirectiveKind::AttributePreference,
        format: Format::AndroidManifest,
    },
    Route {
        platform: Platform::Android,
        kind: DirectiveKind::SubtreeInsert,
        format: Format::AndroidManifest,
    },
    Route {
        platform: Platform::Wp8,
        kind: DirectiveKind::SubtreeInsert,
        format: Format::WindowsManifest,
    },
    Route {
        platform: Platform::Ios,
        kind: DirectiveKind::SubtreeInsert,
        format: Format::InfoPlist,
    },
    Route {
        platform: Platform::Ios,
        kind: DirectiveKind::BuildSetting,
        format: Format::BuildSettings,
    },
    Route {
        platform: Platform::Ios,
        kind: DirectiveKind::BuildSetting,
        format: Format::TextConfig,
    },
    Route {
        platform: Platform::Ios,
        kind: DirectiveKind::TextSetting,
        format: Format::TextConfig,
    },
];

/// Formats that handle `target_file` on `platform`, in table order.
pub fn formats_for(platform: Platform, target_file: &str) -> Vec<Format> {
    let mut formats = Vec::new();
    for route in ROUTES {
        if route.platform == platform
            && route.format.matches_target(target_file)
            && !formats.contains(&route.format)
        {
            formats.push(route.format);
        }
    }
    formats
}

/// The directives `format` consumes.
pub fn directives_for(format: Format, directives: &[Directive]) -> Vec<&Directive> {
    directives
        .iter()
        .filter(|d| {
            ROUTES
                .iter()
                .any(|r| r.format == format && r.platform == d.platform && r.kind == d.kind)
        })
        .collect()
}

/// Finds the child of `parent` matched by `selector`, appending a new
/// `<tag>` when there is none, then replaces its attributes and content
/// with the payload's.
pub(crate) fn splice_subtree(
    parent: &mut Element,
    selector: &Selector,
    tag: &str,
    payload: &Element,
) -> bool {
    let existing = selector.find(parent).and_then(|path| path.first().copied());
    let appended = existing.is_none();
    let index = existing.unwrap_or_else(|| {
        parent.children.push(Node::Element(Element::new(tag)));
        parent.children.len() - 1
    });

    let Some(Node::Element(child)) = parent.children.get_mut(index) else {
        return appended;
    };
    if child.attributes == payload.attributes && child.children == payload.children {
        return appended;
    }
    child.attributes = payload.attributes.clone();
    child.children = payload.children.clone();
    true
}

/// Read, decode, patch, back up and write one file. Returns whether the
/// file was rewritten.
fn patch_file<D>(
    ctx: &mut RunContext<'_>,
    platform: Platform,
    path: &Path,
    backup_name: &str,
    decode: impl FnOnce(&str) -> Result<D>,
    patch: impl FnOnce(D) -> Result<PatchResult<D>>,
    encode: impl FnOnce(&D) -> Result<String>,
) -> Result<bool> {
    let source = fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
    let result = patch(decode(&source)?)?;
    if !result.modified {
        debug!("No changes for {}", path.display());
        return Ok(false);
    }

    let output = encode(&result.document)?;
    ctx.backups.ensure_backup(platform, path, backup_name)?;
    fs::write(path, output).map_err(|e| MergeError::io(path, e))?;
    debug!("Wrote {}", path.display());
    Ok(true)
}

fn decode_xml(path: &Path, source: &str) -> Result<xml::Document> {
    xml::parse(source).map_err(|e| MergeError::codec(path, e))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Applies one target file's directives. Returns the paths written.
pub fn apply_patch(
    ctx: &mut RunContext<'_>,
    platform: Platform,
    target_file: &str,
    directives: &[Directive],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for format in formats_for(platform, target_file) {
        let selected = directives_for(format, directives);
        if selected.is_empty() {
            continue;
        }

        match format {
            Format::AndroidManifest => {
                let path = ctx.android_manifest_path();
                let updated = patch_file(
                    ctx,
                    platform,
                    &path,
                    ANDROID_MANIFEST,
                    |s| decode_xml(&path, s),
                    |doc| Ok(android_manifest::patch(doc, &selected)),
                    |doc| Ok(doc.write(XML_INDENT)),
                )?;
                if updated {
                    written.push(path);
                }
            }
            Format::WindowsManifest => {
                let path = ctx.platform_dir(platform).join(target_file);
                let updated = patch_file(
                    ctx,
                    platform,
                    &path,
                    target_file,
                    |s| decode_xml(&path, s),
                    |doc| Ok(wp_manifest::patch(doc, &selected)),
                    |doc| Ok(doc.write(XML_INDENT)),
                )?;
                if updated {
                    written.push(path);
                }
            }
            Format::InfoPlist => {
                let path = ctx.info_plist_path()?;
                let name = file_name(&path);
                let updated = patch_file(
                    ctx,
                    platform,
                    &path,
                    &name,
                    |s| info_plist::decode(s).map_err(|e| MergeError::codec(&path, e)),
                    |value| info_plist::patch(value, &selected).map_err(|e| MergeError::codec(&path, e)),
                    |value| info_plist::encode(value).map_err(|e| MergeError::codec(&path, e)),
                )?;
                if updated {
                    written.push(path);
                }
            }
            Format::BuildSettings => {
                let path = ctx.pbxproj_path()?;
                let updated = patch_file(
                    ctx,
                    platform,
                    &path,
                    PBXPROJ,
                    |s| pbxproj_parser::parse_pbxproj(s).map_err(|e| MergeError::codec(&path, e)),
                    |project| Ok(build_settings::patch(project, &selected)),
                    |project| Ok(project.write()),
                )?;
                if updated {
                    written.push(path);
                }
            }
            Format::TextConfig => {
                for name in xcconfig::XCCONFIG_FILES {
                    let path = ctx.xcconfig_path(name);
                    if !path.is_file() {
                        debug!("Skipping missing {}", path.display());
                        continue;
                    }
                    debug!("Reading {}", name);
                    let updated = patch_file(
                        ctx,
                        platform,
                        &path,
                        name,
                        |s| Ok(s.to_string()),
                        |contents| Ok(xcconfig::patch(name, contents, &selected)),
                        |contents| Ok(contents.clone()),
                    )?;
                    if updated {
                        written.push(path);
                    }
                }
            }
        }
    }
    Ok(written)
}
