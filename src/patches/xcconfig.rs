use super::PatchResult;
use crate::directive::{Directive, Enforce};
use regex::{NoExpand, Regex};
use tracing::debug;

/// Cordova's xcconfig files under `platforms/ios/cordova/`.
pub const XCCONFIG_FILES: [&str; 4] = [
    "build.xcconfig",
    "build-extras.xcconfig",
    "build-debug.xcconfig",
    "build-release.xcconfig",
];

const CODE_SIGN_IDENTITY: &str = "CODE_SIGN_IDENTITY";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BuildScope {
    Base,
    Debug,
    Release,
}

impl BuildScope {
    pub fn of_file(file_name: &str) -> Self {
        if file_name.contains("release") {
            BuildScope::Release
        } else if file_name.contains("debug") {
            BuildScope::Debug
        } else {
            BuildScope::Base
        }
    }

    /// `None` for build types with no file of their own.
    fn of_build_type(build_type: Option<&str>) -> Option<Self> {
        match build_type.map(str::to_lowercase).as_deref() {
            None | Some("none") => Some(BuildScope::Base),
            Some("debug") => Some(BuildScope::Debug),
            Some("release") => Some(BuildScope::Release),
            Some(_) => None,
        }
    }
}

/// The whole `NAME = ...` line. The name must be followed by `=`, so
/// `FOO` never matches `FOO_BAR` or `FOO[sdk=iphoneos*]`.
fn setting_line(name: &str) -> Option<Regex> {
    Regex::new(&format!(r#"(?m)^"?{}"?[ \t]*=[^\r\n]*"#, regex::escape(name))).ok()
}

fn replace_first(contents: &mut String, pattern: &Regex, line: &str) -> bool {
    let replaced = pattern.replacen(contents, 1, NoExpand(line)).into_owned();
    if replaced == *contents {
        return false;
    }
    *contents = replaced;
    true
}

fn append(contents: &mut String, line: &str) {
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(line);
    contents.push('\n');
}

/// Applies settings to one xcconfig file's contents.
pub fn patch(file_name: &str, mut contents: String, directives: &[&Directive]) -> PatchResult<String> {
    let file_scope = BuildScope::of_file(file_name);

    let mut modified = false;
    for directive in directives {
        let name = directive.destination.as_str();
        let Some(pattern) = setting_line(name) else {
            continue;
        };
        let line = format!("{} = {}", name, directive.value());
        let scope = BuildScope::of_build_type(directive.build_type.as_deref());

        if scope == Some(file_scope) {
            if pattern.is_match(&contents) && directive.enforce != Enforce::False {
                if replace_first(&mut contents, &pattern, &line) {
                    debug!("Overwrote {} with '{}' in {}", name, directive.value(), file_name);
                    modified = true;
                }
            } else if directive.enforce == Enforce::True {
                append(&mut contents, &line);
                debug!("Added {} = '{}' to {}", name, directive.value(), file_name);
                modified = true;
            }
        } else if name.contains(CODE_SIGN_IDENTITY)
            && scope == Some(BuildScope::Debug)
            && file_scope == BuildScope::Base
            && directive.enforce == Enforce::Unset
            && replace_first(&mut contents, &pattern, &line)
        {
            // 兼容 Cordova 把 debug 签名写在 build.xcconfig 中
            debug!("Overwrote {} with '{}' in {}", name, directive.value(), file_name);
            modified = true;
        }
    }

    PatchResult {
        modified,
        document: contents,
    }
}
