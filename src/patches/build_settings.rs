use super::PatchResult;
use crate::directive::Directive;
use pbxproj_parser::PbxProject;
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
    Replace,
    Add,
}

fn quote(s: &str) -> String {
    format!("\"{s}\"")
}

/// Sets a `buildSettings` key in every configuration matching the
/// directive's build type. Returns whether any configuration was targeted.
fn update_configurations(project: &mut PbxProject, directive: &Directive, mode: Mode) -> bool {
    let name = directive.destination.as_str();
    let quoted_name = quote(name);
    let quote_mode = directive.quote_mode();

    let mut matched = false;
    for config in project.configurations_mut() {
        if let Some(build_type) = &directive.build_type {
            if !build_type.eq_ignore_ascii_case(&config.name) {
                continue;
            }
        }

        let settings = config.build_settings_mut();
        let key = if settings.contains_key(name) {
            name.to_string()
        } else if settings.contains_key(&quoted_name) {
            quoted_name.clone()
        } else if mode == Mode::Replace {
            continue;
        } else if quote_mode.quotes_key() {
            quoted_name.clone()
        } else {
            name.to_string()
        };
        let value = if quote_mode.quotes_value() {
            quote(directive.value())
        } else {
            directive.value().to_string()
        };

        settings.insert(key.as_str(), value.as_str());
        debug!(
            "{:?} XCBuildConfiguration key={{ {} }} to value={{ {} }} for build type='{}' in block='{}'",
            mode, key, value, config.name, config.id
        );
        matched = true;
    }
    matched
}

pub fn patch(mut project: PbxProject, directives: &[&Directive]) -> PatchResult<PbxProject> {
    for directive in directives {
        if !update_configurations(&mut project, directive, Mode::Replace) {
            update_configurations(&mut project, directive, Mode::Add);
        }
    }
    PatchResult {
        modified: project.is_dirty(),
        document: project,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::{DirectiveKind, Enforce, Payload, Platform, QuoteMode};
    use pbxproj_parser::parse_pbxproj;

    const PBXPROJ: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	objects = {

/* Begin XCBuildConfiguration section */
		1D6058940D05DD3E006BFB54 /* Debug */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				ENABLE_BITCODE = NO;
				"ARCHS[sdk=iphoneos*]" = arm64;
				PRODUCT_NAME = "HelloCordova";
			};
			name = Debug;
		};
		1D6058950D05DD3E006BFB54 /* Release */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				ENABLE_BITCODE = NO;
				PRODUCT_NAME = "HelloCordova";
			};
			name = Release;
		};
/* End XCBuildConfiguration section */
	};
	rootObject = 29B97313FDCFA39411CA2CEA /* Project object */;
}
"#;

    fn setting(name: &str, value: &str, build_type: Option<&str>, quote: Option<QuoteMode>) -> Directive {
        Directive {
            platform: Platform::Ios,
            target_file: "project.pbxproj".to_string(),
            kind: DirectiveKind::BuildSetting,
            parent_path: "XCBuildConfiguration".to_string(),
            destination: name.to_string(),
            payload: Payload::Value(value.to_string()),
            build_type: build_type.map(str::to_string),
            quote_mode: quote,
            enforce: Enforce::Unset,
        }
    }

    fn run(directives: &[Directive]) -> PatchResult<PbxProject> {
        let refs: Vec<&Directive> = directives.iter().collect();
        patch(parse_pbxproj(PBXPROJ).unwrap(), &refs)
    }

    fn values(project: &PbxProject, key: &str) -> Vec<Option<String>> {
        project
            .configurations()
            .iter()
            .map(|c| c.build_settings().get(key).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_replace_existing_key_in_all_configurations() {
        let result = run(&[setting("ENABLE_BITCODE", "YES", None, None)]);
        assert!(result.modified);
        assert_eq!(
            values(&result.document, "ENABLE_BITCODE"),
            vec![Some("\"YES\"".to_string()), Some("\"YES\"".to_string())]
        );
    }

    #[test]
    fn test_build_type_limits_replacement() {
        let result = run(&[setting("ENABLE_BITCODE", "YES", Some("release"), Some(QuoteMode::None))]);
        assert_eq!(
            values(&result.document, "ENABLE_BITCODE"),
            vec![Some("NO".to_string()), Some("YES".to_string())]
        );
    }

    #[test]
    fn test_missing_key_is_added_with_quoting() {
        let result = run(&[setting("OTHER_LDFLAGS", "-ObjC", Some("Debug"), Some(QuoteMode::Value))]);
        let debug = result.document.configurations()[0].build_settings();
        assert_eq!(debug.get("OTHER_LDFLAGS"), Some("\"-ObjC\""));
        assert!(!result.document.configurations()[1].build_settings().contains_key("OTHER_LDFLAGS"));

        let keyed = run(&[setting("OTHER_LDFLAGS", "-ObjC", None, None)]);
        assert_eq!(
            values(&keyed.document, "\"OTHER_LDFLAGS\""),
            vec![Some("\"-ObjC\"".to_string()), Some("\"-ObjC\"".to_string())]
        );
    }

    #[test]
    fn test_quoted_key_is_matched() {
        let result = run(&[setting("ARCHS[sdk=iphoneos*]", "arm64e", None, Some(QuoteMode::Key))]);
        let debug = result.document.configurations()[0].build_settings();
        assert_eq!(debug.get("\"ARCHS[sdk=iphoneos*]\""), Some("arm64e"));
        assert!(!result.document.configurations()[1].build_settings().contains_key("\"ARCHS[sdk=iphoneos*]\""));
    }

    #[test]
    fn test_unmatched_build_type_adds_nothing() {
        let result = run(&[setting("ENABLE_BITCODE", "YES", Some("Staging"), None)]);
        assert!(!result.modified);
    }

    #[test]
    fn test_unchanged_value_keeps_file_bytes() {
        let result = run(&[setting("ENABLE_BITCODE", "NO", None, Some(QuoteMode::None))]);
        assert!(!result.modified);
        assert_eq!(result.document.write(), PBXPROJ);
    }

    #[test]
    fn test_written_file_reparses_with_new_value() {
        let result = run(&[setting("SWIFT_VERSION", "5.0", None, Some(QuoteMode::None))]);
        let written = result.document.write();
        assert!(written.contains("\t\t\t\tSWIFT_VERSION = 5.0;\n"));
        assert!(written.contains("rootObject = 29B97313FDCFA39411CA2CEA /* Project object */;"));

        let reparsed = parse_pbxproj(&written).unwrap();
        assert_eq!(
            values(&reparsed, "SWIFT_VERSION"),
            vec![Some("5.0".to_string()), Some("5.0".to_string())]
        );
    }
}
