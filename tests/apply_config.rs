use apply_custom_config::orchestrator::PlatformStatus;
use apply_custom_config::{Descriptor, MergeError, RunContext, RunReport, Settings, run};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ANDROID_MANIFEST: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="io.cordova.hello" android:versionCode="1">
    <uses-permission android:name="android.permission.INTERNET" />
    <application android:label="@string/app_name">
        <activity android:name="MainActivity" android:label="@string/activity_name">
            <intent-filter>
                <action android:name="android.intent.action.MAIN" />
            </intent-filter>
        </activity>
    </application>
</manifest>
"#;

const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleDisplayName</key>
	<string>Hello</string>
</dict>
</plist>
"#;

const PBXPROJ: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	objects = {
		1D6058940D05DD3E006BFB54 /* Debug */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				ENABLE_BITCODE = YES;
				PRODUCT_NAME = "Hello";
			};
			name = Debug;
		};
		1D6058950D05DD3E006BFB54 /* Release */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				ENABLE_BITCODE = YES;
				PRODUCT_NAME = "Hello";
			};
			name = Release;
		};
	};
	rootObject = 29B97313FDCFA39411CA2CEA /* Project object */;
}
"#;

const BUILD_XCCONFIG: &str = "OTHER_LDFLAGS = -ObjC\n";

struct Project {
    dir: TempDir,
}

impl Project {
    fn new(config_xml: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.xml"), config_xml).unwrap();
        fs::create_dir_all(dir.path().join("platforms")).unwrap();
        Project { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    fn with_android(self) -> Self {
        self.write("platforms/android/app/src/main/AndroidManifest.xml", ANDROID_MANIFEST);
        self
    }

    fn with_ios(self) -> Self {
        self.write("platforms/ios/Hello/Hello-Info.plist", INFO_PLIST);
        self.write("platforms/ios/Hello.xcodeproj/project.pbxproj", PBXPROJ);
        self.write("platforms/ios/cordova/build.xcconfig", BUILD_XCCONFIG);
        self
    }

    fn run(&self, settings: &Settings) -> Result<RunReport, MergeError> {
        let descriptor = Descriptor::load(&self.path("config.xml"))?;
        let mut ctx = RunContext::new(self.root(), &descriptor, settings);
        run(&mut ctx)
    }
}

fn config_xml(body: &str) -> String {
    format!(
        r#"<?xml version='1.0' encoding='utf-8'?>
<widget id="io.cordova.hello" version="1.0.0" xmlns="http://www.w3.org/ns/widgets" xmlns:android="http://schemas.android.com/apk/res/android">
    <name>Hello</name>
    {body}
</widget>"#
    )
}

const ANDROID_CONFIG: &str = r#"
    <platform name="android">
        <preference name="android-manifest/application/activity/{ActivityName}/@android:screenOrientation" value="portrait" />
        <preference name="android-manifest/@android:installLocation" value="auto" />
        <config-file target="AndroidManifest.xml" parent="/*">
            <uses-permission android:name="android.permission.CAMERA" />
        </config-file>
    </platform>"#;

const IOS_CONFIG: &str = r#"
    <platform name="ios">
        <preference name="ios-XCBuildConfiguration-ENABLE_BITCODE" value="NO" quote="none" />
        <preference name="ios-XCBuildConfiguration-SWIFT_VERSION" value="5.0" buildType="release" quote="none" xcconfigEnforce="true" />
        <preference name="ios-xcconfig-OTHER_LDFLAGS" value="-ObjC -lz" />
        <config-file target="*-Info.plist" parent="NSCameraUsageDescription">
            <string>Used to scan barcodes</string>
        </config-file>
    </platform>"#;

#[test]
fn test_android_manifest_is_merged_and_backed_up() {
    let project = Project::new(&config_xml(ANDROID_CONFIG)).with_android();
    let report = project.run(&Settings::default()).unwrap();

    let manifest_path = project.path("platforms/android/app/src/main/AndroidManifest.xml");
    assert_eq!(report.updated_files, vec![manifest_path.clone()]);
    assert_eq!(
        report.platforms[0].status,
        PlatformStatus::Updated {
            files: vec![manifest_path]
        }
    );

    let manifest = project.read("platforms/android/app/src/main/AndroidManifest.xml");
    assert!(manifest.contains(r#"android:installLocation="auto""#));
    assert!(manifest.contains(
        r#"<activity android:name="MainActivity" android:label="@string/activity_name" android:screenOrientation="portrait">"#
    ));
    assert!(manifest.contains(r#"<uses-permission android:name="android.permission.CAMERA" />"#));
    assert!(manifest.contains(r#"<uses-permission android:name="android.permission.INTERNET" />"#));

    let backup = project.read("plugins/cordova-custom-config/backup/android/AndroidManifest.xml");
    assert_eq!(backup, ANDROID_MANIFEST);
}

#[test]
fn test_legacy_android_layout() {
    let project = Project::new(&config_xml(ANDROID_CONFIG));
    project.write("platforms/android/AndroidManifest.xml", ANDROID_MANIFEST);
    project.run(&Settings::default()).unwrap();
    assert!(
        project
            .read("platforms/android/AndroidManifest.xml")
            .contains(r#"android:screenOrientation="portrait""#)
    );
}

#[test]
fn test_ios_files_are_merged() {
    let project = Project::new(&config_xml(IOS_CONFIG)).with_ios();
    let report = project.run(&Settings::default()).unwrap();
    assert_eq!(report.updated_files.len(), 3);

    let pbxproj = project.read("platforms/ios/Hello.xcodeproj/project.pbxproj");
    assert_eq!(pbxproj.matches("ENABLE_BITCODE = NO;").count(), 2);
    assert_eq!(pbxproj.matches("SWIFT_VERSION = 5.0;").count(), 1);
    assert!(!pbxproj.contains("OTHER_LDFLAGS"));
    assert!(pbxproj.starts_with("// !$*UTF8*$!\n{\n\tarchiveVersion = 1;"));

    assert_eq!(
        project.read("platforms/ios/cordova/build.xcconfig"),
        "OTHER_LDFLAGS = -ObjC -lz\n"
    );

    let plist = project.read("platforms/ios/Hello/Hello-Info.plist");
    assert!(plist.contains("<key>NSCameraUsageDescription</key>"));
    assert!(plist.contains("<string>Used to scan barcodes</string>"));

    for file in ["Hello-Info.plist", "project.pbxproj", "build.xcconfig"] {
        assert!(project.path("plugins/cordova-custom-config/backup/ios").join(file).is_file());
    }
}

#[test]
fn test_second_run_rewrites_nothing() {
    let project = Project::new(&config_xml(&format!("{ANDROID_CONFIG}{IOS_CONFIG}")))
        .with_android()
        .with_ios();
    project.run(&Settings::default()).unwrap();

    let files = [
        "platforms/android/app/src/main/AndroidManifest.xml",
        "platforms/ios/Hello/Hello-Info.plist",
        "platforms/ios/Hello.xcodeproj/project.pbxproj",
        "platforms/ios/cordova/build.xcconfig",
    ];
    let first: Vec<String> = files.iter().map(|f| project.read(f)).collect();

    let report = project.run(&Settings::default()).unwrap();
    assert!(report.updated_files.is_empty());
    let second: Vec<String> = files.iter().map(|f| project.read(f)).collect();
    assert_eq!(first, second);

    assert_eq!(
        project.read("plugins/cordova-custom-config/backup/ios/project.pbxproj"),
        PBXPROJ
    );
}

#[test]
fn test_later_config_file_block_wins() {
    let project = Project::new(&config_xml(
        r#"
    <platform name="android">
        <config-file target="AndroidManifest.xml" parent="/*">
            <uses-permission android:name="android.permission.CAMERA" />
        </config-file>
        <config-file target="AndroidManifest.xml" parent="./">
            <uses-permission android:name="android.permission.VIBRATE" />
        </config-file>
    </platform>"#,
    ))
    .with_android();
    project.run(&Settings::default()).unwrap();

    let manifest = project.read("platforms/android/app/src/main/AndroidManifest.xml");
    assert!(manifest.contains("android.permission.VIBRATE"));
    assert!(!manifest.contains("android.permission.CAMERA"));
}

#[test]
fn test_unsupported_platform_is_reported() {
    let project = Project::new(&config_xml(""));
    fs::create_dir_all(project.path("platforms/browser")).unwrap();
    let report = project.run(&Settings::default()).unwrap();
    assert_eq!(report.platforms.len(), 1);
    assert_eq!(report.platforms[0].platform, "browser");
    assert_eq!(report.platforms[0].status, PlatformStatus::Unsupported);
}

fn broken_android_project() -> Project {
    let project = Project::new(&config_xml(&format!("{ANDROID_CONFIG}{IOS_CONFIG}"))).with_ios();
    project.write("platforms/android/app/src/main/AndroidManifest.xml", "<manifest><application>");
    project
}

#[test]
fn test_failure_continues_with_next_platform() {
    let project = broken_android_project();
    let report = project.run(&Settings::default()).unwrap();

    assert_eq!(report.platforms[0].platform, "android");
    assert!(matches!(report.platforms[0].status, PlatformStatus::Failed { .. }));
    assert_eq!(report.platforms[1].platform, "ios");
    assert!(matches!(report.platforms[1].status, PlatformStatus::Updated { .. }));
    assert!(
        project
            .read("platforms/ios/Hello.xcodeproj/project.pbxproj")
            .contains("ENABLE_BITCODE = NO;")
    );
}

#[test]
fn test_stop_on_error_aborts_the_run() {
    let project = broken_android_project();
    let settings = Settings {
        stop_on_error: true,
        ..Settings::default()
    };
    let err = project.run(&settings).unwrap_err();
    match err {
        MergeError::Aborted { platform, source } => {
            assert_eq!(platform, "android");
            assert!(matches!(*source, MergeError::Codec { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(project.read("platforms/ios/Hello.xcodeproj/project.pbxproj"), PBXPROJ);
}

#[test]
fn test_custom_plugin_id_moves_backups() {
    let project = Project::new(&config_xml(ANDROID_CONFIG)).with_android();
    let settings = Settings {
        plugin_id: "my-config".to_string(),
        ..Settings::default()
    };
    project.run(&settings).unwrap();
    assert!(
        project
            .path("plugins/my-config/backup/android/AndroidManifest.xml")
            .is_file()
    );
}

#[test]
fn test_platform_preference_overrides_common() {
    let project = Project::new(&config_xml(
        r#"<preference name="ios-XCBuildConfiguration-ENABLE_BITCODE" value="YES" quote="none" />
    <platform name="ios">
        <preference name="ios-XCBuildConfiguration-ENABLE_BITCODE" value="NO" quote="none" />
    </platform>"#,
    ))
    .with_ios();
    project.run(&Settings::default()).unwrap();

    let pbxproj = project.read("platforms/ios/Hello.xcodeproj/project.pbxproj");
    assert_eq!(pbxproj.matches("ENABLE_BITCODE = NO;").count(), 2);
    assert!(!pbxproj.contains("ENABLE_BITCODE = YES;"));
}

fn settings_from(project: &Project) -> Settings {
    let descriptor = Descriptor::load(&project.path("config.xml")).unwrap();
    let mut settings = Settings::default();
    settings.apply_descriptor(&descriptor);
    settings
}

#[test]
fn test_nameless_platform_preference_fails_only_that_platform() {
    let project = Project::new(&config_xml(&format!(
        r#"{ANDROID_CONFIG}
    <platform name="ios">
        <preference value="orphan" />
    </platform>"#
    )))
    .with_android()
    .with_ios();
    let settings = settings_from(&project);
    let report = project.run(&settings).unwrap();

    assert_eq!(report.platforms[0].platform, "android");
    assert!(matches!(report.platforms[0].status, PlatformStatus::Updated { .. }));
    assert_eq!(report.platforms[1].platform, "ios");
    match &report.platforms[1].status {
        PlatformStatus::Failed { message } => assert!(message.contains("without a name")),
        other => panic!("unexpected status: {other:?}"),
    }
    assert!(
        project
            .read("platforms/android/app/src/main/AndroidManifest.xml")
            .contains(r#"android:screenOrientation="portrait""#)
    );
}

#[test]
fn test_nameless_common_preference_is_reported_per_platform() {
    let project = Project::new(&config_xml(&format!(
        r#"<preference value="orphan" />
    <preference name="cordova-custom-config-stoponerror" value="false" />
    {ANDROID_CONFIG}"#
    )))
    .with_android()
    .with_ios();
    let settings = settings_from(&project);
    assert!(!settings.stop_on_error);

    let report = project.run(&settings).unwrap();
    assert_eq!(report.platforms.len(), 2);
    for outcome in &report.platforms {
        assert!(matches!(outcome.status, PlatformStatus::Failed { .. }));
    }
    assert_eq!(
        project.read("platforms/android/app/src/main/AndroidManifest.xml"),
        ANDROID_MANIFEST
    );
}

#[test]
fn test_debug_code_sign_identity_rewrites_base_xcconfig_only() {
    let build = "CODE_SIGN_IDENTITY = iPhone Developer\nOTHER_LDFLAGS = -ObjC\n";
    let build_debug = "#include \"build.xcconfig\"\nGCC_PREPROCESSOR_DEFINITIONS = DEBUG=1\n";
    let project = Project::new(&config_xml(
        r#"<platform name="ios">
        <preference name="ios-XCBuildConfiguration-CODE_SIGN_IDENTITY" value="iPhone Distribution" buildType="debug" quote="none" />
    </platform>"#,
    ))
    .with_ios();
    project.write("platforms/ios/cordova/build.xcconfig", build);
    project.write("platforms/ios/cordova/build-debug.xcconfig", build_debug);
    project.run(&Settings::default()).unwrap();

    assert_eq!(
        project.read("platforms/ios/cordova/build.xcconfig"),
        "CODE_SIGN_IDENTITY = iPhone Distribution\nOTHER_LDFLAGS = -ObjC\n"
    );
    assert_eq!(project.read("platforms/ios/cordova/build-debug.xcconfig"), build_debug);

    let backups = project.path("plugins/cordova-custom-config/backup/ios");
    assert!(backups.join("build.xcconfig").is_file());
    assert!(!backups.join("build-debug.xcconfig").exists());
}
