use crate::backup::BackupManager;
use crate::config::Settings;
use crate::descriptor::{ANDROID_MANIFEST, Descriptor, PBXPROJ, PreferenceCache};
use crate::directive::Platform;
use crate::error::{MergeError, Result};
use std::path::{Path, PathBuf};

/// State shared by every platform update of one run.
pub struct RunContext<'a> {
    pub descriptor: &'a Descriptor,
    pub settings: &'a Settings,
    pub project_root: PathBuf,
    pub preferences: PreferenceCache,
    pub backups: BackupManager,
}

impl<'a> RunContext<'a> {
    pub fn new(project_root: &Path, descriptor: &'a Descriptor, settings: &'a Settings) -> Self {
        RunContext {
            descriptor,
            settings,
            project_root: project_root.to_path_buf(),
            preferences: PreferenceCache::default(),
            backups: BackupManager::new(project_root, &settings.plugin_id),
        }
    }

    pub fn platforms_dir(&self) -> PathBuf {
        self.project_root.join("platforms")
    }

    pub fn platform_dir(&self, platform: Platform) -> PathBuf {
        self.platforms_dir().join(platform.as_str())
    }

    /// From settings, else the descriptor's `<name>`.
    pub fn project_name(&self) -> Result<String> {
        self.settings
            .project_name
            .clone()
            .or_else(|| self.descriptor.project_name())
            .ok_or(MergeError::MissingProjectName)
    }

    /// Gradle layout (cordova-android >= 7) first, then the legacy one.
    pub fn android_manifest_path(&self) -> PathBuf {
        let android = self.platform_dir(Platform::Android);
        let gradle = android.join("app/src/main").join(ANDROID_MANIFEST);
        if gradle.is_file() {
            gradle
        } else {
            android.join(ANDROID_MANIFEST)
        }
    }

    pub fn info_plist_path(&self) -> Result<PathBuf> {
        let name = self.project_name()?;
        Ok(self
            .platform_dir(Platform::Ios)
            .join(&name)
            .join(format!("{name}-Info.plist")))
    }

    pub fn pbxproj_path(&self) -> Result<PathBuf> {
        let name = self.project_name()?;
        Ok(self
            .platform_dir(Platform::Ios)
            .join(format!("{name}.xcodeproj"))
            .join(PBXPROJ))
    }

    pub fn xcconfig_path(&self, file_name: &str) -> PathBuf {
        self.platform_dir(Platform::Ios).join("cordova").join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn descriptor() -> Descriptor {
        Descriptor::parse("config.xml", "<widget><name>Hello</name></widget>").unwrap()
    }

    #[test]
    fn test_ios_paths_use_project_name() {
        let descriptor = descriptor();
        let settings = Settings::default();
        let ctx = RunContext::new(Path::new("/app"), &descriptor, &settings);
        assert_eq!(
            ctx.info_plist_path().unwrap(),
            PathBuf::from("/app/platforms/ios/Hello/Hello-Info.plist")
        );
        assert_eq!(
            ctx.pbxproj_path().unwrap(),
            PathBuf::from("/app/platforms/ios/Hello.xcodeproj/project.pbxproj")
        );
        assert_eq!(
            ctx.xcconfig_path("build.xcconfig"),
            PathBuf::from("/app/platforms/ios/cordova/build.xcconfig")
        );
        assert_eq!(ctx.backups.root(), Path::new("/app/plugins/cordova-custom-config/backup"));
    }

    #[test]
    fn test_project_name_override_and_missing_name() {
        let descriptor = Descriptor::parse("config.xml", "<widget />").unwrap();
        let settings = Settings::default();
        let ctx = RunContext::new(Path::new("/app"), &descriptor, &settings);
        assert!(matches!(ctx.pbxproj_path(), Err(MergeError::MissingProjectName)));

        let settings = Settings {
            project_name: Some("Override".to_string()),
            ..Settings::default()
        };
        let ctx = RunContext::new(Path::new("/app"), &descriptor, &settings);
        assert_eq!(ctx.project_name().unwrap(), "Override");
    }

    #[test]
    fn test_android_manifest_prefers_gradle_layout() {
        let dir = TempDir::new().unwrap();
        let descriptor = descriptor();
        let settings = Settings::default();
        let ctx = RunContext::new(dir.path(), &descriptor, &settings);
        assert_eq!(
            ctx.android_manifest_path(),
            dir.path().join("platforms/android/AndroidManifest.xml")
        );

        let gradle = dir.path().join("platforms/android/app/src/main");
        fs::create_dir_all(&gradle).unwrap();
        fs::write(gradle.join("AndroidManifest.xml"), "<manifest />").unwrap();
        assert_eq!(ctx.android_manifest_path(), gradle.join("AndroidManifest.xml"));
    }
}
