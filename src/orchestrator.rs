use crate::context::RunContext;
use crate::descriptor::parse_platform;
use crate::directive::Platform;
use crate::error::{MergeError, Result};
use crate::patches::apply_patch;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PlatformStatus {
    Updated { files: Vec<PathBuf> },
    Unsupported,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformOutcome {
    pub platform: String,
    #[serde(flatten)]
    pub status: PlatformStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub platforms: Vec<PlatformOutcome>,
    /// Every file touched in the run, in first-touch order.
    pub updated_files: Vec<PathBuf>,
}

/// Directory names under `platforms/`, trimmed, lowercased and sorted.
pub fn discover_platforms(platforms_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(platforms_dir).map_err(|e| MergeError::io(platforms_dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MergeError::io(platforms_dir, e))?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().trim().to_lowercase());
        }
    }
    names.sort();
    Ok(names)
}

/// Parses the descriptor for `platform` and patches every target file.
pub fn update_platform(ctx: &mut RunContext<'_>, platform: Platform) -> Result<Vec<PathBuf>> {
    let config = parse_platform(ctx.descriptor, &mut ctx.preferences, platform)?;
    debug!("Parsed {} target file(s) for {}", config.len(), platform);

    let mut written = Vec::new();
    for (target_file, directives) in &config {
        written.extend(apply_patch(ctx, platform, target_file, directives)?);
    }
    Ok(written)
}

pub fn run(ctx: &mut RunContext<'_>) -> Result<RunReport> {
    let mut report = RunReport::default();
    for name in discover_platforms(&ctx.platforms_dir())? {
        let Some(platform) = Platform::from_dir_name(&name) else {
            debug!("No custom config support for platform '{}'", name);
            report.platforms.push(PlatformOutcome {
                platform: name,
                status: PlatformStatus::Unsupported,
            });
            continue;
        };

        debug!("Processing settings for platform: {}", platform);
        let status = match update_platform(ctx, platform) {
            Ok(files) => PlatformStatus::Updated { files },
            Err(e) => {
                error!("Error updating config for platform '{}': {}", platform, e);
                if ctx.settings.stop_on_error {
                    return Err(MergeError::Aborted {
                        platform: name,
                        source: Box::new(e),
                    });
                }
                PlatformStatus::Failed {
                    message: e.to_string(),
                }
            }
        };
        report.platforms.push(PlatformOutcome {
            platform: name,
            status,
        });
    }

    report.updated_files = ctx.backups.touched().map(Path::to_path_buf).collect();
    info!("Finished applying platform config");
    Ok(report)
}
