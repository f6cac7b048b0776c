use crate::directive::Platform;
use crate::error::{MergeError, Result};
use indexmap::IndexSet;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupRecord {
    pub source: PathBuf,
    pub backup: PathBuf,
    /// False when a backup from an earlier run was already there.
    pub created: bool,
}

/// Keeps the pristine copy of every touched file under
/// `<project>/plugins/<plugin id>/backup/<platform>/`.
#[derive(Debug)]
pub struct BackupManager {
    root: PathBuf,
    touched: IndexSet<PathBuf>,
}

fn create_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| MergeError::io(path, e))?;
    debug!("Created backup directory: {}", path.display());
    Ok(())
}

impl BackupManager {
    pub fn new(project_root: &Path, plugin_id: &str) -> Self {
        BackupManager {
            root: project_root.join("plugins").join(plugin_id).join("backup"),
            touched: IndexSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backup_path(&self, platform: Platform, file_name: &str) -> PathBuf {
        self.root.join(platform.as_str()).join(file_name)
    }

    /// Copies `source` aside unless a backup already exists. Must be called
    /// before the first write to `source`.
    pub fn ensure_backup(
        &mut self,
        platform: Platform,
        source: &Path,
        file_name: &str,
    ) -> Result<BackupRecord> {
        create_dir(&self.root)?;
        create_dir(&self.root.join(platform.as_str()))?;

        let backup = self.backup_path(platform, file_name);
        let created = if backup.exists() {
            debug!("Backup exists for '{}' at: {}", file_name, backup.display());
            false
        } else {
            if let Some(parent) = backup.parent() {
                create_dir(parent)?;
            }
            fs::copy(source, &backup).map_err(|e| MergeError::io(source, e))?;
            debug!("Backed up {} to {}", source.display(), backup.display());
            true
        };

        if self.touched.insert(source.to_path_buf()) {
            info!("Applied custom config from config.xml to {}", source.display());
        }
        Ok(BackupRecord {
            source: source.to_path_buf(),
            backup,
            created,
        })
    }

    /// Files touched in this run, in first-touch order.
    pub fn touched(&self) -> impl Iterator<Item = &Path> {
        self.touched.iter().map(PathBuf::as_path)
    }
}
