//! Backups copied into a directory (local disk, NAS mount, synced folder).

use std::fs;
use std::path::{Path, PathBuf};

use super::CloudBackup;

/// Stores each remote object as a file directly under `root`.
#[derive(Debug, Clone)]
pub struct DirectoryBackup {
    root: PathBuf,
}

impl DirectoryBackup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a remote name to a file under `root`.
    ///
    /// Names that could escape the directory are refused.
    fn resolve(&self, remote: &str) -> Option<PathBuf> {
        if remote.is_empty()
            || remote == "."
            || remote == ".."
            || remote.contains(['/', '\\'])
        {
            tracing::warn!(remote, "refusing unsafe backup name");
            return None;
        }
        Some(self.root.join(remote))
    }
}

impl CloudBackup for DirectoryBackup {
    fn upload(&self, local: &Path, remote: &str) -> bool {
        let Some(target) = self.resolve(remote) else {
            return false;
        };
        if let Err(e) = fs::create_dir_all(&self.root) {
            tracing::warn!(error = %e, "cannot create backup directory");
            return false;
        }
        match fs::copy(local, &target) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, remote, "backup upload failed");
                false
            }
        }
    }

    fn download(&self, remote: &str, local: &Path) -> bool {
        let Some(source) = self.resolve(remote) else {
            return false;
        };
        match fs::copy(&source, local) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, remote, "backup download failed");
                false
            }
        }
    }

    fn delete(&self, remote: &str) -> bool {
        let Some(target) = self.resolve(remote) else {
            return false;
        };
        fs::remove_file(target).is_ok()
    }
}
