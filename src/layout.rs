//! The on-disk directory contract shared by the distribution step, the
//! annotators' painting tool and the progress/merge steps.
//!
//! ```text
//! {workspace}/{contributor}/assigned/
//! {workspace}/{contributor}/completed/
//! {workspace}/{contributor}/masks/
//! {workspace}/final_masks/
//! {workspace}/quality_check/
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{LedgerError, Result};
use crate::traits::Collection;

pub const FINAL_MASKS_DIR: &str = "final_masks";
pub const QUALITY_CHECK_DIR: &str = "quality_check";
pub const ASSIGNMENT_FILE: &str = "assignment.json";
pub const PROGRESS_FILE: &str = "progress.json";
pub const INSTRUCTIONS_FILE: &str = "INSTRUCTIONS.md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contributor_dir(&self, contributor: &str) -> PathBuf {
        self.root.join(contributor)
    }

    pub fn collection_dir(&self, contributor: &str, collection: Collection) -> PathBuf {
        self.contributor_dir(contributor).join(collection.dir_name())
    }

    pub fn instructions_file(&self, contributor: &str) -> PathBuf {
        self.contributor_dir(contributor).join(INSTRUCTIONS_FILE)
    }

    pub fn final_masks_dir(&self) -> PathBuf {
        self.root.join(FINAL_MASKS_DIR)
    }

    pub fn quality_check_dir(&self) -> PathBuf {
        self.root.join(QUALITY_CHECK_DIR)
    }

    pub fn assignment_file(&self) -> PathBuf {
        self.root.join(ASSIGNMENT_FILE)
    }

    pub fn progress_file(&self) -> PathBuf {
        self.root.join(PROGRESS_FILE)
    }

    /// Fails with `WorkspaceMissing` unless the workspace root is a directory.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(LedgerError::WorkspaceMissing {
                path: self.root.clone(),
            })
        }
    }

    /// Creates every folder of the contract. Existing folders and their
    /// contents are left as they are.
    pub fn create(&self, contributors: &[String]) -> Result<()> {
        let mut folders = Vec::with_capacity(contributors.len() * 3 + 2);
        for contributor in contributors {
            for collection in Collection::ALL {
                folders.push(self.collection_dir(contributor, collection));
            }
        }
        folders.push(self.final_masks_dir());
        folders.push(self.quality_check_dir());

        for folder in folders {
            fs::create_dir_all(&folder)
                .map_err(|e| LedgerError::file_system(&folder, "directory creation", e))?;
        }

        log::info!(
            "Workspace layout ready at {} for {} contributor(s)",
            self.root.display(),
            contributors.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_follow_contract() {
        let layout = WorkspaceLayout::new("ws");
        assert_eq!(
            layout.collection_dir("alice", Collection::Assigned),
            Path::new("ws/alice/assigned")
        );
        assert_eq!(
            layout.collection_dir("alice", Collection::Completed),
            Path::new("ws/alice/completed")
        );
        assert_eq!(
            layout.collection_dir("alice", Collection::Masks),
            Path::new("ws/alice/masks")
        );
        assert_eq!(layout.final_masks_dir(), Path::new("ws/final_masks"));
        assert_eq!(layout.quality_check_dir(), Path::new("ws/quality_check"));
        assert_eq!(layout.progress_file(), Path::new("ws/progress.json"));
    }

    #[test]
    fn test_create_is_idempotent() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let layout = WorkspaceLayout::new(temp_dir.path().join("ws"));
        let contributors = vec!["alice".to_string(), "bob".to_string()];

        assert!(layout.ensure_exists().is_err());
        layout.create(&contributors)?;

        let marker = layout
            .collection_dir("alice", Collection::Masks)
            .join("keep.png");
        fs::write(&marker, b"mask")?;
        layout.create(&contributors)?;

        layout.ensure_exists()?;
        assert!(marker.exists());
        assert!(layout.collection_dir("bob", Collection::Completed).is_dir());
        assert!(layout.final_masks_dir().is_dir());
        assert!(layout.quality_check_dir().is_dir());
        Ok(())
    }
}
