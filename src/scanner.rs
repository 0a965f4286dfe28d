use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::ExtensionSet;
use crate::errors::{LedgerError, Result};
use crate::layout::WorkspaceLayout;
use crate::traits::{Collection, CollectionScanner};

/// Reads collections straight from the workspace directories.
#[derive(Debug, Clone)]
pub struct FsCollectionScanner {
    layout: WorkspaceLayout,
}

impl FsCollectionScanner {
    pub const fn new(layout: WorkspaceLayout) -> Self {
        Self { layout }
    }

    pub const fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }
}

impl CollectionScanner for FsCollectionScanner {
    fn base_names(
        &self,
        contributor: &str,
        collection: Collection,
        extensions: &ExtensionSet,
    ) -> Result<BTreeSet<String>> {
        let dir = self.layout.collection_dir(contributor, collection);
        let file_names = list_file_names(&dir)?;
        extensions.base_names(&dir.display().to_string(), file_names)
    }
}

/// Names of the regular files directly inside `dir`, sorted.
///
/// Subdirectories are not descended into. Names that are not valid UTF-8 are
/// skipped with a warning since they can never match a mask name.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    Ok(list_files(dir)?.into_iter().map(|(name, _)| name).collect())
}

/// Like [`list_file_names`], paired with the full path of each file.
pub fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Err(LedgerError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            LedgerError::file_system(dir, "directory listing", std::io::Error::from(e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        match entry.file_name().to_str().map(str::to_string) {
            Some(name) => files.push((name, entry.into_path())),
            None => log::warn!("Skipping non UTF-8 file name: {}", entry.path().display()),
        }
    }
    Ok(files)
}
