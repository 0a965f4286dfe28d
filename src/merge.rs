//! Collects finished work from every contributor into one folder pair.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{ExtensionSet, WorkspaceConfig};
use crate::copy::{copy_all, CopyJob};
use crate::errors::{LedgerError, Result};
use crate::persist;
use crate::scanner::list_files;
use crate::traits::Collection;

pub const DEFAULT_MERGE_DIR: &str = "merged_annotations";
pub const MERGE_STATS_FILE: &str = "merge_stats.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
    pub images: usize,
    pub masks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeStats {
    pub total_images: usize,
    pub total_masks: usize,
    pub members: IndexMap<String, MemberStats>,
    pub merge_date: DateTime<FixedOffset>,
}

/// Destination file name to the contributor that supplied it.
struct Destinations {
    dir: PathBuf,
    owners: HashMap<String, String>,
}

impl Destinations {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            owners: HashMap::new(),
        }
    }

    fn claim(&mut self, contributor: &str, file_name: &str) -> Result<PathBuf> {
        if let Some(owner) = self.owners.get(file_name) {
            return Err(LedgerError::FilenameCollision {
                location: self.dir.display().to_string(),
                base_name: file_name.to_string(),
                file_names: vec![
                    format!("{owner}/{file_name}"),
                    format!("{contributor}/{file_name}"),
                ],
            });
        }
        self.owners.insert(file_name.to_string(), contributor.to_string());
        Ok(self.dir.join(file_name))
    }
}

/// Copies every contributor's `completed/` images and `masks/` files into
/// `{output}/images` and `{output}/masks` and writes `merge_stats.json`.
///
/// Contributors missing either folder are skipped. Nothing is copied if two
/// contributors supply the same destination file name.
pub fn merge_annotations(config: &WorkspaceConfig, output: &Path) -> Result<MergeStats> {
    let layout = config.layout();
    layout.ensure_exists()?;

    let mask_extensions = ExtensionSet::masks();
    let mut images = Destinations::new(output.join("images"));
    let mut masks = Destinations::new(output.join("masks"));
    let mut jobs = Vec::new();
    let mut members = Vec::new();

    for contributor in &config.contributors {
        let completed_dir = layout.collection_dir(contributor, Collection::Completed);
        let masks_dir = layout.collection_dir(contributor, Collection::Masks);
        if !completed_dir.is_dir() || !masks_dir.is_dir() {
            log::info!("{contributor}: nothing to merge, completed/ or masks/ is missing");
            continue;
        }

        let mut stats = MemberStats { images: 0, masks: 0 };
        for (file_name, path) in list_files(&completed_dir)? {
            if config.extensions.strip(&file_name).is_some() {
                jobs.push(CopyJob::new(path, images.claim(contributor, &file_name)?));
                stats.images += 1;
            }
        }
        for (file_name, path) in list_files(&masks_dir)? {
            if mask_extensions.strip(&file_name).is_some() {
                jobs.push(CopyJob::new(path, masks.claim(contributor, &file_name)?));
                stats.masks += 1;
            }
        }
        members.push((contributor.clone(), stats));
    }

    for dir in [&images.dir, &masks.dir] {
        fs::create_dir_all(dir).map_err(|e| LedgerError::file_system(dir, "directory creation", e))?;
    }
    copy_all(&jobs, "merging annotations")?;

    let stats = MergeStats {
        total_images: members.iter().map(|(_, s)| s.images).sum(),
        total_masks: members.iter().map(|(_, s)| s.masks).sum(),
        members: members.into_iter().collect(),
        merge_date: Local::now().into(),
    };
    persist::write_json(&output.join(MERGE_STATS_FILE), &stats)?;

    log::info!(
        "Merged {} image(s) and {} mask(s) into {}",
        stats.total_images,
        stats.total_masks,
        output.display()
    );
    Ok(stats)
}
