//! Workspace setup: pick the candidate images, split them across the team,
//! copy each slice into the owner's `assigned/` folder and record who got what.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::{validate_contributors, ExtensionSet, WorkspaceConfig};
use crate::copy::{copy_all, CopyJob};
use crate::errors::{LedgerError, Result};
use crate::layout::WorkspaceLayout;
use crate::ledger::{distribute_evenly, Ledger};
use crate::persist;
use crate::report::ProgressReport;
use crate::scanner::{list_files, FsCollectionScanner};
use crate::traits::Collection;

/// How the candidate pool is gathered from the source folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolOptions {
    /// Descend into subfolders instead of listing only the top level.
    pub recursive: bool,
    /// Keep only files whose name starts with this prefix.
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolImage {
    pub file_name: String,
    pub path: PathBuf,
}

/// Gathers recognized images under `source`, sorted by file name.
///
/// Every image ends up in a single flat `assigned/` folder and is matched to
/// its mask by base name, so two candidates sharing a base name are rejected.
pub fn collect_pool(
    source: &Path,
    extensions: &ExtensionSet,
    options: &PoolOptions,
) -> Result<Vec<PoolImage>> {
    if !source.is_dir() {
        log::warn!("Source folder {} does not exist", source.display());
        return Err(LedgerError::NoImagesFound {
            path: source.to_path_buf(),
        });
    }

    let mut walker = WalkDir::new(source).min_depth(1).follow_links(true);
    if !options.recursive {
        walker = walker.max_depth(1);
    }

    let mut pool = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            LedgerError::file_system(source, "directory listing", std::io::Error::from(e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            log::warn!("Skipping non UTF-8 file name: {}", entry.path().display());
            continue;
        };
        if extensions.strip(&file_name).is_none() {
            continue;
        }
        if let Some(prefix) = &options.prefix {
            if !file_name.starts_with(prefix.as_str()) {
                continue;
            }
        }

        pool.push(PoolImage {
            file_name,
            path: entry.into_path(),
        });
    }

    pool.sort_by(|a, b| (&a.file_name, &a.path).cmp(&(&b.file_name, &b.path)));
    extensions.base_names(
        &source.display().to_string(),
        pool.iter().map(|image| image.file_name.as_str()),
    )?;

    log::info!("Found {} candidate image(s) in {}", pool.len(), source.display());
    Ok(pool)
}

/// Contributor to the file names assigned to them, extensions included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(pub IndexMap<String, Vec<String>>);

impl Assignment {
    pub fn contributors(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn images_for(&self, contributor: &str) -> Option<&[String]> {
        self.0.get(contributor).map(Vec::as_slice)
    }

    pub fn total_images(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Overwrites the assignment file wholesale.
    pub fn write(&self, path: &Path) -> Result<()> {
        persist::write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        persist::read_json(path)
    }
}

/// Splits `pool` across the team and copies each slice into the owner's
/// `assigned/` folder. The layout must already exist.
pub fn distribute_images(config: &WorkspaceConfig, pool: &[PoolImage]) -> Result<Assignment> {
    let layout = config.layout();
    let slices = distribute_evenly(pool, &config.contributors)?;

    let mut jobs = Vec::with_capacity(pool.len());
    let mut entries = IndexMap::with_capacity(slices.len());
    for (contributor, images) in slices {
        let assigned_dir = layout.collection_dir(&contributor, Collection::Assigned);
        jobs.extend(
            images
                .iter()
                .map(|image| CopyJob::new(&image.path, assigned_dir.join(&image.file_name))),
        );

        log::info!("{contributor}: {} image(s) assigned", images.len());
        entries.insert(
            contributor,
            images.into_iter().map(|image| image.file_name).collect(),
        );
    }

    copy_all(&jobs, "distributing images")?;
    Ok(Assignment(entries))
}

pub fn instructions(contributor: &str) -> String {
    format!(
        "# Foot segmentation annotation: {contributor}

## Workflow
1. Open the images in `assigned/` with your painting tool.
2. Paint every foot and every piece of footwear.
3. Save the mask into `masks/` as `<image name without extension>.png`.
4. Move finished source images into `completed/`.

## Include
- Bare feet, socks and any footwear (shoes, sandals, boots, flip-flops)
- Partially visible or occluded feet
- All feet in the image, in a single mask

## Exclude
- Legs above the ankle
- Shadows and reflections
- Floor, rugs and other background objects

## Mask format
- Single 8-bit channel PNG with the same width and height as the image
- 0 = background, 255 = foot or footwear, no other values

Masks are matched to images by name only: `img_001.jpg` is done once
`masks/img_001.png` exists.
"
    )
}

pub fn write_instructions(layout: &WorkspaceLayout, contributors: &[String]) -> Result<()> {
    for contributor in contributors {
        let path = layout.instructions_file(contributor);
        fs::write(&path, instructions(contributor))
            .map_err(|e| LedgerError::file_system(&path, "instructions write", e))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupOptions {
    pub pool: PoolOptions,
    /// Clear `assigned/` folders left by an earlier setup instead of refusing.
    pub replace_existing: bool,
}

#[derive(Debug, Clone)]
pub struct SetupSummary {
    pub assignment: Assignment,
    pub report: ProgressReport,
}

/// Files already sitting in `assigned/` folders, for the given team and for
/// anyone named in an existing assignment file.
fn leftover_assignments(
    layout: &WorkspaceLayout,
    contributors: &[String],
) -> Result<Vec<(String, Vec<PathBuf>)>> {
    let mut owners = contributors.to_vec();
    let assignment_file = layout.assignment_file();
    if assignment_file.is_file() {
        for previous in Assignment::load(&assignment_file)?.contributors() {
            if !owners.contains(&previous)
                && validate_contributors(std::slice::from_ref(&previous)).is_ok()
            {
                owners.push(previous);
            }
        }
    }

    let mut leftovers = Vec::new();
    for owner in owners {
        let files = match list_files(&layout.collection_dir(&owner, Collection::Assigned)) {
            Ok(files) => files,
            Err(LedgerError::MissingDirectory { .. }) => continue,
            Err(e) => return Err(e),
        };
        if !files.is_empty() {
            leftovers.push((owner, files.into_iter().map(|(_, path)| path).collect()));
        }
    }
    Ok(leftovers)
}

fn clear_leftovers(leftovers: Vec<(String, Vec<PathBuf>)>) -> Result<()> {
    for (owner, files) in leftovers {
        for path in &files {
            fs::remove_file(path).map_err(|e| LedgerError::file_system(path, "file removal", e))?;
        }
        log::info!("{owner}: cleared {} previously assigned file(s)", files.len());
    }
    Ok(())
}

/// Prepares a workspace from the images in `source`: layout, assignment,
/// instructions and an initial progress snapshot.
///
/// Every pool image lands in exactly one `assigned/` folder, so a workspace
/// that still holds assigned files is refused unless `replace_existing` is set.
pub fn setup_workspace(
    config: &WorkspaceConfig,
    source: &Path,
    options: &SetupOptions,
) -> Result<SetupSummary> {
    let pool = collect_pool(source, &config.extensions, &options.pool)?;
    if pool.is_empty() {
        return Err(LedgerError::NoImagesFound {
            path: source.to_path_buf(),
        });
    }

    let layout = config.layout();
    let leftovers = leftover_assignments(&layout, &config.contributors)?;
    if !leftovers.is_empty() {
        if !options.replace_existing {
            let owners: Vec<&str> = leftovers.iter().map(|(owner, _)| owner.as_str()).collect();
            return Err(LedgerError::invalid_configuration(format!(
                "assigned folders of {} already hold images; use --force to replace them",
                owners.join(", ")
            )));
        }
        clear_leftovers(leftovers)?;
    }
    layout.create(&config.contributors)?;

    let assignment = distribute_images(config, &pool)?;
    assignment.write(&layout.assignment_file())?;
    write_instructions(&layout, &config.contributors)?;

    let ledger = Ledger::new(
        FsCollectionScanner::new(layout.clone()),
        config.extensions.clone(),
    );
    let report = ProgressReport::now(ledger.survey(&config.contributors)?);
    report.write(&layout.progress_file())?;

    Ok(SetupSummary { assignment, report })
}
