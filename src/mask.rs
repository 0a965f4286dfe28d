//! The binary mask contract: one 8-bit channel, 0 for background and 255 for
//! foot or footwear. Training reads masks through a threshold at 127, which
//! [`binarize`] reproduces when repairing masks.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{ExtensionSet, WorkspaceConfig};
use crate::errors::{LedgerError, Result};
use crate::persist;
use crate::scanner::list_files;
use crate::traits::Collection;

pub const BACKGROUND: u8 = 0;
pub const FOREGROUND: u8 = 255;
pub const THRESHOLD: u8 = 127;
pub const MASK_REPORT_FILE: &str = "mask_report.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum MaskVerdict {
    Binary,
    /// Single channel, but some pixels are neither 0 nor 255.
    NonBinary { intermediate_pixels: u64 },
    WrongChannels { color_type: String },
    Unreadable { reason: String },
}

impl MaskVerdict {
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Binary)
    }

    pub const fn is_fixable(&self) -> bool {
        matches!(self, Self::NonBinary { .. } | Self::WrongChannels { .. })
    }
}

pub fn classify(image: &DynamicImage) -> MaskVerdict {
    let DynamicImage::ImageLuma8(gray) = image else {
        return MaskVerdict::WrongChannels {
            color_type: format!("{:?}", image.color()),
        };
    };

    let intermediate_pixels = gray
        .pixels()
        .filter(|Luma([value])| *value != BACKGROUND && *value != FOREGROUND)
        .count() as u64;

    if intermediate_pixels == 0 {
        MaskVerdict::Binary
    } else {
        MaskVerdict::NonBinary {
            intermediate_pixels,
        }
    }
}

/// Converts to one 8-bit channel and maps values above 127 to 255, the rest to 0.
pub fn binarize(image: &DynamicImage) -> GrayImage {
    let mut mask = image.to_luma8();
    for Luma([value]) in mask.pixels_mut() {
        *value = if *value > THRESHOLD {
            FOREGROUND
        } else {
            BACKGROUND
        };
    }
    mask
}

/// Encodes `mask` as PNG and replaces `path` atomically.
pub fn save_mask(mask: &GrayImage, path: &Path) -> Result<()> {
    let mut encoded = Cursor::new(Vec::new());
    mask.write_to(&mut encoded, ImageFormat::Png)
        .map_err(|e| LedgerError::ImageProcessing {
            path: path.to_path_buf(),
            operation: "mask encoding".to_string(),
            source: e,
        })?;
    persist::write_atomic(path, encoded.get_ref())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskEntry {
    pub contributor: String,
    pub file_name: String,
    #[serde(flatten)]
    pub verdict: MaskVerdict,
    pub fixed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaskQualityReport {
    pub checked: usize,
    pub binary: usize,
    pub fixed: usize,
    /// Masks that broke the contract, in contributor then file order.
    pub flagged: Vec<MaskEntry>,
    pub generated_at: DateTime<FixedOffset>,
}

fn check_one(contributor: &str, file_name: String, path: &Path, fix: bool) -> Result<MaskEntry> {
    let (verdict, image) = match image::open(path) {
        Ok(image) => (classify(&image), Some(image)),
        Err(e) => (
            MaskVerdict::Unreadable {
                reason: e.to_string(),
            },
            None,
        ),
    };

    let mut fixed = false;
    if fix && verdict.is_fixable() {
        if let Some(image) = image {
            save_mask(&binarize(&image), path)?;
            log::info!("{contributor}: rewrote {file_name} as a binary mask");
            fixed = true;
        }
    }

    Ok(MaskEntry {
        contributor: contributor.to_string(),
        file_name,
        verdict,
        fixed,
    })
}

/// Checks every mask of every contributor against the binary contract and
/// writes the result to `quality_check/mask_report.json`. With `fix`, masks
/// that decode but break the contract are rewritten in place.
pub fn check_masks(config: &WorkspaceConfig, fix: bool) -> Result<MaskQualityReport> {
    let layout = config.layout();
    layout.ensure_exists()?;

    let mask_extensions = ExtensionSet::masks();
    let mut targets: Vec<(&str, String, PathBuf)> = Vec::new();
    for contributor in &config.contributors {
        let dir = layout.collection_dir(contributor, Collection::Masks);
        let files = match list_files(&dir) {
            Ok(files) => files,
            Err(LedgerError::MissingDirectory { path }) => {
                log::warn!("{contributor}: no masks folder at {}", path.display());
                continue;
            }
            Err(e) => return Err(e),
        };
        targets.extend(
            files
                .into_iter()
                .filter(|(name, _)| mask_extensions.strip(name).is_some())
                .map(|(name, path)| (contributor.as_str(), name, path)),
        );
    }

    let entries = targets
        .into_par_iter()
        .map(|(contributor, file_name, path)| check_one(contributor, file_name, &path, fix))
        .collect::<Result<Vec<_>>>()?;

    let checked = entries.len();
    let binary = entries.iter().filter(|e| e.verdict.is_binary()).count();
    let fixed = entries.iter().filter(|e| e.fixed).count();
    let report = MaskQualityReport {
        checked,
        binary,
        fixed,
        flagged: entries
            .into_iter()
            .filter(|e| !e.verdict.is_binary())
            .collect(),
        generated_at: Local::now().into(),
    };

    let report_path = layout.quality_check_dir().join(MASK_REPORT_FILE);
    persist::write_json(&report_path, &report)?;
    log::info!(
        "Checked {checked} mask(s): {binary} binary, {} flagged, {fixed} fixed",
        report.flagged.len()
    );
    Ok(report)
}
