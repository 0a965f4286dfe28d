//! Train/validation split of merged image/mask pairs.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::{ExtensionSet, MASK_EXTENSION};
use crate::copy::{copy_all, CopyJob};
use crate::errors::{LedgerError, Result};
use crate::persist;
use crate::scanner::{list_file_names, list_files};

pub const SPLIT_INFO_FILE: &str = "split_info.json";
pub const SPLITS: [&str; 2] = ["train", "val"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitOptions {
    /// Share of pairs that go to the training split, strictly between 0 and 1.
    pub train_split: f64,
    pub seed: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            train_split: 0.8,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitInfo {
    pub train_images: usize,
    pub val_images: usize,
    pub total_images: usize,
    pub train_split: f64,
}

/// Number of training items for `total` pairs, rounding down.
pub fn train_count(total: usize, train_split: f64) -> usize {
    ((train_split * total as f64).floor() as usize).min(total)
}

/// Copies every image of `{source}/images` that has a `{base}.png` in
/// `{source}/masks` into `{target}/{train,val}/{images,masks}` and records the
/// split in `split_info.json`. The shuffle is seeded, so equal inputs give
/// equal splits.
pub fn prepare_dataset(
    source: &Path,
    target: &Path,
    extensions: &ExtensionSet,
    options: &SplitOptions,
) -> Result<SplitInfo> {
    if !(options.train_split > 0.0 && options.train_split < 1.0) {
        return Err(LedgerError::invalid_configuration(format!(
            "train split must be between 0 and 1, got {}",
            options.train_split
        )));
    }

    let images_dir = source.join("images");
    let masks_dir = source.join("masks");
    let images = list_files(&images_dir)?;
    extensions.base_names(
        &images_dir.display().to_string(),
        images.iter().map(|(name, _)| name.as_str()),
    )?;
    let masks: BTreeSet<String> = list_file_names(&masks_dir)?.into_iter().collect();

    let mut pairs: Vec<(String, String)> = images
        .into_iter()
        .filter_map(|(file_name, _)| {
            let mask_name = format!("{}.{MASK_EXTENSION}", extensions.strip(&file_name)?);
            masks.contains(&mask_name).then_some((file_name, mask_name))
        })
        .collect();
    log::info!("Found {} valid image/mask pair(s)", pairs.len());

    if pairs.is_empty() {
        return Err(LedgerError::NoImagesFound {
            path: source.to_path_buf(),
        });
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    pairs.shuffle(&mut rng);
    let (train, val) = pairs.split_at(train_count(pairs.len(), options.train_split));

    let mut jobs = Vec::with_capacity(pairs.len() * 2);
    for (split, items) in SPLITS.into_iter().zip([train, val]) {
        let split_images = target.join(split).join("images");
        let split_masks = target.join(split).join("masks");
        for dir in [&split_images, &split_masks] {
            fs::create_dir_all(dir)
                .map_err(|e| LedgerError::file_system(dir, "directory creation", e))?;
        }

        for (image, mask) in items {
            jobs.push(CopyJob::new(images_dir.join(image), split_images.join(image)));
            jobs.push(CopyJob::new(masks_dir.join(mask), split_masks.join(mask)));
        }
    }
    copy_all(&jobs, "preparing dataset")?;

    let info = SplitInfo {
        train_images: train.len(),
        val_images: val.len(),
        total_images: pairs.len(),
        train_split: options.train_split,
    };
    persist::write_json(&target.join(SPLIT_INFO_FILE), &info)?;
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source_with_pairs(root: &Path, paired: usize, unpaired: usize) -> Result<()> {
        let images = root.join("images");
        let masks = root.join("masks");
        fs::create_dir_all(&images)?;
        fs::create_dir_all(&masks)?;
        for i in 0..paired {
            fs::write(images.join(format!("img_{i:03}.jpg")), b"image")?;
            fs::write(masks.join(format!("img_{i:03}.png")), b"mask")?;
        }
        for i in 0..unpaired {
            fs::write(images.join(format!("lonely_{i}.jpg")), b"image")?;
        }
        Ok(())
    }

    #[test]
    fn test_train_count_rounds_down() {
        assert_eq!(train_count(10, 0.8), 8);
        assert_eq!(train_count(7, 0.8), 5);
        assert_eq!(train_count(1, 0.5), 0);
    }

    #[test]
    fn test_prepare_dataset_splits_pairs_only() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("merged");
        let target = temp_dir.path().join("data");
        source_with_pairs(&source, 10, 3)?;

        let info = prepare_dataset(&source, &target, &ExtensionSet::images(), &SplitOptions::default())?;
        assert_eq!(
            info,
            SplitInfo {
                train_images: 8,
                val_images: 2,
                total_images: 10,
                train_split: 0.8
            }
        );

        let train_images = list_file_names(&target.join("train").join("images"))?;
        let val_masks = list_file_names(&target.join("val").join("masks"))?;
        assert_eq!(train_images.len(), 8);
        assert_eq!(val_masks.len(), 2);
        assert!(train_images.iter().all(|name| !name.starts_with("lonely_")));

        let stored: SplitInfo = persist::read_json(&target.join(SPLIT_INFO_FILE))?;
        assert_eq!(stored, info);
        Ok(())
    }

    #[test]
    fn test_prepare_dataset_is_reproducible() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("merged");
        source_with_pairs(&source, 12, 0)?;

        let options = SplitOptions::default();
        let first = temp_dir.path().join("first");
        let second = temp_dir.path().join("second");
        prepare_dataset(&source, &first, &ExtensionSet::images(), &options)?;
        prepare_dataset(&source, &second, &ExtensionSet::images(), &options)?;

        assert_eq!(
            list_file_names(&first.join("val").join("images"))?,
            list_file_names(&second.join("val").join("images"))?
        );
        Ok(())
    }

    #[test]
    fn test_prepare_dataset_rejects_bad_input() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("merged");
        source_with_pairs(&source, 0, 2)?;
        let target = temp_dir.path().join("data");

        let err = prepare_dataset(&source, &target, &ExtensionSet::images(), &SplitOptions::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NoImagesFound { .. }));

        let options = SplitOptions {
            train_split: 1.0,
            seed: 42,
        };
        let err = prepare_dataset(&source, &target, &ExtensionSet::images(), &options).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));
        Ok(())
    }
}
