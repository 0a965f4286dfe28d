use std::fs;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::errors::{LedgerError, Result};

/// A single file copy from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl CopyJob {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

pub(crate) fn progress_bar(len: usize, message: &str) -> ProgressBar {
    let progress_bar = ProgressBar::new(len as u64);
    progress_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    progress_bar.set_message(message.to_string());
    progress_bar
}

/// Copies every job in parallel. Destination folders must already exist, and
/// destinations must be distinct since jobs run concurrently.
pub fn copy_all(jobs: &[CopyJob], message: &str) -> Result<()> {
    if jobs.is_empty() {
        return Ok(());
    }

    let progress_bar = progress_bar(jobs.len(), message);
    jobs.par_iter().try_for_each(|job| -> Result<()> {
        fs::copy(&job.source, &job.destination)
            .map_err(|e| LedgerError::file_system(&job.source, "file copy", e))?;
        progress_bar.inc(1);
        Ok(())
    })?;
    progress_bar.finish_and_clear();

    log::info!("{message}: copied {} file(s)", jobs.len());
    Ok(())
}
