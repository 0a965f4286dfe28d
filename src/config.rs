use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::errors::{LedgerError, Result};
use crate::layout::{WorkspaceLayout, FINAL_MASKS_DIR, QUALITY_CHECK_DIR};

/// Extension every mask file carries.
pub const MASK_EXTENSION: &str = "png";

/// Source image extensions recognized when no allow-list is given.
pub const DEFAULT_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Splits a file name into base name and extension.
///
/// Leading dots belong to the base name, so `.hidden` has no extension and
/// `archive.tar.png` splits into `archive.tar` and `png`.
pub fn split_extension(file_name: &str) -> Option<(&str, &str)> {
    let leading = file_name.len() - file_name.trim_start_matches('.').len();
    let dot = file_name[leading..].rfind('.')? + leading;
    Some((&file_name[..dot], &file_name[dot + 1..]))
}

/// A set of recognized file extensions, stored without the leading dot.
///
/// Matching is case-sensitive: `photo.JPG` is not recognized by an allow-list
/// containing `jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: Vec<String>,
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::images()
    }
}

impl ExtensionSet {
    pub fn new<I, S>(extensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique = Vec::new();
        for extension in extensions {
            let extension = extension.as_ref().trim();
            if extension.is_empty() {
                return Err(LedgerError::invalid_configuration(
                    "extension list contains an empty entry",
                ));
            }
            if extension.starts_with('.') {
                return Err(LedgerError::invalid_configuration(format!(
                    "extension `{extension}` must be given without a leading dot"
                )));
            }
            if !unique.iter().any(|e: &String| e == extension) {
                unique.push(extension.to_string());
            }
        }

        if unique.is_empty() {
            return Err(LedgerError::invalid_configuration(
                "at least one image extension is required",
            ));
        }

        Ok(Self { extensions: unique })
    }

    pub fn images() -> Self {
        Self {
            extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn masks() -> Self {
        Self {
            extensions: vec![MASK_EXTENSION.to_string()],
        }
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.extensions
    }

    /// Returns the base name of `file_name` if its extension is recognized.
    pub fn strip<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        split_extension(file_name)
            .filter(|(_, extension)| self.contains(extension))
            .map(|(base, _)| base)
    }

    /// Reduces a listing of file names to the base names of recognized files.
    ///
    /// Two recognized files sharing a base name (`a.jpg` and `a.png`) would make
    /// one mask stand for two images, so that is reported as a collision for
    /// `location` instead of letting one file shadow the other.
    pub fn base_names<I, S>(&self, location: &str, file_names: I) -> Result<BTreeSet<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut by_base: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for file_name in file_names {
            let file_name = file_name.as_ref();
            if let Some(base) = self.strip(file_name) {
                by_base
                    .entry(base.to_string())
                    .or_default()
                    .push(file_name.to_string());
            }
        }

        let mut names = BTreeSet::new();
        for (base_name, mut file_names) in by_base {
            if file_names.len() > 1 {
                file_names.sort();
                return Err(LedgerError::FilenameCollision {
                    location: location.to_string(),
                    base_name,
                    file_names,
                });
            }
            names.insert(base_name);
        }
        Ok(names)
    }
}

/// Everything an operation needs to know about a workspace.
///
/// Built once from the command line and handed to every operation; nothing in
/// the library falls back to process-wide defaults.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    pub contributors: Vec<String>,
    pub extensions: ExtensionSet,
}

impl WorkspaceConfig {
    pub fn new(
        root: impl Into<PathBuf>,
        contributors: Vec<String>,
        extensions: ExtensionSet,
    ) -> Result<Self> {
        validate_contributors(&contributors)?;
        Ok(Self {
            root: root.into(),
            contributors,
            extensions,
        })
    }

    pub fn layout(&self) -> WorkspaceLayout {
        WorkspaceLayout::new(&self.root)
    }
}

/// Checks that contributor slugs can safely name a subtree of the workspace.
pub fn validate_contributors(contributors: &[String]) -> Result<()> {
    if contributors.is_empty() {
        return Err(LedgerError::invalid_configuration(
            "at least one contributor is required",
        ));
    }

    let mut seen = BTreeSet::new();
    for contributor in contributors {
        if contributor.is_empty() {
            return Err(LedgerError::invalid_configuration(
                "contributor names must not be empty",
            ));
        }
        if contributor == "." || contributor == ".." || contributor.contains(['/', '\\']) {
            return Err(LedgerError::invalid_configuration(format!(
                "contributor `{contributor}` is not a valid folder name"
            )));
        }
        if contributor == FINAL_MASKS_DIR || contributor == QUALITY_CHECK_DIR {
            return Err(LedgerError::invalid_configuration(format!(
                "contributor `{contributor}` clashes with a reserved workspace folder"
            )));
        }
        if !seen.insert(contributor.as_str()) {
            return Err(LedgerError::invalid_configuration(format!(
                "contributor `{contributor}` is listed more than once"
            )));
        }
    }
    Ok(())
}
