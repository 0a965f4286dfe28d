use std::collections::{BTreeSet, HashMap};

use crate::config::ExtensionSet;
use crate::errors::{LedgerError, Result};
use crate::traits::{Collection, CollectionScanner};

/// In-memory stand-in for the workspace directories, used in tests.
///
/// A collection that was never added behaves like a missing directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScanner {
    collections: HashMap<(String, Collection), Vec<String>>,
}

impl InMemoryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the file names present in one collection of `contributor`.
    pub fn with_files<I, S>(mut self, contributor: &str, collection: Collection, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections.insert(
            (contributor.to_string(), collection),
            files.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl CollectionScanner for InMemoryScanner {
    fn base_names(
        &self,
        contributor: &str,
        collection: Collection,
        extensions: &ExtensionSet,
    ) -> Result<BTreeSet<String>> {
        let location = format!("{contributor}/{collection}");
        let files = self
            .collections
            .get(&(contributor.to_string(), collection))
            .ok_or_else(|| LedgerError::MissingDirectory {
                path: location.clone().into(),
            })?;
        extensions.base_names(&location, files)
    }
}
