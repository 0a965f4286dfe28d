use std::collections::BTreeSet;
use std::fmt;

use crate::config::ExtensionSet;
use crate::errors::Result;

/// One of the per-contributor folders of the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// Source images handed to the contributor.
    Assigned,
    /// Source images the contributor has moved aside after painting.
    Completed,
    /// Masks produced by the contributor, one `{base}.png` per image.
    Masks,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Self::Assigned, Self::Completed, Self::Masks];

    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Masks => "masks",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Lists the contents of a logical collection as base names.
///
/// The filesystem is the data store of the workflow; this seam keeps the
/// reconciliation logic independent of real directories so it can run against
/// an in-memory fake.
pub trait CollectionScanner {
    /// Base names (extension stripped) of the files in `collection` whose
    /// extension is in `extensions`.
    ///
    /// Fails with `MissingDirectory` when the collection does not exist and
    /// with `FilenameCollision` when two recognized files share a base name.
    fn base_names(
        &self,
        contributor: &str,
        collection: Collection,
        extensions: &ExtensionSet,
    ) -> Result<BTreeSet<String>>;
}

impl<S: CollectionScanner + ?Sized> CollectionScanner for &S {
    fn base_names(
        &self,
        contributor: &str,
        collection: Collection,
        extensions: &ExtensionSet,
    ) -> Result<BTreeSet<String>> {
        (**self).base_names(contributor, collection, extensions)
    }
}
