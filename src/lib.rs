pub mod config;
pub mod copy;
pub mod dataset;
pub mod distribute;
pub mod errors;
pub mod layout;
pub mod ledger;
pub mod mask;
pub mod merge;
pub mod persist;
pub mod report;
pub mod scanner;
pub mod traits;

pub mod mocks;

use std::path::PathBuf;

pub use config::{ExtensionSet, WorkspaceConfig};
pub use distribute::{Assignment, PoolOptions, SetupOptions};
pub use errors::{LedgerError, Result};
pub use layout::WorkspaceLayout;
pub use ledger::{
    compute_aggregate_progress, compute_contributor_progress, distribute_evenly,
    AggregateProgress, ContributorProgress, Inspection, Ledger,
};
pub use report::ProgressReport;
pub use scanner::FsCollectionScanner;
pub use traits::*;

#[cfg(test)]
pub use mocks::*;

/// Recomputes progress for every contributor of a workspace from disk.
pub fn check_progress(config: &WorkspaceConfig) -> Result<ProgressReport> {
    let layout = config.layout();
    layout.ensure_exists()?;

    let ledger = Ledger::new(FsCollectionScanner::new(layout), config.extensions.clone());
    Ok(ProgressReport::now(ledger.survey(&config.contributors)?))
}

/// Per-image state of one team member. Names outside the configured team are
/// rejected rather than read as an empty folder.
pub fn inspect_contributor(config: &WorkspaceConfig, contributor: &str) -> Result<Inspection> {
    if !config.contributors.iter().any(|c| c == contributor) {
        return Err(LedgerError::invalid_configuration(format!(
            "`{contributor}` is not part of the team ({})",
            config.contributors.join(", ")
        )));
    }

    let layout = config.layout();
    layout.ensure_exists()?;
    let ledger = Ledger::new(FsCollectionScanner::new(layout), config.extensions.clone());
    ledger.inspect(contributor)
}

/// Contributor list recorded by the last setup run, in team order.
pub fn contributors_from_assignment(workspace: impl Into<PathBuf>) -> Result<Vec<String>> {
    let layout = WorkspaceLayout::new(workspace);
    layout.ensure_exists()?;

    let path = layout.assignment_file();
    if !path.is_file() {
        return Err(LedgerError::invalid_configuration(format!(
            "no contributors given and no assignment file at {}",
            path.display()
        )));
    }
    Ok(Assignment::load(&path)?.contributors())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_check_progress_requires_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let config = WorkspaceConfig::new(
            temp_dir.path().join("missing"),
            vec!["alice".to_string()],
            ExtensionSet::images(),
        )
        .unwrap();

        let err = check_progress(&config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_contributors_from_assignment() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let layout = WorkspaceLayout::new(temp_dir.path());

        let err = contributors_from_assignment(temp_dir.path()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));

        fs::write(
            layout.assignment_file(),
            br#"{ "zoe": ["a.jpg"], "adam": [], "mia": ["b.png"] }"#,
        )?;
        assert_eq!(
            contributors_from_assignment(temp_dir.path())?,
            vec!["zoe", "adam", "mia"]
        );
        Ok(())
    }

    #[test]
    fn test_inspect_contributor_rejects_names_outside_team() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = WorkspaceConfig::new(
            temp_dir.path(),
            vec!["alice".to_string(), "bob".to_string()],
            ExtensionSet::images(),
        )?;
        config.layout().create(&config.contributors)?;

        for name in ["alcie", "../.."] {
            let err = inspect_contributor(&config, name).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));
            assert_eq!(err.exit_code(), 4);
        }

        fs::remove_dir_all(config.layout().collection_dir("bob", Collection::Assigned))?;
        let inspection = inspect_contributor(&config, "bob")?;
        assert!(inspection.assigned_missing);
        assert!(!inspection.masks_missing);
        Ok(())
    }
}
