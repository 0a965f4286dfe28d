//! Completion bookkeeping over assigned images and produced masks.
//!
//! Progress is never stored as ground truth: every call recomputes it from the
//! collections a [`CollectionScanner`] reports. The functions here are pure;
//! [`Ledger`] only adds the scanning around them.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::{ExtensionSet, MASK_EXTENSION};
use crate::errors::{LedgerError, Result};
use crate::traits::{Collection, CollectionScanner};

/// Completion state of one contributor. `completed + remaining == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContributorProgress {
    pub completed: usize,
    pub remaining: usize,
    pub total: usize,
}

impl ContributorProgress {
    /// Progress from base names on both sides: an assigned image is done when
    /// its base name is among the mask base names.
    pub fn from_base_names(assigned: &BTreeSet<String>, mask_bases: &BTreeSet<String>) -> Self {
        Self::from_counts(assigned.intersection(mask_bases).count(), assigned.len())
    }

    const fn from_counts(completed: usize, total: usize) -> Self {
        Self {
            completed,
            remaining: total - completed,
            total,
        }
    }

    pub fn percent(&self) -> f64 {
        percentage(self.completed, self.total)
    }

    pub const fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Totals across all contributors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateProgress {
    pub total_assigned: usize,
    pub total_completed: usize,
    pub pct: f64,
}

impl AggregateProgress {
    pub const fn total_remaining(&self) -> usize {
        self.total_assigned - self.total_completed
    }

    pub const fn is_complete(&self) -> bool {
        self.total_assigned > 0 && self.total_completed == self.total_assigned
    }
}

/// Counts the assigned base names that have a `{base}.png` among `mask_files`.
///
/// Matching is an exact string comparison. Masks without an assigned image
/// never inflate the count.
pub fn compute_contributor_progress(
    assigned: &BTreeSet<String>,
    mask_files: &BTreeSet<String>,
) -> ContributorProgress {
    let completed = assigned
        .iter()
        .filter(|base| mask_files.contains(&format!("{base}.{MASK_EXTENSION}")))
        .count();
    ContributorProgress::from_counts(completed, assigned.len())
}

/// Sums per-contributor progress. `pct` is 0 when nothing is assigned.
pub fn compute_aggregate_progress<'a, I>(per_contributor: I) -> AggregateProgress
where
    I: IntoIterator<Item = &'a ContributorProgress>,
{
    let (total_completed, total_assigned) = per_contributor
        .into_iter()
        .fold((0, 0), |(completed, total), progress| {
            (completed + progress.completed, total + progress.total)
        });

    AggregateProgress {
        total_assigned,
        total_completed,
        pct: percentage(total_completed, total_assigned),
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// Splits `pool` into one contiguous slice per contributor, in order.
///
/// Every contributor but the last receives `pool.len() / contributors.len()`
/// items and the last one takes whatever is left, so the remainder lands on a
/// single contributor. Concatenating the slices gives back `pool` exactly.
pub fn distribute_evenly<T: Clone>(
    pool: &[T],
    contributors: &[String],
) -> Result<Vec<(String, Vec<T>)>> {
    if contributors.is_empty() {
        return Err(LedgerError::invalid_configuration(
            "cannot distribute images among zero contributors",
        ));
    }

    let mut seen = BTreeSet::new();
    if let Some(duplicate) = contributors.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(LedgerError::invalid_configuration(format!(
            "contributor `{duplicate}` is listed more than once"
        )));
    }

    let per_contributor = pool.len() / contributors.len();
    let last = contributors.len() - 1;

    Ok(contributors
        .iter()
        .enumerate()
        .map(|(i, contributor)| {
            let start = i * per_contributor;
            let end = if i < last {
                start + per_contributor
            } else {
                pool.len()
            };
            (contributor.clone(), pool[start..end].to_vec())
        })
        .collect())
}

/// Per-image view of one contributor's collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Assigned base names with a mask.
    pub matched: Vec<String>,
    /// Assigned base names still waiting for a mask.
    pub missing: Vec<String>,
    /// Mask base names with no assigned image.
    pub orphaned: Vec<String>,
}

impl Reconciliation {
    pub fn progress(&self) -> ContributorProgress {
        ContributorProgress::from_counts(
            self.matched.len(),
            self.matched.len() + self.missing.len(),
        )
    }
}

pub fn reconcile(assigned: &BTreeSet<String>, mask_bases: &BTreeSet<String>) -> Reconciliation {
    let (matched, missing) = assigned
        .iter()
        .cloned()
        .partition(|base| mask_bases.contains(base));

    Reconciliation {
        matched,
        missing,
        orphaned: mask_bases.difference(assigned).cloned().collect(),
    }
}

/// Progress of one contributor together with which folders were absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorStatus {
    pub contributor: String,
    pub progress: ContributorProgress,
    pub assigned_missing: bool,
    pub masks_missing: bool,
    /// Why the contributor's folders could not be reconciled, in which case
    /// `progress` is zero.
    pub problem: Option<String>,
}

/// [`Reconciliation`] of one contributor plus which folders were absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub reconciliation: Reconciliation,
    pub assigned_missing: bool,
    pub masks_missing: bool,
}

/// Runs the pure computations above over collections read by a scanner.
pub struct Ledger<S: CollectionScanner> {
    scanner: S,
    extensions: ExtensionSet,
    mask_extensions: ExtensionSet,
}

impl<S: CollectionScanner> Ledger<S> {
    pub fn new(scanner: S, extensions: ExtensionSet) -> Self {
        Self {
            scanner,
            extensions,
            mask_extensions: ExtensionSet::masks(),
        }
    }

    /// Recomputes the status of every contributor, in the given order.
    ///
    /// A filename collision is recorded on the affected contributor so the
    /// rest of the team is still reported.
    pub fn survey(&self, contributors: &[String]) -> Result<Vec<ContributorStatus>> {
        contributors
            .iter()
            .map(|contributor| match self.contributor_status(contributor) {
                Err(err @ LedgerError::FilenameCollision { .. }) => {
                    log::warn!("{contributor}: {err}");
                    Ok(ContributorStatus {
                        contributor: contributor.clone(),
                        progress: ContributorProgress::default(),
                        assigned_missing: false,
                        masks_missing: false,
                        problem: Some(err.to_string()),
                    })
                }
                other => other,
            })
            .collect()
    }

    pub fn contributor_status(&self, contributor: &str) -> Result<ContributorStatus> {
        let (assigned, assigned_missing) = self.scan(contributor, Collection::Assigned)?;
        let (masks, masks_missing) = self.scan(contributor, Collection::Masks)?;

        Ok(ContributorStatus {
            contributor: contributor.to_string(),
            progress: ContributorProgress::from_base_names(&assigned, &masks),
            assigned_missing,
            masks_missing,
            problem: None,
        })
    }

    pub fn inspect(&self, contributor: &str) -> Result<Inspection> {
        let (assigned, assigned_missing) = self.scan(contributor, Collection::Assigned)?;
        let (masks, masks_missing) = self.scan(contributor, Collection::Masks)?;
        Ok(Inspection {
            reconciliation: reconcile(&assigned, &masks),
            assigned_missing,
            masks_missing,
        })
    }

    /// A missing directory reads as an empty collection; the flag records it.
    fn scan(&self, contributor: &str, collection: Collection) -> Result<(BTreeSet<String>, bool)> {
        let extensions = match collection {
            Collection::Masks => &self.mask_extensions,
            Collection::Assigned | Collection::Completed => &self.extensions,
        };

        match self.scanner.base_names(contributor, collection, extensions) {
            Ok(names) => Ok((names, false)),
            Err(LedgerError::MissingDirectory { path }) => {
                log::warn!("{contributor}: no {collection} folder at {}", path.display());
                Ok((BTreeSet::new(), true))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::InMemoryScanner;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_orphan_mask_does_not_count() {
        let progress = compute_contributor_progress(
            &set(&["a", "b", "c"]),
            &set(&["a.png", "c.png", "d.png"]),
        );

        assert_eq!(
            progress,
            ContributorProgress {
                completed: 2,
                remaining: 1,
                total: 3
            }
        );
    }

    #[test]
    fn test_mask_match_is_exact() {
        let progress = compute_contributor_progress(
            &set(&["a", "B", "c d"]),
            &set(&["A.png", "b.png", "c d.png", "a.jpg", "a.PNG"]),
        );
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.remaining, 2);
    }

    #[test]
    fn test_progress_is_idempotent() {
        let assigned = set(&["x", "y"]);
        let masks = set(&["y.png"]);
        assert_eq!(
            compute_contributor_progress(&assigned, &masks),
            compute_contributor_progress(&assigned, &masks)
        );
    }

    #[test]
    fn test_progress_counts_hold_across_inputs() {
        let pool = ["a", "b", "c", "d", "e"];
        for assigned_len in 0..=pool.len() {
            for mask_len in 0..=pool.len() {
                let assigned = set(&pool[..assigned_len]);
                let mask_files: BTreeSet<String> = pool[pool.len() - mask_len..]
                    .iter()
                    .map(|base| format!("{base}.png"))
                    .collect();

                let progress = compute_contributor_progress(&assigned, &mask_files);
                let expected = assigned_len.saturating_sub(pool.len() - mask_len);

                assert_eq!(progress.completed, expected);
                assert_eq!(progress.completed + progress.remaining, progress.total);
                assert_eq!(progress.total, assigned_len);
            }
        }
    }

    #[test]
    fn test_base_name_progress_agrees_with_file_progress() {
        let assigned = set(&["a", "b", "c"]);
        let from_files = compute_contributor_progress(&assigned, &set(&["a.png", "d.png"]));
        let from_bases = ContributorProgress::from_base_names(&assigned, &set(&["a", "d"]));
        assert_eq!(from_files, from_bases);
    }

    #[test]
    fn test_aggregate_progress() {
        let per_contributor = [
            ContributorProgress::from_counts(2, 3),
            ContributorProgress::from_counts(5, 5),
        ];

        let aggregate = compute_aggregate_progress(&per_contributor);
        assert_eq!(aggregate.total_completed, 7);
        assert_eq!(aggregate.total_assigned, 8);
        assert!((aggregate.pct - 87.5).abs() < f64::EPSILON);
        assert_eq!(aggregate.total_remaining(), 1);
        assert!(!aggregate.is_complete());
    }

    #[test]
    fn test_aggregate_of_nothing_is_zero() {
        let aggregate = compute_aggregate_progress(&[ContributorProgress::default()]);
        assert_eq!(aggregate.total_assigned, 0);
        assert_eq!(aggregate.pct, 0.0);
        assert!(!aggregate.is_complete());

        let empty: [ContributorProgress; 0] = [];
        assert_eq!(compute_aggregate_progress(&empty).pct, 0.0);
    }

    #[test]
    fn test_distribute_remainder_goes_to_last() -> Result<()> {
        let pool: Vec<u32> = (0..10).collect();
        let slices = distribute_evenly(&pool, &names(&["a", "b", "c"]))?;

        let sizes: Vec<usize> = slices.iter().map(|(_, items)| items.len()).collect();
        assert_eq!(sizes, vec![3, 3, 4]);
        assert_eq!(slices[0], ("a".to_string(), vec![0, 1, 2]));
        assert_eq!(slices[2], ("c".to_string(), vec![6, 7, 8, 9]));
        Ok(())
    }

    #[test]
    fn test_distribute_partitions_pool() -> Result<()> {
        for pool_len in 0..25 {
            let pool: Vec<usize> = (0..pool_len).collect();
            for team_size in 1..7 {
                let contributors: Vec<String> =
                    (0..team_size).map(|i| format!("member{i}")).collect();
                let slices = distribute_evenly(&pool, &contributors)?;

                let order: Vec<&String> = slices.iter().map(|(name, _)| name).collect();
                assert_eq!(order, contributors.iter().collect::<Vec<_>>());

                let joined: Vec<usize> = slices.into_iter().flat_map(|(_, items)| items).collect();
                assert_eq!(joined, pool);
            }
        }
        Ok(())
    }

    #[test]
    fn test_distribute_small_pool_lands_on_last() -> Result<()> {
        let slices = distribute_evenly(&["x", "y"], &names(&["a", "b", "c"]))?;
        assert!(slices[0].1.is_empty());
        assert!(slices[1].1.is_empty());
        assert_eq!(slices[2].1, vec!["x", "y"]);
        Ok(())
    }

    #[test]
    fn test_distribute_empty_pool() -> Result<()> {
        let empty: [String; 0] = [];
        let slices = distribute_evenly(&empty, &names(&["a", "b"]))?;
        assert_eq!(slices.len(), 2);
        assert!(slices.iter().all(|(_, items)| items.is_empty()));
        Ok(())
    }

    #[test]
    fn test_distribute_rejects_bad_contributors() {
        let err = distribute_evenly(&["x"], &[]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));

        let err = distribute_evenly(&["x"], &names(&["a", "a"])).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_reconcile() {
        let rec = reconcile(&set(&["a", "b", "c"]), &set(&["a", "c", "d"]));
        assert_eq!(rec.matched, names(&["a", "c"]));
        assert_eq!(rec.missing, names(&["b"]));
        assert_eq!(rec.orphaned, names(&["d"]));
        assert_eq!(rec.progress(), ContributorProgress::from_counts(2, 3));
    }

    #[test]
    fn test_ledger_missing_assigned_contributes_zero() -> Result<()> {
        let scanner = InMemoryScanner::new()
            .with_files("alice", Collection::Assigned, ["a.jpg", "b.png", "c.jpeg"])
            .with_files("alice", Collection::Masks, ["a.png", "c.png", "d.png"])
            .with_files("bob", Collection::Masks, ["x.png"]);
        let ledger = Ledger::new(scanner, ExtensionSet::images());

        let statuses = ledger.survey(&names(&["alice", "bob", "carol"]))?;
        assert_eq!(statuses[0].progress, ContributorProgress::from_counts(2, 3));

        assert!(statuses[1].assigned_missing);
        assert!(!statuses[1].masks_missing);
        assert_eq!(statuses[1].progress, ContributorProgress::default());

        assert!(statuses[2].assigned_missing && statuses[2].masks_missing);

        let aggregate = compute_aggregate_progress(statuses.iter().map(|s| &s.progress));
        assert_eq!(aggregate.total_assigned, 3);
        assert_eq!(aggregate.total_completed, 2);
        Ok(())
    }

    #[test]
    fn test_ledger_propagates_collisions() {
        let scanner = InMemoryScanner::new()
            .with_files("alice", Collection::Assigned, ["a.jpg", "a.png"])
            .with_files("alice", Collection::Masks, ["a.png"]);
        let ledger = Ledger::new(scanner, ExtensionSet::images());

        let err = ledger.contributor_status("alice").unwrap_err();
        assert!(matches!(err, LedgerError::FilenameCollision { .. }));
    }

    #[test]
    fn test_survey_isolates_collision_to_one_contributor() -> Result<()> {
        let scanner = InMemoryScanner::new()
            .with_files("alice", Collection::Assigned, ["a.jpg", "a.png"])
            .with_files("alice", Collection::Masks, ["a.png"])
            .with_files("bob", Collection::Assigned, ["b.jpg", "c.jpg"])
            .with_files("bob", Collection::Masks, ["b.png"]);
        let ledger = Ledger::new(scanner, ExtensionSet::images());

        let statuses = ledger.survey(&names(&["alice", "bob"]))?;
        assert!(statuses[0]
            .problem
            .as_deref()
            .is_some_and(|p| p.contains("a.jpg")));
        assert_eq!(statuses[0].progress, ContributorProgress::default());
        assert_eq!(statuses[1].problem, None);
        assert_eq!(statuses[1].progress, ContributorProgress::from_counts(1, 2));
        Ok(())
    }

    #[test]
    fn test_ledger_inspect() -> Result<()> {
        let scanner = InMemoryScanner::new()
            .with_files("alice", Collection::Assigned, ["a.jpg", "b.jpg"])
            .with_files("alice", Collection::Masks, ["b.png", "z.png", "readme.txt"]);
        let ledger = Ledger::new(&scanner, ExtensionSet::images());

        let inspection = ledger.inspect("alice")?;
        assert!(!inspection.assigned_missing);
        let rec = inspection.reconciliation;
        assert_eq!(rec.matched, names(&["b"]));
        assert_eq!(rec.missing, names(&["a"]));
        assert_eq!(rec.orphaned, names(&["z"]));
        Ok(())
    }
}
