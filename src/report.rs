use std::fmt;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::ledger::{compute_aggregate_progress, AggregateProgress, ContributorStatus};
use crate::persist;

/// One contributor's entry in `progress.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub assigned: usize,
    pub completed: usize,
    pub remaining: usize,
    pub last_updated: DateTime<FixedOffset>,
}

/// A timestamped snapshot of the ledger. Only ever exported; the workspace
/// directories stay the source of truth.
#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub statuses: Vec<ContributorStatus>,
    pub aggregate: AggregateProgress,
    pub generated_at: DateTime<FixedOffset>,
}

impl ProgressReport {
    pub fn new(statuses: Vec<ContributorStatus>, generated_at: DateTime<FixedOffset>) -> Self {
        let aggregate = compute_aggregate_progress(statuses.iter().map(|s| &s.progress));
        Self {
            statuses,
            aggregate,
            generated_at,
        }
    }

    pub fn now(statuses: Vec<ContributorStatus>) -> Self {
        Self::new(statuses, Local::now().into())
    }

    pub fn records(&self) -> IndexMap<String, ProgressRecord> {
        self.statuses
            .iter()
            .filter(|status| status.problem.is_none())
            .map(|status| {
                let record = ProgressRecord {
                    assigned: status.progress.total,
                    completed: status.progress.completed,
                    remaining: status.progress.remaining,
                    last_updated: self.generated_at,
                };
                (status.contributor.clone(), record)
            })
            .collect()
    }

    /// Overwrites the progress file with this snapshot.
    pub fn write(&self, path: &Path) -> Result<()> {
        persist::write_json(path, &self.records())?;
        log::info!("Progress snapshot written to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<IndexMap<String, ProgressRecord>> {
        persist::read_json(path)
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TEAM ANNOTATION PROGRESS")?;
        writeln!(f, "{}", "=".repeat(40))?;

        for status in &self.statuses {
            if let Some(problem) = &status.problem {
                writeln!(f, "{}: not counted, {problem}", status.contributor)?;
                continue;
            }
            if status.assigned_missing {
                writeln!(f, "{}: no assigned folder found", status.contributor)?;
                continue;
            }
            let progress = &status.progress;
            writeln!(f, "{}:", status.contributor)?;
            writeln!(f, "   Assigned:  {} images", progress.total)?;
            writeln!(f, "   Completed: {} masks", progress.completed)?;
            writeln!(f, "   Remaining: {}", progress.remaining)?;
            writeln!(f, "   Progress:  {:.1}%", progress.percent())?;
        }

        writeln!(f)?;
        writeln!(f, "OVERALL PROGRESS:")?;
        writeln!(f, "   Total assigned:  {}", self.aggregate.total_assigned)?;
        writeln!(f, "   Total completed: {}", self.aggregate.total_completed)?;
        write!(f, "   Overall progress: {:.1}%", self.aggregate.pct)?;
        if self.aggregate.is_complete() && self.statuses.iter().all(|s| s.problem.is_none()) {
            write!(f, "\nAll annotation completed. Next step: merge.")?;
        }
        Ok(())
    }
}
