use std::collections::BTreeMap;

use serde::Serialize;

use crate::owner::OwnerSource;
use crate::tags::TagOutcome;

/// What happened to the remote write for a matched project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    /// The tag was already correct.
    NotNeeded,
    Written,
    /// Suppressed by dry-run.
    DryRun,
    Failed,
}

impl std::fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteStatus::NotNeeded => write!(f, "not_needed"),
            WriteStatus::Written => write!(f, "written"),
            WriteStatus::DryRun => write!(f, "dry_run"),
            WriteStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome for one project whose reference matched the default branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectReport {
    pub org_id: String,
    pub target_id: String,
    pub project_id: String,
    pub project_name: String,
    pub tag_value: String,
    pub outcome: TagOutcome,
    pub owner_source: Option<OwnerSource>,
    pub write: WriteStatus,
}

/// Per-target tallies, folded into the run report.
#[derive(Debug, Default)]
pub(crate) struct TargetReport {
    pub has_url: bool,
    pub resolved: bool,
    pub listed: usize,
    pub matched: usize,
    pub projects: Vec<ProjectReport>,
}

/// Totals for a whole run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    pub organizations: usize,
    pub targets: usize,
    pub targets_with_url: usize,
    pub repositories_resolved: usize,
    pub projects_listed: usize,
    pub projects_matched: usize,
    pub projects: Vec<ProjectReport>,
}

impl RunReport {
    pub(crate) fn absorb(&mut self, target: TargetReport) {
        self.targets += 1;
        self.targets_with_url += usize::from(target.has_url);
        self.repositories_resolved += usize::from(target.resolved);
        self.projects_listed += target.listed;
        self.projects_matched += target.matched;
        self.projects.extend(target.projects);
    }

    /// Count of projects per merge classification.
    pub fn outcomes(&self) -> BTreeMap<TagOutcome, usize> {
        let mut counts = BTreeMap::new();
        for p in &self.projects {
            *counts.entry(p.outcome).or_insert(0) += 1;
        }
        counts
    }

    /// Count of projects per write status.
    pub fn writes(&self) -> BTreeMap<WriteStatus, usize> {
        let mut counts = BTreeMap::new();
        for p in &self.projects {
            *counts.entry(p.write).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_writes(&self, status: WriteStatus) -> usize {
        self.projects.iter().filter(|p| p.write == status).count()
    }
}
