use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use branchtag_core::error::TaggerError;
use branchtag_core::models::ledger::{ErrorKind, RecordContext};
use branchtag_core::models::repo::RepositoryInfo;
use branchtag_core::models::scan::{Organization, Project, Target};
use branchtag_host::{BranchResolver, ResolveError};
use branchtag_ledger::{details, ErrorLedger};
use branchtag_scan::{ProjectUpdate, ScanPlatform};

use crate::matcher::match_projects;
use crate::owner::OwnerResolver;
use crate::report::{ProjectReport, RunReport, TargetReport, WriteStatus};
use crate::tags::merge_tag;

/// Value written under the tag key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// The repository's resolved default branch.
    DefaultBranch,
    Fixed(String),
}

impl TagValue {
    fn for_repo<'a>(&'a self, info: &'a RepositoryInfo) -> &'a str {
        match self {
            TagValue::DefaultBranch => &info.default_branch,
            TagValue::Fixed(v) => v,
        }
    }
}

/// Knobs for one tagging run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub tag_key: String,
    pub tag_value: TagValue,
    pub dry_run: bool,
    pub group_id: Option<String>,
    /// Validated source-type filter; empty means all targets.
    pub source_types: Vec<String>,
    pub target_concurrency: usize,
    pub show_progress: bool,
}

impl RunOptions {
    pub fn new(tag_key: impl Into<String>) -> Self {
        Self {
            tag_key: tag_key.into(),
            tag_value: TagValue::DefaultBranch,
            dry_run: false,
            group_id: None,
            source_types: Vec::new(),
            target_concurrency: 1,
            show_progress: false,
        }
    }
}

/// Drives organizations -> targets -> projects and routes failures into the ledger.
///
/// Listing organizations or targets is fail-fast; everything below a target
/// is fail-soft and recorded.
#[derive(Clone)]
pub struct Orchestrator {
    scan: Arc<dyn ScanPlatform>,
    resolver: Arc<BranchResolver>,
    owners: OwnerResolver,
    ledger: Arc<ErrorLedger>,
    options: Arc<RunOptions>,
}

impl Orchestrator {
    pub fn new(
        scan: Arc<dyn ScanPlatform>,
        resolver: Arc<BranchResolver>,
        owners: OwnerResolver,
        ledger: Arc<ErrorLedger>,
        options: RunOptions,
    ) -> Self {
        Self {
            scan,
            resolver,
            owners,
            ledger,
            options: Arc::new(options),
        }
    }

    pub fn ledger(&self) -> &ErrorLedger {
        &self.ledger
    }

    pub async fn run(&self) -> Result<RunReport, TaggerError> {
        if self.options.dry_run {
            tracing::info!("dry run: no project will be modified");
        }

        let orgs = self
            .scan
            .list_organizations(self.options.group_id.as_deref())
            .await?;

        let mut report = RunReport::default();
        for org in &orgs {
            tracing::info!("processing organization: {} ({})", org.name, org.id);
            let targets = self.process_org(org).await?;
            let count = targets.len();
            for target in targets {
                report.absorb(target);
            }
            report.organizations += 1;
            tracing::info!("completed {count} target(s) for organization {}", org.name);
        }

        Ok(report)
    }

    async fn process_org(&self, org: &Organization) -> Result<Vec<TargetReport>, TaggerError> {
        let targets = self
            .scan
            .list_targets(&org.id, &self.options.source_types)
            .await?;
        tracing::info!("found {} target(s) in {}", targets.len(), org.name);

        let pb = self.progress(targets.len() as u64, &org.name);
        let mut reports = Vec::with_capacity(targets.len());

        if self.options.target_concurrency <= 1 {
            for target in targets {
                reports.push(self.process_target(org, target).await);
                pb.inc(1);
            }
        } else {
            let permits = self.options.target_concurrency.min(Semaphore::MAX_PERMITS);
            let semaphore = Arc::new(Semaphore::new(permits));
            let handles: Vec<_> = targets
                .into_iter()
                .map(|target| {
                    let ctx = RecordContext::org(&org.id, &org.name)
                        .with_target(&target.id, target.url.as_deref());
                    let worker = self.clone();
                    let org = org.clone();
                    let sem = semaphore.clone();
                    let pb = pb.clone();
                    let handle = tokio::spawn(async move {
                        let _permit = sem.acquire_owned().await.ok();
                        let report = worker.process_target(&org, target).await;
                        pb.inc(1);
                        report
                    });
                    (ctx, handle)
                })
                .collect();

            for (ctx, handle) in handles {
                match handle.await {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        let target_id = ctx.target_id.clone().unwrap_or_default();
                        let has_url = ctx.target_url.is_some();
                        tracing::error!("target worker for {target_id} in {} failed: {e}", org.name);
                        self.ledger.record(
                            ErrorKind::TargetWorkerFailed,
                            details([
                                ("target_id", json!(target_id)),
                                ("error", json!(e.to_string())),
                            ]),
                            Some(ctx),
                        );
                        pb.inc(1);
                        reports.push(TargetReport {
                            has_url,
                            ..TargetReport::default()
                        });
                    }
                }
            }
        }

        pb.finish_and_clear();
        Ok(reports)
    }

    fn progress(&self, len: u64, org_name: &str) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} [{bar:30}] {pos}/{len}") {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(org_name.to_string());
        pb
    }

    async fn process_target(&self, org: &Organization, target: Target) -> TargetReport {
        let mut report = TargetReport::default();
        let ctx = RecordContext::org(&org.id, &org.name).with_target(&target.id, target.url.as_deref());

        let Some(url) = target.url.as_deref() else {
            tracing::warn!("target {} has no URL attribute", target.id);
            self.ledger.record(
                ErrorKind::MissingTargetUrl,
                details([
                    ("target_id", json!(target.id)),
                    ("target_attributes", Value::Object(target.attributes.clone())),
                ]),
                Some(ctx),
            );
            return report;
        };
        report.has_url = true;
        tracing::info!("processing target: {url}");

        let info = match self.resolver.resolve(url).await {
            Ok(info) => info,
            Err(ResolveError::Identity { url }) => {
                self.ledger.record(
                    ErrorKind::RepoIdentityError,
                    details([
                        ("target_url", json!(url)),
                        ("error", json!("Could not extract owner/repo from URL")),
                    ]),
                    Some(ctx),
                );
                return report;
            }
            Err(ResolveError::Metadata(failure)) => {
                let mut d = details([
                    ("target_url", json!(url)),
                    ("error", json!("Could not fetch repository information")),
                ]);
                d.extend(failure.to_details());
                self.ledger.record(ErrorKind::GithubApiError, d, Some(ctx));
                return report;
            }
        };
        report.resolved = true;
        tracing::info!(
            "repository {}/{} has default branch {}",
            info.owner,
            info.repo,
            info.default_branch
        );

        let projects = match self.scan.list_projects(&org.id, &target.id).await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!("no project details available for target {}: {e}", target.id);
                self.ledger.record(
                    ErrorKind::MissingProjectDetails,
                    details([
                        ("target_id", json!(target.id)),
                        ("target_url", json!(url)),
                        ("status_code", json!(e.status())),
                        ("error", json!(e.to_string())),
                    ]),
                    Some(ctx),
                );
                return report;
            }
        };
        report.listed = projects.len();

        let matched = match_projects(&projects, &info.default_branch);
        report.matched = matched.len();
        if matched.is_empty() {
            tracing::info!("no projects match default branch '{}'", info.default_branch);
            return report;
        }
        tracing::info!(
            "found {} project(s) matching default branch '{}'",
            matched.len(),
            info.default_branch
        );

        let value = self.options.tag_value.for_repo(&info);
        for project in matched {
            let project_ctx = ctx.clone().with_project(&project.id, &project.name);
            if let Some(r) = self.process_project(org, &target, project, value, project_ctx).await {
                report.projects.push(r);
            }
        }

        report
    }

    /// Merge the tag into one project and write it back when it changed.
    ///
    /// Returns `None` when no owner could be resolved for a needed write.
    async fn process_project(
        &self,
        org: &Organization,
        target: &Target,
        project: &Project,
        value: &str,
        ctx: RecordContext,
    ) -> Option<ProjectReport> {
        let key = &self.options.tag_key;
        tracing::info!("processing project: {} ({})", project.name, project.id);

        let (tags, outcome) = merge_tag(&project.tags, key, value);
        let mut report = ProjectReport {
            org_id: org.id.clone(),
            target_id: target.id.clone(),
            project_id: project.id.clone(),
            project_name: project.name.clone(),
            tag_value: value.to_string(),
            outcome,
            owner_source: None,
            write: WriteStatus::NotNeeded,
        };

        if !outcome.needs_write() {
            tracing::info!("tag {key}={value} already exists and is correct");
            return Some(report);
        }

        // A write replaces the whole tag list, which would drop entries we could not read.
        if !project.unreadable_tags.is_empty() {
            tracing::warn!("skipping project {}: existing tags could not be decoded", project.id);
            self.ledger.record(
                ErrorKind::InvalidProjectTags,
                details([
                    ("project_id", json!(project.id)),
                    ("project_name", json!(project.name)),
                    ("unreadable_tags", Value::Array(project.unreadable_tags.clone())),
                ]),
                Some(ctx),
            );
            return None;
        }

        let owner = match self.owners.resolve(project) {
            Ok(owner) => owner,
            Err(unresolved) => {
                tracing::warn!("skipping project {}: {unresolved}", project.id);
                self.ledger.record(
                    ErrorKind::MissingOwnerId,
                    details([
                        ("error", json!(unresolved.reason)),
                        ("project_id", json!(project.id)),
                        ("project_name", json!(project.name)),
                        ("available_keys", json!(unresolved.available_keys)),
                    ]),
                    Some(ctx),
                );
                return None;
            }
        };
        report.owner_source = Some(owner.source);

        if self.options.dry_run {
            tracing::info!("DRY RUN: would {outcome} tag {key}={value} on project {}", project.id);
            report.write = WriteStatus::DryRun;
            return Some(report);
        }

        let update = ProjectUpdate {
            project_id: project.id.clone(),
            tags,
            owner_id: owner.id,
        };
        match self.scan.update_project(&org.id, &update).await {
            Ok(()) => {
                tracing::info!("tagged project {} ({outcome} {key}={value})", project.id);
                report.write = WriteStatus::Written;
            }
            Err(e) => {
                tracing::warn!("error tagging project {}: {e}", project.id);
                self.ledger.record(
                    ErrorKind::TaggingApiError,
                    details([
                        ("error", json!(e.to_string())),
                        ("status_code", json!(e.status())),
                        ("project_id", json!(project.id)),
                        ("tag_key", json!(key)),
                        ("tag_value", json!(value)),
                    ]),
                    Some(ctx),
                );
                report.write = WriteStatus::Failed;
            }
        }
        Some(report)
    }
}
