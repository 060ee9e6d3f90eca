use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use branchtag_auth::{Credentials, MemoryStore, GITHUB_TOKEN, SNYK_TOKEN};
use branchtag_core::config::TaggerConfig;
use branchtag_core::error::TaggerError;
use branchtag_core::models::ledger::ErrorKind;
use branchtag_core::models::repo::RepositoryIdentity;
use branchtag_core::models::scan::{Organization, Project, Tag, Target};
use branchtag_host::{BranchResolver, HostFailure, RepoHost};
use branchtag_ledger::{ErrorLedger, FlushOutcome};
use branchtag_reconcile::owner::OwnerResolver;
use branchtag_reconcile::tags::TagOutcome;
use branchtag_reconcile::{Orchestrator, RunOptions, RunReport, WriteStatus};
use branchtag_scan::{ProjectUpdate, ScanPlatform};

/// Scan platform with one organization and canned targets/projects.
struct InMemoryScan {
    self_id: Option<String>,
    targets: Vec<Target>,
    projects: HashMap<String, Vec<Project>>,
    writes: Mutex<Vec<ProjectUpdate>>,
}

impl InMemoryScan {
    fn new(targets: Vec<Target>) -> Self {
        Self {
            self_id: None,
            targets,
            projects: HashMap::new(),
            writes: Mutex::new(Vec::new()),
        }
    }

    fn writes(&self) -> Vec<ProjectUpdate> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScanPlatform for InMemoryScan {
    async fn token_identity(&self) -> Result<Option<String>, TaggerError> {
        Ok(self.self_id.clone())
    }

    async fn list_organizations(&self, _: Option<&str>) -> Result<Vec<Organization>, TaggerError> {
        Ok(vec![Organization {
            id: "org-1".into(),
            name: "Acme".into(),
        }])
    }

    async fn list_targets(&self, _: &str, _: &[String]) -> Result<Vec<Target>, TaggerError> {
        Ok(self.targets.clone())
    }

    async fn list_projects(&self, _: &str, target_id: &str) -> Result<Vec<Project>, TaggerError> {
        self.projects
            .get(target_id)
            .cloned()
            .ok_or_else(|| TaggerError::ApiError {
                status: 404,
                url: format!("/rest/orgs/org-1/projects?target_id={target_id}"),
                message: "not found".into(),
            })
    }

    async fn update_project(&self, _: &str, update: &ProjectUpdate) -> Result<(), TaggerError> {
        self.writes.lock().unwrap().push(update.clone());
        Ok(())
    }
}

struct InMemoryHost(HashMap<String, String>);

#[async_trait]
impl RepoHost for InMemoryHost {
    async fn default_branch(&self, identity: &RepositoryIdentity) -> Result<String, HostFailure> {
        self.0
            .get(&identity.to_string())
            .cloned()
            .ok_or_else(|| HostFailure::new("in-memory", identity))
    }
}

fn target(id: &str, url: &str) -> Target {
    Target {
        id: id.into(),
        url: Some(url.into()),
        attributes: Default::default(),
    }
}

fn widgets_scan() -> InMemoryScan {
    let mut scan = InMemoryScan::new(vec![target("t-1", "https://github.com/acme/widgets")]);
    scan.projects.insert(
        "t-1".into(),
        vec![
            Project::new("p-main", "acme/widgets:package.json")
                .with_reference("main")
                .with_owner("user-1"),
            Project::new("p-dev", "acme/widgets:package.json").with_reference("dev"),
        ],
    );
    scan
}

async fn run(scan: Arc<InMemoryScan>, options: RunOptions, ledger: Arc<ErrorLedger>) -> RunReport {
    let mut repos = HashMap::new();
    repos.insert("acme/widgets".to_string(), "main".to_string());
    let resolver = BranchResolver::new(Arc::new(InMemoryHost(repos)), "github.com");
    let owners = OwnerResolver::from_platform(&*scan).await;
    Orchestrator::new(scan, Arc::new(resolver), owners, ledger, options)
        .run()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_default_branch_project_is_tagged() {
    let scan = Arc::new(widgets_scan());
    let ledger = Arc::new(ErrorLedger::new("unused.log"));
    let report = run(scan.clone(), RunOptions::new("default-branch"), ledger.clone()).await;

    let writes = scan.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].project_id, "p-main");
    assert_eq!(writes[0].tags, vec![Tag::new("default-branch", "main")]);

    assert_eq!(report.projects.len(), 1);
    assert_eq!(report.projects[0].outcome, TagOutcome::Inserted);
    assert_eq!(report.projects_listed, 2);
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn test_dry_run_matches_live_computation() {
    let live_scan = Arc::new(widgets_scan());
    let live = run(
        live_scan.clone(),
        RunOptions::new("default-branch"),
        Arc::new(ErrorLedger::new("unused.log")),
    )
    .await;

    let dry_scan = Arc::new(widgets_scan());
    let mut options = RunOptions::new("default-branch");
    options.dry_run = true;
    let dry_ledger = Arc::new(ErrorLedger::new("unused.log"));
    let dry = run(dry_scan.clone(), options, dry_ledger.clone()).await;

    assert!(dry_scan.writes().is_empty());
    assert_eq!(live.outcomes(), dry.outcomes());
    assert_eq!(live.projects_matched, dry.projects_matched);
    assert_eq!(dry.count_writes(WriteStatus::DryRun), 1);
    assert!(dry_ledger.is_empty());
}

#[tokio::test]
async fn test_second_run_is_unchanged() {
    let first = Arc::new(widgets_scan());
    run(
        first.clone(),
        RunOptions::new("default-branch"),
        Arc::new(ErrorLedger::new("unused.log")),
    )
    .await;
    let written_tags = first.writes()[0].tags.clone();

    let mut second = widgets_scan();
    second.projects.insert(
        "t-1".into(),
        vec![Project::new("p-main", "w")
            .with_reference("main")
            .with_owner("user-1")
            .with_tags(written_tags)],
    );
    let second = Arc::new(second);
    let report = run(
        second.clone(),
        RunOptions::new("default-branch"),
        Arc::new(ErrorLedger::new("unused.log")),
    )
    .await;

    assert!(second.writes().is_empty());
    assert_eq!(report.outcomes()[&TagOutcome::Unchanged], 1);
}

#[tokio::test]
async fn test_ledger_flush_after_partial_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagging_errors.log");

    let mut scan = widgets_scan();
    scan.targets.push(target("t-2", "https://github.com/acme/unknown"));
    scan.targets.push(Target {
        id: "t-3".into(),
        url: None,
        attributes: Default::default(),
    });
    scan.projects.insert(
        "t-1".into(),
        vec![
            Project::new("p-orphan", "orphan").with_reference("main"),
            Project::new("p-main", "w").with_reference("main").with_owner("user-1"),
        ],
    );
    let scan = Arc::new(scan);
    let ledger = Arc::new(ErrorLedger::new(&path));
    let report = run(scan.clone(), RunOptions::new("default-branch"), ledger.clone()).await;

    assert_eq!(scan.writes().len(), 1);
    assert_eq!(report.targets, 3);

    let summary = ledger.summary();
    assert_eq!(summary[&ErrorKind::MissingOwnerId], 1);
    assert_eq!(summary[&ErrorKind::GithubApiError], 1);
    assert_eq!(summary[&ErrorKind::MissingTargetUrl], 1);

    match ledger.flush().unwrap() {
        FlushOutcome::Written { count, .. } => assert_eq!(count, 3),
        FlushOutcome::Clean => panic!("expected records to be written"),
    }
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let kinds: Vec<&str> = written
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["missing_owner_id", "github_api_error", "missing_target_url"]);
    assert_eq!(written[0]["details"]["available_keys"], serde_json::json!([]));
}

#[tokio::test]
async fn test_token_identity_is_owner_fallback() {
    let mut scan = widgets_scan();
    scan.self_id = Some("token-user".into());
    scan.projects.insert(
        "t-1".into(),
        vec![Project::new("p-orphan", "orphan").with_reference("main")],
    );
    let scan = Arc::new(scan);
    let ledger = Arc::new(ErrorLedger::new("unused.log"));
    run(scan.clone(), RunOptions::new("default-branch"), ledger.clone()).await;

    assert_eq!(scan.writes()[0].owner_id, "token-user");
    assert!(ledger.is_empty());
}

#[test]
fn test_missing_credentials_fail_before_network() {
    let store = MemoryStore::new();
    store.store(GITHUB_TOKEN, "gh");
    let err = Credentials::load(&store).unwrap_err();
    assert!(err.to_string().contains(SNYK_TOKEN));
}

#[test]
fn test_config_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut config = TaggerConfig::default();
    config.allowed_source_types.push("github-server-app".into());
    config.save_to(&path).unwrap();

    let loaded = TaggerConfig::load_from(&path).unwrap();
    assert!(loaded
        .validate_source_types(&["github-server-app".to_string()])
        .is_ok());
}
