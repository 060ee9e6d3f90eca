use url::Url;

use branchtag_core::error::TaggerError;
use branchtag_core::models::repo::RepositoryIdentity;

/// Derive `{owner, repo}` from a hosted repository URL.
///
/// URLs containing `host_marker` (e.g. `github.com`) are split on it; any
/// other URL is parsed and its path used, which covers enterprise hosts.
/// A trailing `.git` is dropped first.
pub fn extract_identity(url: &str, host_marker: &str) -> Result<RepositoryIdentity, TaggerError> {
    let fail = || TaggerError::RepoIdentity {
        url: url.to_string(),
    };

    let trimmed = url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let marker = format!("{}/", host_marker.trim_end_matches('/'));
    let path = match trimmed.split_once(&marker) {
        Some((_, rest)) if !host_marker.is_empty() => rest.to_string(),
        _ => {
            let parsed = Url::parse(trimmed).map_err(|_| fail())?;
            parsed.path().trim_start_matches('/').to_string()
        }
    };

    let mut segments = path.split('/');
    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok(RepositoryIdentity::new(owner, repo))
        }
        _ => Err(fail()),
    }
}
