use branchtag_core::models::scan::Project;

/// Projects whose target reference equals `default_branch` exactly, in input order.
pub fn match_projects<'a>(projects: &'a [Project], default_branch: &str) -> Vec<&'a Project> {
    projects
        .iter()
        .filter(|p| p.target_reference.as_deref() == Some(default_branch))
        .collect()
}
