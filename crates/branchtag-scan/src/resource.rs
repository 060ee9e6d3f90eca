use serde::Deserialize;
use serde_json::{Map, Value};

use branchtag_core::error::TaggerError;
use branchtag_core::models::scan::{Organization, OwnerRef, Project, Tag, Target};

/// Relationship naming the user recorded against a project.
const OWNER_RELATIONSHIP: &str = "importer";

/// A JSON:API resource object.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: Option<Map<String, Value>>,
}

impl Resource {
    fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Decode the `data` array of a collection envelope.
pub fn extract_resources(body: &Value) -> Result<Vec<Resource>, TaggerError> {
    let data = body.get("data").ok_or_else(|| TaggerError::MalformedResponse {
        url: String::new(),
        message: "response has no `data` member".into(),
    })?;
    serde_json::from_value(data.clone()).map_err(|e| TaggerError::MalformedResponse {
        url: String::new(),
        message: format!("invalid resource list: {e}"),
    })
}

pub fn extract_organizations(body: &Value) -> Result<Vec<Organization>, TaggerError> {
    Ok(extract_resources(body)?
        .into_iter()
        .map(Organization::from)
        .collect())
}

pub fn extract_targets(body: &Value) -> Result<Vec<Target>, TaggerError> {
    Ok(extract_resources(body)?
        .into_iter()
        .map(Target::from)
        .collect())
}

pub fn extract_projects(body: &Value) -> Result<Vec<Project>, TaggerError> {
    Ok(extract_resources(body)?
        .into_iter()
        .map(Project::from)
        .collect())
}

impl From<Resource> for Organization {
    fn from(resource: Resource) -> Self {
        let name = resource
            .attr_str("name")
            .map(String::from)
            .unwrap_or_else(|| resource.id.clone());
        Organization {
            id: resource.id,
            name,
        }
    }
}

impl From<Resource> for Target {
    fn from(resource: Resource) -> Self {
        let url = resource
            .attr_str("url")
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from);
        Target {
            id: resource.id,
            url,
            attributes: resource.attributes,
        }
    }
}

impl From<Resource> for Project {
    fn from(resource: Resource) -> Self {
        let (tags, unreadable_tags) = split_tags(resource.attributes.get("tags"));
        if !unreadable_tags.is_empty() {
            tracing::debug!(
                "project {}: {} tag entries could not be decoded",
                resource.id,
                unreadable_tags.len()
            );
        }

        let relationship_keys = resource
            .relationships
            .as_ref()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();

        Project {
            name: resource
                .attr_str("name")
                .map(String::from)
                .unwrap_or_else(|| "Unknown".to_string()),
            target_reference: resource.attr_str("target_reference").map(String::from),
            tags,
            unreadable_tags,
            owner: owner_ref(resource.relationships.as_ref()),
            relationship_keys,
            id: resource.id,
        }
    }
}

/// Decode tag entries one by one. Entries that are not `{key, value}` strings
/// are returned separately, verbatim.
fn split_tags(raw: Option<&Value>) -> (Vec<Tag>, Vec<Value>) {
    match raw {
        None | Some(Value::Null) => (Vec::new(), Vec::new()),
        Some(Value::Array(entries)) => {
            let mut tags = Vec::with_capacity(entries.len());
            let mut unreadable = Vec::new();
            for entry in entries {
                match serde_json::from_value::<Tag>(entry.clone()) {
                    Ok(tag) => tags.push(tag),
                    Err(_) => unreadable.push(entry.clone()),
                }
            }
            (tags, unreadable)
        }
        Some(other) => (Vec::new(), vec![other.clone()]),
    }
}

/// Read `relationships.importer.data.id` as a typed reference.
fn owner_ref(relationships: Option<&Map<String, Value>>) -> OwnerRef {
    let Some(rel) = relationships.and_then(|r| r.get(OWNER_RELATIONSHIP)) else {
        return OwnerRef::Absent;
    };
    match rel.get("data") {
        None | Some(Value::Null) => OwnerRef::Absent,
        Some(data) => match data.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => OwnerRef::Present(id.to_string()),
            _ => OwnerRef::Malformed(format!("{OWNER_RELATIONSHIP}.data has no id: {data}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_from_resource() {
        let body = json!({"data": [{
            "id": "p1",
            "attributes": {
                "name": "acme/widgets:package.json",
                "target_reference": "main",
                "tags": [{"key": "team", "value": "core"}]
            },
            "relationships": {
                "importer": {"data": {"id": "u1", "type": "user"}},
                "organization": {"data": {"id": "o1"}}
            }
        }]});
        let projects = extract_projects(&body).unwrap();
        assert_eq!(projects.len(), 1);
        let p = &projects[0];
        assert_eq!(p.target_reference.as_deref(), Some("main"));
        assert_eq!(p.tags, vec![Tag::new("team", "core")]);
        assert_eq!(p.owner, OwnerRef::Present("u1".to_string()));
        assert_eq!(p.relationship_keys.len(), 2);
    }

    #[test]
    fn test_bad_tags_do_not_drop_sibling_projects() {
        let body = json!({"data": [
            {"id": "p1", "attributes": {"target_reference": "main", "tags": []}},
            {"id": "p2", "attributes": {
                "target_reference": "main",
                "tags": [{"key": "team", "value": "core"}, {"key": "x"}]
            }}
        ]});
        let projects = extract_projects(&body).unwrap();
        assert_eq!(projects.len(), 2);
        assert!(projects[0].unreadable_tags.is_empty());
        assert_eq!(projects[1].tags, vec![Tag::new("team", "core")]);
        assert_eq!(projects[1].unreadable_tags, vec![json!({"key": "x"})]);
    }

    #[test]
    fn test_non_array_tags_are_unreadable() {
        let body = json!({"data": [{"id": "p1", "attributes": {"tags": "team=core"}}]});
        let projects = extract_projects(&body).unwrap();
        assert!(projects[0].tags.is_empty());
        assert_eq!(projects[0].unreadable_tags, vec![json!("team=core")]);
    }

    #[test]
    fn test_owner_ref_shapes() {
        assert_eq!(owner_ref(None), OwnerRef::Absent);

        let rel = json!({"importer": {"data": null}});
        assert_eq!(owner_ref(rel.as_object()), OwnerRef::Absent);

        let rel = json!({"owner": {"data": {"id": "u9"}}});
        assert_eq!(owner_ref(rel.as_object()), OwnerRef::Absent);

        let rel = json!({"importer": {"data": {"type": "user"}}});
        assert!(matches!(owner_ref(rel.as_object()), OwnerRef::Malformed(_)));
    }

    #[test]
    fn test_target_without_url() {
        let body = json!({"data": [
            {"id": "t1", "attributes": {"url": "https://github.com/acme/widgets"}},
            {"id": "t2", "attributes": {"display_name": "acme/cli"}},
            {"id": "t3", "attributes": {"url": ""}}
        ]});
        let targets = extract_targets(&body).unwrap();
        assert_eq!(targets[0].url.as_deref(), Some("https://github.com/acme/widgets"));
        assert!(targets[1].url.is_none());
        assert!(targets[2].url.is_none());
    }

    #[test]
    fn test_missing_data_is_malformed() {
        let err = extract_organizations(&json!({"links": {}})).unwrap_err();
        assert!(matches!(err, TaggerError::MalformedResponse { .. }));
    }
}
