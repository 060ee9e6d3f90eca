use serde::Serialize;

use branchtag_core::models::scan::Tag;

/// How a tag merge changed the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOutcome {
    /// The key already held exactly this value.
    Unchanged,
    /// The key existed with another value and was overwritten in place.
    Updated,
    /// The key did not exist and was appended.
    Inserted,
}

impl TagOutcome {
    /// Whether the remote platform must be written to.
    pub fn needs_write(&self) -> bool {
        !matches!(self, TagOutcome::Unchanged)
    }
}

impl std::fmt::Display for TagOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagOutcome::Unchanged => write!(f, "unchanged"),
            TagOutcome::Updated => write!(f, "updated"),
            TagOutcome::Inserted => write!(f, "inserted"),
        }
    }
}

/// Upsert `key=value` into `existing`.
///
/// Tags with other keys keep their values and relative order. The first tag
/// with `key` is overwritten in place and any later duplicates of `key` are
/// dropped, so the result holds exactly one tag with `key`.
pub fn merge_tag(existing: &[Tag], key: &str, value: &str) -> (Vec<Tag>, TagOutcome) {
    let with_key = existing.iter().filter(|t| t.key == key).count();
    if with_key == 1 && existing.iter().any(|t| t.key == key && t.value == value) {
        return (existing.to_vec(), TagOutcome::Unchanged);
    }

    let mut merged = Vec::with_capacity(existing.len() + 1);
    let mut placed = false;
    for tag in existing {
        if tag.key != key {
            merged.push(tag.clone());
        } else if !placed {
            merged.push(Tag::new(key, value));
            placed = true;
        }
    }

    if placed {
        (merged, TagOutcome::Updated)
    } else {
        merged.push(Tag::new(key, value));
        (merged, TagOutcome::Inserted)
    }
}
