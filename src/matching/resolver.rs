//! Maps free-form completion text back to candidate uids.

use std::collections::HashSet;

use crate::data::models::TutorProfile;

/// Resolve a comma-separated name list against the candidate pool.
///
/// Reply tokens are trimmed, then compared case-insensitively against the
/// stored names as written, with no trimming on that side. Only candidates
/// can appear in the result, in pool order, each uid at most once. Missing or
/// unparseable text resolves to no matches.
pub fn resolve_matches(raw: Option<&str>, candidates: &[TutorProfile]) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let wanted: HashSet<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_lowercase)
        .collect();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|tutor| wanted.contains(&tutor.name.to_lowercase()))
        .filter(|tutor| seen.insert(&tutor.uid))
        .map(|tutor| tutor.uid.clone())
        .collect()
}
