use std::collections::HashSet;

use crate::repos::model::RepositoryIndex;

/// Repository names followed by every tag, first occurrence wins.
pub fn flatten_repo_map(index: &RepositoryIndex) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for term in index.keys().chain(index.values().flat_map(|r| r.tags.iter())) {
        if seen.insert(term.as_str()) {
            out.push(term.clone());
        }
    }
    out
}
