//! Substring filtering over the repository index.
//!
//! Matching is case-insensitive on both sides: terms are stored lowercase
//! and candidates are lowercased before the containment test. Results keep
//! the original casing of the candidates.

use std::collections::BTreeSet;

use crate::repos::model::RepositoryIndex;

/// Lowercased, de-duplicated filter terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterTermSet {
    terms: BTreeSet<String>,
}

impl FilterTermSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a term, lowercased. Blank terms are ignored.
    pub fn insert(&mut self, term: &str) -> bool {
        if term.trim().is_empty() {
            return false;
        }
        self.terms.insert(term.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    /// True when at least one term is a substring of `candidate`.
    pub fn matches(&self, candidate: &str) -> bool {
        let lowered = candidate.to_lowercase();
        self.terms.iter().any(|t| lowered.contains(t.as_str()))
    }
}

impl<S: AsRef<str>> FromIterator<S> for FilterTermSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for term in iter {
            set.insert(term.as_ref());
        }
        set
    }
}

/// Keeps the candidates (in order) that contain at least one term.
/// An empty term set matches nothing; callers that want "no filtering"
/// must check for that themselves.
pub fn filter_terms(candidates: &[String], terms: &FilterTermSet) -> Vec<String> {
    candidates
        .iter()
        .filter(|c| terms.matches(c))
        .cloned()
        .collect()
}

/// Filters the index by repository name or tag.
///
/// A repository with matching tags is kept with its tag list narrowed to
/// those tags. A repository whose name matches but none of whose tags do is
/// kept with all of its tags. The input is never modified.
pub fn filter_repo_map(index: &RepositoryIndex, terms: &FilterTermSet) -> RepositoryIndex {
    if terms.is_empty() {
        return index.clone();
    }
    let mut out = RepositoryIndex::new();
    for (name, record) in index {
        let matched = filter_terms(&record.tags, terms);
        if !matched.is_empty() {
            let mut narrowed = record.clone();
            narrowed.tags = matched;
            out.insert(name.clone(), narrowed);
        } else if terms.matches(name) {
            out.insert(name.clone(), record.clone());
        }
    }
    out
}

/// Free-text query plus the terms picked from autocomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    free_text: String,
    selected: Vec<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    pub fn selected_terms(&self) -> &[String] {
        &self.selected
    }

    pub fn set_free_text(&mut self, text: impl Into<String>) {
        self.free_text = text.into();
    }

    /// Adds a selected term. Returns false for blank or already selected terms.
    pub fn add_term(&mut self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() || self.selected.contains(&term) {
            return false;
        }
        self.selected.push(term);
        true
    }

    pub fn remove_term(&mut self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        let before = self.selected.len();
        self.selected.retain(|t| *t != term);
        self.selected.len() != before
    }

    pub fn pop_term(&mut self) -> Option<String> {
        self.selected.pop()
    }

    pub fn clear(&mut self) {
        self.free_text.clear();
        self.selected.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.terms().is_empty()
    }

    /// Selected terms plus the lowercased free text, if any.
    pub fn terms(&self) -> FilterTermSet {
        let mut set: FilterTermSet = self.selected.iter().collect();
        set.insert(&self.free_text);
        set
    }
}
