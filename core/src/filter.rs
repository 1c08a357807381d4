use serde::{Deserialize, Serialize};

use crate::model::Candidate;

/// Search box plus field-level predicates, combined with AND. Empty
/// predicates match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Free-text search over name or e-mail.
    pub query: String,
    pub name: String,
    pub role: String,
    pub city: String,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        [&self.query, &self.name, &self.role, &self.city]
            .iter()
            .all(|value| value.trim().is_empty())
    }

    pub fn matches(&self, candidate: &Candidate) -> bool {
        let query = needle(&self.query);
        let query_hit = query.is_empty()
            || contains(candidate.name.as_deref(), &query)
            || contains(candidate.email.as_deref(), &query);

        query_hit
            && contains(candidate.name.as_deref(), &needle(&self.name))
            && contains(candidate.role.as_deref(), &needle(&self.role))
            && contains(candidate.city.as_deref(), &needle(&self.city))
    }
}

/// Criteria are matched trimmed and lower-cased.
fn needle(value: &str) -> String {
    value.trim().to_lowercase()
}

fn contains(field: Option<&str>, needle: &str) -> bool {
    needle.is_empty() || field.unwrap_or("").to_lowercase().contains(needle)
}

pub fn filter_candidates(candidates: &[Candidate], criteria: &FilterCriteria) -> Vec<Candidate> {
    candidates
        .iter()
        .filter(|candidate| criteria.matches(candidate))
        .cloned()
        .collect()
}
