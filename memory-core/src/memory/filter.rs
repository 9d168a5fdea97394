//! Query filter used by [`super::store::MemoryStore::list`].

use super::record::Scope;

/// Criteria for enumerating memories. All fields are optional; an absent
/// field imposes no constraint.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    /// Restrict to this project id.
    pub project_id: Option<String>,
    /// Restrict to this scope.
    pub scope: Option<Scope>,
    /// Restrict to memories carrying all of these tags.
    pub tags: Vec<String>,
    /// Restrict to importance greater than or equal to this value.
    pub min_importance: Option<f64>,
}

impl MemoryFilter {
    /// An unconstrained filter matching every memory.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to a project id.
    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Restricts to a scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Requires the given tag to be present.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Requires importance at or above `min`.
    #[must_use]
    pub fn with_min_importance(mut self, min: f64) -> Self {
        self.min_importance = Some(min);
        self
    }

    /// Returns whether `memory` satisfies this filter.
    #[must_use]
    pub fn matches(&self, memory: &super::record::Memory) -> bool {
        if let Some(project_id) = &self.project_id {
            if &memory.project_id != project_id {
                return false;
            }
        }
        if let Some(scope) = self.scope {
            if memory.scope != scope {
                return false;
            }
        }
        if !self.tags.iter().all(|tag| memory.tags.contains(tag)) {
            return false;
        }
        if let Some(min) = self.min_importance {
            if memory.importance < min {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::record::Memory;
    use std::collections::BTreeSet;

    fn memory_with(project_id: &str, importance: f64, tags: &[&str]) -> crate::memory::record::Memory {
        Memory::new(
            "id".into(),
            "content".into(),
            project_id.into(),
            Scope::Project,
            importance,
            1.0,
            tags.iter().map(|s| (*s).to_string()).collect::<BTreeSet<_>>(),
            None,
            chrono::Utc::now(),
        )
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = MemoryFilter::all();
        assert!(filter.matches(&memory_with("p", 0.0, &[])));
    }

    #[test]
    fn filters_combine_with_and() {
        let filter = MemoryFilter::all()
            .with_project("p1")
            .with_min_importance(0.5)
            .with_tag("ui");
        assert!(filter.matches(&memory_with("p1", 0.6, &["ui", "dark"])));
        assert!(!filter.matches(&memory_with("p2", 0.6, &["ui"])));
        assert!(!filter.matches(&memory_with("p1", 0.4, &["ui"])));
        assert!(!filter.matches(&memory_with("p1", 0.6, &["dark"])));
    }
}
