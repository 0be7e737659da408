use std::collections::HashSet;

use crate::models::{ContentId, ContentKey, CourseId, ModuleId};

/// Per-module slice of the in-memory course aggregate.
#[derive(Debug, Clone)]
pub struct ModuleProgress {
    pub module_id: ModuleId,
    pub total_contents: usize,
    completed: HashSet<ContentId>,
}

impl ModuleProgress {
    pub fn new(module_id: impl Into<ModuleId>, total_contents: usize) -> Self {
        Self {
            module_id: module_id.into(),
            total_contents,
            completed: HashSet::new(),
        }
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.total_contents > 0 && self.completed.len() >= self.total_contents
    }
}

/// In-memory course progress aggregate, updated when the server confirms a
/// completion. Module accessibility is derived from it: a module unlocks
/// once every item in the preceding module is complete.
///
/// The server remains the source of truth; the percent it returns with a
/// completion acknowledgement overrides the locally derived figure.
#[derive(Debug, Clone)]
pub struct CourseProgress {
    pub course_id: CourseId,
    modules: Vec<ModuleProgress>,
    server_percent: Option<f64>,
}

impl CourseProgress {
    pub fn new(course_id: impl Into<CourseId>, modules: Vec<ModuleProgress>) -> Self {
        Self {
            course_id: course_id.into(),
            modules,
            server_percent: None,
        }
    }

    pub fn modules(&self) -> &[ModuleProgress] {
        &self.modules
    }

    /// Record a server-confirmed completion for one content item.
    pub fn record_completion(&mut self, key: &ContentKey, server_percent: Option<f64>) {
        if key.course_id != self.course_id {
            return;
        }
        if let Some(module) = self
            .modules
            .iter_mut()
            .find(|m| m.module_id == key.module_id)
        {
            module.completed.insert(key.content_id.clone());
        }
        if server_percent.is_some() {
            self.server_percent = server_percent;
        }
    }

    pub fn is_completed(&self, key: &ContentKey) -> bool {
        self.modules
            .iter()
            .find(|m| m.module_id == key.module_id)
            .is_some_and(|m| m.completed.contains(&key.content_id))
    }

    /// Percent of all course contents completed. Prefers the figure the
    /// server last returned over the locally derived one.
    pub fn percent(&self) -> f64 {
        if let Some(p) = self.server_percent {
            return p;
        }
        let total: usize = self.modules.iter().map(|m| m.total_contents).sum();
        if total == 0 {
            return 0.0;
        }
        let done: usize = self.modules.iter().map(|m| m.completed.len()).sum();
        done as f64 / total as f64 * 100.0
    }

    /// A module is accessible when it is first, or when the one before it
    /// is fully complete.
    pub fn module_unlocked(&self, index: usize) -> bool {
        if index == 0 {
            return true;
        }
        self.modules
            .get(index - 1)
            .is_some_and(|prev| prev.is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> CourseProgress {
        CourseProgress::new(
            "c1",
            vec![
                ModuleProgress::new("m1", 2),
                ModuleProgress::new("m2", 1),
            ],
        )
    }

    #[test]
    fn first_module_is_always_unlocked() {
        let progress = course();
        assert!(progress.module_unlocked(0));
        assert!(!progress.module_unlocked(1));
    }

    #[test]
    fn next_module_unlocks_when_previous_completes() {
        let mut progress = course();
        progress.record_completion(&ContentKey::new("c1", "m1", "a"), None);
        assert!(!progress.module_unlocked(1));
        progress.record_completion(&ContentKey::new("c1", "m1", "b"), None);
        assert!(progress.module_unlocked(1));
    }

    #[test]
    fn percent_is_locally_derived_until_server_reports() {
        let mut progress = course();
        progress.record_completion(&ContentKey::new("c1", "m1", "a"), None);
        assert!((progress.percent() - 100.0 / 3.0).abs() < 1e-9);

        progress.record_completion(&ContentKey::new("c1", "m1", "b"), Some(66.7));
        assert_eq!(progress.percent(), 66.7);
    }

    #[test]
    fn completion_for_other_course_is_ignored() {
        let mut progress = course();
        progress.record_completion(&ContentKey::new("other", "m1", "a"), Some(50.0));
        assert_eq!(progress.percent(), 0.0);
    }

    #[test]
    fn duplicate_completion_is_idempotent() {
        let mut progress = course();
        let key = ContentKey::new("c1", "m1", "a");
        progress.record_completion(&key, None);
        progress.record_completion(&key, None);
        assert_eq!(progress.modules()[0].completed_count(), 1);
        assert!(progress.is_completed(&key));
    }
}
