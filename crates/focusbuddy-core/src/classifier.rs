use anyhow::Result;
use focusbuddy_storage::{CategoryRule, RuleStore, DEFAULT_CATEGORY};
use std::sync::{Arc, RwLock};

/// Resolves a (process, window title) pair to a category label
///
/// Rules are checked in list order and the first match wins; within a rule the
/// process name is checked before title keywords. The rule list is an immutable
/// snapshot swapped wholesale, so a resolve racing a replace sees either the old
/// list or the new one.
#[derive(Clone)]
pub struct CategoryResolver {
    rules: Arc<RwLock<Arc<[CategoryRule]>>>,
}

impl CategoryResolver {
    #[must_use]
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self {
            rules: Arc::new(RwLock::new(rules.into())),
        }
    }

    /// Create resolver from the persisted rule file
    ///
    /// # Errors
    ///
    /// Returns an error if the rule file exists but cannot be read
    pub fn from_store(store: &RuleStore) -> Result<Self> {
        let rules = store.load()?;
        log::info!(
            "Loaded {} category rules from {}",
            rules.len(),
            store.path().display()
        );
        Ok(Self::new(rules))
    }

    /// Current rule snapshot
    #[must_use]
    pub fn rules(&self) -> Arc<[CategoryRule]> {
        let guard = match self.rules.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&guard)
    }

    #[must_use]
    pub fn resolve(&self, process_name: &str, window_title: &str) -> String {
        let rules = self.rules();

        for rule in rules.iter() {
            if rule.matches_process(process_name) || rule.matches_title(window_title) {
                log::debug!("Classified '{process_name}' as '{}'", rule.category);
                return rule.category.clone();
            }
        }

        log::debug!("'{process_name}' not matched, using '{DEFAULT_CATEGORY}'");
        String::from(DEFAULT_CATEGORY)
    }

    /// Replace the whole rule list
    pub fn replace_rules(&self, rules: Vec<CategoryRule>) {
        let next: Arc<[CategoryRule]> = rules.into();
        let mut guard = match self.rules.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = next;
    }

    /// Reload rules from the store, returning how many were loaded
    ///
    /// # Errors
    ///
    /// Returns an error if the rule file cannot be read; the current rules stay in place
    pub fn reload(&self, store: &RuleStore) -> Result<usize> {
        let rules = store.load()?;
        let count = rules.len();
        self.replace_rules(rules);
        log::info!("Reloaded {count} category rules");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn resolver() -> CategoryResolver {
        CategoryResolver::new(vec![
            CategoryRule::new("Development", &["code.exe"], &["github"]),
            CategoryRule::new("Entertainment", &["steam.exe"], &["youtube"]),
        ])
    }

    #[test]
    fn test_process_match() {
        assert_eq!(resolver().resolve("Code.exe", "main.rs"), "Development");
    }

    #[test]
    fn test_keyword_match() {
        assert_eq!(
            resolver().resolve("firefox.exe", "Funny cats - YouTube"),
            "Entertainment"
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // Matches rule 2 by process and rule 1 by keyword; rule 1 comes first
        assert_eq!(resolver().resolve("steam.exe", "github releases"), "Development");
    }

    #[test]
    fn test_no_match_is_other() {
        assert_eq!(resolver().resolve("notepad.exe", ""), DEFAULT_CATEGORY);
        assert_eq!(CategoryResolver::new(Vec::new()).resolve("a.exe", "b"), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_replace_is_visible_to_clones() {
        let resolver = resolver();
        let shared = resolver.clone();

        resolver.replace_rules(vec![CategoryRule::new("Games", &["steam.exe"], &[])]);

        assert_eq!(shared.resolve("steam.exe", ""), "Games");
        assert_eq!(shared.resolve("code.exe", ""), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let resolver = resolver();
        let before = resolver.rules();

        resolver.replace_rules(Vec::new());

        assert_eq!(before.len(), 2);
        assert!(resolver.rules().is_empty());
    }

    #[test]
    fn test_concurrent_resolve_sees_whole_lists() {
        let resolver = CategoryResolver::new(vec![CategoryRule::new("A", &["x.exe"], &[])]);
        let reader = resolver.clone();

        let handle = std::thread::spawn(move || {
            for _ in 0..1_000 {
                let category = reader.resolve("x.exe", "");
                assert!(category == "A" || category == "B");
            }
        });

        for i in 0..1_000 {
            let label = if i % 2 == 0 { "B" } else { "A" };
            resolver.replace_rules(vec![CategoryRule::new(label, &["x.exe"], &[])]);
        }
        handle.join().unwrap();
    }

    #[test]
    fn test_reload_from_store() {
        let dir = tempdir().unwrap();
        let store = RuleStore::new(dir.path());
        store
            .save(&[CategoryRule::new("Chat", &["slack.exe"], &[])])
            .unwrap();

        let resolver = resolver();
        assert_eq!(resolver.reload(&store).unwrap(), 1);
        assert_eq!(resolver.resolve("slack.exe", ""), "Chat");
        assert_eq!(resolver.resolve("code.exe", ""), DEFAULT_CATEGORY);
    }
}
