use anyhow::Result;
use focusbuddy_core::monitor::normalize_process_name;
use focusbuddy_storage::{eq_ignore_case, CategoryRule, RuleStore};
use std::path::Path;
use tabled::{Table, Tabled};

use super::helpers::{notify_daemon, Reload};

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "#")]
    order: usize,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Processes")]
    processes: String,
    #[tabled(rename = "Title keywords")]
    keywords: String,
}

pub fn list_categories(data_dir: &Path) -> Result<()> {
    let store = RuleStore::new(data_dir);
    let rules = store.load()?;

    if rules.is_empty() {
        println!("No category rules in {}", store.path().display());
        println!("Run 'focusbuddy init' for a default set.");
        return Ok(());
    }

    let rows: Vec<RuleRow> = rules
        .into_iter()
        .enumerate()
        .map(|(i, rule)| RuleRow {
            order: i + 1,
            category: rule.category,
            processes: rule.process_names.join(", "),
            keywords: rule.window_title_keywords.join(", "),
        })
        .collect();

    println!("{}", Table::new(rows));
    println!("Rules are checked top to bottom; unmatched windows are 'Other'.");
    Ok(())
}

pub async fn add_category(
    data_dir: &Path,
    category: &str,
    processes: Vec<String>,
    keywords: Vec<String>,
) -> Result<()> {
    if processes.is_empty() && keywords.is_empty() {
        anyhow::bail!("Give at least one --process or --keyword");
    }

    let store = RuleStore::new(data_dir);
    let mut rules = store.load()?;
    let created = upsert_rule(&mut rules, category, processes, keywords);
    store.save(&rules)?;

    if created {
        println!("Added category '{category}'");
    } else {
        println!("Updated category '{category}'");
    }

    notify_daemon(data_dir, Reload::Rules).await;
    Ok(())
}

pub async fn remove_category(data_dir: &Path, category: &str) -> Result<()> {
    let store = RuleStore::new(data_dir);
    let mut rules = store.load()?;

    if !remove_rule(&mut rules, category) {
        println!("No rule for category '{category}'");
        return Ok(());
    }

    store.save(&rules)?;
    println!("Removed category '{category}'");
    notify_daemon(data_dir, Reload::Rules).await;
    Ok(())
}

/// Merge matchers into the rule for `category`, appending a new rule if there is none.
/// Returns whether a rule was created.
fn upsert_rule(
    rules: &mut Vec<CategoryRule>,
    category: &str,
    processes: Vec<String>,
    keywords: Vec<String>,
) -> bool {
    let processes = processes.iter().map(|p| normalize_process_name(p));
    let keywords = keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());

    let existing = rules
        .iter()
        .position(|r| eq_ignore_case(&r.category, category));

    let (rule, created) = match existing {
        Some(i) => (&mut rules[i], false),
        None => {
            rules.push(CategoryRule::new(category, &[], &[]));
            let last = rules.len() - 1;
            (&mut rules[last], true)
        }
    };

    for process in processes {
        if !rule.matches_process(&process) {
            rule.process_names.push(process);
        }
    }
    for keyword in keywords {
        if !rule
            .window_title_keywords
            .iter()
            .any(|k| eq_ignore_case(k, &keyword))
        {
            rule.window_title_keywords.push(keyword);
        }
    }

    created
}

fn remove_rule(rules: &mut Vec<CategoryRule>, category: &str) -> bool {
    let before = rules.len();
    rules.retain(|r| !eq_ignore_case(&r.category, category));
    rules.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_upsert_appends_new_rule() {
        let mut rules = vec![CategoryRule::new("Chat", &["slack.exe"], &[])];

        let created = upsert_rule(
            &mut rules,
            "Games",
            vec!["Steam".into()],
            vec!["  twitch ".into(), String::new()],
        );

        assert!(created);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].process_names, vec!["steam.exe"]);
        assert_eq!(rules[1].window_title_keywords, vec!["twitch"]);
    }

    #[test]
    fn test_upsert_merges_without_duplicates() {
        let mut rules = vec![CategoryRule::new("Chat", &["slack.exe"], &["zoom"])];

        let created = upsert_rule(
            &mut rules,
            "chat",
            vec!["SLACK.exe".into(), "teams.exe".into()],
            vec!["Zoom".into()],
        );

        assert!(!created);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].process_names, vec!["slack.exe", "teams.exe"]);
        assert_eq!(rules[0].window_title_keywords, vec!["zoom"]);
    }

    #[test]
    fn test_remove_rule() {
        let mut rules = vec![
            CategoryRule::new("Chat", &["slack.exe"], &[]),
            CategoryRule::new("Games", &["steam.exe"], &[]),
        ];

        assert!(remove_rule(&mut rules, "GAMES"));
        assert!(!remove_rule(&mut rules, "Games"));
        assert_eq!(rules.len(), 1);
    }

    #[tokio::test]
    async fn test_add_category_persists() {
        let dir = tempdir().unwrap();

        add_category(dir.path(), "Docs", Vec::new(), vec!["confluence".into()])
            .await
            .unwrap();

        let rules = RuleStore::new(dir.path()).load().unwrap();
        assert_eq!(rules[0].category, "Docs");
        assert!(add_category(dir.path(), "Empty", Vec::new(), Vec::new())
            .await
            .is_err());
    }
}
