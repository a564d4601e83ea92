use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned when no rule matches
pub const DEFAULT_CATEGORY: &str = "Other";

/// Unicode-aware case-insensitive equality for process names and categories
#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// A closed usage session - one contiguous interval of foreground focus
///
/// Timestamps are local wall-clock time; the tracker works in UTC and converts
/// when the session is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSession {
    pub process_name: String,
    pub window_title: String,
    pub category: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub duration_seconds: i64,
}

impl UsageSession {
    /// Build a session from a UTC interval.
    ///
    /// Returns `None` when the interval is not at least one whole second long,
    /// which is how a backwards clock jump or a zero-length focus shows up.
    #[must_use]
    pub fn from_interval(
        process_name: String,
        window_title: String,
        category: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<Self> {
        let duration_seconds = end.signed_duration_since(start).num_seconds();
        if duration_seconds <= 0 {
            return None;
        }

        Some(Self {
            process_name,
            window_title,
            category,
            start_time: start.with_timezone(&Local),
            end_time: end.with_timezone(&Local),
            duration_seconds,
        })
    }
}

/// Maps process names and window-title keywords to a category label
///
/// Field names follow the `PascalCase` layout of existing `category-rules.json` files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CategoryRule {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub process_names: Vec<String>,
    #[serde(default)]
    pub window_title_keywords: Vec<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl CategoryRule {
    #[must_use]
    pub fn new(category: &str, process_names: &[&str], window_title_keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            process_names: process_names.iter().map(ToString::to_string).collect(),
            window_title_keywords: window_title_keywords
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Exact, case-insensitive process name match
    #[must_use]
    pub fn matches_process(&self, process_name: &str) -> bool {
        self.process_names
            .iter()
            .any(|p| eq_ignore_case(p, process_name))
    }

    /// Case-insensitive substring match of any keyword against the title
    #[must_use]
    pub fn matches_title(&self, window_title: &str) -> bool {
        if window_title.is_empty() {
            return false;
        }
        let title = window_title.to_lowercase();
        self.window_title_keywords
            .iter()
            .filter(|k| !k.is_empty())
            .any(|k| title.contains(&k.to_lowercase()))
    }

    /// Starter rule set written by `focusbuddy init`
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(
                "Development",
                &[
                    "code.exe",
                    "devenv.exe",
                    "rider64.exe",
                    "idea64.exe",
                    "windowsterminal.exe",
                    "alacritty.exe",
                ],
                &["visual studio", "github", "stack overflow"],
            ),
            Self::new(
                "Communication",
                &["slack.exe", "teams.exe", "outlook.exe", "zoom.exe"],
                &["gmail", "outlook"],
            ),
            Self::new(
                "Entertainment",
                &["steam.exe", "spotify.exe", "discord.exe", "vlc.exe"],
                &["youtube", "netflix", "twitch"],
            ),
            Self::new(
                "Productivity",
                &["winword.exe", "excel.exe", "powerpnt.exe", "notion.exe", "obsidian.exe"],
                &["google docs", "google sheets"],
            ),
            Self::new(
                "Browsing",
                &["chrome.exe", "firefox.exe", "msedge.exe", "brave.exe"],
                &[],
            ),
        ]
    }
}

/// User preferences persisted in `settings.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AppSettings {
    pub run_on_startup: bool,
    pub auto_minimize_distracting_apps: bool,
    pub focus_mode_enabled: bool,
    pub focus_mode_blacklist: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            run_on_startup: false,
            auto_minimize_distracting_apps: false,
            focus_mode_enabled: false,
            focus_mode_blacklist: vec![
                "youtube.exe".to_string(),
                "steam.exe".to_string(),
                "discord.exe".to_string(),
            ],
        }
    }
}

impl AppSettings {
    /// Case-insensitive blacklist lookup
    #[must_use]
    pub fn is_blacklisted(&self, process_name: &str) -> bool {
        self.focus_mode_blacklist
            .iter()
            .any(|p| eq_ignore_case(p, process_name))
    }
}

/// Seconds spent per category on one local day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsageSummary {
    pub date: NaiveDate,
    pub category: String,
    pub duration_seconds: i64,
}

/// Seconds spent in one process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUsageSummary {
    pub process_name: String,
    pub duration_seconds: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_session_requires_positive_duration() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let zero = UsageSession::from_interval(
            "a.exe".into(),
            String::new(),
            DEFAULT_CATEGORY.into(),
            start,
            start,
        );
        assert!(zero.is_none());

        let backwards = UsageSession::from_interval(
            "a.exe".into(),
            String::new(),
            DEFAULT_CATEGORY.into(),
            start,
            start - chrono::Duration::seconds(3),
        );
        assert!(backwards.is_none());
    }

    #[test]
    fn test_session_truncates_to_whole_seconds() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let sub_second = UsageSession::from_interval(
            "a.exe".into(),
            String::new(),
            DEFAULT_CATEGORY.into(),
            start,
            start + chrono::Duration::milliseconds(900),
        );
        assert!(sub_second.is_none());

        let session = UsageSession::from_interval(
            "a.exe".into(),
            "Alpha".into(),
            "Work".into(),
            start,
            start + chrono::Duration::milliseconds(6_400),
        )
        .unwrap();
        assert_eq!(session.duration_seconds, 6);
        assert_eq!(session.start_time, start.with_timezone(&Local));
    }

    #[test]
    fn test_rule_process_match_is_exact_and_case_insensitive() {
        let rule = CategoryRule::new("Dev", &["Code.exe"], &[]);
        assert!(rule.matches_process("code.exe"));
        assert!(rule.matches_process("CODE.EXE"));
        assert!(!rule.matches_process("vscode.exe"));
    }

    #[test]
    fn test_process_match_folds_non_ascii_case() {
        let rule = CategoryRule::new("Health", &["\u{e4}rzte.exe"], &["m\u{fc}nchen"]);
        assert!(rule.matches_process("\u{c4}rzte.exe"));
        assert!(rule.matches_title("Praxis M\u{dc}NCHEN"));

        let settings = AppSettings {
            focus_mode_blacklist: vec!["\u{c4}rzte.exe".into()],
            ..AppSettings::default()
        };
        assert!(settings.is_blacklisted("\u{e4}rzte.exe"));
        assert!(!eq_ignore_case("\u{e4}rzte.exe", "arzte.exe"));
    }

    #[test]
    fn test_rule_keyword_match_is_substring() {
        let rule = CategoryRule::new("Fun", &[], &["YouTube"]);
        assert!(rule.matches_title("Cats - youtube - Mozilla Firefox"));
        assert!(!rule.matches_title("Inbox - Gmail"));
        assert!(!rule.matches_title(""));
    }

    #[test]
    fn test_rule_json_uses_pascal_case() {
        let json = r#"[{"Category":"Dev","ProcessNames":["code.exe"],"WindowTitleKeywords":["github"]},{"ProcessNames":["x.exe"]}]"#;
        let rules: Vec<CategoryRule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules[0].category, "Dev");
        assert_eq!(rules[0].window_title_keywords, vec!["github"]);
        assert_eq!(rules[1].category, DEFAULT_CATEGORY);
        assert!(rules[1].window_title_keywords.is_empty());
    }

    #[test]
    fn test_settings_defaults_and_blacklist() {
        let settings: AppSettings = serde_json::from_str(r#"{"FocusModeEnabled":true}"#).unwrap();
        assert!(settings.focus_mode_enabled);
        assert!(!settings.auto_minimize_distracting_apps);
        assert!(settings.is_blacklisted("Steam.exe"));
        assert!(!settings.is_blacklisted("code.exe"));
    }
}
