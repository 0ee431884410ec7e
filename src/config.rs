//! Configuration loading for leadflow.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.leadflow/config.toml`)
//! 3. User config (`~/.leadflow/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The defaults reproduce the production
//! routing rules exactly.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::LeadCategory;
use crate::error::{LeadflowError, Result};

/// Main configuration struct for leadflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Form flow behavior.
    pub flow: FlowConfig,
    /// Categorization rule parameters.
    pub rules: RulesConfig,
    /// Counsellor routing.
    pub routing: RoutingConfig,
    /// Analytics and record sinks.
    pub sinks: SinksConfig,
}

/// Form flow behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlowConfig {
    /// Seconds the evaluation animation runs before step 2.5 or step 3.
    pub evaluation_delay_seconds: u32,
    /// Whether step 2 may navigate back to step 1.
    pub allow_back_navigation: bool,
}

/// Upper bound for the evaluation delay (5 minutes).
pub const MAX_EVALUATION_DELAY_SECONDS: u32 = 300;

impl FlowConfig {
    /// Check if an evaluation delay is valid.
    pub fn is_valid_evaluation_delay(value: u32) -> bool {
        value <= MAX_EVALUATION_DELAY_SECONDS
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            evaluation_delay_seconds: 10,
            allow_back_navigation: true,
        }
    }
}

/// Categorization rule parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// A GPA equal to this value is treated as spam.
    pub spam_gpa: f64,
    /// A percentage equal to this value is treated as spam.
    pub spam_percentage: f64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            spam_gpa: 10.0,
            spam_percentage: 100.0,
        }
    }
}

impl RulesConfig {
    /// Check if a spam threshold is usable (finite and non-negative).
    pub fn is_valid_threshold(value: f64) -> bool {
        value.is_finite() && value >= 0.0
    }
}

/// Counsellor assigned to each qualified segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Counsellor for bch leads.
    pub bch_counsellor: String,
    /// Counsellor for both Luminaire tiers.
    pub luminaire_counsellor: String,
    /// Counsellor for both masters tiers.
    pub masters_counsellor: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            bch_counsellor: "Viswanathan".to_string(),
            luminaire_counsellor: "Karthik Lakshman".to_string(),
            masters_counsellor: "Masters Counselling Team".to_string(),
        }
    }
}

impl RoutingConfig {
    /// Counsellor for a category, if the category books counselling.
    pub fn counsellor_for(&self, category: LeadCategory) -> Option<&str> {
        match category {
            LeadCategory::Bch => Some(&self.bch_counsellor),
            LeadCategory::LumL1 | LeadCategory::LumL2 => Some(&self.luminaire_counsellor),
            LeadCategory::MastersL1 | LeadCategory::MastersL2 => Some(&self.masters_counsellor),
            LeadCategory::Nurture | LeadCategory::Drop => None,
        }
    }
}

/// Analytics and record sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SinksConfig {
    /// Whether analytics events are appended.
    pub analytics_enabled: bool,
    /// Whether session records are appended at each checkpoint.
    pub records_enabled: bool,
    /// Analytics log file name under the leadflow home.
    pub analytics_log: String,
    /// Record log file name under the leadflow home.
    pub records_log: String,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            analytics_enabled: true,
            records_enabled: true,
            analytics_log: "analytics.log".to_string(),
            records_log: "records.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.leadflow/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = leadflow_home()?;
        Self::load_existing(&home.join("config.toml"))
    }

    /// Load project config from the nearest `.leadflow/config.toml`.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let config_path = find_project_root(cwd)
            .join(".leadflow")
            .join("config.toml");
        Self::load_existing(&config_path)
    }

    /// Load a config file if it exists, warning when it does not parse.
    fn load_existing(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| LeadflowError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| LeadflowError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // LEADFLOW_EVALUATION_DELAY
        if let Ok(val) = env::var("LEADFLOW_EVALUATION_DELAY") {
            match val.parse::<u32>() {
                Ok(n) if FlowConfig::is_valid_evaluation_delay(n) => {
                    self.flow.evaluation_delay_seconds = n;
                }
                _ => tracing::warn!(
                    value = %val,
                    max = MAX_EVALUATION_DELAY_SECONDS,
                    default = self.flow.evaluation_delay_seconds,
                    "invalid LEADFLOW_EVALUATION_DELAY, keeping current value"
                ),
            }
        }

        // LEADFLOW_ALLOW_BACK
        if let Ok(val) = env::var("LEADFLOW_ALLOW_BACK") {
            self.flow.allow_back_navigation = val == "true" || val == "1";
        }

        // LEADFLOW_SPAM_GPA
        if let Ok(val) = env::var("LEADFLOW_SPAM_GPA") {
            match val.parse::<f64>() {
                Ok(n) if RulesConfig::is_valid_threshold(n) => self.rules.spam_gpa = n,
                _ => tracing::warn!(
                    value = %val,
                    default = self.rules.spam_gpa,
                    "invalid LEADFLOW_SPAM_GPA, keeping current value"
                ),
            }
        }

        // LEADFLOW_SPAM_PERCENTAGE
        if let Ok(val) = env::var("LEADFLOW_SPAM_PERCENTAGE") {
            match val.parse::<f64>() {
                Ok(n) if RulesConfig::is_valid_threshold(n) => self.rules.spam_percentage = n,
                _ => tracing::warn!(
                    value = %val,
                    default = self.rules.spam_percentage,
                    "invalid LEADFLOW_SPAM_PERCENTAGE, keeping current value"
                ),
            }
        }

        // LEADFLOW_ANALYTICS_ENABLED
        if let Ok(val) = env::var("LEADFLOW_ANALYTICS_ENABLED") {
            self.sinks.analytics_enabled = val == "true" || val == "1";
        }

        // LEADFLOW_RECORDS_ENABLED
        if let Ok(val) = env::var("LEADFLOW_RECORDS_ENABLED") {
            self.sinks.records_enabled = val == "true" || val == "1";
        }
    }

    /// Merge another config into this one.
    ///
    /// Field by field: every value in `other` that differs from the default
    /// wins. A layer cannot reset a lower layer's value back to the default.
    fn merge(mut self, other: Config) -> Self {
        let default_flow = FlowConfig::default();
        if other.flow.evaluation_delay_seconds != default_flow.evaluation_delay_seconds {
            self.flow.evaluation_delay_seconds = other.flow.evaluation_delay_seconds;
        }
        if other.flow.allow_back_navigation != default_flow.allow_back_navigation {
            self.flow.allow_back_navigation = other.flow.allow_back_navigation;
        }

        let default_rules = RulesConfig::default();
        if other.rules.spam_gpa != default_rules.spam_gpa {
            self.rules.spam_gpa = other.rules.spam_gpa;
        }
        if other.rules.spam_percentage != default_rules.spam_percentage {
            self.rules.spam_percentage = other.rules.spam_percentage;
        }

        let default_routing = RoutingConfig::default();
        if other.routing.bch_counsellor != default_routing.bch_counsellor {
            self.routing.bch_counsellor = other.routing.bch_counsellor;
        }
        if other.routing.luminaire_counsellor != default_routing.luminaire_counsellor {
            self.routing.luminaire_counsellor = other.routing.luminaire_counsellor;
        }
        if other.routing.masters_counsellor != default_routing.masters_counsellor {
            self.routing.masters_counsellor = other.routing.masters_counsellor;
        }

        let default_sinks = SinksConfig::default();
        if other.sinks.analytics_enabled != default_sinks.analytics_enabled {
            self.sinks.analytics_enabled = other.sinks.analytics_enabled;
        }
        if other.sinks.records_enabled != default_sinks.records_enabled {
            self.sinks.records_enabled = other.sinks.records_enabled;
        }
        if other.sinks.analytics_log != default_sinks.analytics_log {
            self.sinks.analytics_log = other.sinks.analytics_log;
        }
        if other.sinks.records_log != default_sinks.records_log {
            self.sinks.records_log = other.sinks.records_log;
        }

        self
    }

    /// Path of the analytics log under the leadflow home.
    pub fn analytics_log_path(&self) -> Option<PathBuf> {
        leadflow_home().map(|h| h.join(&self.sinks.analytics_log))
    }

    /// Path of the record log under the leadflow home.
    pub fn records_log_path(&self) -> Option<PathBuf> {
        leadflow_home().map(|h| h.join(&self.sinks.records_log))
    }
}

/// Get the leadflow home directory.
///
/// Checks `LEADFLOW_HOME` first, then falls back to `~/.leadflow`.
pub fn leadflow_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("LEADFLOW_HOME") {
        if home.is_empty() {
            tracing::warn!("LEADFLOW_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("LEADFLOW_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".leadflow"));
    }

    let fallback_path = std::env::temp_dir().join("leadflow");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Find the project root: the nearest ancestor holding `.leadflow/`, else `cwd`.
pub fn find_project_root(cwd: &Path) -> PathBuf {
    for ancestor in cwd.ancestors() {
        if ancestor.join(".leadflow").is_dir() {
            return ancestor.to_path_buf();
        }
    }
    cwd.to_path_buf()
}

/// Get the sessions directory (`<leadflow_home>/sessions/`).
pub fn sessions_dir() -> Option<PathBuf> {
    leadflow_home().map(|h| h.join("sessions"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.flow.evaluation_delay_seconds, 10);
        assert!(config.flow.allow_back_navigation);

        assert!((config.rules.spam_gpa - 10.0).abs() < f64::EPSILON);
        assert!((config.rules.spam_percentage - 100.0).abs() < f64::EPSILON);

        assert_eq!(config.routing.bch_counsellor, "Viswanathan");
        assert_eq!(config.routing.luminaire_counsellor, "Karthik Lakshman");

        assert!(config.sinks.analytics_enabled);
        assert!(config.sinks.records_enabled);
        assert_eq!(config.sinks.analytics_log, "analytics.log");
    }

    #[test]
    fn test_counsellor_for() {
        let routing = RoutingConfig::default();
        assert_eq!(routing.counsellor_for(LeadCategory::Bch), Some("Viswanathan"));
        assert_eq!(
            routing.counsellor_for(LeadCategory::LumL1),
            Some("Karthik Lakshman")
        );
        assert_eq!(
            routing.counsellor_for(LeadCategory::LumL2),
            Some("Karthik Lakshman")
        );
        assert!(routing.counsellor_for(LeadCategory::MastersL1).is_some());
        assert_eq!(routing.counsellor_for(LeadCategory::Nurture), None);
        assert_eq!(routing.counsellor_for(LeadCategory::Drop), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let toml_content = r#"
[flow]
evaluation_delay_seconds = 4

[routing]
bch_counsellor = "Asha"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.flow.evaluation_delay_seconds, 4);
        assert_eq!(config.routing.bch_counsellor, "Asha");
        // Other fields should be defaults
        assert_eq!(config.routing.luminaire_counsellor, "Karthik Lakshman");
        assert!(config.sinks.records_enabled);
    }

    #[test]
    fn test_load_from_file_missing() {
        let result = Config::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let result = Config::load_from_file(&config_path);
        assert!(matches!(result, Err(LeadflowError::Config { .. })));
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".leadflow");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(
            project_dir.join("config.toml"),
            "[flow]\nevaluation_delay_seconds = 2\n",
        )
        .unwrap();

        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.flow.evaluation_delay_seconds, 2);
        assert!(config.flow.allow_back_navigation);
    }

    #[test]
    #[serial]
    fn test_project_config_found_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".leadflow");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(
            project_dir.join("config.toml"),
            "[routing]\nluminaire_counsellor = \"Meera\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::load_from_cwd(&nested);
        assert_eq!(config.routing.luminaire_counsellor, "Meera");
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".leadflow");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(
            project_dir.join("config.toml"),
            "[flow]\nevaluation_delay_seconds = 2\n",
        )
        .unwrap();

        env::set_var("LEADFLOW_EVALUATION_DELAY", "7");
        let config = Config::load_from_cwd(dir.path());
        env::remove_var("LEADFLOW_EVALUATION_DELAY");

        assert_eq!(config.flow.evaluation_delay_seconds, 7);
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        env::set_var("LEADFLOW_ALLOW_BACK", "false");
        env::set_var("LEADFLOW_SPAM_GPA", "9.9");
        env::set_var("LEADFLOW_SPAM_PERCENTAGE", "99");
        env::set_var("LEADFLOW_ANALYTICS_ENABLED", "0");
        env::set_var("LEADFLOW_RECORDS_ENABLED", "false");

        let mut config = Config::default();
        config.apply_env_overrides();

        env::remove_var("LEADFLOW_ALLOW_BACK");
        env::remove_var("LEADFLOW_SPAM_GPA");
        env::remove_var("LEADFLOW_SPAM_PERCENTAGE");
        env::remove_var("LEADFLOW_ANALYTICS_ENABLED");
        env::remove_var("LEADFLOW_RECORDS_ENABLED");

        assert!(!config.flow.allow_back_navigation);
        assert!((config.rules.spam_gpa - 9.9).abs() < f64::EPSILON);
        assert!((config.rules.spam_percentage - 99.0).abs() < f64::EPSILON);
        assert!(!config.sinks.analytics_enabled);
        assert!(!config.sinks.records_enabled);
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        env::set_var("LEADFLOW_EVALUATION_DELAY", "forever");
        env::set_var("LEADFLOW_SPAM_GPA", "-1");

        let mut config = Config::default();
        config.apply_env_overrides();

        env::remove_var("LEADFLOW_EVALUATION_DELAY");
        env::remove_var("LEADFLOW_SPAM_GPA");

        assert_eq!(config.flow.evaluation_delay_seconds, 10);
        assert!((config.rules.spam_gpa - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_field_by_field() {
        let mut user = Config::default();
        user.routing.bch_counsellor = "Asha".to_string();
        user.flow.evaluation_delay_seconds = 5;

        let mut project = Config::default();
        project.flow.evaluation_delay_seconds = 3;

        let merged = Config::default().merge(user).merge(project);
        assert_eq!(merged.routing.bch_counsellor, "Asha");
        assert_eq!(merged.flow.evaluation_delay_seconds, 3);
    }

    #[test]
    #[serial]
    fn test_leadflow_home_env() {
        let dir = TempDir::new().unwrap();
        env::set_var("LEADFLOW_HOME", dir.path());
        let home = leadflow_home();
        let sessions = sessions_dir();
        env::remove_var("LEADFLOW_HOME");

        assert_eq!(home, Some(dir.path().to_path_buf()));
        assert_eq!(sessions, Some(dir.path().join("sessions")));
    }

    #[test]
    #[serial]
    fn test_sink_paths_use_configured_names() {
        let dir = TempDir::new().unwrap();
        env::set_var("LEADFLOW_HOME", dir.path());
        let mut config = Config::default();
        config.sinks.records_log = "webhook.log".to_string();
        let records = config.records_log_path();
        let analytics = config.analytics_log_path();
        env::remove_var("LEADFLOW_HOME");

        assert_eq!(records, Some(dir.path().join("webhook.log")));
        assert_eq!(analytics, Some(dir.path().join("analytics.log")));
    }
}
