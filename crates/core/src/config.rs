use std::collections::{HashMap, HashSet};
use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::WfqError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Env key overriding a queue's weight: `WFQ_QUEUE_{NAME}_WEIGHT`.
///
/// The name is upper-cased and every non-alphanumeric character becomes `_`.
pub fn weight_override_key(queue_name: &str) -> String {
    let normalized: String = queue_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("WFQ_QUEUE_{}_WEIGHT", normalized)
}

// ── Top-level config ──────────────────────────────────────────

/// Queue layout for a scheduler, typically parsed from TOML.
///
/// ```toml
/// [[queues]]
/// name = "interactive"
/// weight = 10
///
/// [[queues]]
/// name = "batch"
/// weight = 20
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub queues: Vec<QueueConfig>,
}

/// One weighted queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,
    pub weight: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queues: vec![
                QueueConfig {
                    name: "default".into(),
                    weight: 1,
                },
                QueueConfig {
                    name: "background".into(),
                    weight: 10,
                },
            ],
        }
    }
}

impl SchedulerConfig {
    /// Parse config from a TOML string, apply env overrides, and validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, WfqError> {
        Self::from_toml_with(toml_str, env_opt)
    }

    /// Like [`from_toml`](Self::from_toml) with an arbitrary override lookup.
    pub fn from_toml_with<F>(toml_str: &str, lookup: F) -> Result<Self, WfqError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WfqError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Load from `path` when given, otherwise use the defaults.
    ///
    /// A file that cannot be loaded is logged and replaced by the defaults.
    /// Env overrides apply on every path and the result is validated.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, WfqError> {
        Self::load_or_default_with(path, env_opt)
    }

    /// Like [`load_or_default`](Self::load_or_default) with an arbitrary
    /// override lookup.
    pub fn load_or_default_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, WfqError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loaded = path.map(|p| {
            std::fs::read_to_string(p)
                .map_err(WfqError::from)
                .and_then(|content| Self::from_toml_with(&content, &lookup))
        });

        match loaded {
            Some(Ok(config)) => {
                info!(path = %path.unwrap_or(Path::new("")).display(), "loaded scheduler config");
                Ok(config)
            }
            Some(Err(e)) => {
                warn!(
                    error = %e,
                    path = %path.unwrap_or(Path::new("")).display(),
                    "failed to load config, using defaults"
                );
                Self::defaults_with(lookup)
            }
            None => Self::defaults_with(lookup),
        }
    }

    fn defaults_with<F>(lookup: F) -> Result<Self, WfqError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Override queue weights from `WFQ_QUEUE_{NAME}_WEIGHT` env vars.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_opt);
    }

    /// Override queue weights using an arbitrary key lookup.
    ///
    /// Values that do not parse as an integer are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for queue in &mut self.queues {
            let key = weight_override_key(&queue.name);
            let Some(raw) = lookup(&key) else {
                continue;
            };
            match raw.trim().parse::<u32>() {
                Ok(weight) => {
                    info!(queue = %queue.name, from = queue.weight, to = weight, "queue weight overridden by {}", key);
                    queue.weight = weight;
                }
                Err(e) => {
                    warn!(queue = %queue.name, value = %raw, error = %e, "ignoring invalid weight override {}", key);
                }
            }
        }
    }

    /// Validate the config: at least one queue, unique non-empty names,
    /// positive weights, and no two names sharing an override key.
    pub fn validate(&self) -> Result<(), WfqError> {
        if self.queues.is_empty() {
            return Err(WfqError::Config("at least one queue must be configured".into()));
        }

        let mut seen = HashSet::new();
        let mut override_keys: HashMap<String, &str> = HashMap::new();
        for queue in &self.queues {
            if queue.name.trim().is_empty() {
                return Err(WfqError::Config("queue name must not be empty".into()));
            }
            if queue.weight == 0 {
                return Err(WfqError::Config(format!(
                    "queue '{}' must have a weight > 0",
                    queue.name
                )));
            }
            if !seen.insert(queue.name.as_str()) {
                return Err(WfqError::Config(format!(
                    "duplicate queue name '{}'",
                    queue.name
                )));
            }
            if let Some(other) = override_keys.insert(weight_override_key(&queue.name), &queue.name) {
                return Err(WfqError::Config(format!(
                    "queues '{}' and '{}' map to the same override key {}",
                    other,
                    queue.name,
                    weight_override_key(&queue.name)
                )));
            }
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        info!("Scheduler config loaded ({} queues):", self.queues.len());
        for queue in &self.queues {
            info!("  {:<16} weight={}", queue.name, queue.weight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_queues_from_toml() {
        let toml = r#"
[[queues]]
name = "interactive"
weight = 10

[[queues]]
name = "batch"
weight = 20
"#;
        let cfg = SchedulerConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.queues.len(), 2);
        assert_eq!(cfg.queues[0], QueueConfig { name: "interactive".into(), weight: 10 });
        assert_eq!(cfg.queues[1].weight, 20);
    }

    #[test]
    fn empty_config_is_rejected() {
        let err = SchedulerConfig::from_toml("").unwrap_err();
        assert!(matches!(err, WfqError::Config(_)));
        assert!(err.to_string().contains("at least one queue"));
    }

    #[test]
    fn zero_weight_is_rejected() {
        let toml = r#"
[[queues]]
name = "idle"
weight = 0
"#;
        let err = SchedulerConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("weight > 0"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let cfg = SchedulerConfig {
            queues: vec![
                QueueConfig { name: "a".into(), weight: 1 },
                QueueConfig { name: "a".into(), weight: 2 },
            ],
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate queue name 'a'"));
    }

    #[test]
    fn blank_name_is_rejected() {
        let cfg = SchedulerConfig {
            queues: vec![QueueConfig { name: "  ".into(), weight: 1 }],
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SchedulerConfig::from_toml("[[queues]\nname=").unwrap_err();
        assert!(matches!(err, WfqError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SchedulerConfig::from_file("/nonexistent/wfq/scheduler.toml").unwrap_err();
        assert!(matches!(err, WfqError::ConfigIo(_)));
    }

    #[test]
    fn override_key_normalizes_name() {
        assert_eq!(weight_override_key("batch"), "WFQ_QUEUE_BATCH_WEIGHT");
        assert_eq!(weight_override_key("low-prio.jobs"), "WFQ_QUEUE_LOW_PRIO_JOBS_WEIGHT");
    }

    #[test]
    fn overrides_replace_weights() {
        let mut cfg = SchedulerConfig::default();
        let vars: HashMap<&str, &str> = [
            ("WFQ_QUEUE_BACKGROUND_WEIGHT", "42"),
            ("WFQ_QUEUE_DEFAULT_WEIGHT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        cfg.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(cfg.queues[0].weight, 1, "invalid override is ignored");
        assert_eq!(cfg.queues[1].weight, 42);
    }

    #[test]
    fn names_sharing_an_override_key_are_rejected() {
        let cfg = SchedulerConfig {
            queues: vec![
                QueueConfig { name: "low-prio".into(), weight: 1 },
                QueueConfig { name: "low.prio".into(), weight: 2 },
            ],
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("WFQ_QUEUE_LOW_PRIO_WEIGHT"), "{}", err);
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults_with_overrides() {
        let lookup = |key: &str| (key == "WFQ_QUEUE_BACKGROUND_WEIGHT").then(|| "25".to_string());
        let cfg = SchedulerConfig::load_or_default_with(
            Some(Path::new("/nonexistent/wfq/scheduler.toml")),
            lookup,
        )
        .unwrap();

        assert_eq!(cfg.queues[0].name, "default");
        assert_eq!(cfg.queues[1].weight, 25);
    }

    #[test]
    fn defaults_apply_overrides_and_validate() {
        let cfg = SchedulerConfig::load_or_default_with(None, |key: &str| {
            (key == "WFQ_QUEUE_DEFAULT_WEIGHT").then(|| "3".to_string())
        })
        .unwrap();
        assert_eq!(cfg.queues[0].weight, 3);

        let err = SchedulerConfig::load_or_default_with(None, |key: &str| {
            (key == "WFQ_QUEUE_DEFAULT_WEIGHT").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("weight > 0"));
    }

    #[test]
    fn file_values_win_over_defaults() {
        let path = std::env::temp_dir().join(format!("wfq-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[[queues]]\nname = \"only\"\nweight = 4\n").unwrap();

        let cfg = SchedulerConfig::load_or_default_with(Some(&path), |_: &str| None).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.queues, vec![QueueConfig { name: "only".into(), weight: 4 }]);
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = SchedulerConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.queues.len(), 2);
        assert_eq!(cfg.queues[0].name, "default");
        assert_eq!(cfg.queues[1].name, "background");
    }
}
