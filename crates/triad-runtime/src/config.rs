//! Runtime configuration
//!
//! Defaults, then an optional file, then `TRIAD_`-prefixed environment
//! variables. Nested keys use a double underscore, e.g.
//! `TRIAD_CONSOLIDATION__INTERVAL_SECS=3600`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use triad_fusion::FusionWeights;

use crate::error::{RuntimeError, RuntimeResult};

/// Top-level runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriadConfig {
    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub fusion: FusionWeights,

    #[serde(default)]
    pub alignment: AlignmentConfig,

    #[serde(default)]
    pub consolidation: ConsolidationConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TriadConfig {
    /// Load configuration from an optional file path and the environment.
    pub fn load(path: Option<&str>) -> RuntimeResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&TriadConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TRIAD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: TriadConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RuntimeResult<()> {
        self.fusion.validate()?;
        if self.consolidation.interval_secs == 0 {
            return Err(RuntimeError::Config(
                "consolidation.interval_secs must be greater than zero".into(),
            ));
        }
        if self.consolidation.report_retention == 0 {
            return Err(RuntimeError::Config(
                "consolidation.report_retention must be greater than zero".into(),
            ));
        }
        if self.consolidation.cleanup_enabled && self.consolidation.cleanup_max_age_days == 0 {
            return Err(RuntimeError::Config(
                "consolidation.cleanup_max_age_days must be greater than zero".into(),
            ));
        }
        if self.pipeline.analyzer_timeout_ms == 0 {
            return Err(RuntimeError::Config(
                "pipeline.analyzer_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Policy rule set location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
        }
    }
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("config/ethical_rules.json")
}

/// Alignment store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    #[serde(default = "default_profiles_path")]
    pub profiles_path: PathBuf,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            profiles_path: default_profiles_path(),
        }
    }
}

fn default_profiles_path() -> PathBuf {
    PathBuf::from("data/profiles.jsonl")
}

/// Consolidation scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,

    /// Newest reports kept in the report file
    #[serde(default = "default_report_retention")]
    pub report_retention: usize,

    #[serde(default)]
    pub cleanup_enabled: bool,

    #[serde(default = "default_cleanup_max_age_days")]
    pub cleanup_max_age_days: u32,
}

impl ConsolidationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cleanup_max_age(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.cleanup_max_age_days))
    }
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            report_path: default_report_path(),
            report_retention: default_report_retention(),
            cleanup_enabled: false,
            cleanup_max_age_days: default_cleanup_max_age_days(),
        }
    }
}

fn default_interval_secs() -> u64 {
    triad_consolidation::DEFAULT_INTERVAL.as_secs()
}

fn default_report_path() -> PathBuf {
    PathBuf::from("data/consolidation_reports.json")
}

fn default_report_retention() -> usize {
    triad_consolidation::DEFAULT_REPORT_RETENTION
}

fn default_cleanup_max_age_days() -> u32 {
    30
}

/// Per-input pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on each analyzer call
    #[serde(default = "default_analyzer_timeout_ms")]
    pub analyzer_timeout_ms: u64,
}

impl PipelineConfig {
    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analyzer_timeout_ms: default_analyzer_timeout_ms(),
        }
    }
}

fn default_analyzer_timeout_ms() -> u64 {
    5000
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TriadConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.consolidation.interval_secs, 21_600);
        assert_eq!(config.pipeline.analyzer_timeout(), Duration::from_secs(5));
        assert!(!config.consolidation.cleanup_enabled);
        assert_eq!(config.consolidation.report_retention, 500);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_report_retention_rejected() {
        let mut config = TriadConfig::default();
        config.consolidation.report_retention = 0;
        assert!(matches!(config.validate(), Err(RuntimeError::Config(_))));
    }

    #[test]
    fn zero_interval_rejected() {
        let mut config = TriadConfig::default();
        config.consolidation.interval_secs = 0;
        assert!(matches!(config.validate(), Err(RuntimeError::Config(_))));
    }

    #[test]
    fn unnormalised_weights_rejected() {
        let mut config = TriadConfig::default();
        config.fusion = FusionWeights {
            emotional: 0.5,
            linguistic: 0.5,
            interaction: 0.5,
        };
        assert!(matches!(config.validate(), Err(RuntimeError::Fusion(_))));
    }

    #[test]
    fn load_layers_file_over_defaults() {
        let dir = std::env::temp_dir().join(format!("triad_config_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("triad.toml");
        std::fs::write(
            &path,
            r#"
[consolidation]
interval_secs = 60
report_path = "/tmp/reports.json"

[fusion]
emotional = 0.5
linguistic = 0.25
interaction = 0.25

[logging]
json = true
"#,
        )
        .unwrap();

        let config = TriadConfig::load(path.to_str()).unwrap();
        assert_eq!(config.consolidation.interval_secs, 60);
        assert_eq!(config.consolidation.report_path, PathBuf::from("/tmp/reports.json"));
        assert_eq!(config.consolidation.cleanup_max_age_days, 30);
        assert!((config.fusion.emotional - 0.5).abs() < f64::EPSILON);
        assert!(config.logging.json);
        assert_eq!(config.pipeline.analyzer_timeout_ms, 5000);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = TriadConfig::load(Some("/nonexistent/triad-config")).unwrap();
        assert_eq!(config.consolidation.interval_secs, 21_600);
    }
}
