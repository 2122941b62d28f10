use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    logging::LogConfig,
    observability::{ObservabilityConfig, SnapshotConfig},
    scheduling::{EscalationConfig, SweepConfig, WorkloadConfig},
};
use crate::validation::ConfigValidator;

/// 默认配置文件查找顺序
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/care-scheduler.toml",
    "care-scheduler.toml",
    "/etc/care-scheduler/config.toml",
];

/// 环境变量前缀，例如 `CARE_SCHEDULER_SWEEP__INTERVAL_SECONDS=60`
pub const ENV_PREFIX: &str = "CARE_SCHEDULER";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub sweep: SweepConfig,
    pub escalation: EscalationConfig,
    pub workload: WorkloadConfig,
    pub logging: LogConfig,
    pub observability: ObservabilityConfig,
    pub snapshot: SnapshotConfig,
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("escalation.sensitive_observation_types"),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.sweep.validate()?;
        self.escalation.validate()?;
        self.workload.validate()?;
        self.logging.validate()?;
        self.observability.validate()?;
        self.snapshot.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LogLevel, OutputFormat};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert!(config.sweep.enabled);
        assert_eq!(config.sweep.interval_seconds, 300);
        assert_eq!(config.workload.default_staff_minutes, 3600);
        assert_eq!(config.workload.due_window_minutes, 15);
        assert_eq!(config.escalation.sensitive_observation_types.len(), 3);
        assert!(!config.observability.metrics_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_from_toml() {
        let toml_str = r#"
[sweep]
interval_seconds = 60
persist_overdue_status = true
realert_after_minutes = 120

[escalation]
sensitive_observation_types = ["vital_signs", "fluid_balance"]

[workload]
default_staff_minutes = 2400

[workload.department_staff_minutes]
dementia-unit = 4800

[logging]
level = "debug"
format = "json"
"#;

        let config = AppConfig::from_toml(toml_str).expect("Failed to parse TOML");
        assert_eq!(config.sweep.interval_seconds, 60);
        assert!(config.sweep.persist_overdue_status);
        assert_eq!(config.sweep.realert_after_minutes, Some(120));
        assert_eq!(config.workload.staff_minutes_for("dementia-unit"), 4800);
        assert_eq!(config.workload.staff_minutes_for("ward-a"), 2400);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, OutputFormat::Json);
        // 未出现的配置段使用默认值
        assert_eq!(config.observability, ObservabilityConfig::default());
        assert!(config.sweep.enabled);
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        assert!(AppConfig::from_toml("[sweep]\ninterval_seconds = 0\n").is_err());
        assert!(AppConfig::from_toml(
            "[escalation]\nsensitive_observation_types = [\"telepathy\"]\n"
        )
        .is_err());
        assert!(AppConfig::from_toml("[logging]\nlevel = \"loud\"\n").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AppConfig::default();
        config.sweep.realert_after_minutes = Some(30);
        config
            .workload
            .department_staff_minutes
            .insert("ward-c".to_string(), 1200);

        let serialized = config.to_toml().expect("Failed to serialize");
        let parsed = AppConfig::from_toml(&serialized).expect("Failed to parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[sweep]\ninterval_seconds = 45\n\n[snapshot]\npath = \"data/seed.json\""
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::load(Some(&path)).expect("Failed to load config");
        assert_eq!(config.sweep.interval_seconds, 45);
        assert_eq!(config.snapshot.path.as_deref(), Some("data/seed.json"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let result = AppConfig::load(missing.to_str());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("配置文件不存在"));
    }
}
