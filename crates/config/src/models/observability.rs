use crate::validation::{validate_not_empty, ConfigValidator};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
    /// Prometheus 抓取地址
    pub metrics_listen_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_listen_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn listen_addr(&self) -> crate::ConfigResult<SocketAddr> {
        self.metrics_listen_address.parse().map_err(|e| {
            crate::ConfigError::Validation(format!(
                "observability.metrics_listen_address 无效: {} ({e})",
                self.metrics_listen_address
            ))
        })
    }
}

impl ConfigValidator for ObservabilityConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.metrics_enabled {
            validate_not_empty(
                &self.metrics_listen_address,
                "observability.metrics_listen_address",
            )?;
            self.listen_addr()?;
        }
        Ok(())
    }
}

/// 启动时用于填充内存存储的 JSON 快照
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: Option<String>,
}

impl ConfigValidator for SnapshotConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if let Some(path) = &self.path {
            validate_not_empty(path, "snapshot.path")?;
        }
        Ok(())
    }
}
