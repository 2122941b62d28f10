use std::collections::HashMap;
use std::time::Duration;

use care_scheduler_domain::{EscalationPolicy, ObservationType};
use serde::{Deserialize, Serialize};

use crate::validation::{validate_positive, validate_range, ConfigValidator};
use crate::{ConfigError, ConfigResult};

/// 逾期/升级巡检配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SweepConfig {
    pub enabled: bool,
    /// 巡检间隔（秒）
    pub interval_seconds: u64,
    /// 把逾期状态写回存储
    pub persist_overdue_status: bool,
    /// 同一原因再次告警前的静默时间（分钟），None 表示不重复告警
    pub realert_after_minutes: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 300,
            persist_overdue_status: false,
            realert_after_minutes: None,
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl ConfigValidator for SweepConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_range(self.interval_seconds, 1, 86_400, "sweep.interval_seconds")?;
        if let Some(minutes) = self.realert_after_minutes {
            validate_positive(minutes, "sweep.realert_after_minutes")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EscalationConfig {
    /// 逾期超过一个周期即升级的观察类型
    pub sensitive_observation_types: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            sensitive_observation_types: vec![
                "vital_signs".to_string(),
                "pain_assessment".to_string(),
                "safety_check".to_string(),
            ],
        }
    }
}

impl EscalationConfig {
    pub fn sensitive_types(&self) -> ConfigResult<Vec<ObservationType>> {
        self.sensitive_observation_types
            .iter()
            .map(|value| {
                value.parse::<ObservationType>().map_err(|e| {
                    ConfigError::Validation(format!(
                        "escalation.sensitive_observation_types 包含无效类型: {e}"
                    ))
                })
            })
            .collect()
    }

    pub fn policy(&self) -> ConfigResult<EscalationPolicy> {
        Ok(EscalationPolicy::new(self.sensitive_types()?))
    }
}

impl ConfigValidator for EscalationConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.sensitive_types().map(|_| ())
    }
}

/// 工作负荷计算所需的人力配置，未单独配置的部门使用默认值
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkloadConfig {
    pub default_staff_minutes: u64,
    pub department_staff_minutes: HashMap<String, u64>,
    /// 计划时间前多少分钟视为"到期"
    pub due_window_minutes: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            default_staff_minutes: 3600,
            department_staff_minutes: HashMap::new(),
            due_window_minutes: 15,
        }
    }
}

impl WorkloadConfig {
    pub fn staff_minutes_for(&self, department_id: &str) -> u64 {
        self.department_staff_minutes
            .get(department_id)
            .copied()
            .unwrap_or(self.default_staff_minutes)
    }
}

impl ConfigValidator for WorkloadConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.default_staff_minutes, "workload.default_staff_minutes")?;
        validate_range(self.due_window_minutes, 0, 1440, "workload.due_window_minutes")?;
        for (department, minutes) in &self.department_staff_minutes {
            validate_positive(
                *minutes,
                &format!("workload.department_staff_minutes.{department}"),
            )?;
        }
        Ok(())
    }
}
