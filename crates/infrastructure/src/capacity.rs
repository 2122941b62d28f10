use async_trait::async_trait;
use care_scheduler_config::WorkloadConfig;
use care_scheduler_domain::CapacityProvider;
use care_scheduler_errors::CareResult;
use chrono::NaiveDate;
use std::collections::HashMap;

/// 按部门固定配置的人力容量，与日期无关
#[derive(Debug, Clone)]
pub struct StaticCapacityProvider {
    default_minutes: u64,
    departments: HashMap<String, u64>,
}

impl StaticCapacityProvider {
    pub fn new(default_minutes: u64) -> Self {
        Self {
            default_minutes,
            departments: HashMap::new(),
        }
    }

    pub fn with_department(mut self, department_id: impl Into<String>, minutes: u64) -> Self {
        self.departments.insert(department_id.into(), minutes);
        self
    }

    pub fn from_config(config: &WorkloadConfig) -> Self {
        Self {
            default_minutes: config.default_staff_minutes,
            departments: config.department_staff_minutes.clone(),
        }
    }
}

#[async_trait]
impl CapacityProvider for StaticCapacityProvider {
    async fn staff_minutes(&self, department_id: &str, _date: NaiveDate) -> CareResult<u64> {
        Ok(self
            .departments
            .get(department_id)
            .copied()
            .unwrap_or(self.default_minutes))
    }
}
