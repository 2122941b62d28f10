//! JSON 快照：启动时把外部导出的排班日与护理记录载入内存存储

use care_scheduler_domain::{InstanceRecord, ScheduleDay};
use care_scheduler_errors::{CareError, CareResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::in_memory_store::InMemoryCareStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub schedule_days: Vec<ScheduleDay>,
    #[serde(default)]
    pub instances: Vec<InstanceRecord>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> CareResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> CareResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CareError::storage_error(format!("读取快照文件失败 {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> CareResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn into_store(self) -> InMemoryCareStore {
        let store = InMemoryCareStore::new();
        info!(
            "载入快照: {} 个排班日, {} 条护理记录",
            self.schedule_days.len(),
            self.instances.len()
        );
        store.import_days(self.schedule_days).await;
        store.import_records(self.instances).await;
        store
    }
}
