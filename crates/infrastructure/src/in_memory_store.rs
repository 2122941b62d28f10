use async_trait::async_trait;
use care_scheduler_domain::{
    CareInstance, CareInstanceRepository, EscalationReason, InstanceRecord, ScheduleDay,
    ScheduleDayRepository,
};
use care_scheduler_errors::{CareError, CareResult};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// 内存存储
///
/// 护理记录以扁平的 [`InstanceRecord`] 保存，读取时再解码，
/// 因此可以容纳含未知枚举值的历史数据。版本检查在写锁内完成。
#[derive(Debug, Clone, Default)]
pub struct InMemoryCareStore {
    state: Arc<RwLock<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<i64, InstanceRecord>,
    days: HashMap<i64, ScheduleDay>,
    next_instance_id: i64,
    next_day_id: i64,
}

impl StoreState {
    fn allocate_instance_id(&mut self) -> i64 {
        self.next_instance_id += 1;
        self.next_instance_id
    }

    fn allocate_day_id(&mut self) -> i64 {
        self.next_day_id += 1;
        self.next_day_id
    }
}

impl InMemoryCareStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 原样导入存储记录（保留ID），不做解码校验
    pub async fn import_records(&self, records: Vec<InstanceRecord>) {
        let mut state = self.state.write().await;
        for record in records {
            state.next_instance_id = state.next_instance_id.max(record.id);
            state.records.insert(record.id, record);
        }
    }

    pub async fn import_days(&self, days: Vec<ScheduleDay>) {
        let mut state = self.state.write().await;
        for day in days {
            state.next_day_id = state.next_day_id.max(day.id);
            state.days.insert(day.id, day);
        }
    }

    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn day_count(&self) -> usize {
        self.state.read().await.days.len()
    }
}

fn sort_instances(instances: &mut [CareInstance]) {
    instances.sort_by(|a, b| {
        a.scheduled_time()
            .cmp(&b.scheduled_time())
            .then(a.id().cmp(&b.id()))
    });
}

#[async_trait]
impl CareInstanceRepository for InMemoryCareStore {
    async fn create(&self, instance: &CareInstance) -> CareResult<CareInstance> {
        instance.validate()?;

        let mut state = self.state.write().await;
        if !state.days.contains_key(&instance.schedule_day_id()) {
            return Err(CareError::day_not_found(instance.schedule_day_id()));
        }

        let mut created = instance.clone();
        created.set_id(state.allocate_instance_id());
        state
            .records
            .insert(created.id(), InstanceRecord::from(&created));

        debug!("创建{}", created.entity_description());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> CareResult<Option<CareInstance>> {
        let state = self.state.read().await;
        state
            .records
            .get(&id)
            .map(CareInstance::try_from)
            .transpose()
    }

    async fn find_by_day(&self, schedule_day_id: i64) -> CareResult<Vec<CareInstance>> {
        let state = self.state.read().await;
        let mut instances = state
            .records
            .values()
            .filter(|record| record.schedule_day_id == schedule_day_id)
            .map(CareInstance::try_from)
            .collect::<CareResult<Vec<_>>>()?;
        sort_instances(&mut instances);
        Ok(instances)
    }

    async fn list_records(&self) -> CareResult<Vec<InstanceRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<InstanceRecord> = state.records.values().cloned().collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        updated: &CareInstance,
    ) -> CareResult<bool> {
        let mut state = self.state.write().await;
        let stored = state
            .records
            .get(&updated.id())
            .ok_or_else(|| CareError::instance_not_found(updated.id()))?;

        if stored.version != expected_version {
            debug!(
                "护理记录 {} 版本冲突: 期望 {}, 实际 {}",
                updated.id(),
                expected_version,
                stored.version
            );
            return Ok(false);
        }

        let mut record = InstanceRecord::from(updated);
        record.last_escalated_at = stored.last_escalated_at;
        record.last_escalation_reason = stored.last_escalation_reason.clone();
        state.records.insert(record.id, record);
        Ok(true)
    }

    async fn mark_escalated(
        &self,
        id: i64,
        reason: EscalationReason,
        at: DateTime<Utc>,
    ) -> CareResult<()> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| CareError::instance_not_found(id))?;
        record.last_escalated_at = Some(at);
        record.last_escalation_reason = Some(reason.as_str().to_string());
        Ok(())
    }
}

#[async_trait]
impl ScheduleDayRepository for InMemoryCareStore {
    async fn create_if_absent(&self, day: &ScheduleDay) -> CareResult<ScheduleDay> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .days
            .values()
            .find(|d| d.department_id == day.department_id && d.date == day.date)
        {
            return Ok(existing.clone());
        }

        let mut created = day.clone();
        created.id = state.allocate_day_id();
        state.days.insert(created.id, created.clone());
        debug!("创建{}", created.entity_description());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> CareResult<Option<ScheduleDay>> {
        Ok(self.state.read().await.days.get(&id).cloned())
    }

    async fn find_by_department_date(
        &self,
        department_id: &str,
        date: NaiveDate,
    ) -> CareResult<Option<ScheduleDay>> {
        let state = self.state.read().await;
        Ok(state
            .days
            .values()
            .find(|d| d.department_id == department_id && d.date == date)
            .cloned())
    }

    async fn update(&self, expected_version: u64, updated: &ScheduleDay) -> CareResult<bool> {
        let mut state = self.state.write().await;
        let stored = state
            .days
            .get(&updated.id)
            .ok_or_else(|| CareError::day_not_found(updated.id))?;

        if stored.version != expected_version {
            return Ok(false);
        }
        state.days.insert(updated.id, updated.clone());
        Ok(true)
    }

    async fn list_active(&self) -> CareResult<Vec<ScheduleDay>> {
        let state = self.state.read().await;
        let mut days: Vec<ScheduleDay> = state
            .days
            .values()
            .filter(|d| d.is_active())
            .cloned()
            .collect();
        days.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(days)
    }
}
