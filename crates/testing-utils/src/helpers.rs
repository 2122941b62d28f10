//! Test helper utilities

use care_scheduler_domain::{
    CareInstance, CareInstanceRepository, ScheduleDay, ScheduleDayRepository,
};
use care_scheduler_infrastructure::InMemoryCareStore;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// 测试统一使用的排班日期
pub fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap_or_default()
}

/// [`fixed_date`] 当天的某个 UTC 时间
pub fn fixed_time(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

/// 内存存储与已创建的排班日
pub struct SeededStore {
    pub store: InMemoryCareStore,
    pub day: ScheduleDay,
}

impl SeededStore {
    /// 创建带一个活动排班日的内存存储
    pub async fn new(day: ScheduleDay) -> Self {
        let store = InMemoryCareStore::new();
        let day = match store.create_if_absent(&day).await {
            Ok(day) => day,
            Err(e) => panic!("failed to seed schedule day: {e}"),
        };
        Self { store, day }
    }

    /// 把记录挂到已创建的排班日下并保存
    pub async fn add(&self, mut instance: CareInstance) -> CareInstance {
        match &mut instance {
            CareInstance::Task(task) => task.schedule_day_id = self.day.id,
            CareInstance::Observation(obs) => obs.schedule_day_id = self.day.id,
        }
        match self.store.create(&instance).await {
            Ok(created) => created,
            Err(e) => panic!("failed to seed instance: {e}"),
        }
    }

    pub async fn reload(&self, id: i64) -> Option<CareInstance> {
        CareInstanceRepository::find_by_id(&self.store, id)
            .await
            .ok()
            .flatten()
    }
}
