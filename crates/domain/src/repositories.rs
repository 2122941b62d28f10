//! 领域仓储抽象
//!
//! 持久化由外部实现；本核心只依赖这里的快照读写接口。

use async_trait::async_trait;
use care_scheduler_errors::CareResult;
use chrono::{DateTime, NaiveDate, Utc};

use crate::entities::{CareInstance, ScheduleDay};
use crate::escalation::EscalationReason;
use crate::records::InstanceRecord;

/// 护理记录仓储抽象
#[async_trait]
pub trait CareInstanceRepository: Send + Sync {
    /// 分配ID后保存
    async fn create(&self, instance: &CareInstance) -> CareResult<CareInstance>;
    async fn find_by_id(&self, id: i64) -> CareResult<Option<CareInstance>>;
    async fn find_by_day(&self, schedule_day_id: i64) -> CareResult<Vec<CareInstance>>;
    /// 原始存储记录，不做解码
    async fn list_records(&self) -> CareResult<Vec<InstanceRecord>>;
    /// 仅当存储中的版本仍为 `expected_version` 时写入，返回是否成功。
    /// 升级标记字段不受此方法影响，只能通过 [`Self::mark_escalated`] 写入。
    async fn compare_and_swap(
        &self,
        expected_version: u64,
        updated: &CareInstance,
    ) -> CareResult<bool>;
    async fn mark_escalated(
        &self,
        id: i64,
        reason: EscalationReason,
        at: DateTime<Utc>,
    ) -> CareResult<()>;
}

/// 排班日仓储抽象
#[async_trait]
pub trait ScheduleDayRepository: Send + Sync {
    /// 同一部门同一日期只创建一次，已存在时返回已有记录
    async fn create_if_absent(&self, day: &ScheduleDay) -> CareResult<ScheduleDay>;
    async fn find_by_id(&self, id: i64) -> CareResult<Option<ScheduleDay>>;
    async fn find_by_department_date(
        &self,
        department_id: &str,
        date: NaiveDate,
    ) -> CareResult<Option<ScheduleDay>>;
    /// 带版本检查的更新，语义同 [`CareInstanceRepository::compare_and_swap`]
    async fn update(&self, expected_version: u64, updated: &ScheduleDay) -> CareResult<bool>;
    async fn list_active(&self) -> CareResult<Vec<ScheduleDay>>;
}
