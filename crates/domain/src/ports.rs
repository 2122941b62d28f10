//! 外部协作方接口

use async_trait::async_trait;
use care_scheduler_errors::CareResult;
use chrono::NaiveDate;

use crate::entities::{CareInstance, ScheduleDay};
use crate::escalation::EscalationAlert;

/// 告警通道，接收 (实例ID, 原因, 优先级)
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, alert: &EscalationAlert) -> CareResult<()>;
}

/// 人力排班方提供的某部门某日可用人力（分钟）
#[async_trait]
pub trait CapacityProvider: Send + Sync {
    async fn staff_minutes(&self, department_id: &str, date: NaiveDate) -> CareResult<u64>;
}

/// 可插拔的排班优化算法
#[async_trait]
pub trait OptimizationStrategy: Send + Sync {
    fn name(&self) -> &str;
    async fn optimize(&self, day: &ScheduleDay, instances: &[CareInstance]) -> CareResult<()>;
}
