//! 排班日汇总：任务/观察计数与预估工作负荷

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{CareInstance, CareStatus, ScheduleDay};

/// 工作负荷百分比上限
pub const MAX_WORKLOAD_PERCENT: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySummary {
    pub schedule_day_id: i64,
    pub total_tasks: u32,
    pub total_observations: u32,
    /// 未取消任务的预计时长之和
    pub scheduled_minutes: u64,
    pub capacity_minutes: u64,
    /// 0-100
    pub estimated_workload: f64,
    /// 排班日仍有效且存在未结束的记录时才值得运行优化
    pub optimization_eligible: bool,
    /// 无法解析、未计入汇总的记录
    #[serde(default)]
    pub skipped_instance_ids: Vec<i64>,
}

/// 工作负荷 = 已排任务分钟 / 可用人力分钟 × 100，截断到 [0, 100]。
/// 人力为 0 时，只要有排班就视为满负荷。
pub fn workload_percent(scheduled_minutes: u64, capacity_minutes: u64) -> f64 {
    if capacity_minutes == 0 {
        return if scheduled_minutes > 0 {
            MAX_WORKLOAD_PERCENT
        } else {
            0.0
        };
    }
    let percent = scheduled_minutes as f64 / capacity_minutes as f64 * 100.0;
    percent.clamp(0.0, MAX_WORKLOAD_PERCENT)
}

/// 汇总属于 `day` 的记录；其他排班日的记录被忽略
pub fn summarize_day(
    day: &ScheduleDay,
    instances: &[CareInstance],
    capacity_minutes: u64,
) -> DaySummary {
    let mut total_tasks = 0u32;
    let mut total_observations = 0u32;
    let mut scheduled_minutes = 0u64;
    let mut has_open = false;

    for instance in instances
        .iter()
        .filter(|instance| instance.schedule_day_id() == day.id)
    {
        if !instance.is_terminal() {
            has_open = true;
        }
        match instance {
            CareInstance::Task(task) => {
                total_tasks += 1;
                if task.lifecycle.status != CareStatus::Cancelled {
                    scheduled_minutes += u64::from(task.estimated_duration_minutes);
                }
            }
            CareInstance::Observation(_) => total_observations += 1,
        }
    }

    DaySummary {
        schedule_day_id: day.id,
        total_tasks,
        total_observations,
        scheduled_minutes,
        capacity_minutes,
        estimated_workload: workload_percent(scheduled_minutes, capacity_minutes),
        optimization_eligible: day.is_active() && has_open,
        skipped_instance_ids: Vec::new(),
    }
}

/// 把汇总写回排班日，只改计数与负荷，优化标记原样保留
pub fn apply_summary(day: &ScheduleDay, summary: &DaySummary, now: DateTime<Utc>) -> ScheduleDay {
    ScheduleDay {
        total_tasks: summary.total_tasks,
        total_observations: summary.total_observations,
        estimated_workload: summary.estimated_workload,
        updated_at: now,
        ..day.clone()
    }
}
