//! 到期/逾期判定
//!
//! 任务与观察共用同一条规则。逾期是读取时推导的事实，不是阻止后续转换的终态。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::CareStatus;

/// 记录相对当前时间的到期状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DueState {
    /// 距计划时间超过提醒窗口
    Upcoming,
    /// 处于提醒窗口内（含计划时间点本身）
    Due,
    Overdue,
    /// 已完成或已取消
    Closed,
}

/// 已完成的记录永不逾期；其余状态在 `now > scheduled_time` 时逾期
pub fn evaluate_overdue(
    status: CareStatus,
    scheduled_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    if status == CareStatus::Completed {
        return false;
    }
    now > scheduled_time
}

pub fn classify_due(
    status: CareStatus,
    scheduled_time: DateTime<Utc>,
    now: DateTime<Utc>,
    due_window: Duration,
) -> DueState {
    if status.is_terminal() {
        return DueState::Closed;
    }
    if evaluate_overdue(status, scheduled_time, now) {
        DueState::Overdue
    } else if now >= scheduled_time - due_window {
        DueState::Due
    } else {
        DueState::Upcoming
    }
}

/// 逾期时长；未逾期返回 `None`
pub fn overdue_by(
    status: CareStatus,
    scheduled_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<Duration> {
    evaluate_overdue(status, scheduled_time, now).then(|| now - scheduled_time)
}
