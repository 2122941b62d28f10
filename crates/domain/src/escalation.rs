//! 升级策略：决定哪些记录需要推送给主管/合规告警
//!
//! 规则按顺序匹配，命中第一条即返回：
//! 1. critical/urgent 优先级且已逾期 → `critical-overdue`
//! 2. 需要跟进、已是终态却没有跟进说明 → `missing-followup`
//! 3. 临床敏感类观察逾期超过一个完整周期 → `missed-recurrence`
//!
//! 策略只读，实际告警由外部的 [`crate::ports::AlertSink`] 负责。

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::due_status::overdue_by;
use crate::entities::{
    CareInstance, CareLifecycle, CareStatus, InstanceKind, ObservationType, Priority,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EscalationReason {
    #[serde(rename = "critical-overdue")]
    CriticalOverdue,
    #[serde(rename = "missing-followup")]
    MissingFollowUp,
    #[serde(rename = "missed-recurrence")]
    MissedRecurrence,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::CriticalOverdue => "critical-overdue",
            EscalationReason::MissingFollowUp => "missing-followup",
            EscalationReason::MissedRecurrence => "missed-recurrence",
        }
    }
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 告警载荷：(实例ID, 原因, 优先级)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EscalationAlert {
    pub alert_id: Uuid,
    pub instance_id: i64,
    pub instance_kind: InstanceKind,
    pub schedule_day_id: i64,
    pub reason: EscalationReason,
    pub priority: Priority,
    pub raised_at: DateTime<Utc>,
}

impl EscalationAlert {
    pub fn new(instance: &CareInstance, reason: EscalationReason, raised_at: DateTime<Utc>) -> Self {
        Self {
            alert_id: Uuid::new_v4(),
            instance_id: instance.id(),
            instance_kind: instance.kind(),
            schedule_day_id: instance.schedule_day_id(),
            reason,
            priority: instance.priority(),
            raised_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    sensitive_types: HashSet<ObservationType>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new([
            ObservationType::VitalSigns,
            ObservationType::PainAssessment,
            ObservationType::SafetyCheck,
        ])
    }
}

impl EscalationPolicy {
    pub fn new<I>(sensitive_types: I) -> Self
    where
        I: IntoIterator<Item = ObservationType>,
    {
        Self {
            sensitive_types: sensitive_types.into_iter().collect(),
        }
    }

    pub fn is_sensitive(&self, observation_type: ObservationType) -> bool {
        self.sensitive_types.contains(&observation_type)
    }

    pub fn evaluate(&self, instance: &CareInstance, now: DateTime<Utc>) -> Option<EscalationReason> {
        let lifecycle = instance.lifecycle();

        // 已取消的记录没有待完成的护理工作
        if instance.priority().is_critical()
            && lifecycle.status != CareStatus::Cancelled
            && instance.is_overdue(now)
        {
            return Some(EscalationReason::CriticalOverdue);
        }

        if lifecycle.follow_up_required && lifecycle.is_terminal() && !lifecycle.has_follow_up_notes()
        {
            return Some(EscalationReason::MissingFollowUp);
        }

        if let CareInstance::Observation(obs) = instance {
            if !lifecycle.is_terminal() && self.is_sensitive(obs.observation_type) {
                let overdue = overdue_by(lifecycle.status, lifecycle.scheduled_time, now);
                if let (Some(overdue), Some(interval)) = (overdue, obs.frequency.interval()) {
                    if overdue > interval {
                        return Some(EscalationReason::MissedRecurrence);
                    }
                }
            }
        }

        None
    }
}

/// 使用默认敏感类型集合评估单条记录
pub fn evaluate_escalation(instance: &CareInstance, now: DateTime<Utc>) -> Option<EscalationReason> {
    EscalationPolicy::default().evaluate(instance, now)
}

/// 同一原因已告警过时不再重复推送；`realert_after` 为 `None` 表示永不重复
pub fn is_duplicate_alert(
    lifecycle: &CareLifecycle,
    reason: EscalationReason,
    now: DateTime<Utc>,
    realert_after: Option<Duration>,
) -> bool {
    if lifecycle.last_escalation_reason != Some(reason) {
        return false;
    }
    match (realert_after, lifecycle.last_escalated_at) {
        (None, _) => true,
        (Some(window), Some(last)) => now - last < window,
        (Some(_), None) => false,
    }
}
