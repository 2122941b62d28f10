//! 护理记录生命周期状态机
//!
//! | 当前状态                 | 操作         | 目标状态      |
//! |--------------------------|--------------|---------------|
//! | scheduled                | start        | in_progress   |
//! | in_progress              | complete     | completed     |
//! | scheduled / in_progress  | cancel       | cancelled     |
//! | scheduled / in_progress  | defer        | deferred      |
//! | deferred                 | reschedule   | scheduled     |
//! | 任意非终态               | assign       | 不变          |
//! | scheduled / in_progress  | mark_overdue | overdue       |
//!
//! `overdue` 只在开启持久化时写入，转换校验按其有效状态处理，不阻塞后续的完成或取消。
//! 所有转换都返回新的记录副本，失败时原记录保持不变。

use care_scheduler_errors::{CareError, CareResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{CareInstance, CareStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CareAction {
    Start,
    Complete {
        /// 缺省为操作时间
        ended_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    },
    Cancel {
        reason: String,
    },
    Defer {
        follow_up_notes: Option<String>,
        reschedule_to: Option<DateTime<Utc>>,
    },
    Reschedule {
        scheduled_time: DateTime<Utc>,
    },
    Assign {
        staff_id: String,
    },
    MarkOverdue,
}

impl CareAction {
    pub fn name(&self) -> &'static str {
        match self {
            CareAction::Start => "start",
            CareAction::Complete { .. } => "complete",
            CareAction::Cancel { .. } => "cancel",
            CareAction::Defer { .. } => "defer",
            CareAction::Reschedule { .. } => "reschedule",
            CareAction::Assign { .. } => "assign",
            CareAction::MarkOverdue => "mark_overdue",
        }
    }
}

/// 校验转换并返回目标状态，不修改任何记录
pub fn next_status(
    current: CareStatus,
    effective: CareStatus,
    action: &CareAction,
) -> CareResult<CareStatus> {
    if current.is_terminal() {
        return Err(CareError::invalid_transition(
            current.as_str(),
            action.name(),
            "终态记录不可再变更",
        ));
    }

    let target = match (effective, action) {
        (CareStatus::Scheduled, CareAction::Start) => Some(CareStatus::InProgress),
        (CareStatus::InProgress, CareAction::Complete { .. }) => Some(CareStatus::Completed),
        (CareStatus::Scheduled | CareStatus::InProgress, CareAction::Cancel { .. }) => {
            Some(CareStatus::Cancelled)
        }
        (CareStatus::Scheduled | CareStatus::InProgress, CareAction::Defer { .. }) => {
            Some(CareStatus::Deferred)
        }
        (CareStatus::Deferred, CareAction::Reschedule { .. }) => Some(CareStatus::Scheduled),
        (_, CareAction::Assign { .. }) => Some(current),
        (CareStatus::Scheduled | CareStatus::InProgress, CareAction::MarkOverdue)
            if current != CareStatus::Overdue =>
        {
            Some(CareStatus::Overdue)
        }
        _ => None,
    };

    target.ok_or_else(|| {
        CareError::invalid_transition(current.as_str(), action.name(), "当前状态不支持该操作")
    })
}

/// 对记录应用一次操作，返回更新后的副本（版本号 +1）
pub fn apply_transition(
    instance: &CareInstance,
    action: &CareAction,
    actor: &str,
    at: DateTime<Utc>,
) -> CareResult<CareInstance> {
    if actor.trim().is_empty() {
        return Err(CareError::validation_error("操作人不能为空"));
    }

    let current = instance.status();
    let target = next_status(current, instance.lifecycle().effective_status(), action)?;

    let mut updated = instance.clone();
    let mut actual_duration = None;
    {
        let lifecycle = updated.lifecycle_mut();
        match action {
            CareAction::Start => {
                lifecycle.actual_start_time = Some(at);
            }
            CareAction::Complete { ended_at, notes } => {
                let start = lifecycle.actual_start_time.ok_or_else(|| {
                    CareError::invalid_transition(current.as_str(), action.name(), "缺少实际开始时间")
                })?;
                let end = ended_at.unwrap_or(at);
                if end < start {
                    return Err(CareError::invalid_duration(start, end));
                }
                lifecycle.actual_end_time = Some(end);
                lifecycle.completed_by = Some(actor.to_string());
                if let Some(notes) = notes {
                    lifecycle.outcome_notes = Some(notes.clone());
                }
                actual_duration = u32::try_from((end - start).num_minutes()).ok();
            }
            CareAction::Cancel { reason } => {
                if reason.trim().is_empty() {
                    return Err(CareError::invalid_transition(
                        current.as_str(),
                        action.name(),
                        "取消必须填写原因",
                    ));
                }
                lifecycle.outcome_notes = Some(reason.clone());
            }
            CareAction::Defer {
                follow_up_notes,
                reschedule_to,
            } => {
                let has_notes = follow_up_notes
                    .as_deref()
                    .is_some_and(|notes| !notes.trim().is_empty());
                if !has_notes && reschedule_to.is_none() {
                    return Err(CareError::invalid_transition(
                        current.as_str(),
                        action.name(),
                        "延后必须填写跟进说明或新的计划时间",
                    ));
                }
                if has_notes {
                    lifecycle.follow_up_notes = follow_up_notes.clone();
                }
                if let Some(time) = reschedule_to {
                    lifecycle.scheduled_time = *time;
                }
            }
            CareAction::Reschedule { scheduled_time } => {
                lifecycle.scheduled_time = *scheduled_time;
                lifecycle.actual_start_time = None;
                lifecycle.actual_end_time = None;
            }
            CareAction::Assign { staff_id } => {
                if staff_id.trim().is_empty() {
                    return Err(CareError::validation_error("员工ID不能为空"));
                }
                lifecycle.assigned_staff_id = Some(staff_id.clone());
            }
            CareAction::MarkOverdue => {
                if at <= lifecycle.scheduled_time {
                    return Err(CareError::invalid_transition(
                        current.as_str(),
                        action.name(),
                        "尚未到达计划时间",
                    ));
                }
            }
        }

        lifecycle.status = target;
        lifecycle.last_actor = Some(actor.to_string());
        lifecycle.version += 1;
        lifecycle.updated_at = at;
    }

    if let CareInstance::Task(task) = &mut updated {
        match action {
            CareAction::Complete { .. } => task.actual_duration_minutes = actual_duration,
            CareAction::Reschedule { .. } => task.actual_duration_minutes = None,
            _ => {}
        }
    }

    updated.validate()?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        CareTaskInstance, CareTaskType, ObservationFrequency, ObservationInstance,
        ObservationType, Priority,
    };
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, minute, 0).unwrap()
    }

    fn task() -> CareInstance {
        CareTaskInstance::new(
            1,
            CareTaskType::MedicationAdministration,
            Priority::High,
            at(8, 0),
            30,
            at(6, 0),
        )
        .unwrap()
        .into()
    }

    fn observation() -> CareInstance {
        ObservationInstance::new(
            1,
            "resident-7".to_string(),
            ObservationType::VitalSigns,
            ObservationFrequency::FourHourly,
            at(8, 0),
            at(6, 0),
        )
        .into()
    }

    fn complete(ended_at: Option<DateTime<Utc>>) -> CareAction {
        CareAction::Complete {
            ended_at,
            notes: None,
        }
    }

    #[test]
    fn test_start_then_complete() {
        let started = apply_transition(&task(), &CareAction::Start, "nurse-1", at(8, 5)).unwrap();
        assert_eq!(started.status(), CareStatus::InProgress);
        assert_eq!(started.lifecycle().actual_start_time, Some(at(8, 5)));
        assert_eq!(started.version(), 1);

        let done = apply_transition(&started, &complete(None), "nurse-1", at(8, 50)).unwrap();
        assert_eq!(done.status(), CareStatus::Completed);
        assert_eq!(done.lifecycle().actual_end_time, Some(at(8, 50)));
        assert_eq!(done.lifecycle().completed_by.as_deref(), Some("nurse-1"));
        assert_eq!(done.as_task().unwrap().actual_duration_minutes, Some(45));
        assert_eq!(done.version(), 2);
    }

    #[test]
    fn test_observation_follows_same_lifecycle() {
        let started =
            apply_transition(&observation(), &CareAction::Start, "carer-2", at(8, 2)).unwrap();
        let obs = started.as_observation().unwrap();
        assert_eq!(obs.actual_time(), Some(at(8, 2)));

        let done = apply_transition(&started, &complete(None), "carer-2", at(8, 10)).unwrap();
        assert_eq!(done.status(), CareStatus::Completed);
    }

    #[test]
    fn test_terminal_states_reject_every_action() {
        let started = apply_transition(&task(), &CareAction::Start, "n", at(8, 0)).unwrap();
        let completed = apply_transition(&started, &complete(None), "n", at(8, 30)).unwrap();
        let cancelled = apply_transition(
            &task(),
            &CareAction::Cancel {
                reason: "住户外出".to_string(),
            },
            "n",
            at(7, 0),
        )
        .unwrap();

        let actions = [
            CareAction::Start,
            complete(None),
            CareAction::Cancel {
                reason: "x".to_string(),
            },
            CareAction::Defer {
                follow_up_notes: Some("x".to_string()),
                reschedule_to: None,
            },
            CareAction::Reschedule {
                scheduled_time: at(12, 0),
            },
            CareAction::Assign {
                staff_id: "n2".to_string(),
            },
            CareAction::MarkOverdue,
        ];

        for terminal in [&completed, &cancelled] {
            let before = terminal.clone();
            for action in &actions {
                let err = apply_transition(terminal, action, "n", at(13, 0)).unwrap_err();
                assert!(
                    matches!(err, CareError::InvalidTransition { .. }),
                    "{action:?}: {err}"
                );
            }
            assert_eq!(*terminal, before);
        }
    }

    #[test]
    fn test_complete_before_start_is_invalid_duration() {
        let started = apply_transition(&task(), &CareAction::Start, "n", at(9, 0)).unwrap();
        let err = apply_transition(&started, &complete(Some(at(8, 30))), "n", at(9, 5)).unwrap_err();
        assert!(matches!(err, CareError::InvalidDuration { .. }));
        assert_eq!(started.status(), CareStatus::InProgress);
    }

    #[test]
    fn test_complete_requires_in_progress() {
        let err = apply_transition(&task(), &complete(None), "n", at(9, 0)).unwrap_err();
        assert!(matches!(err, CareError::InvalidTransition { .. }));
    }

    #[test]
    fn test_cancel_requires_reason() {
        let err = apply_transition(
            &task(),
            &CareAction::Cancel {
                reason: "  ".to_string(),
            },
            "n",
            at(7, 0),
        )
        .unwrap_err();
        assert!(matches!(err, CareError::InvalidTransition { .. }));

        let cancelled = apply_transition(
            &task(),
            &CareAction::Cancel {
                reason: "住院".to_string(),
            },
            "n",
            at(7, 0),
        )
        .unwrap();
        assert_eq!(cancelled.status(), CareStatus::Cancelled);
        assert_eq!(cancelled.lifecycle().outcome_notes.as_deref(), Some("住院"));
    }

    #[test]
    fn test_defer_and_reschedule() {
        let err = apply_transition(
            &task(),
            &CareAction::Defer {
                follow_up_notes: None,
                reschedule_to: None,
            },
            "n",
            at(7, 0),
        )
        .unwrap_err();
        assert!(matches!(err, CareError::InvalidTransition { .. }));

        let deferred = apply_transition(
            &task(),
            &CareAction::Defer {
                follow_up_notes: Some("住户拒绝，午后再试".to_string()),
                reschedule_to: None,
            },
            "n",
            at(8, 10),
        )
        .unwrap();
        assert_eq!(deferred.status(), CareStatus::Deferred);

        // 延后的记录必须先重新排期才能开始
        let err = apply_transition(&deferred, &CareAction::Start, "n", at(8, 20)).unwrap_err();
        assert!(matches!(err, CareError::InvalidTransition { .. }));

        let rescheduled = apply_transition(
            &deferred,
            &CareAction::Reschedule {
                scheduled_time: at(14, 0),
            },
            "n",
            at(8, 30),
        )
        .unwrap();
        assert_eq!(rescheduled.status(), CareStatus::Scheduled);
        assert_eq!(rescheduled.scheduled_time(), at(14, 0));
    }

    #[test]
    fn test_defer_in_progress_with_new_time() {
        let started = apply_transition(&task(), &CareAction::Start, "n", at(8, 0)).unwrap();
        let deferred = apply_transition(
            &started,
            &CareAction::Defer {
                follow_up_notes: None,
                reschedule_to: Some(at(15, 0)),
            },
            "n",
            at(8, 10),
        )
        .unwrap();
        assert_eq!(deferred.status(), CareStatus::Deferred);
        assert_eq!(deferred.scheduled_time(), at(15, 0));
    }

    #[test]
    fn test_persisted_overdue_does_not_block_completion() {
        let overdue =
            apply_transition(&task(), &CareAction::MarkOverdue, "system", at(8, 30)).unwrap();
        assert_eq!(overdue.status(), CareStatus::Overdue);

        // 重复标记无效
        let err =
            apply_transition(&overdue, &CareAction::MarkOverdue, "system", at(8, 45)).unwrap_err();
        assert!(matches!(err, CareError::InvalidTransition { .. }));

        let started = apply_transition(&overdue, &CareAction::Start, "n", at(8, 40)).unwrap();
        assert_eq!(started.status(), CareStatus::InProgress);
        let done = apply_transition(&started, &complete(None), "n", at(9, 0)).unwrap();
        assert_eq!(done.status(), CareStatus::Completed);

        let cancelled = apply_transition(
            &overdue,
            &CareAction::Cancel {
                reason: "已由夜班完成".to_string(),
            },
            "n",
            at(9, 0),
        )
        .unwrap();
        assert_eq!(cancelled.status(), CareStatus::Cancelled);
    }

    #[test]
    fn test_in_progress_overdue_can_complete_directly() {
        let started = apply_transition(&task(), &CareAction::Start, "n", at(8, 0)).unwrap();
        let overdue =
            apply_transition(&started, &CareAction::MarkOverdue, "system", at(8, 45)).unwrap();
        let done = apply_transition(&overdue, &complete(None), "n", at(9, 0)).unwrap();
        assert_eq!(done.status(), CareStatus::Completed);
    }

    #[test]
    fn test_mark_overdue_before_scheduled_time_fails() {
        let err =
            apply_transition(&task(), &CareAction::MarkOverdue, "system", at(7, 0)).unwrap_err();
        assert!(matches!(err, CareError::InvalidTransition { .. }));
    }

    #[test]
    fn test_assign_keeps_status() {
        let assigned = apply_transition(
            &task(),
            &CareAction::Assign {
                staff_id: "staff-9".to_string(),
            },
            "supervisor",
            at(7, 0),
        )
        .unwrap();
        assert_eq!(assigned.status(), CareStatus::Scheduled);
        assert_eq!(
            assigned.lifecycle().assigned_staff_id.as_deref(),
            Some("staff-9")
        );
    }

    #[test]
    fn test_actor_required() {
        let err = apply_transition(&task(), &CareAction::Start, " ", at(8, 0)).unwrap_err();
        assert!(matches!(err, CareError::ValidationError(_)));
    }
}
