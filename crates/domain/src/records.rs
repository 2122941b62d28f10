//! 存储层交换的扁平记录
//!
//! 枚举字段保存为字符串，解码时才可能发现未知取值（例如未登记的观察频率），
//! 由调用方决定是跳过并上报还是中止。

use care_scheduler_errors::{CareError, CareResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{
    CareInstance, CareLifecycle, CareTaskInstance, InstanceKind, ObservationInstance,
};
use crate::escalation::EscalationReason;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceRecord {
    pub id: i64,
    pub kind: String,
    pub schedule_day_id: i64,
    pub resident_id: Option<String>,
    pub task_type: Option<String>,
    pub observation_type: Option<String>,
    pub frequency: Option<String>,
    pub priority: String,
    pub status: String,
    pub estimated_duration_minutes: Option<u32>,
    pub actual_duration_minutes: Option<u32>,
    pub scheduled_time: DateTime<Utc>,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub assigned_staff_id: Option<String>,
    pub completed_by: Option<String>,
    pub last_actor: Option<String>,
    pub outcome_notes: Option<String>,
    #[serde(default)]
    pub follow_up_required: bool,
    pub follow_up_notes: Option<String>,
    pub last_escalated_at: Option<DateTime<Utc>>,
    pub last_escalation_reason: Option<String>,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstanceRecord {
    pub fn entity_description(&self) -> String {
        format!("存储记录 (ID: {}, 类型: {})", self.id, self.kind)
    }

    fn required<'a>(&self, field: &str, value: &'a Option<String>) -> CareResult<&'a str> {
        value.as_deref().ok_or_else(|| {
            CareError::validation_error(format!(
                "{} 缺少必填字段 {field}",
                self.entity_description()
            ))
        })
    }

    fn lifecycle(&self) -> CareResult<CareLifecycle> {
        let last_escalation_reason = self
            .last_escalation_reason
            .as_deref()
            .map(parse_escalation_reason)
            .transpose()?;

        Ok(CareLifecycle {
            status: self.status.parse()?,
            scheduled_time: self.scheduled_time,
            actual_start_time: self.actual_start_time,
            actual_end_time: self.actual_end_time,
            assigned_staff_id: self.assigned_staff_id.clone(),
            completed_by: self.completed_by.clone(),
            last_actor: self.last_actor.clone(),
            outcome_notes: self.outcome_notes.clone(),
            follow_up_required: self.follow_up_required,
            follow_up_notes: self.follow_up_notes.clone(),
            last_escalated_at: self.last_escalated_at,
            last_escalation_reason,
            version: self.version,
            updated_at: self.updated_at,
        })
    }
}

fn parse_escalation_reason(value: &str) -> CareResult<EscalationReason> {
    match value {
        "critical-overdue" => Ok(EscalationReason::CriticalOverdue),
        "missing-followup" => Ok(EscalationReason::MissingFollowUp),
        "missed-recurrence" => Ok(EscalationReason::MissedRecurrence),
        other => Err(CareError::unknown_value("escalation_reason", other)),
    }
}

impl TryFrom<&InstanceRecord> for CareInstance {
    type Error = CareError;

    fn try_from(record: &InstanceRecord) -> CareResult<Self> {
        let lifecycle = record.lifecycle()?;
        let priority = record.priority.parse()?;

        let instance = match record.kind.parse::<InstanceKind>()? {
            InstanceKind::Task => CareInstance::Task(CareTaskInstance {
                id: record.id,
                schedule_day_id: record.schedule_day_id,
                resident_id: record.resident_id.clone(),
                task_type: record.required("task_type", &record.task_type)?.parse()?,
                priority,
                estimated_duration_minutes: record.estimated_duration_minutes.ok_or_else(|| {
                    CareError::validation_error(format!(
                        "{} 缺少必填字段 estimated_duration_minutes",
                        record.entity_description()
                    ))
                })?,
                actual_duration_minutes: record.actual_duration_minutes,
                lifecycle,
                created_at: record.created_at,
            }),
            InstanceKind::Observation => CareInstance::Observation(ObservationInstance {
                id: record.id,
                schedule_day_id: record.schedule_day_id,
                resident_id: record.required("resident_id", &record.resident_id)?.to_string(),
                observation_type: record
                    .required("observation_type", &record.observation_type)?
                    .parse()?,
                frequency: record.required("frequency", &record.frequency)?.parse()?,
                priority,
                lifecycle,
                created_at: record.created_at,
            }),
        };

        instance.validate()?;
        Ok(instance)
    }
}

impl TryFrom<InstanceRecord> for CareInstance {
    type Error = CareError;

    fn try_from(record: InstanceRecord) -> CareResult<Self> {
        CareInstance::try_from(&record)
    }
}

impl From<&CareInstance> for InstanceRecord {
    fn from(instance: &CareInstance) -> Self {
        let lifecycle = instance.lifecycle();
        let mut record = InstanceRecord {
            id: instance.id(),
            kind: instance.kind().to_string(),
            schedule_day_id: instance.schedule_day_id(),
            resident_id: None,
            task_type: None,
            observation_type: None,
            frequency: None,
            priority: instance.priority().to_string(),
            status: lifecycle.status.to_string(),
            estimated_duration_minutes: None,
            actual_duration_minutes: None,
            scheduled_time: lifecycle.scheduled_time,
            actual_start_time: lifecycle.actual_start_time,
            actual_end_time: lifecycle.actual_end_time,
            assigned_staff_id: lifecycle.assigned_staff_id.clone(),
            completed_by: lifecycle.completed_by.clone(),
            last_actor: lifecycle.last_actor.clone(),
            outcome_notes: lifecycle.outcome_notes.clone(),
            follow_up_required: lifecycle.follow_up_required,
            follow_up_notes: lifecycle.follow_up_notes.clone(),
            last_escalated_at: lifecycle.last_escalated_at,
            last_escalation_reason: lifecycle
                .last_escalation_reason
                .map(|reason| reason.as_str().to_string()),
            version: lifecycle.version,
            created_at: instance.created_at(),
            updated_at: lifecycle.updated_at,
        };

        match instance {
            CareInstance::Task(task) => {
                record.resident_id = task.resident_id.clone();
                record.task_type = Some(task.task_type.to_string());
                record.estimated_duration_minutes = Some(task.estimated_duration_minutes);
                record.actual_duration_minutes = task.actual_duration_minutes;
            }
            CareInstance::Observation(obs) => {
                record.resident_id = Some(obs.resident_id.clone());
                record.observation_type = Some(obs.observation_type.to_string());
                record.frequency = Some(obs.frequency.to_string());
            }
        }
        record
    }
}
