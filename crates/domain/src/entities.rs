use std::fmt;
use std::str::FromStr;

use care_scheduler_errors::{CareError, CareResult};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::due_status::evaluate_overdue;
use crate::escalation::EscalationReason;
use crate::recurrence::compute_next_occurrence;

/// 护理任务预计时长下限（分钟）
pub const MIN_TASK_DURATION_MINUTES: u32 = 1;
/// 护理任务预计时长上限（分钟）
pub const MAX_TASK_DURATION_MINUTES: u32 = 480;

/// 为存储层使用的字符串枚举生成 `as_str` / `Display` / `FromStr`。
/// 解析时忽略大小写，并把 `-` 视作 `_`（`two-hourly` 等价于 `two_hourly`）。
macro_rules! wire_enum {
    ($name:ident, $on_unknown:expr, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CareError;

            fn from_str(s: &str) -> CareResult<Self> {
                let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
                match normalized.as_str() {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(($on_unknown)(s.to_string())),
                }
            }
        }
    };
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
    Urgent,
}

wire_enum!(Priority, |v| CareError::unknown_value("priority", v), {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
    Urgent => "urgent",
});

impl Priority {
    /// critical 与 urgent 逾期时需立即上报主管
    pub fn is_critical(&self) -> bool {
        matches!(self, Priority::Critical | Priority::Urgent)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CareTaskType {
    PersonalCare,
    MedicationAdministration,
    MobilityAssistance,
    NutritionSupport,
    Hydration,
    ContinenceCare,
    WoundCare,
    Repositioning,
    SocialActivity,
    Other,
}

wire_enum!(CareTaskType, |v| CareError::unknown_value("task_type", v), {
    PersonalCare => "personal_care",
    MedicationAdministration => "medication_administration",
    MobilityAssistance => "mobility_assistance",
    NutritionSupport => "nutrition_support",
    Hydration => "hydration",
    ContinenceCare => "continence_care",
    WoundCare => "wound_care",
    Repositioning => "repositioning",
    SocialActivity => "social_activity",
    Other => "other",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    VitalSigns,
    Behavioral,
    PainAssessment,
    SafetyCheck,
    FluidBalance,
    Weight,
    SkinIntegrity,
    Sleep,
    Mood,
    Other,
}

wire_enum!(ObservationType, |v| CareError::unknown_value("observation_type", v), {
    VitalSigns => "vital_signs",
    Behavioral => "behavioral",
    PainAssessment => "pain_assessment",
    SafetyCheck => "safety_check",
    FluidBalance => "fluid_balance",
    Weight => "weight",
    SkinIntegrity => "skin_integrity",
    Sleep => "sleep",
    Mood => "mood",
    Other => "other",
});

/// 观察记录的重复频率。间隔表见 [`ObservationFrequency::interval_hours`]。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObservationFrequency {
    Hourly,
    TwoHourly,
    FourHourly,
    TwiceDaily,
    Daily,
    TwiceWeekly,
    Weekly,
    AsNeeded,
    Continuous,
}

wire_enum!(ObservationFrequency, CareError::UnknownFrequency, {
    Hourly => "hourly",
    TwoHourly => "two_hourly",
    FourHourly => "four_hourly",
    TwiceDaily => "twice_daily",
    Daily => "daily",
    TwiceWeekly => "twice_weekly",
    Weekly => "weekly",
    AsNeeded => "as_needed",
    Continuous => "continuous",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CareStatus {
    Scheduled,
    InProgress,
    Completed,
    Overdue,
    Cancelled,
    Deferred,
}

wire_enum!(CareStatus, |v| CareError::unknown_value("status", v), {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Completed => "completed",
    Overdue => "overdue",
    Cancelled => "cancelled",
    Deferred => "deferred",
});

impl CareStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CareStatus::Completed | CareStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleDayStatus {
    Active,
    Inactive,
}

wire_enum!(ScheduleDayStatus, |v| CareError::unknown_value("schedule_day_status", v), {
    Active => "active",
    Inactive => "inactive",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    Task,
    Observation,
}

wire_enum!(InstanceKind, |v| CareError::unknown_value("kind", v), {
    Task => "task",
    Observation => "observation",
});

/// 任务与观察共用的生命周期字段，状态转换规则只在此处实现一次。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareLifecycle {
    pub status: CareStatus,
    pub scheduled_time: DateTime<Utc>,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub assigned_staff_id: Option<String>,
    pub completed_by: Option<String>,
    pub last_actor: Option<String>,
    pub outcome_notes: Option<String>,
    pub follow_up_required: bool,
    pub follow_up_notes: Option<String>,
    pub last_escalated_at: Option<DateTime<Utc>>,
    pub last_escalation_reason: Option<EscalationReason>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl CareLifecycle {
    pub fn new(scheduled_time: DateTime<Utc>, created_at: DateTime<Utc>) -> Self {
        Self {
            status: CareStatus::Scheduled,
            scheduled_time,
            actual_start_time: None,
            actual_end_time: None,
            assigned_staff_id: None,
            completed_by: None,
            last_actor: None,
            outcome_notes: None,
            follow_up_required: false,
            follow_up_notes: None,
            last_escalated_at: None,
            last_escalation_reason: None,
            version: 0,
            updated_at: created_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        evaluate_overdue(self.status, self.scheduled_time, now)
    }

    /// 持久化的 overdue 只是视图：有开始时间视为进行中，否则视为待执行
    pub fn effective_status(&self) -> CareStatus {
        match self.status {
            CareStatus::Overdue if self.actual_start_time.is_some() => CareStatus::InProgress,
            CareStatus::Overdue => CareStatus::Scheduled,
            other => other,
        }
    }

    pub fn has_follow_up_notes(&self) -> bool {
        self.follow_up_notes
            .as_deref()
            .is_some_and(|notes| !notes.trim().is_empty())
    }

    pub fn validate(&self) -> CareResult<()> {
        if let (Some(start), Some(end)) = (self.actual_start_time, self.actual_end_time) {
            if end < start {
                return Err(CareError::invalid_duration(start, end));
            }
        }
        if self.status == CareStatus::Completed && self.actual_end_time.is_none() {
            return Err(CareError::validation_error("已完成的记录必须包含实际结束时间"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareTaskInstance {
    pub id: i64,
    pub schedule_day_id: i64,
    pub resident_id: Option<String>,
    pub task_type: CareTaskType,
    pub priority: Priority,
    pub estimated_duration_minutes: u32,
    pub actual_duration_minutes: Option<u32>,
    #[serde(flatten)]
    pub lifecycle: CareLifecycle,
    pub created_at: DateTime<Utc>,
}

impl CareTaskInstance {
    pub fn new(
        schedule_day_id: i64,
        task_type: CareTaskType,
        priority: Priority,
        scheduled_time: DateTime<Utc>,
        estimated_duration_minutes: u32,
        created_at: DateTime<Utc>,
    ) -> CareResult<Self> {
        validate_estimated_duration(estimated_duration_minutes)?;
        Ok(Self {
            id: 0, // 由存储层分配
            schedule_day_id,
            resident_id: None,
            task_type,
            priority,
            estimated_duration_minutes,
            actual_duration_minutes: None,
            lifecycle: CareLifecycle::new(scheduled_time, created_at),
            created_at,
        })
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.lifecycle.is_overdue(now)
    }

    /// 实际耗时：优先使用记录值，否则由起止时间推算
    pub fn actual_duration(&self) -> Option<u32> {
        self.actual_duration_minutes.or_else(|| {
            match (self.lifecycle.actual_start_time, self.lifecycle.actual_end_time) {
                (Some(start), Some(end)) if end >= start => {
                    u32::try_from((end - start).num_minutes()).ok()
                }
                _ => None,
            }
        })
    }

    /// 效率百分比 = 预计时长 / 实际时长 × 100（四舍五入）
    pub fn efficiency(&self) -> Option<u32> {
        let actual = self.actual_duration().filter(|minutes| *minutes > 0)?;
        let ratio = self.estimated_duration_minutes as f64 / actual as f64 * 100.0;
        Some(ratio.round() as u32)
    }

    pub fn time_variance(&self) -> Option<i64> {
        self.actual_duration()
            .map(|actual| actual as i64 - self.estimated_duration_minutes as i64)
    }

    pub fn scheduled_end(&self) -> DateTime<Utc> {
        self.lifecycle.scheduled_time + Duration::minutes(self.estimated_duration_minutes as i64)
    }

    /// 实际结束时间相对计划结束时间的延迟（分钟，提前完成为负数）
    pub fn completion_delay_minutes(&self) -> Option<i64> {
        self.lifecycle
            .actual_end_time
            .map(|end| (end - self.scheduled_end()).num_minutes())
    }

    pub fn validate(&self) -> CareResult<()> {
        validate_estimated_duration(self.estimated_duration_minutes)?;
        self.lifecycle.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservationInstance {
    pub id: i64,
    pub schedule_day_id: i64,
    pub resident_id: String,
    pub observation_type: ObservationType,
    pub frequency: ObservationFrequency,
    pub priority: Priority,
    #[serde(flatten)]
    pub lifecycle: CareLifecycle,
    pub created_at: DateTime<Utc>,
}

impl ObservationInstance {
    pub fn new(
        schedule_day_id: i64,
        resident_id: String,
        observation_type: ObservationType,
        frequency: ObservationFrequency,
        scheduled_time: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            schedule_day_id,
            resident_id,
            observation_type,
            frequency,
            priority: Priority::default(),
            lifecycle: CareLifecycle::new(scheduled_time, created_at),
            created_at,
        }
    }

    /// 实际观察时间
    pub fn actual_time(&self) -> Option<DateTime<Utc>> {
        self.lifecycle.actual_start_time
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.lifecycle.is_overdue(now)
    }

    /// as_needed / continuous 没有确定的下一次时间
    pub fn next_scheduled_time(&self) -> Option<DateTime<Utc>> {
        compute_next_occurrence(self.frequency, self.lifecycle.scheduled_time)
    }

    pub fn validate(&self) -> CareResult<()> {
        if self.resident_id.trim().is_empty() {
            return Err(CareError::validation_error("观察记录必须关联住户"));
        }
        self.lifecycle.validate()
    }
}

/// 排班日下的一条护理记录（任务或观察）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CareInstance {
    Task(CareTaskInstance),
    Observation(ObservationInstance),
}

impl CareInstance {
    pub fn id(&self) -> i64 {
        match self {
            CareInstance::Task(task) => task.id,
            CareInstance::Observation(obs) => obs.id,
        }
    }

    pub fn set_id(&mut self, id: i64) {
        match self {
            CareInstance::Task(task) => task.id = id,
            CareInstance::Observation(obs) => obs.id = id,
        }
    }

    pub fn schedule_day_id(&self) -> i64 {
        match self {
            CareInstance::Task(task) => task.schedule_day_id,
            CareInstance::Observation(obs) => obs.schedule_day_id,
        }
    }

    pub fn kind(&self) -> InstanceKind {
        match self {
            CareInstance::Task(_) => InstanceKind::Task,
            CareInstance::Observation(_) => InstanceKind::Observation,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            CareInstance::Task(task) => task.priority,
            CareInstance::Observation(obs) => obs.priority,
        }
    }

    pub fn lifecycle(&self) -> &CareLifecycle {
        match self {
            CareInstance::Task(task) => &task.lifecycle,
            CareInstance::Observation(obs) => &obs.lifecycle,
        }
    }

    pub fn lifecycle_mut(&mut self) -> &mut CareLifecycle {
        match self {
            CareInstance::Task(task) => &mut task.lifecycle,
            CareInstance::Observation(obs) => &mut obs.lifecycle,
        }
    }

    pub fn status(&self) -> CareStatus {
        self.lifecycle().status
    }

    pub fn scheduled_time(&self) -> DateTime<Utc> {
        self.lifecycle().scheduled_time
    }

    pub fn version(&self) -> u64 {
        self.lifecycle().version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            CareInstance::Task(task) => task.created_at,
            CareInstance::Observation(obs) => obs.created_at,
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.lifecycle().is_overdue(now)
    }

    pub fn is_terminal(&self) -> bool {
        self.lifecycle().is_terminal()
    }

    pub fn as_task(&self) -> Option<&CareTaskInstance> {
        match self {
            CareInstance::Task(task) => Some(task),
            CareInstance::Observation(_) => None,
        }
    }

    pub fn as_observation(&self) -> Option<&ObservationInstance> {
        match self {
            CareInstance::Task(_) => None,
            CareInstance::Observation(obs) => Some(obs),
        }
    }

    pub fn validate(&self) -> CareResult<()> {
        match self {
            CareInstance::Task(task) => task.validate(),
            CareInstance::Observation(obs) => obs.validate(),
        }
    }

    pub fn entity_description(&self) -> String {
        match self {
            CareInstance::Task(task) => format!(
                "护理任务 (ID: {}, 类型: {}, 优先级: {})",
                task.id, task.task_type, task.priority
            ),
            CareInstance::Observation(obs) => format!(
                "观察记录 (ID: {}, 类型: {}, 频率: {}, 住户: {})",
                obs.id, obs.observation_type, obs.frequency, obs.resident_id
            ),
        }
    }
}

impl From<CareTaskInstance> for CareInstance {
    fn from(task: CareTaskInstance) -> Self {
        CareInstance::Task(task)
    }
}

impl From<ObservationInstance> for CareInstance {
    fn from(obs: ObservationInstance) -> Self {
        CareInstance::Observation(obs)
    }
}

/// 某部门某一天的排班
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDay {
    pub id: i64,
    pub department_id: String,
    pub date: NaiveDate,
    pub total_tasks: u32,
    pub total_observations: u32,
    pub estimated_workload: f64,
    pub optimization_applied: bool,
    pub optimized_at: Option<DateTime<Utc>>,
    pub status: ScheduleDayStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleDay {
    pub fn new(department_id: String, date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            department_id,
            date,
            total_tasks: 0,
            total_observations: 0,
            estimated_workload: 0.0,
            optimization_applied: false,
            optimized_at: None,
            status: ScheduleDayStatus::Active,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ScheduleDayStatus::Active)
    }

    /// 日期已完全过去（UTC）
    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        now.date_naive() > self.date
    }

    pub fn entity_description(&self) -> String {
        format!(
            "排班日 (ID: {}, 部门: {}, 日期: {})",
            self.id, self.department_id, self.date
        )
    }
}

fn validate_estimated_duration(minutes: u32) -> CareResult<()> {
    if !(MIN_TASK_DURATION_MINUTES..=MAX_TASK_DURATION_MINUTES).contains(&minutes) {
        return Err(CareError::validation_error(format!(
            "预计时长必须在 {MIN_TASK_DURATION_MINUTES}-{MAX_TASK_DURATION_MINUTES} 分钟之间: {minutes}"
        )));
    }
    Ok(())
}
