//! Test data builders
//!
//! 所有构造器默认使用 [`crate::helpers::fixed_time`] 附近的固定时间，
//! 测试结果不依赖系统时钟。

use care_scheduler_domain::{
    CareInstance, CareLifecycle, CareStatus, CareTaskInstance, CareTaskType, ObservationFrequency,
    ObservationInstance, ObservationType, Priority, ScheduleDay, ScheduleDayStatus,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::helpers::{fixed_date, fixed_time};

/// 按状态补齐生命周期中的时间字段，保证构造出的记录可以通过校验
fn settle_lifecycle(lifecycle: &mut CareLifecycle, duration_minutes: i64) {
    match lifecycle.status {
        CareStatus::InProgress if lifecycle.actual_start_time.is_none() => {
            lifecycle.actual_start_time = Some(lifecycle.scheduled_time);
        }
        CareStatus::Completed => {
            let start = lifecycle
                .actual_start_time
                .unwrap_or(lifecycle.scheduled_time);
            lifecycle.actual_start_time = Some(start);
            if lifecycle.actual_end_time.is_none() {
                lifecycle.actual_end_time = Some(start + Duration::minutes(duration_minutes));
            }
        }
        _ => {}
    }
}

/// Builder for creating test CareTaskInstance entities
pub struct CareTaskBuilder {
    task: CareTaskInstance,
}

impl CareTaskBuilder {
    pub fn new() -> Self {
        let created_at = fixed_time(6, 0);
        Self {
            task: CareTaskInstance {
                id: 0,
                schedule_day_id: 1,
                resident_id: Some("resident-1".to_string()),
                task_type: CareTaskType::PersonalCare,
                priority: Priority::Medium,
                estimated_duration_minutes: 30,
                actual_duration_minutes: None,
                lifecycle: CareLifecycle::new(fixed_time(8, 0), created_at),
                created_at,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.task.id = id;
        self
    }

    pub fn with_schedule_day_id(mut self, schedule_day_id: i64) -> Self {
        self.task.schedule_day_id = schedule_day_id;
        self
    }

    pub fn with_resident(mut self, resident_id: &str) -> Self {
        self.task.resident_id = Some(resident_id.to_string());
        self
    }

    pub fn with_task_type(mut self, task_type: CareTaskType) -> Self {
        self.task.task_type = task_type;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.task.estimated_duration_minutes = minutes;
        self
    }

    pub fn with_scheduled_time(mut self, scheduled_time: DateTime<Utc>) -> Self {
        self.task.lifecycle.scheduled_time = scheduled_time;
        self
    }

    pub fn with_status(mut self, status: CareStatus) -> Self {
        self.task.lifecycle.status = status;
        self
    }

    pub fn with_follow_up_required(mut self, required: bool) -> Self {
        self.task.lifecycle.follow_up_required = required;
        self
    }

    pub fn with_assigned_staff(mut self, staff_id: &str) -> Self {
        self.task.lifecycle.assigned_staff_id = Some(staff_id.to_string());
        self
    }

    pub fn build_task(mut self) -> CareTaskInstance {
        let minutes = i64::from(self.task.estimated_duration_minutes);
        settle_lifecycle(&mut self.task.lifecycle, minutes);
        self.task
    }

    pub fn build(self) -> CareInstance {
        self.build_task().into()
    }
}

impl Default for CareTaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test ObservationInstance entities
pub struct ObservationBuilder {
    observation: ObservationInstance,
}

impl ObservationBuilder {
    pub fn new() -> Self {
        Self {
            observation: ObservationInstance::new(
                1,
                "resident-1".to_string(),
                ObservationType::VitalSigns,
                ObservationFrequency::FourHourly,
                fixed_time(8, 0),
                fixed_time(6, 0),
            ),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.observation.id = id;
        self
    }

    pub fn with_schedule_day_id(mut self, schedule_day_id: i64) -> Self {
        self.observation.schedule_day_id = schedule_day_id;
        self
    }

    pub fn with_resident(mut self, resident_id: &str) -> Self {
        self.observation.resident_id = resident_id.to_string();
        self
    }

    pub fn with_observation_type(mut self, observation_type: ObservationType) -> Self {
        self.observation.observation_type = observation_type;
        self
    }

    pub fn with_frequency(mut self, frequency: ObservationFrequency) -> Self {
        self.observation.frequency = frequency;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.observation.priority = priority;
        self
    }

    pub fn with_scheduled_time(mut self, scheduled_time: DateTime<Utc>) -> Self {
        self.observation.lifecycle.scheduled_time = scheduled_time;
        self
    }

    pub fn with_status(mut self, status: CareStatus) -> Self {
        self.observation.lifecycle.status = status;
        self
    }

    pub fn build_observation(mut self) -> ObservationInstance {
        settle_lifecycle(&mut self.observation.lifecycle, 5);
        self.observation
    }

    pub fn build(self) -> CareInstance {
        self.build_observation().into()
    }
}

impl Default for ObservationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test ScheduleDay entities
pub struct ScheduleDayBuilder {
    day: ScheduleDay,
}

impl ScheduleDayBuilder {
    pub fn new() -> Self {
        Self {
            day: ScheduleDay::new("ward-a".to_string(), fixed_date(), fixed_time(6, 0)),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.day.id = id;
        self
    }

    pub fn with_department(mut self, department_id: &str) -> Self {
        self.day.department_id = department_id.to_string();
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.day.date = date;
        self
    }

    pub fn with_status(mut self, status: ScheduleDayStatus) -> Self {
        self.day.status = status;
        self
    }

    pub fn with_optimization_applied(mut self, at: DateTime<Utc>) -> Self {
        self.day.optimization_applied = true;
        self.day.optimized_at = Some(at);
        self
    }

    pub fn build(self) -> ScheduleDay {
        self.day
    }
}

impl Default for ScheduleDayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
