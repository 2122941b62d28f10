use std::time::Duration;

use metrics::{counter, gauge, histogram, Counter, Histogram};

pub const SWEEP_RUNS_TOTAL: &str = "care_sweep_runs_total";
pub const SWEEP_OVERDUE_TOTAL: &str = "care_sweep_overdue_total";
pub const ESCALATIONS_RAISED_TOTAL: &str = "care_escalations_raised_total";
pub const ESCALATIONS_SUPPRESSED_TOTAL: &str = "care_escalations_suppressed_total";
pub const SWEEP_RECORD_FAILURES_TOTAL: &str = "care_sweep_record_failures_total";
pub const TRANSITIONS_TOTAL: &str = "care_transitions_total";
pub const DAY_WORKLOAD_PERCENT: &str = "care_schedule_day_workload_percent";
pub const SWEEP_DURATION_MS: &str = "care_sweep_duration_ms";

/// 排班引擎指标。未安装 recorder 时所有调用都是空操作。
#[derive(Clone)]
pub struct CareMetrics {
    sweep_runs_total: Counter,
    sweep_overdue_total: Counter,
    escalations_raised_total: Counter,
    escalations_suppressed_total: Counter,
    sweep_record_failures_total: Counter,
    sweep_duration_ms: Histogram,
}

impl Default for CareMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CareMetrics {
    pub fn new() -> Self {
        Self {
            sweep_runs_total: counter!(SWEEP_RUNS_TOTAL),
            sweep_overdue_total: counter!(SWEEP_OVERDUE_TOTAL),
            escalations_raised_total: counter!(ESCALATIONS_RAISED_TOTAL),
            escalations_suppressed_total: counter!(ESCALATIONS_SUPPRESSED_TOTAL),
            sweep_record_failures_total: counter!(SWEEP_RECORD_FAILURES_TOTAL),
            sweep_duration_ms: histogram!(SWEEP_DURATION_MS),
        }
    }

    pub fn record_sweep(&self, overdue: u64, failures: u64, elapsed: Duration) {
        self.sweep_runs_total.increment(1);
        self.sweep_overdue_total.increment(overdue);
        self.sweep_record_failures_total.increment(failures);
        self.sweep_duration_ms.record(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn record_escalation_raised(&self) {
        self.escalations_raised_total.increment(1);
    }

    pub fn record_escalation_suppressed(&self) {
        self.escalations_suppressed_total.increment(1);
    }

    /// outcome: applied / rejected / conflict
    pub fn record_transition(&self, action: &'static str, outcome: &'static str) {
        counter!(TRANSITIONS_TOTAL, "action" => action, "outcome" => outcome).increment(1);
    }

    pub fn record_day_workload(&self, department_id: &str, workload_percent: f64) {
        gauge!(DAY_WORKLOAD_PERCENT, "department" => department_id.to_string())
            .set(workload_percent);
    }
}
