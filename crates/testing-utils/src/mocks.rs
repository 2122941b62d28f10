//! Test doubles for the external collaborator ports

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use care_scheduler_domain::{
    AlertSink, CapacityProvider, CareInstance, EscalationAlert, OptimizationStrategy, ScheduleDay,
};
use care_scheduler_errors::{CareError, CareResult};
use chrono::NaiveDate;
use tokio::sync::Mutex;

/// 记录全部收到告警的告警通道
#[derive(Debug, Clone, Default)]
pub struct RecordingAlertSink {
    alerts: Arc<Mutex<Vec<EscalationAlert>>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn alerts(&self) -> Vec<EscalationAlert> {
        self.alerts.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.alerts.lock().await.len()
    }

    pub async fn clear(&self) {
        self.alerts.lock().await.clear();
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn send_alert(&self, alert: &EscalationAlert) -> CareResult<()> {
        self.alerts.lock().await.push(alert.clone());
        Ok(())
    }
}

/// 总是投递失败的告警通道，统计被调用次数
#[derive(Debug, Clone, Default)]
pub struct FailingAlertSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertSink for FailingAlertSink {
    async fn send_alert(&self, alert: &EscalationAlert) -> CareResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CareError::AlertDelivery(format!(
            "告警 {} 投递失败",
            alert.instance_id
        )))
    }
}

/// 固定人力，可按部门覆盖
#[derive(Debug, Clone)]
pub struct FixedCapacityProvider {
    default_minutes: u64,
    departments: HashMap<String, u64>,
}

impl FixedCapacityProvider {
    pub fn new(default_minutes: u64) -> Self {
        Self {
            default_minutes,
            departments: HashMap::new(),
        }
    }

    pub fn with_department(mut self, department_id: &str, minutes: u64) -> Self {
        self.departments.insert(department_id.to_string(), minutes);
        self
    }
}

#[async_trait]
impl CapacityProvider for FixedCapacityProvider {
    async fn staff_minutes(&self, department_id: &str, _date: NaiveDate) -> CareResult<u64> {
        Ok(self
            .departments
            .get(department_id)
            .copied()
            .unwrap_or(self.default_minutes))
    }
}

/// 记录调用次数的优化器，可配置为失败
#[derive(Debug, Clone, Default)]
pub struct CountingOptimizer {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OptimizationStrategy for CountingOptimizer {
    fn name(&self) -> &str {
        "counting"
    }

    async fn optimize(&self, day: &ScheduleDay, _instances: &[CareInstance]) -> CareResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CareError::Internal(format!(
                "优化排班日 {} 失败",
                day.id
            )));
        }
        Ok(())
    }
}
