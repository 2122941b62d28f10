use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use care_scheduler_config::SweepConfig;
use care_scheduler_domain::{
    apply_transition, classify_due, is_duplicate_alert, AlertSink, CareAction, CareInstance,
    CareInstanceRepository, CareStatus, DueState, EscalationAlert, EscalationPolicy,
    InstanceRecord,
};
use care_scheduler_errors::{CareError, CareResult};
use care_scheduler_observability::CareMetrics;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

/// 巡检写回逾期状态时使用的操作人
pub const SWEEPER_ACTOR: &str = "overdue-sweeper";

const DEFAULT_DUE_WINDOW_MINUTES: i64 = 15;

/// 只有待执行和进行中的记录才写回 overdue；延期等状态只在报告里计为逾期
fn can_persist_overdue(instance: &CareInstance) -> bool {
    instance.status() != CareStatus::Overdue
        && matches!(
            instance.lifecycle().effective_status(),
            CareStatus::Scheduled | CareStatus::InProgress
        )
}

/// 单条记录的巡检失败
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SweepFailure {
    pub instance_id: i64,
    pub error: String,
}

/// 一次巡检的结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SweepReport {
    pub swept_at: DateTime<Utc>,
    pub evaluated: usize,
    /// 处于提醒窗口内、尚未逾期的记录数
    pub due_soon: usize,
    /// 未结束且已过计划时间的记录数
    pub overdue: usize,
    pub overdue_persisted: usize,
    pub escalations_raised: usize,
    pub escalations_suppressed: usize,
    pub alerts: Vec<EscalationAlert>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    fn new(swept_at: DateTime<Utc>) -> Self {
        Self {
            swept_at,
            evaluated: 0,
            due_soon: 0,
            overdue: 0,
            overdue_persisted: 0,
            escalations_raised: 0,
            escalations_suppressed: 0,
            alerts: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, instance_id: i64, error: &CareError) {
        self.failures.push(SweepFailure {
            instance_id,
            error: error.to_string(),
        });
    }
}

/// 逾期/升级巡检服务接口
#[async_trait]
pub trait OverdueSweepService: Send + Sync {
    /// 启动周期巡检，直到收到关闭信号或被停止
    async fn start(&self, shutdown: broadcast::Receiver<()>) -> CareResult<()>;

    async fn stop(&self) -> CareResult<()>;

    /// 执行一次巡检
    async fn sweep_once(&self, now: DateTime<Utc>) -> CareResult<SweepReport>;
}

/// 逾期/升级巡检
///
/// 每轮读取全部存储记录，逐条解码并评估。单条记录失败只进入报告，
/// 不中断本轮巡检。已告警过的同一原因不会重复推送。
pub struct OverdueSweeper {
    instance_repo: Arc<dyn CareInstanceRepository>,
    alert_sink: Arc<dyn AlertSink>,
    policy: EscalationPolicy,
    config: SweepConfig,
    due_window: Duration,
    metrics: CareMetrics,
    running: Arc<RwLock<bool>>,
}

impl OverdueSweeper {
    pub fn new(
        instance_repo: Arc<dyn CareInstanceRepository>,
        alert_sink: Arc<dyn AlertSink>,
        policy: EscalationPolicy,
        config: SweepConfig,
    ) -> Self {
        Self {
            instance_repo,
            alert_sink,
            policy,
            config,
            due_window: Duration::minutes(DEFAULT_DUE_WINDOW_MINUTES),
            metrics: CareMetrics::new(),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// 计划时间前多长时间开始计入 `due_soon`
    pub fn with_due_window(mut self, due_window: Duration) -> Self {
        self.due_window = due_window;
        self
    }

    fn realert_after(&self) -> Option<Duration> {
        self.config
            .realert_after_minutes
            .and_then(|minutes| i64::try_from(minutes).ok())
            .map(Duration::minutes)
    }

    /// 把逾期状态写回存储，返回写回后的记录；版本冲突时返回 `None`
    async fn persist_overdue(
        &self,
        instance: &CareInstance,
        now: DateTime<Utc>,
    ) -> CareResult<Option<CareInstance>> {
        let updated = apply_transition(instance, &CareAction::MarkOverdue, SWEEPER_ACTOR, now)?;
        if self
            .instance_repo
            .compare_and_swap(instance.version(), &updated)
            .await?
        {
            Ok(Some(updated))
        } else {
            debug!("{} 已被并发修改，跳过逾期写回", instance.entity_description());
            Ok(None)
        }
    }

    async fn sweep_record(
        &self,
        record: &InstanceRecord,
        now: DateTime<Utc>,
        realert_after: Option<Duration>,
        report: &mut SweepReport,
    ) -> CareResult<()> {
        let mut instance = CareInstance::try_from(record)?;
        report.evaluated += 1;

        let due_state = classify_due(
            instance.status(),
            instance.scheduled_time(),
            now,
            self.due_window,
        );
        if due_state == DueState::Due {
            report.due_soon += 1;
        }
        if due_state == DueState::Overdue {
            report.overdue += 1;
            if self.config.persist_overdue_status && can_persist_overdue(&instance) {
                // 写回失败不影响后续升级判定
                match self.persist_overdue(&instance, now).await {
                    Ok(Some(updated)) => {
                        report.overdue_persisted += 1;
                        instance = updated;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("{} 逾期状态写回失败: {}", instance.entity_description(), e);
                        report.fail(instance.id(), &e);
                    }
                }
            }
        }

        let Some(reason) = self.policy.evaluate(&instance, now) else {
            return Ok(());
        };

        if is_duplicate_alert(instance.lifecycle(), reason, now, realert_after) {
            report.escalations_suppressed += 1;
            self.metrics.record_escalation_suppressed();
            debug!("{} 的 {} 告警已发送过，跳过", instance.entity_description(), reason);
            return Ok(());
        }

        let alert = EscalationAlert::new(&instance, reason, now);
        self.alert_sink.send_alert(&alert).await?;
        self.instance_repo
            .mark_escalated(instance.id(), reason, now)
            .await?;

        report.escalations_raised += 1;
        self.metrics.record_escalation_raised();
        info!(
            instance_id = instance.id(),
            reason = %reason,
            priority = %instance.priority(),
            "已发出升级告警"
        );
        report.alerts.push(alert);
        Ok(())
    }

    async fn sweep_loop(&self, mut shutdown: broadcast::Receiver<()>) -> CareResult<()> {
        info!("启动逾期巡检循环，间隔 {} 秒", self.config.interval_seconds);

        let mut interval = tokio::time::interval(self.config.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            if !*self.running.read().await {
                info!("收到停止信号，退出逾期巡检循环");
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once(Utc::now()).await {
                        error!("逾期巡检时出错: {}", e);
                    }
                }
                _ = shutdown.recv() => {
                    info!("收到关闭信号，退出逾期巡检循环");
                    break;
                }
            }
        }

        *self.running.write().await = false;
        Ok(())
    }
}

#[async_trait]
impl OverdueSweepService for OverdueSweeper {
    async fn start(&self, shutdown: broadcast::Receiver<()>) -> CareResult<()> {
        if !self.config.enabled {
            info!("逾期巡检已禁用");
            return Ok(());
        }

        info!("启动逾期巡检服务");
        *self.running.write().await = true;
        self.sweep_loop(shutdown).await
    }

    async fn stop(&self) -> CareResult<()> {
        info!("停止逾期巡检服务");
        *self.running.write().await = false;
        Ok(())
    }

    async fn sweep_once(&self, now: DateTime<Utc>) -> CareResult<SweepReport> {
        let started = Instant::now();
        let realert_after = self.realert_after();
        let mut report = SweepReport::new(now);

        let records = self.instance_repo.list_records().await?;
        debug!("开始逾期巡检，共 {} 条记录", records.len());

        for record in &records {
            if let Err(e) = self.sweep_record(record, now, realert_after, &mut report).await {
                if e.is_data_error() {
                    warn!("跳过无法解析的{}: {}", record.entity_description(), e);
                } else {
                    error!("巡检{}时出错: {}", record.entity_description(), e);
                }
                report.fail(record.id, &e);
            }
        }

        self.metrics.record_sweep(
            report.overdue as u64,
            report.failures.len() as u64,
            started.elapsed(),
        );

        if report.overdue > 0 || !report.failures.is_empty() || report.escalations_raised > 0 {
            info!(
                "逾期巡检完成: 评估 {} 条, 逾期 {} 条, 告警 {} 条, 抑制 {} 条, 失败 {} 条",
                report.evaluated,
                report.overdue,
                report.escalations_raised,
                report.escalations_suppressed,
                report.failures.len()
            );
        }

        Ok(report)
    }
}
