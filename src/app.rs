use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use care_scheduler_config::AppConfig;
use care_scheduler_domain::{AlertSink, CareInstanceRepository, ScheduleDayRepository};
use care_scheduler_infrastructure::{
    InMemoryCareStore, LoggingAlertSink, Snapshot, StaticCapacityProvider,
};
use care_scheduler_scheduling::{
    OverdueSweepService, OverdueSweeper, ScheduleDayService, SweepReport,
};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::shutdown::ShutdownManager;

/// 主应用程序：内存存储 + 排班日服务 + 逾期巡检
pub struct Application {
    config: AppConfig,
    day_service: Arc<ScheduleDayService>,
    sweeper: Arc<OverdueSweeper>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let store = create_store(&config).await?;
        let instance_repo: Arc<dyn CareInstanceRepository> = Arc::new(store.clone());
        let day_repo: Arc<dyn ScheduleDayRepository> = Arc::new(store);
        let alert_sink: Arc<dyn AlertSink> = Arc::new(LoggingAlertSink);

        let day_service = Arc::new(ScheduleDayService::new(
            day_repo,
            Arc::clone(&instance_repo),
            Arc::new(StaticCapacityProvider::from_config(&config.workload)),
        ));

        let policy = config
            .escalation
            .policy()
            .context("解析升级策略配置失败")?;
        let due_window = chrono::Duration::minutes(config.workload.due_window_minutes as i64);
        let sweeper = Arc::new(
            OverdueSweeper::new(instance_repo, alert_sink, policy, config.sweep.clone())
                .with_due_window(due_window),
        );

        Ok(Self {
            config,
            day_service,
            sweeper,
        })
    }

    /// 执行一次巡检并关闭已过期的排班日
    pub async fn run_once(&self) -> Result<SweepReport> {
        let now = Utc::now();
        let report = self
            .sweeper
            .sweep_once(now)
            .await
            .context("执行逾期巡检失败")?;
        self.day_service
            .close_elapsed_days(now)
            .await
            .context("关闭过期排班日失败")?;
        Ok(report)
    }

    /// 运行巡检循环与排班日关闭循环，直到收到关闭信号
    pub async fn run(&self, shutdown: &ShutdownManager) -> Result<()> {
        info!("启动护理排班服务");

        let sweeper_handle = {
            let sweeper = Arc::clone(&self.sweeper);
            let shutdown_rx = shutdown.subscribe().await;
            tokio::spawn(async move {
                if let Err(e) = sweeper.start(shutdown_rx).await {
                    error!("逾期巡检服务运行失败: {}", e);
                }
            })
        };

        let closer_handle = {
            let day_service = Arc::clone(&self.day_service);
            let interval = self.config.sweep.interval();
            let shutdown_rx = shutdown.subscribe().await;
            tokio::spawn(close_days_loop(day_service, interval, shutdown_rx))
        };

        for (name, handle) in [("逾期巡检", sweeper_handle), ("排班日关闭", closer_handle)] {
            if let Err(e) = handle.await {
                warn!("{}任务异常退出: {}", name, e);
            }
        }

        info!("护理排班服务已停止");
        Ok(())
    }
}

async fn create_store(config: &AppConfig) -> Result<InMemoryCareStore> {
    let Some(path) = config.snapshot.path.as_deref() else {
        info!("未配置快照，使用空的内存存储");
        return Ok(InMemoryCareStore::new());
    };

    let snapshot = Snapshot::load(path).with_context(|| format!("加载快照失败: {path}"))?;
    let store = snapshot.into_store().await;
    info!(
        "已从快照 {} 加载 {} 个排班日, {} 条记录",
        path,
        store.day_count().await,
        store.record_count().await
    );
    Ok(store)
}

async fn close_days_loop(
    day_service: Arc<ScheduleDayService>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = day_service.close_elapsed_days(Utc::now()).await {
                    error!("关闭过期排班日失败: {}", e);
                }
            }
            _ = shutdown_rx.recv() => {
                info!("收到关闭信号，退出排班日关闭循环");
                break;
            }
        }
    }
}
