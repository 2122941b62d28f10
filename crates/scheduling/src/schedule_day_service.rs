use std::collections::HashMap;
use std::sync::Arc;

use care_scheduler_domain::{
    apply_summary, summarize_day, CapacityProvider, CareInstance, CareInstanceRepository,
    DaySummary, OptimizationStrategy, ScheduleDay, ScheduleDayRepository, ScheduleDayStatus,
};
use care_scheduler_errors::{CareError, CareResult};
use care_scheduler_observability::CareMetrics;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 排班日版本冲突时的最大重试次数
const MAX_UPDATE_ATTEMPTS: usize = 3;

/// 排班日服务
///
/// 负责排班日的幂等创建、计数/负荷重算、优化标记与过期关闭。
/// 同一排班日的读-改-写在一把异步互斥锁内完成。
pub struct ScheduleDayService {
    day_repo: Arc<dyn ScheduleDayRepository>,
    instance_repo: Arc<dyn CareInstanceRepository>,
    capacity: Arc<dyn CapacityProvider>,
    day_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    metrics: CareMetrics,
}

impl ScheduleDayService {
    pub fn new(
        day_repo: Arc<dyn ScheduleDayRepository>,
        instance_repo: Arc<dyn CareInstanceRepository>,
        capacity: Arc<dyn CapacityProvider>,
    ) -> Self {
        Self {
            day_repo,
            instance_repo,
            capacity,
            day_locks: Mutex::new(HashMap::new()),
            metrics: CareMetrics::new(),
        }
    }

    async fn day_lock(&self, day_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.day_locks.lock().await;
        locks.entry(day_id).or_default().clone()
    }

    async fn release_day_lock(&self, day_id: i64) {
        self.day_locks.lock().await.remove(&day_id);
    }

    /// 解码某排班日的全部记录；无法解析的记录跳过并返回其ID
    async fn load_instances(&self, day_id: i64) -> CareResult<(Vec<CareInstance>, Vec<i64>)> {
        let mut instances = Vec::new();
        let mut skipped = Vec::new();

        for record in self
            .instance_repo
            .list_records()
            .await?
            .iter()
            .filter(|record| record.schedule_day_id == day_id)
        {
            match CareInstance::try_from(record) {
                Ok(instance) => instances.push(instance),
                Err(e) if e.is_data_error() => {
                    warn!("汇总时跳过无法解析的{}: {}", record.entity_description(), e);
                    skipped.push(record.id);
                }
                Err(e) => return Err(e),
            }
        }

        instances.sort_by(|a, b| {
            a.scheduled_time()
                .cmp(&b.scheduled_time())
                .then(a.id().cmp(&b.id()))
        });
        Ok((instances, skipped))
    }

    async fn load_day(&self, day_id: i64) -> CareResult<ScheduleDay> {
        self.day_repo
            .find_by_id(day_id)
            .await?
            .ok_or_else(|| CareError::day_not_found(day_id))
    }

    /// 获取或创建某部门某日的排班，重复调用返回同一条记录
    pub async fn ensure_day(
        &self,
        department_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> CareResult<ScheduleDay> {
        if department_id.trim().is_empty() {
            return Err(CareError::validation_error("部门ID不能为空"));
        }
        if let Some(existing) = self
            .day_repo
            .find_by_department_date(department_id, date)
            .await?
        {
            return Ok(existing);
        }

        let day = self
            .day_repo
            .create_if_absent(&ScheduleDay::new(department_id.to_string(), date, now))
            .await?;
        info!("排班日就绪: {}", day.entity_description());
        Ok(day)
    }

    /// 在排班日下创建一条记录并刷新汇总
    pub async fn add_instance(
        &self,
        instance: CareInstance,
        now: DateTime<Utc>,
    ) -> CareResult<CareInstance> {
        let day = self.load_day(instance.schedule_day_id()).await?;
        if !day.is_active() {
            return Err(CareError::validation_error(format!(
                "{} 已关闭，不能再添加记录",
                day.entity_description()
            )));
        }

        let created = self.instance_repo.create(&instance).await?;
        debug!("{} 已加入 {}", created.entity_description(), day.entity_description());
        // 记录已写入，汇总失败不回滚
        if let Err(e) = self.refresh(day.id, now).await {
            error!("{} 汇总刷新失败: {}", day.entity_description(), e);
        }
        Ok(created)
    }

    /// 只读汇总，不写回
    pub async fn summary(&self, day_id: i64) -> CareResult<DaySummary> {
        let day = self.load_day(day_id).await?;
        self.summarize(&day).await
    }

    async fn summarize(&self, day: &ScheduleDay) -> CareResult<DaySummary> {
        let (instances, skipped) = self.load_instances(day.id).await?;
        let capacity = self
            .capacity
            .staff_minutes(&day.department_id, day.date)
            .await?;
        let mut summary = summarize_day(day, &instances, capacity);
        summary.skipped_instance_ids = skipped;
        Ok(summary)
    }

    /// 重算计数与负荷并写回，优化标记保持不变
    pub async fn refresh(&self, day_id: i64, now: DateTime<Utc>) -> CareResult<ScheduleDay> {
        let lock = self.day_lock(day_id).await;
        let _guard = lock.lock().await;

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let day = self.load_day(day_id).await?;
            let summary = self.summarize(&day).await?;

            let mut updated = apply_summary(&day, &summary, now);
            updated.version = day.version + 1;

            if self.day_repo.update(day.version, &updated).await? {
                self.metrics
                    .record_day_workload(&updated.department_id, updated.estimated_workload);
                debug!(
                    "刷新{}: 任务 {}, 观察 {}, 负荷 {:.1}%",
                    updated.entity_description(),
                    updated.total_tasks,
                    updated.total_observations,
                    updated.estimated_workload
                );
                return Ok(updated);
            }
            warn!("排班日 {} 更新冲突，第 {} 次重试", day_id, attempt);
        }

        Err(CareError::storage_error(format!(
            "排班日 {day_id} 更新冲突，重试 {MAX_UPDATE_ATTEMPTS} 次后放弃"
        )))
    }

    /// 运行外部优化算法，成功后记录优化标记与时间
    pub async fn apply_optimization(
        &self,
        day_id: i64,
        strategy: &dyn OptimizationStrategy,
        now: DateTime<Utc>,
    ) -> CareResult<ScheduleDay> {
        let lock = self.day_lock(day_id).await;
        let _guard = lock.lock().await;

        let day = self.load_day(day_id).await?;
        let (instances, _) = self.load_instances(day_id).await?;
        let capacity = self
            .capacity
            .staff_minutes(&day.department_id, day.date)
            .await?;
        let summary = summarize_day(&day, &instances, capacity);
        if !summary.optimization_eligible {
            return Err(CareError::validation_error(format!(
                "{} 不满足优化条件",
                day.entity_description()
            )));
        }

        strategy.optimize(&day, &instances).await?;

        let mut updated = day.clone();
        updated.optimization_applied = true;
        updated.optimized_at = Some(now);
        updated.updated_at = now;
        updated.version = day.version + 1;

        if !self.day_repo.update(day.version, &updated).await? {
            return Err(CareError::storage_error(format!(
                "{} 在优化期间被修改",
                day.entity_description()
            )));
        }

        info!(
            "{} 已应用优化策略 {}",
            updated.entity_description(),
            strategy.name()
        );
        Ok(updated)
    }

    /// 关闭日期已过且全部记录均为终态的排班日，返回被关闭的排班日。
    /// 单个排班日失败只记录日志。
    pub async fn close_elapsed_days(&self, now: DateTime<Utc>) -> CareResult<Vec<ScheduleDay>> {
        let mut closed = Vec::new();

        for day in self.day_repo.list_active().await? {
            if !day.has_elapsed(now) {
                continue;
            }
            match self.try_close(day.id, now).await {
                Ok(Some(day)) => closed.push(day),
                Ok(None) => {}
                Err(e) => error!("关闭排班日 {} 时出错: {}", day.id, e),
            }
        }

        if !closed.is_empty() {
            info!("关闭了 {} 个已过期的排班日", closed.len());
        }
        Ok(closed)
    }

    async fn try_close(&self, day_id: i64, now: DateTime<Utc>) -> CareResult<Option<ScheduleDay>> {
        let lock = self.day_lock(day_id).await;
        let guard = lock.lock().await;

        let day = self.load_day(day_id).await?;
        if !day.is_active() {
            return Ok(None);
        }

        let (instances, skipped) = self.load_instances(day_id).await?;
        if !skipped.is_empty() {
            warn!(
                "{} 有 {} 条无法解析的记录，暂不关闭",
                day.entity_description(),
                skipped.len()
            );
            return Ok(None);
        }
        if let Some(open) = instances.iter().find(|instance| !instance.is_terminal()) {
            debug!(
                "{} 仍有未结束的记录 ({})",
                day.entity_description(),
                open.entity_description()
            );
            return Ok(None);
        }

        let mut updated = day.clone();
        updated.status = ScheduleDayStatus::Inactive;
        updated.updated_at = now;
        updated.version = day.version + 1;

        if !self.day_repo.update(day.version, &updated).await? {
            return Ok(None);
        }

        drop(guard);
        self.release_day_lock(day_id).await;
        Ok(Some(updated))
    }
}
