use std::sync::Arc;

use care_scheduler_domain::{apply_transition, CareAction, CareInstance, CareInstanceRepository};
use care_scheduler_errors::{CareError, CareResult};
use care_scheduler_observability::CareMetrics;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::schedule_day_service::ScheduleDayService;

/// 护理记录状态转换服务
///
/// 读取 → 校验转换 → 按版本号比较并交换。并发操作同一记录时只有一个能成功，
/// 失败的一方得到 `InvalidTransition`。
pub struct CareLifecycleService {
    instance_repo: Arc<dyn CareInstanceRepository>,
    day_service: Arc<ScheduleDayService>,
    metrics: CareMetrics,
}

impl CareLifecycleService {
    pub fn new(
        instance_repo: Arc<dyn CareInstanceRepository>,
        day_service: Arc<ScheduleDayService>,
    ) -> Self {
        Self {
            instance_repo,
            day_service,
            metrics: CareMetrics::new(),
        }
    }

    pub async fn apply(
        &self,
        instance_id: i64,
        action: CareAction,
        actor: &str,
        now: DateTime<Utc>,
    ) -> CareResult<CareInstance> {
        let current = self
            .instance_repo
            .find_by_id(instance_id)
            .await?
            .ok_or_else(|| CareError::instance_not_found(instance_id))?;

        let updated = match apply_transition(&current, &action, actor, now) {
            Ok(updated) => updated,
            Err(e) => {
                self.metrics.record_transition(action.name(), "rejected");
                warn!(
                    "拒绝对 {} 执行 {}: {}",
                    current.entity_description(),
                    action.name(),
                    e
                );
                return Err(e);
            }
        };

        if !self
            .instance_repo
            .compare_and_swap(current.version(), &updated)
            .await?
        {
            self.metrics.record_transition(action.name(), "conflict");
            debug!(
                "{} 执行 {} 时发生并发冲突",
                current.entity_description(),
                action.name()
            );
            return Err(CareError::invalid_transition(
                current.status().as_str(),
                action.name(),
                "记录已被其他操作修改",
            ));
        }

        self.metrics.record_transition(action.name(), "applied");
        info!(
            instance_id = updated.id(),
            action = action.name(),
            actor = actor,
            from = %current.status(),
            to = %updated.status(),
            "护理记录状态已更新"
        );

        // 转换已提交，汇总刷新失败不回滚
        if let Err(e) = self
            .day_service
            .refresh(updated.schedule_day_id(), now)
            .await
        {
            error!("刷新排班日 {} 汇总失败: {}", updated.schedule_day_id(), e);
        }

        Ok(updated)
    }

    pub async fn start(
        &self,
        instance_id: i64,
        actor: &str,
        now: DateTime<Utc>,
    ) -> CareResult<CareInstance> {
        self.apply(instance_id, CareAction::Start, actor, now).await
    }

    pub async fn complete(
        &self,
        instance_id: i64,
        actor: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CareResult<CareInstance> {
        let action = CareAction::Complete {
            ended_at: None,
            notes,
        };
        self.apply(instance_id, action, actor, now).await
    }

    pub async fn cancel(
        &self,
        instance_id: i64,
        actor: &str,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> CareResult<CareInstance> {
        let action = CareAction::Cancel {
            reason: reason.into(),
        };
        self.apply(instance_id, action, actor, now).await
    }
}
