use async_trait::async_trait;
use care_scheduler_domain::{AlertSink, EscalationAlert};
use care_scheduler_errors::{CareError, CareResult};
use tokio::sync::mpsc;
use tracing::warn;

/// 只写日志的告警通道，未接入通知服务时使用
#[derive(Debug, Clone, Default)]
pub struct LoggingAlertSink;

#[async_trait]
impl AlertSink for LoggingAlertSink {
    async fn send_alert(&self, alert: &EscalationAlert) -> CareResult<()> {
        warn!(
            alert_id = %alert.alert_id,
            instance_id = alert.instance_id,
            kind = %alert.instance_kind,
            schedule_day_id = alert.schedule_day_id,
            reason = %alert.reason,
            priority = %alert.priority,
            "护理记录需要升级处理"
        );
        Ok(())
    }
}

/// 把告警转发到 tokio 通道，由下游通知服务消费
#[derive(Debug, Clone)]
pub struct ChannelAlertSink {
    sender: mpsc::Sender<EscalationAlert>,
}

impl ChannelAlertSink {
    pub fn new(sender: mpsc::Sender<EscalationAlert>) -> Self {
        Self { sender }
    }

    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<EscalationAlert>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl AlertSink for ChannelAlertSink {
    async fn send_alert(&self, alert: &EscalationAlert) -> CareResult<()> {
        self.sender
            .send(alert.clone())
            .await
            .map_err(|e| CareError::AlertDelivery(format!("告警通道已关闭: {e}")))
    }
}
