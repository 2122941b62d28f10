use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CareError {
    #[error("无效的状态转换: {from} -> {action} ({reason})")]
    InvalidTransition {
        from: String,
        action: String,
        reason: String,
    },
    #[error("无效的时长: 结束时间 {end} 早于开始时间 {start}")]
    InvalidDuration { start: String, end: String },
    #[error("未知的观察频率: {0}")]
    UnknownFrequency(String),
    #[error("未知的{kind}取值: {value}")]
    UnknownValue { kind: String, value: String },
    #[error("护理实例未找到: {id}")]
    InstanceNotFound { id: i64 },
    #[error("排班日未找到: {id}")]
    ScheduleDayNotFound { id: i64 },
    #[error("数据验证失败: {0}")]
    ValidationError(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("存储错误: {0}")]
    Storage(String),
    #[error("告警投递失败: {0}")]
    AlertDelivery(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type CareResult<T> = Result<T, CareError>;

impl CareError {
    pub fn invalid_transition<F, A, R>(from: F, action: A, reason: R) -> Self
    where
        F: Into<String>,
        A: Into<String>,
        R: Into<String>,
    {
        Self::InvalidTransition {
            from: from.into(),
            action: action.into(),
            reason: reason.into(),
        }
    }
    pub fn invalid_duration<S: ToString, E: ToString>(start: S, end: E) -> Self {
        Self::InvalidDuration {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
    pub fn unknown_value<K: Into<String>, V: Into<String>>(kind: K, value: V) -> Self {
        Self::UnknownValue {
            kind: kind.into(),
            value: value.into(),
        }
    }
    pub fn instance_not_found(id: i64) -> Self {
        Self::InstanceNotFound { id }
    }
    pub fn day_not_found(id: i64) -> Self {
        Self::ScheduleDayNotFound { id }
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn storage_error<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// 需要直接反馈给操作人员的错误（不会自动重试）
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CareError::InvalidTransition { .. }
                | CareError::InvalidDuration { .. }
                | CareError::ValidationError(_)
        )
    }

    /// 单条记录的数据错误：巡检时跳过并上报，不中断整体流程
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            CareError::UnknownFrequency(_)
                | CareError::UnknownValue { .. }
                | CareError::Serialization(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CareError::Storage(_) | CareError::AlertDelivery(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, CareError::Internal(_) | CareError::Configuration(_))
    }

    pub fn user_message(&self) -> &str {
        match self {
            CareError::InvalidTransition { .. } => "当前状态不允许此操作",
            CareError::InvalidDuration { .. } => "结束时间不能早于开始时间",
            CareError::InstanceNotFound { .. } => "请求的护理任务不存在",
            CareError::ScheduleDayNotFound { .. } => "请求的排班日不存在",
            CareError::ValidationError(_) => "输入数据验证失败",
            CareError::UnknownFrequency(_) | CareError::UnknownValue { .. } => {
                "记录数据有误，请联系管理员"
            }
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<serde_json::Error> for CareError {
    fn from(err: serde_json::Error) -> Self {
        CareError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for CareError {
    fn from(err: anyhow::Error) -> Self {
        CareError::Internal(err.to_string())
    }
}
