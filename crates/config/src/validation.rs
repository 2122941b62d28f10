// 配置验证

use crate::{ConfigError, ConfigResult};

/// 每个配置段各自实现
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

pub(crate) fn validate_range(value: u64, min: u64, max: u64, field: &str) -> ConfigResult<()> {
    if value < min || value > max {
        return Err(ConfigError::Validation(format!(
            "{field} 必须在 {min}-{max} 之间, 当前值: {value}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_positive(value: u64, field: &str) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::Validation(format!("{field} 必须大于0")));
    }
    Ok(())
}

pub(crate) fn validate_not_empty(value: &str, field: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} 不能为空")));
    }
    Ok(())
}
