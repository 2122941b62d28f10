use std::fmt;
use std::str::FromStr;

use crate::validation::ConfigValidator;
use serde::{Deserialize, Serialize};

/// 按名称（忽略大小写）在候选项中查找
fn parse_named<T: Copy>(value: &str, candidates: &[(&str, T)], kind: &str) -> Result<T, String> {
    let lowered = value.trim().to_ascii_lowercase();
    candidates
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, item)| *item)
        .ok_or_else(|| {
            let names: Vec<&str> = candidates.iter().map(|(name, _)| *name).collect();
            format!("无效的{kind}: {value}，可选值: {}", names.join(", "))
        })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const NAMED: [(&'static str, LogLevel); 5] = [
        ("trace", LogLevel::Trace),
        ("debug", LogLevel::Debug),
        ("info", LogLevel::Info),
        ("warn", LogLevel::Warn),
        ("error", LogLevel::Error),
    ];

    pub fn as_str(&self) -> &'static str {
        Self::NAMED
            .iter()
            .find(|(_, level)| level == self)
            .map_or("info", |(name, _)| *name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named(s, &Self::NAMED, "日志级别")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named(
            s,
            &[
                ("json", OutputFormat::Json),
                ("pretty", OutputFormat::Pretty),
                ("compact", OutputFormat::Compact),
            ],
            "日志格式",
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: OutputFormat,
    /// 输出文件名与行号
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: OutputFormat::default(),
            include_location: false,
        }
    }
}

/// 枚举字段由 serde 保证合法，无需额外校验
impl ConfigValidator for LogConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        Ok(())
    }
}
