//! 观察频率与下一次执行时间的计算
//!
//! 所有时间均为 UTC，按固定小时数相加，不受夏令时影响。

use chrono::{DateTime, Duration, Utc};

use crate::entities::ObservationFrequency;

impl ObservationFrequency {
    /// 固定间隔表（小时）。as_needed / continuous 没有可预测的间隔，返回 `None`，
    /// 不能理解为"间隔为 0、每次都立即到期"。
    pub fn interval_hours(&self) -> Option<i64> {
        match self {
            ObservationFrequency::Hourly => Some(1),
            ObservationFrequency::TwoHourly => Some(2),
            ObservationFrequency::FourHourly => Some(4),
            ObservationFrequency::TwiceDaily => Some(12),
            ObservationFrequency::Daily => Some(24),
            ObservationFrequency::TwiceWeekly => Some(84),
            ObservationFrequency::Weekly => Some(168),
            ObservationFrequency::AsNeeded | ObservationFrequency::Continuous => None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval_hours().map(Duration::hours)
    }

    pub fn is_periodic(&self) -> bool {
        self.interval_hours().is_some()
    }

    /// 频率的中文描述
    pub fn description(&self) -> String {
        match self.interval_hours() {
            Some(168) => "每周".to_string(),
            Some(84) => "每周两次".to_string(),
            Some(24) => "每天".to_string(),
            Some(12) => "每天两次".to_string(),
            Some(hours) => format!("每{hours}小时"),
            None if *self == ObservationFrequency::Continuous => "持续监测".to_string(),
            None => "按需".to_string(),
        }
    }
}

/// 下一次执行时间 = 参考时间 + 固定间隔；非周期频率返回 `None`
pub fn compute_next_occurrence(
    frequency: ObservationFrequency,
    reference_time: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    frequency
        .interval()
        .and_then(|interval| reference_time.checked_add_signed(interval))
}

/// 从 `from`（不含）开始的后续 `count` 个执行时间
pub fn upcoming_occurrences(
    frequency: ObservationFrequency,
    from: DateTime<Utc>,
    count: usize,
) -> Vec<DateTime<Utc>> {
    std::iter::successors(compute_next_occurrence(frequency, from), |last| {
        compute_next_occurrence(frequency, *last)
    })
    .take(count)
    .collect()
}

/// `[start, end)` 区间内以 `start` 为锚点的所有执行时间，用于生成一天的观察排班。
/// 非周期频率只返回锚点本身。
pub fn occurrences_between(
    frequency: ObservationFrequency,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    if start >= end {
        return Vec::new();
    }
    if !frequency.is_periodic() {
        return vec![start];
    }

    std::iter::successors(Some(start), |last| compute_next_occurrence(frequency, *last))
        .take_while(|time| *time < end)
        .collect()
}
