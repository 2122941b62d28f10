//! 护理排班核心的测试工具
//!
//! - **Builders**: 以合理默认值构造护理任务、观察记录与排班日
//! - **Mocks**: 可记录调用的告警通道、固定人力、计数优化器等测试替身
//! - **Helpers**: 预置内存存储与固定时间
//!
//! ```toml
//! [dev-dependencies]
//! care-scheduler-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
