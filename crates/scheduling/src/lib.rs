pub mod lifecycle_service;
pub mod overdue_sweeper;
pub mod schedule_day_service;

pub use lifecycle_service::CareLifecycleService;
pub use overdue_sweeper::{
    OverdueSweepService, OverdueSweeper, SweepFailure, SweepReport, SWEEPER_ACTOR,
};
pub use schedule_day_service::ScheduleDayService;
