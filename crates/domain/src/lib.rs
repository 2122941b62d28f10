pub mod aggregator;
pub mod due_status;
pub mod entities;
pub mod escalation;
pub mod lifecycle;
pub mod ports;
pub mod records;
pub mod recurrence;
pub mod repositories;

pub use aggregator::{apply_summary, summarize_day, workload_percent, DaySummary};
pub use care_scheduler_errors::{CareError, CareResult};
pub use due_status::{classify_due, evaluate_overdue, overdue_by, DueState};
pub use entities::*;
pub use escalation::{
    evaluate_escalation, is_duplicate_alert, EscalationAlert, EscalationPolicy, EscalationReason,
};
pub use lifecycle::{apply_transition, next_status, CareAction};
pub use ports::*;
pub use records::InstanceRecord;
pub use recurrence::{compute_next_occurrence, occurrences_between, upcoming_occurrences};
pub use repositories::*;
