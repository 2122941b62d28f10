pub mod metrics_collector;
pub mod telemetry_setup;

pub use metrics_collector::CareMetrics;
pub use telemetry_setup::{build_env_filter, init_logging, init_metrics, init_observability};
