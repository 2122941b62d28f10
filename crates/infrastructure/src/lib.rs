pub mod alert_sinks;
pub mod capacity;
pub mod in_memory_store;
pub mod snapshot;

pub use alert_sinks::{ChannelAlertSink, LoggingAlertSink};
pub use capacity::StaticCapacityProvider;
pub use in_memory_store::InMemoryCareStore;
pub use snapshot::Snapshot;
