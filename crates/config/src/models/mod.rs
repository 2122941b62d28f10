pub mod app_config;
pub mod logging;
pub mod observability;
pub mod scheduling;

pub use app_config::*;
pub use logging::*;
pub use observability::*;
pub use scheduling::*;
