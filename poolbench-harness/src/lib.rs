pub mod buffer;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod progress;
pub mod report;
pub mod worker;
