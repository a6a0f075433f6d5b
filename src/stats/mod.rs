//! Registry statistics

pub mod metrics;

pub use metrics::{RegistryCounters, RegistryStats};
