//! Registry configuration

use std::time::Duration;

/// Default interval between liveness sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for the camera stream registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Interval between orphan sweeps (None = sweep disabled)
    pub sweep_interval: Option<Duration>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Some(DEFAULT_SWEEP_INTERVAL),
        }
    }
}

impl RegistryConfig {
    /// Set the sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Disable the liveness sweep
    pub fn disable_sweep(mut self) -> Self {
        self.sweep_interval = None;
        self
    }
}
