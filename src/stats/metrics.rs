//! Statistics for the camera stream registry

use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters kept by the registry
#[derive(Debug, Default)]
pub struct RegistryCounters {
    admitted: AtomicU64,
    rejected: AtomicU64,
    released: AtomicU64,
    swept: AtomicU64,
}

impl RegistryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_swept(&self, count: u64) {
        self.swept.fetch_add(count, Ordering::Relaxed);
    }

    /// Take a snapshot combined with the current active session count
    pub fn snapshot(&self, active_sessions: usize) -> RegistryStats {
        RegistryStats {
            active_sessions,
            total_admitted: self.admitted.load(Ordering::Relaxed),
            total_rejected: self.rejected.load(Ordering::Relaxed),
            total_released: self.released.load(Ordering::Relaxed),
            total_swept: self.swept.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Sessions currently admitted
    pub active_sessions: usize,
    /// Admissions granted since start
    pub total_admitted: u64,
    /// Admissions refused as duplicates since start
    pub total_rejected: u64,
    /// Sessions closed by an explicit release
    pub total_released: u64,
    /// Sessions closed by the liveness sweep
    pub total_swept: u64,
}

impl std::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "active={} admitted={} rejected={} released={} swept={}",
            self.active_sessions,
            self.total_admitted,
            self.total_rejected,
            self.total_released,
            self.total_swept
        )
    }
}
