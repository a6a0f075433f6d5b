//! Camera stream registry implementation
//!
//! The authoritative table of which camera is live right now.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use super::config::RegistryConfig;
use super::entry::{CameraStreamSession, ReleaseOutcome, SessionHandle};
use super::error::RegistryError;
use super::path::{resolve_camera_id, without_query};
use crate::session::ConnectionHandle;
use crate::stats::{RegistryCounters, RegistryStats};

/// Source of the Gateway's currently open connections
///
/// Consulted by the liveness sweep to find sessions whose connection
/// vanished without a publish-ended notification.
pub trait LivenessProbe: Send + Sync + 'static {
    /// Connections the Gateway still considers open
    fn live_connections(&self) -> impl Future<Output = HashSet<ConnectionHandle>> + Send;
}

/// Registry of admitted camera streams
///
/// All mutations take the write lock, so admission and release are
/// linearized across every camera. Reads may observe state that is stale
/// by the time the caller acts on it.
pub struct CameraStreamRegistry {
    /// Admitted sessions keyed by camera ID
    sessions: RwLock<HashMap<String, CameraStreamSession>>,

    /// Next session ID; only advanced under the write lock so IDs follow insertion order
    next_session_id: AtomicU64,

    counters: RegistryCounters,

    config: RegistryConfig,
}

impl CameraStreamRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            counters: RegistryCounters::new(),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Admit a publish for a camera
    ///
    /// Fails with `DuplicateStream` if the camera already has an admitted
    /// session. The incumbent is kept and the newcomer is rejected. Any query
    /// suffix on `stream_path` is dropped before the path is recorded.
    pub async fn admit(
        &self,
        camera_id: &str,
        stream_path: &str,
        connection: ConnectionHandle,
    ) -> Result<SessionHandle, RegistryError> {
        let stream_path = without_query(stream_path);
        let mut sessions = self.sessions.write().await;

        if let Some(incumbent) = sessions.get(camera_id) {
            self.counters.record_rejected();
            tracing::warn!(
                camera_id = %camera_id,
                incumbent = %incumbent.connection,
                rejected = %connection,
                "Duplicate publish rejected"
            );
            return Err(RegistryError::DuplicateStream {
                camera_id: camera_id.to_string(),
                incumbent: incumbent.connection.clone(),
                rejected: connection,
            });
        }

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let session = CameraStreamSession::admitted(
            session_id,
            camera_id.to_string(),
            stream_path.to_string(),
            connection,
        );
        let handle = session.handle();
        sessions.insert(camera_id.to_string(), session);
        self.counters.record_admitted();

        tracing::info!(
            camera_id = %camera_id,
            path = %stream_path,
            connection = %handle.connection,
            session_id = session_id,
            "Camera stream admitted"
        );

        Ok(handle)
    }

    /// Resolve a raw stream path and admit it
    ///
    /// An invalid path leaves the registry untouched.
    pub async fn admit_path(
        &self,
        stream_path: &str,
        connection: ConnectionHandle,
    ) -> Result<SessionHandle, RegistryError> {
        let camera_id = resolve_camera_id(stream_path)?;
        self.admit(&camera_id, stream_path, connection).await
    }

    /// Release a camera's session
    ///
    /// Idempotent: releasing a camera with no admitted session is a no-op.
    /// Returns the closed session, if there was one.
    pub async fn release(&self, camera_id: &str) -> Option<CameraStreamSession> {
        let removed = self.sessions.write().await.remove(camera_id);

        match removed {
            Some(session) => {
                self.counters.record_released();
                let session = session.close();
                tracing::info!(
                    camera_id = %camera_id,
                    connection = %session.connection,
                    session_id = session.session_id,
                    duration_ms = session.age().as_millis() as u64,
                    "Camera stream released"
                );
                Some(session)
            }
            None => {
                tracing::debug!(camera_id = %camera_id, "Release of unknown session ignored");
                None
            }
        }
    }

    /// Release a camera's session only if `connection` owns it
    ///
    /// Protects the incumbent from teardown notifications sent on behalf of
    /// a connection whose publish was rejected.
    pub async fn release_owned(
        &self,
        camera_id: &str,
        connection: &ConnectionHandle,
    ) -> ReleaseOutcome {
        let mut sessions = self.sessions.write().await;

        let owner = match sessions.get(camera_id) {
            Some(session) => &session.connection,
            None => return ReleaseOutcome::NotFound,
        };

        if owner != connection {
            tracing::warn!(
                camera_id = %camera_id,
                owner = %owner,
                connection = %connection,
                "Release from non-owning connection ignored"
            );
            return ReleaseOutcome::NotOwner {
                owner: owner.clone(),
            };
        }

        match sessions.remove(camera_id) {
            Some(session) => {
                drop(sessions);
                self.counters.record_released();
                let session = session.close();
                tracing::info!(
                    camera_id = %camera_id,
                    connection = %connection,
                    session_id = session.session_id,
                    duration_ms = session.age().as_millis() as u64,
                    "Camera stream released"
                );
                ReleaseOutcome::Released(session)
            }
            None => ReleaseOutcome::NotFound,
        }
    }

    /// Look up a camera's admitted session
    pub async fn lookup(&self, camera_id: &str) -> Option<CameraStreamSession> {
        self.sessions.read().await.get(camera_id).cloned()
    }

    /// Check if a camera is currently live
    pub async fn is_live(&self, camera_id: &str) -> bool {
        self.sessions.read().await.contains_key(camera_id)
    }

    /// All admitted sessions in admission order
    pub async fn snapshot(&self) -> Vec<CameraStreamSession> {
        let mut sessions: Vec<CameraStreamSession> =
            self.sessions.read().await.values().cloned().collect();
        sessions.sort_by_key(|s| s.session_id);
        sessions
    }

    /// Number of admitted sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Get registry statistics
    pub async fn stats(&self) -> RegistryStats {
        let active = self.session_count().await;
        self.counters.snapshot(active)
    }

    /// Release sessions whose connection is no longer live
    ///
    /// Only sessions admitted before `cutoff` are considered, so a session
    /// admitted after the live set was captured is never mistaken for an
    /// orphan. Returns the closed sessions.
    pub async fn release_orphans(
        &self,
        live: &HashSet<ConnectionHandle>,
        cutoff: Instant,
    ) -> Vec<CameraStreamSession> {
        let mut sessions = self.sessions.write().await;

        let orphaned: Vec<String> = sessions
            .values()
            .filter(|s| s.started_at < cutoff && !live.contains(&s.connection))
            .map(|s| s.camera_id.clone())
            .collect();

        let mut released = Vec::with_capacity(orphaned.len());
        for camera_id in orphaned {
            if let Some(session) = sessions.remove(&camera_id) {
                tracing::warn!(
                    camera_id = %camera_id,
                    connection = %session.connection,
                    session_id = session.session_id,
                    "Orphaned camera stream released by sweep"
                );
                released.push(session.close());
            }
        }
        drop(sessions);

        if !released.is_empty() {
            self.counters.record_swept(released.len() as u64);
        }
        released
    }

    /// Run one liveness sweep against a probe
    pub async fn sweep<P: LivenessProbe>(&self, probe: &P) -> Vec<CameraStreamSession> {
        let cutoff = Instant::now();
        let live = probe.live_connections().await;
        self.release_orphans(&live, cutoff).await
    }

    /// Spawn the background liveness sweep
    ///
    /// Returns None when the sweep is disabled in the configuration,
    /// otherwise a handle that can be used to abort the task.
    pub fn spawn_sweep_task<P: LivenessProbe>(
        self: &Arc<Self>,
        probe: Arc<P>,
    ) -> Option<tokio::task::JoinHandle<()>> {
        let interval = self.config.sweep_interval?;
        let registry = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let released = registry.sweep(probe.as_ref()).await;
                if !released.is_empty() {
                    tracing::info!(released = released.len(), "Liveness sweep complete");
                }
            }
        }))
    }
}

impl Default for CameraStreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::registry::{PathDefect, SessionState};

    fn conn(id: &str) -> ConnectionHandle {
        ConnectionHandle::from(id)
    }

    struct FixedProbe(HashSet<ConnectionHandle>);

    impl LivenessProbe for FixedProbe {
        async fn live_connections(&self) -> HashSet<ConnectionHandle> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_admit_and_lookup() {
        let registry = CameraStreamRegistry::new();

        let handle = assert_ok!(registry.admit("cam-1", "/live/stream/cam-1", conn("h1")).await);
        assert_eq!(handle.camera_id, "cam-1");
        assert_eq!(handle.connection, conn("h1"));

        let session = registry.lookup("cam-1").await.unwrap();
        assert_eq!(session.state, SessionState::Admitted);
        assert_eq!(session.stream_path, "/live/stream/cam-1");
        assert_eq!(session.session_id, handle.session_id);
        assert!(registry.is_live("cam-1").await);
    }

    #[tokio::test]
    async fn test_admit_drops_query_from_path() {
        let registry = CameraStreamRegistry::new();
        registry
            .admit_path("/live/stream/cam-1?token=secret", conn("h1"))
            .await
            .unwrap();

        let session = registry.lookup("cam-1").await.unwrap();
        assert_eq!(session.stream_path, "/live/stream/cam-1");
        assert_eq!(registry.snapshot().await[0].stream_path, "/live/stream/cam-1");
    }

    #[tokio::test]
    async fn test_duplicate_keeps_incumbent() {
        let registry = CameraStreamRegistry::new();
        registry
            .admit("cam-1", "/live/stream/cam-1", conn("h1"))
            .await
            .unwrap();

        let err = assert_err!(registry.admit("cam-1", "/live/stream/cam-1", conn("h2")).await);
        assert_eq!(
            err,
            RegistryError::DuplicateStream {
                camera_id: "cam-1".into(),
                incumbent: conn("h1"),
                rejected: conn("h2"),
            }
        );

        let session = registry.lookup("cam-1").await.unwrap();
        assert_eq!(session.connection, conn("h1"));
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let registry = CameraStreamRegistry::new();

        assert_ok!(registry.admit("cam-1", "/live/stream/cam-1", conn("h1")).await);
        assert!(registry.lookup("cam-1").await.is_some());

        let closed = registry.release("cam-1").await.unwrap();
        assert_eq!(closed.state, SessionState::Closed);
        assert!(registry.lookup("cam-1").await.is_none());

        let handle = assert_ok!(registry.admit("cam-1", "/live/stream/cam-1", conn("h2")).await);
        assert_eq!(handle.connection, conn("h2"));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let registry = CameraStreamRegistry::new();
        registry
            .admit("cam-1", "/live/stream/cam-1", conn("h1"))
            .await
            .unwrap();

        assert!(registry.release("cam-1").await.is_some());
        assert!(registry.release("cam-1").await.is_none());
        assert!(registry.release("never-seen").await.is_none());
        assert_eq!(registry.session_count().await, 0);

        let stats = registry.stats().await;
        assert_eq!(stats.total_released, 1);
    }

    #[tokio::test]
    async fn test_release_owned() {
        let registry = CameraStreamRegistry::new();
        registry
            .admit("cam-1", "/live/stream/cam-1", conn("h1"))
            .await
            .unwrap();

        let outcome = registry.release_owned("cam-1", &conn("h2")).await;
        assert_eq!(outcome, ReleaseOutcome::NotOwner { owner: conn("h1") });
        assert!(registry.is_live("cam-1").await);

        let outcome = registry.release_owned("cam-1", &conn("h1")).await;
        assert!(matches!(
            outcome,
            ReleaseOutcome::Released(ref s) if s.state == SessionState::Closed
        ));
        assert!(!registry.is_live("cam-1").await);

        let outcome = registry.release_owned("cam-1", &conn("h1")).await;
        assert_eq!(outcome, ReleaseOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_path_leaves_registry_unchanged() {
        let registry = CameraStreamRegistry::new();
        registry
            .admit("cam-1", "/live/stream/cam-1", conn("h1"))
            .await
            .unwrap();

        let err = assert_err!(registry.admit_path("/live", conn("h2")).await);
        assert!(matches!(
            err,
            RegistryError::InvalidPath {
                defect: PathDefect::TooFewSegments(1),
                ..
            }
        ));

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].camera_id, "cam-1");
        assert_eq!(registry.stats().await.total_rejected, 0);
    }

    #[tokio::test]
    async fn test_snapshot_in_admission_order() {
        let registry = CameraStreamRegistry::new();
        for cam in ["cam-c", "cam-a", "cam-b"] {
            registry
                .admit(cam, &format!("/live/stream/{cam}"), conn(cam))
                .await
                .unwrap();
        }
        registry.release("cam-a").await;
        registry
            .admit("cam-a", "/live/stream/cam-a", conn("again"))
            .await
            .unwrap();

        let order: Vec<String> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|s| s.camera_id)
            .collect();
        assert_eq!(order, vec!["cam-c", "cam-b", "cam-a"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admission_single_winner() {
        let registry = Arc::new(CameraStreamRegistry::new());

        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let handle = conn(&format!("h{i}"));
                registry
                    .admit("cam-2", "/live/stream/cam-2", handle.clone())
                    .await
                    .map(|_| handle)
            }));
        }

        let mut winners = Vec::new();
        let mut duplicates = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(handle) => winners.push(handle),
                Err(RegistryError::DuplicateStream { .. }) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(duplicates, 31);
        let session = registry.lookup("cam-2").await.unwrap();
        assert_eq!(session.connection, winners[0]);

        let stats = registry.stats().await;
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.total_admitted, 1);
        assert_eq!(stats.total_rejected, 31);
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let registry = CameraStreamRegistry::new();
        let path = "/live/stream/camera-42";

        let first = assert_ok!(registry.admit_path(path, conn("h1")).await);
        assert_eq!(first.camera_id, "camera-42");

        let err = assert_err!(registry.admit_path(path, conn("h2")).await);
        assert!(matches!(err, RegistryError::DuplicateStream { .. }));

        registry.release("camera-42").await;
        assert_ok!(registry.admit_path(path, conn("h3")).await);

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].camera_id, "camera-42");
        assert_eq!(snapshot[0].connection, conn("h3"));
    }

    #[tokio::test]
    async fn test_release_orphans() {
        let registry = CameraStreamRegistry::new();
        registry
            .admit("cam-1", "/live/stream/cam-1", conn("h1"))
            .await
            .unwrap();
        registry
            .admit("cam-2", "/live/stream/cam-2", conn("h2"))
            .await
            .unwrap();

        let live: HashSet<ConnectionHandle> = [conn("h2")].into_iter().collect();
        let released = registry.release_orphans(&live, Instant::now()).await;

        assert_eq!(released.len(), 1);
        assert_eq!(released[0].camera_id, "cam-1");
        assert_eq!(released[0].state, SessionState::Closed);
        assert!(!registry.is_live("cam-1").await);
        assert!(registry.is_live("cam-2").await);
        assert_eq!(registry.stats().await.total_swept, 1);
    }

    #[tokio::test]
    async fn test_sweep_spares_sessions_after_cutoff() {
        let registry = CameraStreamRegistry::new();
        let cutoff = Instant::now();
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry
            .admit("cam-1", "/live/stream/cam-1", conn("h1"))
            .await
            .unwrap();

        let released = registry.release_orphans(&HashSet::new(), cutoff).await;
        assert!(released.is_empty());
        assert!(registry.is_live("cam-1").await);
    }

    #[tokio::test]
    async fn test_sweep_with_probe() {
        let registry = CameraStreamRegistry::new();
        registry
            .admit("cam-1", "/live/stream/cam-1", conn("gone"))
            .await
            .unwrap();

        let probe = FixedProbe(HashSet::new());
        let released = registry.sweep(&probe).await;
        assert_eq!(released.len(), 1);
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_task_disabled() {
        let config = RegistryConfig::default().disable_sweep();
        let registry = Arc::new(CameraStreamRegistry::with_config(config));
        let probe = Arc::new(FixedProbe(HashSet::new()));
        assert!(registry.spawn_sweep_task(probe).is_none());
    }

    #[tokio::test]
    async fn test_sweep_task_releases_orphans() {
        let config = RegistryConfig::default().sweep_interval(Duration::from_millis(20));
        let registry = Arc::new(CameraStreamRegistry::with_config(config));
        registry
            .admit("cam-1", "/live/stream/cam-1", conn("gone"))
            .await
            .unwrap();

        let probe = Arc::new(FixedProbe(HashSet::new()));
        let task = registry.spawn_sweep_task(probe).unwrap();

        for _ in 0..50 {
            if !registry.is_live("cam-1").await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        task.abort();

        assert!(!registry.is_live("cam-1").await);
    }
}
