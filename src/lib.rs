//! camera-ingest: camera stream admission for RTMP ingestion gateways
//!
//! This library sits behind an RTMP media server and decides which camera
//! publishes are admitted:
//! - Stream path resolution (`/<application>/<namespace>/<camera_id>`)
//! - A registry holding at most one live session per camera
//! - Lifecycle handlers translating Gateway notifications into admit/release
//! - A liveness sweep releasing sessions whose connection vanished
//! - A line-oriented hook listener for out-of-process gateways
//!
//! # Example: Embedded Handlers
//!
//! ```no_run
//! use camera_ingest::{GatewayEvent, IngestService, RegistryConfig};
//! use camera_ingest::session::ConnectionHandle;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = IngestService::start(RegistryConfig::default());
//!     let dispatcher = service.dispatcher();
//!
//!     let reply = dispatcher
//!         .dispatch(GatewayEvent::PublishRequested {
//!             connection: ConnectionHandle::from(7u64),
//!             stream_path: "/live/stream/camera-42".into(),
//!         })
//!         .await;
//!     println!("publish: {}", reply);
//!
//!     if let Some(session) = service.registry().lookup("camera-42").await {
//!         println!("live on {}", session.stream_path);
//!     }
//!     service.shutdown().await;
//! }
//! ```

pub mod error;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use registry::{CameraStreamRegistry, CameraStreamSession, RegistryConfig, RegistryError};
pub use server::{
    Dispatcher, EventReply, GatewayEvent, GatewayHandler, HookServer, IngestService,
    LifecycleHandlers, ServerConfig,
};
