//! Camera stream registry
//!
//! The registry decides whether a camera publish is admitted and tracks which
//! camera is currently streaming on which path. At most one session per
//! camera is admitted at any instant.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<CameraStreamRegistry>
//!                   ┌──────────────────────────────────┐
//!                   │ sessions: HashMap<camera_id,     │
//!                   │   CameraStreamSession {          │
//!                   │     stream_path, connection,     │
//!                   │     started_at, state,           │
//!                   │   }                              │
//!                   │ >                                │
//!                   └───────┬──────────────┬───────────┘
//!                           │              │
//!            admit/release  │              │  lookup/snapshot
//!                           │              │
//!                 [LifecycleHandlers]   [dashboard, recorder]
//!                           ▲
//!                           │ GatewayEvent
//!                      [Dispatcher]
//! ```
//!
//! # Duplicate publishes
//!
//! A publish for a camera that is already admitted is rejected; the
//! incumbent keeps streaming.

pub mod config;
pub mod entry;
pub mod error;
pub mod path;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{CameraStreamSession, ReleaseOutcome, SessionHandle, SessionState};
pub use error::{PathDefect, RegistryError};
pub use path::{resolve_camera_id, without_query, StreamPath};
pub use store::{CameraStreamRegistry, LivenessProbe};
