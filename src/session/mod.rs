//! Gateway connection tracking
//!
//! Each Gateway connection moves through `Opened → Publishing → Closed`.
//! The connection table is the live-connection set used to detect sessions
//! whose connection disappeared without a publish-ended notification.

pub mod handle;
pub mod state;
pub mod table;

pub use handle::ConnectionHandle;
pub use state::{ConnectionPhase, ConnectionState};
pub use table::ConnectionTable;
