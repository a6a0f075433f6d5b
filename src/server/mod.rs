//! Gateway-facing service: lifecycle handlers, event dispatch, and the hook listener

pub mod command;
pub mod config;
pub mod dispatch;
pub mod handler;
pub mod listener;
pub mod service;

pub use command::{CommandError, HookCommand};
pub use config::ServerConfig;
pub use dispatch::{Dispatcher, EventReply, GatewayEvent};
pub use handler::{GatewayHandler, LifecycleHandlers};
pub use listener::HookServer;
pub use service::IngestService;
