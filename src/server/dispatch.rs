//! Gateway event dispatch
//!
//! Each event runs on its own task. A handler that panics is contained at
//! the task boundary and the event gets the most conservative reply.

use std::sync::Arc;

use super::handler::GatewayHandler;
use crate::session::ConnectionHandle;

/// Lifecycle notification emitted by the Gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    ConnectionOpened {
        connection: ConnectionHandle,
    },
    PublishRequested {
        connection: ConnectionHandle,
        stream_path: String,
    },
    PublishEnded {
        connection: ConnectionHandle,
        stream_path: String,
    },
    ConnectionClosed {
        connection: ConnectionHandle,
    },
}

impl GatewayEvent {
    /// Connection the event belongs to
    pub fn connection(&self) -> &ConnectionHandle {
        match self {
            GatewayEvent::ConnectionOpened { connection }
            | GatewayEvent::PublishRequested { connection, .. }
            | GatewayEvent::PublishEnded { connection, .. }
            | GatewayEvent::ConnectionClosed { connection } => connection,
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayEvent::ConnectionOpened { .. } => "connection_opened",
            GatewayEvent::PublishRequested { .. } => "publish_requested",
            GatewayEvent::PublishEnded { .. } => "publish_ended",
            GatewayEvent::ConnectionClosed { .. } => "connection_closed",
        }
    }

    /// Reply used when the handler fails
    pub fn fallback_reply(&self) -> EventReply {
        match self {
            GatewayEvent::ConnectionOpened { .. } | GatewayEvent::PublishRequested { .. } => {
                EventReply::Deny
            }
            GatewayEvent::PublishEnded { .. } | GatewayEvent::ConnectionClosed { .. } => {
                EventReply::Ack
            }
        }
    }

    async fn apply<H: GatewayHandler>(self, handler: &H) -> EventReply {
        match self {
            GatewayEvent::ConnectionOpened { connection } => {
                EventReply::decision(handler.on_connection_opened(&connection).await)
            }
            GatewayEvent::PublishRequested {
                connection,
                stream_path,
            } => EventReply::decision(
                handler
                    .on_publish_requested(&connection, &stream_path)
                    .await,
            ),
            GatewayEvent::PublishEnded {
                connection,
                stream_path,
            } => {
                handler.on_publish_ended(&connection, &stream_path).await;
                EventReply::Ack
            }
            GatewayEvent::ConnectionClosed { connection } => {
                handler.on_connection_closed(&connection).await;
                EventReply::Ack
            }
        }
    }
}

/// Answer returned to the Gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReply {
    /// Connection or publish allowed
    Allow,
    /// Connection or publish refused
    Deny,
    /// Teardown acknowledged
    Ack,
}

impl EventReply {
    fn decision(allowed: bool) -> Self {
        if allowed {
            EventReply::Allow
        } else {
            EventReply::Deny
        }
    }

    /// Check if the reply allows the request
    pub fn is_allowed(&self) -> bool {
        *self == EventReply::Allow
    }
}

impl std::fmt::Display for EventReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventReply::Allow => f.write_str("allow"),
            EventReply::Deny => f.write_str("deny"),
            EventReply::Ack => f.write_str("ok"),
        }
    }
}

/// Routes Gateway events to a handler
pub struct Dispatcher<H: GatewayHandler> {
    handler: Arc<H>,
}

impl<H: GatewayHandler> Dispatcher<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Get the handler
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Handle one event and produce the Gateway's answer
    ///
    /// Never fails: a handler panic is logged and converted into the
    /// event's fallback reply.
    pub async fn dispatch(&self, event: GatewayEvent) -> EventReply {
        let kind = event.kind();
        let connection = event.connection().clone();
        let fallback = event.fallback_reply();
        let handler = Arc::clone(&self.handler);

        let task = tokio::spawn(async move { event.apply(handler.as_ref()).await });

        match task.await {
            Ok(reply) => {
                tracing::debug!(
                    connection = %connection,
                    event = kind,
                    reply = %reply,
                    "Event handled"
                );
                reply
            }
            Err(e) => {
                tracing::error!(
                    connection = %connection,
                    event = kind,
                    error = %e,
                    reply = %fallback,
                    "Event handler failed"
                );
                fallback
            }
        }
    }
}

impl<H: GatewayHandler> Clone for Dispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CameraStreamRegistry;
    use crate::server::handler::LifecycleHandlers;
    use crate::session::ConnectionTable;

    struct PanickingHandler;

    impl GatewayHandler for PanickingHandler {
        async fn on_publish_requested(
            &self,
            _connection: &ConnectionHandle,
            stream_path: &str,
        ) -> bool {
            panic!("handler exploded on {stream_path}");
        }

        async fn on_publish_ended(&self, _connection: &ConnectionHandle, _stream_path: &str) {
            panic!("teardown exploded");
        }
    }

    fn publish(connection: &str, path: &str) -> GatewayEvent {
        GatewayEvent::PublishRequested {
            connection: ConnectionHandle::from(connection),
            stream_path: path.to_string(),
        }
    }

    fn lifecycle_dispatcher() -> Dispatcher<LifecycleHandlers> {
        Dispatcher::new(Arc::new(LifecycleHandlers::new(
            Arc::new(CameraStreamRegistry::new()),
            Arc::new(ConnectionTable::new()),
        )))
    }

    #[tokio::test]
    async fn test_dispatch_lifecycle() {
        let dispatcher = lifecycle_dispatcher();
        let c1 = ConnectionHandle::from("c1");

        let reply = dispatcher
            .dispatch(GatewayEvent::ConnectionOpened {
                connection: c1.clone(),
            })
            .await;
        assert_eq!(reply, EventReply::Allow);

        let reply = dispatcher.dispatch(publish("c1", "/live/stream/cam-1")).await;
        assert_eq!(reply, EventReply::Allow);
        let reply = dispatcher.dispatch(publish("c2", "/live/stream/cam-1")).await;
        assert_eq!(reply, EventReply::Deny);
        let reply = dispatcher.dispatch(publish("c3", "/live")).await;
        assert_eq!(reply, EventReply::Deny);

        let reply = dispatcher
            .dispatch(GatewayEvent::PublishEnded {
                connection: c1.clone(),
                stream_path: "/live/stream/cam-1".into(),
            })
            .await;
        assert_eq!(reply, EventReply::Ack);

        let reply = dispatcher
            .dispatch(GatewayEvent::ConnectionClosed { connection: c1 })
            .await;
        assert_eq!(reply, EventReply::Ack);

        assert_eq!(dispatcher.handler().registry().session_count().await, 0);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let dispatcher = Dispatcher::new(Arc::new(PanickingHandler));

        let reply = dispatcher.dispatch(publish("c1", "/live/stream/cam-1")).await;
        assert_eq!(reply, EventReply::Deny);

        let reply = dispatcher
            .dispatch(GatewayEvent::PublishEnded {
                connection: ConnectionHandle::from("c1"),
                stream_path: "/live/stream/cam-1".into(),
            })
            .await;
        assert_eq!(reply, EventReply::Ack);

        // Default callbacks still work after a panic
        let reply = dispatcher
            .dispatch(GatewayEvent::ConnectionOpened {
                connection: ConnectionHandle::from("c2"),
            })
            .await;
        assert_eq!(reply, EventReply::Allow);
    }

    #[test]
    fn test_fallback_replies() {
        assert_eq!(publish("c", "/a/b/c").fallback_reply(), EventReply::Deny);
        let closed = GatewayEvent::ConnectionClosed {
            connection: ConnectionHandle::from("c"),
        };
        assert_eq!(closed.fallback_reply(), EventReply::Ack);
        assert_eq!(closed.kind(), "connection_closed");
    }

    #[test]
    fn test_reply_display() {
        assert_eq!(EventReply::Allow.to_string(), "allow");
        assert_eq!(EventReply::Deny.to_string(), "deny");
        assert_eq!(EventReply::Ack.to_string(), "ok");
        assert!(EventReply::Allow.is_allowed());
        assert!(!EventReply::Ack.is_allowed());
    }
}
