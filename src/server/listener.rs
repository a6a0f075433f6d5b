//! Hook listener
//!
//! Accepts TCP connections from the media server's hook forwarder and
//! answers lifecycle notifications one line at a time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::registry::CameraStreamRegistry;
use crate::server::command::HookCommand;
use crate::server::config::ServerConfig;
use crate::server::dispatch::Dispatcher;
use crate::server::handler::GatewayHandler;

/// Longest hook command accepted, line terminator excluded
pub const MAX_LINE_LEN: usize = 4096;

/// Hook server
pub struct HookServer<H: GatewayHandler> {
    config: ServerConfig,
    dispatcher: Dispatcher<H>,
    registry: Arc<CameraStreamRegistry>,
    next_client_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl<H: GatewayHandler> HookServer<H> {
    /// Create a new server
    ///
    /// `registry` answers the `status` and `stats` queries.
    pub fn new(
        config: ServerConfig,
        dispatcher: Dispatcher<H>,
        registry: Arc<CameraStreamRegistry>,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            dispatcher,
            registry,
            next_client_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tracing::info!(addr = %listener.local_addr()?, "Hook listener ready");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let client_id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(client_id = client_id, peer = %peer_addr, "Hook client connected");

        let client = HookClient {
            client_id,
            dispatcher: self.dispatcher.clone(),
            registry: Arc::clone(&self.registry),
            idle_timeout: self.config.idle_timeout,
        };

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = client.run(socket).await {
                tracing::debug!(client_id = client_id, error = %e, "Hook client error");
            }

            tracing::debug!(client_id = client_id, "Hook client disconnected");
        });
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

/// One connected hook forwarder
struct HookClient<H: GatewayHandler> {
    client_id: u64,
    dispatcher: Dispatcher<H>,
    registry: Arc<CameraStreamRegistry>,
    idle_timeout: std::time::Duration,
}

impl<H: GatewayHandler> HookClient<H> {
    async fn run(&self, socket: TcpStream) -> Result<()> {
        let (reader, mut writer) = socket.into_split();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(256);

        loop {
            buf.clear();
            let mut limited = (&mut reader).take(MAX_LINE_LEN as u64 + 1);
            let read = limited.read_until(b'\n', &mut buf);
            let n = match tokio::time::timeout(self.idle_timeout, read).await {
                Ok(n) => n?,
                Err(_) => {
                    tracing::debug!(client_id = self.client_id, "Hook client idle, closing");
                    return Ok(());
                }
            };
            if n == 0 {
                return Ok(());
            }

            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            } else if buf.len() > MAX_LINE_LEN {
                tracing::warn!(
                    client_id = self.client_id,
                    limit = MAX_LINE_LEN,
                    "Hook command too long"
                );
                match tokio::time::timeout(self.idle_timeout, skip_line(&mut reader)).await {
                    Ok(skipped) => skipped?,
                    Err(_) => return Ok(()),
                }
                writer.write_all(b"error line too long\n").await?;
                continue;
            }

            let line = String::from_utf8_lossy(&buf);
            if line.trim().is_empty() {
                continue;
            }

            let reply = self.respond(&line).await;
            writer.write_all(reply.as_bytes()).await?;
        }
    }

    async fn respond(&self, line: &str) -> String {
        let command = match HookCommand::parse(line) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(client_id = self.client_id, error = %e, "Bad hook command");
                return format!("error {}\n", e);
            }
        };

        match command {
            HookCommand::Event(event) => format!("{}\n", self.dispatcher.dispatch(event).await),
            HookCommand::Status => {
                let mut out = String::new();
                for session in self.registry.snapshot().await {
                    out.push_str(&format!(
                        "session {} {} {} {}\n",
                        session.camera_id,
                        session.stream_path,
                        session.connection,
                        session.age().as_millis()
                    ));
                }
                out.push_str("end\n");
                out
            }
            HookCommand::Stats => format!("stats {}\n", self.registry.stats().await),
        }
    }
}

/// Discard input up to and including the next newline
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok(());
        }
        match chunk.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = chunk.len();
                reader.consume(len);
            }
        }
    }
}
