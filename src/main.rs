//! Camera ingest hook server
//!
//! Run with: camera-ingest [BIND_ADDR] [--sweep-secs N] [--no-sweep]
//!
//! Examples:
//!   camera-ingest                        # binds to 127.0.0.1:1936
//!   camera-ingest 0.0.0.0:1940           # binds to 0.0.0.0:1940
//!   camera-ingest --sweep-secs 30        # sweep orphaned sessions every 30s
//!
//! A media server forwards its lifecycle hooks as lines:
//!
//!   publish 12 /live/stream/camera-42    -> allow | deny
//!   unpublish 12 /live/stream/camera-42  -> ok
//!   status                               -> session ... / end

use std::net::SocketAddr;
use std::time::Duration;

use camera_ingest::{HookServer, IngestService, RegistryConfig, ServerConfig};

struct Args {
    bind_addr: Option<SocketAddr>,
    registry: RegistryConfig,
}

fn print_usage() {
    println!("Usage: camera-ingest [BIND_ADDR] [--sweep-secs N] [--no-sweep]");
    println!();
    println!("Arguments:");
    println!("  BIND_ADDR          Address to listen on (default: 127.0.0.1:1936)");
    println!("                     'localhost' is shorthand for 127.0.0.1:1936");
    println!();
    println!("Options:");
    println!("  --sweep-secs N     Seconds between orphaned-session sweeps (default: 10)");
    println!("  --no-sweep         Disable the orphaned-session sweep");
    println!("  -h, --help         Print this help");
}

fn parse_args(args: &[String]) -> Result<Args, Box<dyn std::error::Error>> {
    let mut parsed = Args {
        bind_addr: None,
        registry: RegistryConfig::default(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--no-sweep" => parsed.registry = parsed.registry.disable_sweep(),
            "--sweep-secs" => {
                let secs: u64 = iter.next().ok_or("--sweep-secs requires a value")?.parse()?;
                if secs == 0 {
                    return Err("--sweep-secs must be greater than zero".into());
                }
                parsed.registry = parsed.registry.sweep_interval(Duration::from_secs(secs));
            }
            "localhost" => parsed.bind_addr = Some("127.0.0.1:1936".parse()?),
            other => parsed.bind_addr = Some(other.parse()?),
        }
    }

    Ok(parsed)
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::error!(location = %location, panic = %info, "Unhandled panic");
    }));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("camera_ingest=info".parse()?),
        )
        .init();

    // Panics inside event tasks are contained by the runtime; log them instead of
    // letting them vanish on stderr
    install_panic_hook();

    let args = parse_args(&args)?;
    let config = match args.bind_addr {
        Some(addr) => ServerConfig::with_addr(addr),
        None => ServerConfig::default(),
    };

    let service = IngestService::start(args.registry);
    let server = HookServer::new(config, service.dispatcher(), service.registry().clone());

    tracing::info!(addr = %server.bind_addr(), "Starting camera ingest hook server");

    let result = server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    service.shutdown().await;
    result?;
    Ok(())
}
