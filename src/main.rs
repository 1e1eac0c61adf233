//! Entry point for the standalone result-chunk router service.
//!
//! Wires a [`router_core::ConsumerRegistry`] to a tonic server exposing
//! `ResultSinkService`. The registry's local interface (`add_grpc_source_node`,
//! `delete_query`, `get_incoming_worker_exec_stats`) is the contract handed to
//! the query executor; this binary only owns the registry and the RPC
//! listener, it does not implement an executor itself (out of scope, per
//! `router_core`'s crate docs).

mod config;

use clap::Parser;
use router_core::ConsumerRegistry;
use router_grpc::ResultSink;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line arguments for `router-service`.
#[derive(Debug, Parser)]
#[command(name = "router-service", about = "Standalone gRPC result-chunk router")]
struct Args {
    /// Path to a YAML config file. Falls back to built-in defaults if absent.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the listen address from the config file.
    #[arg(long, value_name = "HOST:PORT")]
    listen: Option<String>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => config::RouterConfig::from_file(path)?,
        None => config::RouterConfig::default(),
    };
    if let Some(listen) = args.listen {
        settings.listen_addr = listen;
    }

    let addr = settings.listen_addr.parse()?;
    let registry = Arc::new(ConsumerRegistry::new());
    let service = ResultSink::new(Arc::clone(&registry)).into_server();

    info!(%addr, "starting result-chunk router");
    tonic::transport::Server::builder()
        .add_service(service)
        .serve(addr)
        .await?;

    Ok(())
}
