//! Noobcash node binary.
//!
//! Starts one node — the bootstrap when no `--bootstrap` URL is given, a
//! peer otherwise — with its HTTP surface, mining worker, and optional
//! scripted transaction driver.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use noobcash_node::{router, Node, NodeConfig};
use tracing::info;

/// Noobcash node — a small permissioned proof-of-work blockchain.
#[derive(Parser, Debug)]
#[command(name = "noobcash-node", version, about = "Noobcash blockchain node")]
struct Args {
    /// Serve over IPv6 instead of IPv4
    #[arg(short = '6', long)]
    ipv6: bool,

    /// The port to listen on
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// The address of the bootstrap node; omit to be the bootstrap
    #[arg(short, long)]
    bootstrap: Option<String>,

    /// The number of transactions that triggers block sealing
    #[arg(short, long, default_value_t = 1)]
    capacity: usize,

    /// The number of leading zeros required of a mined block hash
    #[arg(short, long, default_value_t = 1)]
    difficulty: usize,

    /// The total number of nodes
    #[arg(short = 'n', long = "nodes", default_value_t = 2)]
    nodes: usize,

    /// A transaction script to replay once the network is enrolled
    #[arg(short, long)]
    transactions: Option<PathBuf>,

    /// Expose pending transactions in the transactions view
    #[arg(long)]
    debug: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> NodeConfig {
        let ip = if self.ipv6 {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
        NodeConfig {
            ip,
            port: self.port,
            bootstrap: self.bootstrap,
            capacity: self.capacity,
            difficulty: self.difficulty,
            n_nodes: self.nodes,
            transactions_file: self.transactions,
            debug: self.debug,
            ..NodeConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.into_config();
    info!(
        port = config.port,
        bootstrap = config.bootstrap.as_deref().unwrap_or("<self>"),
        capacity = config.capacity,
        difficulty = config.difficulty,
        nodes = config.n_nodes,
        "starting node"
    );

    let node = Node::new(config.clone()).context("failed to create node")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;

    node.start();
    info!("serving at {}", config.bind_addr());

    axum::serve(
        listener,
        router(node).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP server error")?;

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}
