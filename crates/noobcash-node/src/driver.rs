//! Scripted transaction driver.
//!
//! When the node is configured with a transaction file, this worker waits
//! for the roster to fill up, then replays lines of the form `id<k> <amount>`
//! through local transaction creation, one per line. Unknown ids, malformed
//! lines, and non-positive amounts count as failures; nothing aborts the
//! run. The outcome counters and the wall-clock throughput land in the
//! node's metrics.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::node::Node;

pub async fn run(node: Arc<Node>, path: PathBuf) {
    while node.network_len() < node.config().n_nodes {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(error) => {
            warn!(path = %path.display(), %error, "cannot read transaction file");
            return;
        }
    };

    info!(path = %path.display(), "reading transaction file");
    let started = Instant::now();
    let mut successful = 0u64;
    let mut failed = 0u64;

    for line in content.lines().filter(|line| !line.trim().is_empty()) {
        let outcome = match parse_line(line) {
            Some((index, amount)) if amount > 0 => match node.peer_info(index) {
                Some(peer) => node
                    .create_transaction(peer.public_key, amount as u64)
                    .await
                    .map(|_| ()),
                None => {
                    warn!(line, "unknown node id");
                    failed += 1;
                    continue;
                }
            },
            _ => {
                warn!(line, "rejected script line");
                failed += 1;
                continue;
            }
        };
        match outcome {
            Ok(()) => successful += 1,
            Err(error) => {
                warn!(line, %error, "scripted transaction failed");
                failed += 1;
            }
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    node.record_driver_metrics(successful, failed, elapsed);
    info!(successful, failed, path = %path.display(), "finished transaction file");
}

/// Parse a whitespace-delimited `id<k> <amount>` line.
fn parse_line(line: &str) -> Option<(usize, i64)> {
    let mut parts = line.split_whitespace();
    let index = parts.next()?.strip_prefix("id")?.parse().ok()?;
    let amount = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((index, amount))
}
