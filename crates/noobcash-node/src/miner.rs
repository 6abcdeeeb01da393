//! The mining worker.
//!
//! One per node, independent of the HTTP handlers. It parks until the
//! mempool may have reached capacity (woken on every accepted transaction,
//! with a poll fallback), then asks the node to seal one block. The node
//! snapshots the batch under the lock and grinds proof-of-work on a local
//! copy, so handlers keep making progress throughout.

use std::sync::Arc;

use tracing::warn;

use crate::node::Node;

pub async fn run(node: Arc<Node>) {
    loop {
        if !node.mempool_at_capacity() {
            node.wait_for_work().await;
            continue;
        }
        if let Err(error) = node.mine_once().await {
            warn!(%error, "mining attempt failed");
        }
    }
}
