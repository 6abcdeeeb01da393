//! # noobcash-node — node composition and peer protocol.
//!
//! Wires the core types into a running node:
//! - [`node::Node`] — roster, wallet registry, mempool, chain, enrollment,
//!   transaction and block ingress, longest-chain conflict resolution
//! - [`miner`] — the capacity-gated proof-of-work worker
//! - [`driver`] — optional scripted transaction feeder
//! - [`routes`] — the axum HTTP surface peers and users talk to
//! - [`peer::PeerClient`] — outbound JSON calls with a bounded timeout

pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod miner;
pub mod node;
pub mod peer;
pub mod routes;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::{EnrollRequest, Node, PeerInfo};
pub use routes::router;
