//! # noobcash-core
//! Foundation types for the Noobcash protocol.

pub mod block;
pub mod canonical;
pub mod chain;
pub mod crypto;
pub mod error;
pub mod transaction;

pub use block::{Block, GENESIS_PREVIOUS_HASH};
pub use chain::Blockchain;
pub use crypto::{Address, Keypair, SINK_ADDRESS};
pub use transaction::{Transaction, Utxo};
