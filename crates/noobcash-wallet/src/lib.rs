//! # noobcash-wallet — key pair plus per-wallet UTXO bookkeeping.

pub mod wallet;

pub use wallet::Wallet;
