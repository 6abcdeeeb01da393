//! Error types for the Noobcash protocol.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid hex encoding: {0}")] InvalidHex(String),
    #[error("invalid DER key material")] InvalidKey,
    #[error("malformed signature bytes")] MalformedSignature,
    #[error("signature verification failed")] VerificationFailed,
    #[error("key generation failed: {0}")] KeyGeneration(String),
    #[error("signing failed: {0}")] Signing(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Invalid transaction signature {0}")] InvalidSignature(String),
    #[error("Invalid transaction amount {0}")] InvalidAmount(String),
    #[error("Transaction id mismatch {0}")] IdMismatch(String),
    #[error("Unknown sender wallet '{0}'")] UnknownSender(String),
    #[error("serialization: {0}")] Serialization(String),
    #[error(transparent)] Crypto(#[from] CryptoError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("block {index} has incorrect hash")] HashMismatch { index: u64 },
    #[error("block {index} does not meet difficulty {difficulty}")] DifficultyNotMet { index: u64, difficulty: usize },
    #[error("block {index} previous hash mismatch")] PreviousHashMismatch { index: u64 },
    #[error("block {index} is not sealed")] Unsealed { index: u64 },
    #[error("serialization: {0}")] Serialization(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("chain has no blocks")] Empty,
    #[error(transparent)] Block(#[from] BlockError),
}
