//! Blocks and proof-of-work.
//!
//! A block's hash is the SHA-256 of its canonical JSON with the
//! `current_hash` field removed; mining grinds the nonce until the hash
//! carries the required prefix of ASCII `'0'` characters. The genesis block
//! is hashed but never mined.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical;
use crate::error::BlockError;
use crate::transaction::Transaction;

/// Sentinel `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// A sealed batch of transactions in the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix seconds at construction time.
    pub timestamp: u64,
    pub nonce: u64,
    /// Hash of the predecessor, or [`GENESIS_PREVIOUS_HASH`] at index 0.
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
    /// Hex SHA-256 over the canonical JSON without this field; `None` while
    /// the block is still being mined.
    pub current_hash: Option<String>,
}

impl Block {
    /// A candidate block awaiting proof-of-work.
    pub fn candidate(
        index: u64,
        timestamp: u64,
        previous_hash: String,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            index,
            timestamp,
            nonce: 0,
            previous_hash,
            transactions,
            current_hash: None,
        }
    }

    /// The genesis block: index 0, sentinel previous hash, a single minting
    /// transaction, hashed without proof-of-work.
    pub fn genesis(transaction: Transaction, timestamp: u64) -> Result<Self, BlockError> {
        let mut block = Self::candidate(
            0,
            timestamp,
            GENESIS_PREVIOUS_HASH.to_string(),
            vec![transaction],
        );
        block.current_hash = Some(block.calculate_hash(false)?);
        Ok(block)
    }

    /// Hash the block's canonical JSON. With `include_hash` false the
    /// `current_hash` field is stripped before hashing, which is the form
    /// every stored hash commits to.
    pub fn calculate_hash(&self, include_hash: bool) -> Result<String, BlockError> {
        let mut value =
            serde_json::to_value(self).map_err(|e| BlockError::Serialization(e.to_string()))?;
        if !include_hash {
            if let Value::Object(map) = &mut value {
                map.remove("current_hash");
            }
        }
        let text = canonical::to_canonical_json(&value)
            .map_err(|e| BlockError::Serialization(e.to_string()))?;
        Ok(canonical::sha256_hex(text.as_bytes()))
    }

    /// Grind the nonce from zero until the hash meets `difficulty`, then
    /// seal `current_hash`. CPU-bound; callers run it on a local copy off
    /// any async runtime.
    pub fn mine(&mut self, difficulty: usize) -> Result<(), BlockError> {
        self.nonce = 0;
        loop {
            let hash = self.calculate_hash(false)?;
            if meets_difficulty(&hash, difficulty) {
                self.current_hash = Some(hash);
                return Ok(());
            }
            self.nonce += 1;
        }
    }

    /// Validate this block as the successor of `previous`: the sealed hash
    /// must match the recomputed one, meet the difficulty prefix (genesis is
    /// exempt), and link to the predecessor's hash.
    pub fn validate_against(&self, previous: &Block, difficulty: usize) -> Result<(), BlockError> {
        let sealed = self
            .current_hash
            .as_deref()
            .ok_or(BlockError::Unsealed { index: self.index })?;
        let computed = self.calculate_hash(false)?;
        if sealed != computed {
            return Err(BlockError::HashMismatch { index: self.index });
        }
        if self.index > 0 && !meets_difficulty(sealed, difficulty) {
            return Err(BlockError::DifficultyNotMet { index: self.index, difficulty });
        }
        if Some(self.previous_hash.as_str()) != previous.current_hash.as_deref() {
            return Err(BlockError::PreviousHashMismatch { index: self.index });
        }
        Ok(())
    }
}

/// Whether a hex hash carries `difficulty` leading `'0'` characters.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.bytes().take(difficulty).filter(|&b| b == b'0').count() == difficulty
}
