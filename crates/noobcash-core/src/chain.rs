//! The replicated chain of blocks.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::error::ChainError;

/// An append-only sequence of blocks, genesis first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
}

impl Blockchain {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The most recent block.
    pub fn tail(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Walk every adjacent pair through block validation. The genesis block
    /// itself is only validated implicitly, as the anchor of the first pair.
    pub fn validate(&self, difficulty: usize) -> Result<(), ChainError> {
        if self.blocks.is_empty() {
            return Err(ChainError::Empty);
        }
        for pair in self.blocks.windows(2) {
            pair[1].validate_against(&pair[0], difficulty)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::GENESIS_PREVIOUS_HASH;
    use crate::error::BlockError;
    use crate::transaction::Transaction;

    fn raw_transaction(amount: u64) -> Transaction {
        let mut transaction = Transaction {
            sender_address: "sender".into(),
            recipient_address: "recipient".into(),
            amount,
            transaction_inputs: Vec::new(),
            transaction_outputs: Vec::new(),
            id: String::new(),
            signature: None,
        };
        transaction.id = transaction.compute_id().unwrap();
        transaction
    }

    fn chain_of(length: usize, difficulty: usize) -> Blockchain {
        let mut chain = Blockchain::default();
        chain
            .blocks
            .push(Block::genesis(raw_transaction(100), 1_700_000_000).unwrap());
        for index in 1..length {
            let tail_hash = chain.tail().unwrap().current_hash.clone().unwrap();
            let mut block = Block::candidate(
                index as u64,
                1_700_000_000 + index as u64,
                tail_hash,
                vec![raw_transaction(index as u64)],
            );
            block.mine(difficulty).unwrap();
            chain.blocks.push(block);
        }
        chain
    }

    // --- structure ---

    #[test]
    fn genesis_uses_the_sentinel_previous_hash() {
        let chain = chain_of(1, 1);
        assert_eq!(chain.blocks[0].previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(chain.tail().unwrap().index, 0);
    }

    #[test]
    fn tail_is_the_last_block() {
        let chain = chain_of(3, 1);
        assert_eq!(chain.tail().unwrap().index, 2);
        assert_eq!(chain.len(), 3);
    }

    // --- validation ---

    #[test]
    fn well_formed_chain_validates() {
        assert!(chain_of(4, 1).validate(1).is_ok());
    }

    #[test]
    fn single_genesis_chain_validates() {
        assert!(chain_of(1, 1).validate(1).is_ok());
    }

    #[test]
    fn empty_chain_is_an_error() {
        assert_eq!(Blockchain::default().validate(1), Err(ChainError::Empty));
    }

    #[test]
    fn genesis_is_exempt_from_difficulty() {
        // Genesis hashes rarely carry leading zeroes; a longer requirement
        // must still not reject the chain through its first block.
        let chain = chain_of(2, 3);
        assert!(chain.validate(3).is_ok());
    }

    #[test]
    fn tampering_mid_chain_is_caught() {
        let mut chain = chain_of(3, 1);
        chain.blocks[1].transactions[0].amount = 1_000_000;
        assert_eq!(
            chain.validate(1),
            Err(ChainError::Block(BlockError::HashMismatch { index: 1 }))
        );
    }

    #[test]
    fn relinking_is_caught() {
        let mut chain = chain_of(3, 1);
        chain.blocks[2].previous_hash = chain.blocks[0].current_hash.clone().unwrap();
        chain.blocks[2].mine(1).unwrap();
        assert_eq!(
            chain.validate(1),
            Err(ChainError::Block(BlockError::PreviousHashMismatch { index: 2 }))
        );
    }

    // --- serde ---

    #[test]
    fn chain_round_trips() {
        let chain = chain_of(3, 1);
        let text = serde_json::to_string(&chain).unwrap();
        let back: Blockchain = serde_json::from_str(&text).unwrap();
        assert_eq!(back, chain);
    }
}
