//! Signed value-transfer transactions and their unspent outputs.
//!
//! A transaction's id is the SHA-256 of its canonical JSON with the outputs
//! still empty and the signature null; outputs are attached by the sender
//! afterwards to encode the recipient credit and the change. The signature
//! is PKCS#1 v1.5 over the id text and therefore pins the id, which in turn
//! pins sender, recipient, amount, and inputs.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::canonical;
use crate::crypto::{self, Address, Keypair, SINK_ADDRESS};
use crate::error::TransactionError;

/// Initial funding minted to the bootstrap wallet per network participant.
pub const COINS_PER_NODE: u64 = 100;

/// An unspent transaction output `(utxo_id, transaction_id, owner, amount)`.
///
/// Encoded on the wire as a 4-element JSON array in field order. The two
/// outputs of a transaction share the id `"<node_id>:<transaction_id>"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UtxoTuple", into = "UtxoTuple")]
pub struct Utxo {
    pub id: String,
    pub transaction_id: String,
    pub owner: Address,
    pub amount: u64,
}

type UtxoTuple = (String, String, String, u64);

impl From<UtxoTuple> for Utxo {
    fn from((id, transaction_id, owner, amount): UtxoTuple) -> Self {
        Self { id, transaction_id, owner, amount }
    }
}

impl From<Utxo> for UtxoTuple {
    fn from(utxo: Utxo) -> Self {
        (utxo.id, utxo.transaction_id, utxo.owner, utxo.amount)
    }
}

/// A signed transfer of `amount` coins from sender to recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender_address: Address,
    pub recipient_address: Address,
    pub amount: u64,
    /// Ids of the sender UTXOs consumed by this transaction.
    pub transaction_inputs: Vec<String>,
    /// Recipient output followed by the sender change output; empty until
    /// the sender attaches them.
    pub transaction_outputs: Vec<Utxo>,
    /// Hex SHA-256 over the canonical id payload.
    pub id: String,
    /// Hex PKCS#1 v1.5 signature over the id text.
    pub signature: Option<String>,
}

impl Transaction {
    /// Build and sign a transaction. Outputs are left empty; the caller
    /// attaches them with [`attach_outputs`](Self::attach_outputs).
    pub fn create(
        sender_address: &Address,
        recipient_address: &Address,
        amount: u64,
        transaction_inputs: Vec<String>,
        keypair: &Keypair,
    ) -> Result<Self, TransactionError> {
        let mut transaction = Self {
            sender_address: sender_address.clone(),
            recipient_address: recipient_address.clone(),
            amount,
            transaction_inputs,
            transaction_outputs: Vec::new(),
            id: String::new(),
            signature: None,
        };
        transaction.id = transaction.compute_id()?;
        transaction.signature = Some(keypair.sign(transaction.id.as_bytes())?);
        Ok(transaction)
    }

    /// The genesis mint: `100 * n_nodes` coins from the sink address to the
    /// bootstrap wallet, with the zero change output written back to the sink.
    pub fn genesis(
        bootstrap_address: &Address,
        n_nodes: u64,
        keypair: &Keypair,
    ) -> Result<Self, TransactionError> {
        let mut transaction = Self::create(
            &SINK_ADDRESS.to_string(),
            bootstrap_address,
            COINS_PER_NODE * n_nodes,
            Vec::new(),
            keypair,
        )?;
        transaction.attach_outputs(0, 0);
        Ok(transaction)
    }

    /// The id digest, recomputed from the current sender, recipient, amount,
    /// and inputs. Outputs and signature do not participate: the id payload
    /// always carries `transaction_outputs: []` and `signature: null`.
    pub fn compute_id(&self) -> Result<String, TransactionError> {
        let payload = json!({
            "sender_address": self.sender_address,
            "recipient_address": self.recipient_address,
            "amount": self.amount,
            "transaction_inputs": self.transaction_inputs,
            "transaction_outputs": [],
            "signature": null,
        });
        let text = canonical::to_canonical_json(&payload)
            .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        Ok(canonical::sha256_hex(text.as_bytes()))
    }

    /// Attach the two outputs a transaction produces, both keyed
    /// `"<node_id>:<transaction_id>"`: the recipient credit, then the sender
    /// change.
    pub fn attach_outputs(&mut self, node_id: u32, change: u64) {
        let utxo_id = format!("{node_id}:{}", self.id);
        self.transaction_outputs = vec![
            Utxo {
                id: utxo_id.clone(),
                transaction_id: self.id.clone(),
                owner: self.recipient_address.clone(),
                amount: self.amount,
            },
            Utxo {
                id: utxo_id,
                transaction_id: self.id.clone(),
                owner: self.sender_address.clone(),
                amount: change,
            },
        ];
    }

    /// The recipient credit output, once attached.
    pub fn recipient_output(&self) -> Option<&Utxo> {
        self.transaction_outputs.first()
    }

    /// The sender change output, once attached.
    pub fn change_output(&self) -> Option<&Utxo> {
        self.transaction_outputs.get(1)
    }

    /// Check the signature over the id text against the sender address.
    pub fn verify_signature(&self) -> bool {
        let Some(signature) = &self.signature else {
            return false;
        };
        crypto::verify(&self.sender_address, self.id.as_bytes(), signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    static KEYS: LazyLock<Keypair> = LazyLock::new(|| Keypair::generate().expect("keygen"));
    static OTHER: LazyLock<Keypair> = LazyLock::new(|| Keypair::generate().expect("keygen"));

    fn sample() -> Transaction {
        Transaction::create(
            KEYS.address(),
            OTHER.address(),
            25,
            vec!["0:aaaa".into(), "1:bbbb".into()],
            &KEYS,
        )
        .unwrap()
    }

    // --- id ---

    #[test]
    fn id_is_deterministic() {
        let transaction = sample();
        assert_eq!(transaction.id, transaction.compute_id().unwrap());
    }

    #[test]
    fn id_ignores_outputs_and_signature() {
        let mut transaction = sample();
        let id = transaction.id.clone();
        transaction.attach_outputs(3, 5);
        transaction.signature = Some("ff".into());
        assert_eq!(transaction.compute_id().unwrap(), id);
    }

    #[test]
    fn id_pins_amount() {
        let mut transaction = sample();
        transaction.amount += 1;
        assert_ne!(transaction.compute_id().unwrap(), transaction.id);
    }

    #[test]
    fn id_pins_inputs() {
        let mut transaction = sample();
        transaction.transaction_inputs.push("2:cccc".into());
        assert_ne!(transaction.compute_id().unwrap(), transaction.id);
    }

    #[test]
    fn id_is_hex_sha256() {
        let transaction = sample();
        assert_eq!(transaction.id.len(), 64);
        assert!(transaction.id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    // --- signature ---

    #[test]
    fn created_transaction_verifies() {
        assert!(sample().verify_signature());
    }

    #[test]
    fn missing_signature_fails() {
        let mut transaction = sample();
        transaction.signature = None;
        assert!(!transaction.verify_signature());
    }

    #[test]
    fn foreign_signature_fails() {
        let mut transaction = sample();
        transaction.signature = Some(OTHER.sign(transaction.id.as_bytes()).unwrap());
        assert!(!transaction.verify_signature());
    }

    #[test]
    fn altered_id_fails_verification() {
        let mut transaction = sample();
        transaction.id = canonical::sha256_hex(b"something else");
        assert!(!transaction.verify_signature());
    }

    // --- outputs ---

    #[test]
    fn outputs_share_the_utxo_id() {
        let mut transaction = sample();
        transaction.attach_outputs(2, 5);
        let expected = format!("2:{}", transaction.id);
        assert_eq!(transaction.recipient_output().unwrap().id, expected);
        assert_eq!(transaction.change_output().unwrap().id, expected);
    }

    #[test]
    fn outputs_split_amount_and_change() {
        let mut transaction = sample();
        transaction.attach_outputs(0, 5);
        let recipient = transaction.recipient_output().unwrap();
        let change = transaction.change_output().unwrap();
        assert_eq!(recipient.owner, *OTHER.address());
        assert_eq!(recipient.amount, 25);
        assert_eq!(change.owner, *KEYS.address());
        assert_eq!(change.amount, 5);
    }

    #[test]
    fn exact_spend_leaves_zero_change() {
        let mut transaction = sample();
        transaction.attach_outputs(0, 0);
        assert_eq!(transaction.change_output().unwrap().amount, 0);
    }

    // --- genesis ---

    #[test]
    fn genesis_mints_per_node() {
        let genesis = Transaction::genesis(KEYS.address(), 5, &KEYS).unwrap();
        assert_eq!(genesis.sender_address, SINK_ADDRESS);
        assert_eq!(genesis.amount, 500);
        assert!(genesis.transaction_inputs.is_empty());
    }

    #[test]
    fn genesis_change_goes_to_sink() {
        let genesis = Transaction::genesis(KEYS.address(), 2, &KEYS).unwrap();
        let change = genesis.change_output().unwrap();
        assert_eq!(change.owner, SINK_ADDRESS);
        assert_eq!(change.amount, 0);
        assert_eq!(genesis.recipient_output().unwrap().amount, 200);
    }

    #[test]
    fn genesis_utxo_ids_use_node_zero() {
        let genesis = Transaction::genesis(KEYS.address(), 2, &KEYS).unwrap();
        assert!(genesis.recipient_output().unwrap().id.starts_with("0:"));
    }

    // --- serde ---

    #[test]
    fn utxo_encodes_as_array() {
        let utxo = Utxo {
            id: "0:abcd".into(),
            transaction_id: "abcd".into(),
            owner: "owner".into(),
            amount: 7,
        };
        let text = serde_json::to_string(&utxo).unwrap();
        assert_eq!(text, r#"["0:abcd","abcd","owner",7]"#);
        let back: Utxo = serde_json::from_str(&text).unwrap();
        assert_eq!(back, utxo);
    }

    #[test]
    fn transaction_round_trips() {
        let mut transaction = sample();
        transaction.attach_outputs(1, 3);
        let text = serde_json::to_string(&transaction).unwrap();
        let back: Transaction = serde_json::from_str(&text).unwrap();
        assert_eq!(back, transaction);
    }
}
