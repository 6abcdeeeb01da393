//! Wallets: an address, optionally its key pair, and the UTXOs it owns.
//!
//! Every node keeps one full wallet (with keys) for itself and a stub wallet
//! (address + UTXO mirror) for every other participant; arriving
//! transactions are checked and applied against these mirrors. The key pair
//! is `#[serde(skip)]` in both directions, so private material can never
//! ride along when wallets cross the wire.

use serde::{Deserialize, Serialize};

use noobcash_core::crypto::{Address, Keypair};
use noobcash_core::error::CryptoError;
use noobcash_core::transaction::Utxo;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wallet {
    pub public_key: Address,
    /// Present only on the owning node.
    #[serde(skip)]
    pub keypair: Option<Keypair>,
    /// Owned unspent outputs in arrival order.
    #[serde(default)]
    pub utxos: Vec<Utxo>,
}

impl Wallet {
    /// A wallet with a fresh RSA-2048 key pair and no coins.
    pub fn generate() -> Result<Self, CryptoError> {
        let keypair = Keypair::generate()?;
        Ok(Self {
            public_key: keypair.address().clone(),
            keypair: Some(keypair),
            utxos: Vec::new(),
        })
    }

    /// A keyless mirror of a remote wallet.
    pub fn stub(public_key: Address) -> Self {
        Self {
            public_key,
            keypair: None,
            utxos: Vec::new(),
        }
    }

    /// Sum of the owned UTXO amounts.
    pub fn balance(&self) -> u64 {
        self.utxos.iter().map(|utxo| utxo.amount).sum()
    }

    /// Greedily walk the UTXOs in stored order, collecting ids until their
    /// sum covers `amount` (or the wallet runs out). Returns the collected
    /// ids and their total; the caller decides whether the total suffices.
    pub fn select_inputs(&self, amount: u64) -> (Vec<String>, u64) {
        let mut inputs = Vec::new();
        let mut total = 0u64;
        for utxo in &self.utxos {
            if total >= amount {
                break;
            }
            inputs.push(utxo.id.clone());
            total = total.saturating_add(utxo.amount);
        }
        (inputs, total)
    }

    /// Credit an incoming output.
    pub fn apply_as_recipient(&mut self, output: Utxo) {
        self.utxos.push(output);
    }

    /// Drop every UTXO whose id was consumed, then credit the change.
    /// Filtering rebuilds the list, so repeated ids cannot be missed.
    pub fn apply_as_sender(&mut self, consumed_ids: &[String], change: Utxo) {
        self.utxos
            .retain(|utxo| !consumed_ids.contains(&utxo.id));
        self.utxos.push(change);
    }
}
