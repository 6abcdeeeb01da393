//! Node composition and state transitions.
//!
//! A [`Node`] holds the network roster, the wallet registry (its own wallet
//! plus a UTXO mirror for every other participant), the mempool, the chain,
//! and the metrics counters — all behind one `parking_lot::Mutex`. Any
//! operation touching more than one of them holds the lock for the whole
//! critical section; outbound HTTP always runs on a snapshot taken first.
//!
//! The bootstrap node (id 0) seeds the genesis block at construction,
//! assigns ids to registering peers, and — once the roster is complete —
//! pushes the enrollment state to every peer and funds each with 100 coins.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{info, warn};

use noobcash_core::crypto::{Address, Keypair};
use noobcash_core::error::TransactionError;
use noobcash_core::transaction::COINS_PER_NODE;
use noobcash_core::{Block, Blockchain, Transaction};
use noobcash_wallet::Wallet;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::{AggregateReport, Metrics, MetricsReport};
use crate::peer::PeerClient;
use crate::{driver, miner};

/// A roster entry `(address_url, public_key)`, JSON-encoded as a 2-element
/// array. `network[i]` is the node with id `i`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct PeerInfo {
    pub address: String,
    pub public_key: Address,
}

impl From<(String, String)> for PeerInfo {
    fn from((address, public_key): (String, String)) -> Self {
        Self { address, public_key }
    }
}

impl From<PeerInfo> for (String, String) {
    fn from(peer: PeerInfo) -> Self {
        (peer.address, peer.public_key)
    }
}

/// The enrollment payload the bootstrap pushes to every peer. Wallets ride
/// along as keyless stubs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnrollRequest {
    pub network: Vec<PeerInfo>,
    pub blockchain: Blockchain,
    pub wallets: Vec<Wallet>,
}

/// Everything a node mutates, guarded by a single lock.
pub struct NodeState {
    pub id: Option<u32>,
    pub network: Vec<PeerInfo>,
    pub wallets: HashMap<Address, Wallet>,
    pub blockchain: Blockchain,
    pub pending_transactions: Vec<Transaction>,
    pub metrics: Metrics,
}

/// One Noobcash node.
pub struct Node {
    config: NodeConfig,
    /// Own RSA keys; the address doubles as the wallet-registry key.
    keypair: Keypair,
    state: Mutex<NodeState>,
    peers: PeerClient,
    /// Wakes the mining worker when the mempool grows.
    miner_wake: Notify,
}

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Clip an address for log and error texts; addresses are ~600 hex chars.
fn short(address: &str) -> &str {
    address.get(..16).unwrap_or(address)
}

impl Node {
    /// Create the node with a fresh wallet. The bootstrap additionally mints
    /// the genesis transaction, seals the genesis block, and enters itself
    /// as roster entry 0.
    pub fn new(config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        let mut wallet = Wallet::generate().map_err(|e| NodeError::Internal(e.to_string()))?;
        let keypair = wallet
            .keypair
            .clone()
            .ok_or_else(|| NodeError::Internal("generated wallet lacks keys".into()))?;
        info!(address = %short(keypair.address()), "registered wallet");

        let mut state = NodeState {
            id: None,
            network: Vec::new(),
            wallets: HashMap::new(),
            blockchain: Blockchain::default(),
            pending_transactions: Vec::new(),
            metrics: Metrics::default(),
        };

        if config.is_bootstrap() {
            let genesis =
                Transaction::genesis(keypair.address(), config.n_nodes as u64, &keypair)?;
            let minted = genesis
                .recipient_output()
                .cloned()
                .ok_or_else(|| NodeError::Internal("genesis transaction has no outputs".into()))?;
            wallet.utxos.push(minted);
            let block = Block::genesis(genesis, unix_now())?;
            state.blockchain.blocks.push(block);
            state.network.push(PeerInfo {
                address: config.public_url(),
                public_key: keypair.address().clone(),
            });
            state.id = Some(0);
        }
        state.wallets.insert(keypair.address().clone(), wallet);

        let peers =
            PeerClient::new(config.peer_timeout).map_err(|e| NodeError::Internal(e.to_string()))?;

        Ok(Arc::new(Self {
            config,
            keypair,
            state: Mutex::new(state),
            peers,
            miner_wake: Notify::new(),
        }))
    }

    /// Spawn the background workers: the miner, the optional transaction
    /// driver, and (on peers) registration with the bootstrap.
    pub fn start(self: &Arc<Self>) {
        tokio::spawn(miner::run(Arc::clone(self)));
        if let Some(path) = self.config.transactions_file.clone() {
            tokio::spawn(driver::run(Arc::clone(self), path));
        }
        if let Some(bootstrap_url) = self.config.bootstrap.clone() {
            tokio::spawn(Arc::clone(self).register_with_bootstrap(bootstrap_url));
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn address(&self) -> &Address {
        self.keypair.address()
    }

    pub fn id(&self) -> Option<u32> {
        self.state.lock().id
    }

    pub fn is_bootstrap(&self) -> bool {
        self.config.is_bootstrap()
    }

    /// Balance of the node's own wallet.
    pub fn balance(&self) -> u64 {
        let state = self.state.lock();
        state
            .wallets
            .get(self.keypair.address())
            .map(Wallet::balance)
            .unwrap_or(0)
    }

    pub fn chain(&self) -> Blockchain {
        self.state.lock().blockchain.clone()
    }

    pub fn network_len(&self) -> usize {
        self.state.lock().network.len()
    }

    /// The roster entry for node id `index`, once known.
    pub fn peer_info(&self, index: usize) -> Option<PeerInfo> {
        self.state.lock().network.get(index).cloned()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending_transactions.len()
    }

    /// The last sealed batch; with `debug` also the current mempool.
    pub fn view_transactions(&self) -> Vec<Transaction> {
        let state = self.state.lock();
        let mut transactions = state
            .blockchain
            .tail()
            .map(|block| block.transactions.clone())
            .unwrap_or_default();
        if self.config.debug {
            transactions.extend(state.pending_transactions.iter().cloned());
        }
        transactions
    }

    pub fn metrics_report(&self) -> MetricsReport {
        let state = self.state.lock();
        state.metrics.report(state.blockchain.len())
    }

    pub fn record_driver_metrics(&self, successful: u64, failed: u64, elapsed_secs: f64) {
        let mut state = self.state.lock();
        state.metrics.transactions.successful = successful;
        state.metrics.transactions.failed = failed;
        state.metrics.transactions.throughput = if elapsed_secs > 0.0 {
            (successful + failed) as f64 / elapsed_secs
        } else {
            0.0
        };
    }

    // --- enrollment -------------------------------------------------------

    /// Bootstrap only: record a joining peer and hand out the next id. The
    /// Nth registration completes the roster and triggers the enrollment
    /// fan-out in a spawned task, off the request path.
    pub fn register_peer(
        self: &Arc<Self>,
        address: String,
        public_key: Address,
    ) -> Result<u32, NodeError> {
        if !self.config.is_bootstrap() {
            return Err(NodeError::Invalid(format!(
                "Node {} is not the bootstrap node",
                self.id_label()
            )));
        }
        let (id, complete) = {
            let mut state = self.state.lock();
            if state.network.len() >= self.config.n_nodes {
                return Err(NodeError::Conflict(
                    "The network is already fully enrolled".into(),
                ));
            }
            info!(%address, "registering peer");
            state.network.push(PeerInfo {
                address,
                public_key: public_key.clone(),
            });
            state.wallets.insert(public_key.clone(), Wallet::stub(public_key));
            (
                (state.network.len() - 1) as u32,
                state.network.len() == self.config.n_nodes,
            )
        };
        if complete {
            tokio::spawn(Arc::clone(self).enroll_network());
        }
        Ok(id)
    }

    /// Push roster, chain, and wallet mirrors to every peer, give the
    /// installs a moment to settle, then seed each peer with 100 coins.
    async fn enroll_network(self: Arc<Self>) {
        let (request, peers) = {
            let state = self.state.lock();
            let request = EnrollRequest {
                network: state.network.clone(),
                blockchain: state.blockchain.clone(),
                wallets: state.wallets.values().cloned().collect(),
            };
            (request, Self::other_peers(&state))
        };
        for peer in &peers {
            info!(peer = %peer.address, "enrolling peer");
            if let Err(error) = self.peers.enroll(&peer.address, &request).await {
                warn!(peer = %peer.address, %error, "enrollment push failed");
            }
        }
        tokio::time::sleep(self.config.enroll_settle).await;
        for peer in &peers {
            if let Err(error) = self
                .create_transaction(peer.public_key.clone(), COINS_PER_NODE)
                .await
            {
                warn!(peer = %peer.address, %error, "funding transaction failed");
            }
        }
    }

    /// Peer only: validate the received chain and install roster, chain, and
    /// wallet mirrors. The node's own wallet (and keys) stay untouched.
    pub fn install_enrollment(&self, request: EnrollRequest) -> Result<(), NodeError> {
        if self.config.is_bootstrap() {
            return Err(NodeError::Invalid(format!(
                "Node {} is the bootstrap node",
                self.id_label()
            )));
        }
        request.blockchain.validate(self.config.difficulty)?;
        let mut state = self.state.lock();
        state.network = request.network;
        state.blockchain = request.blockchain;
        for wallet in request.wallets {
            if wallet.public_key != *self.keypair.address() {
                state.wallets.insert(wallet.public_key.clone(), wallet);
            }
        }
        info!(id = state.id, "received network and blockchain");
        Ok(())
    }

    /// Keep knocking on the bootstrap until it hands out an id.
    async fn register_with_bootstrap(self: Arc<Self>, bootstrap_url: String) {
        loop {
            match self
                .peers
                .register(&bootstrap_url, self.config.port, self.keypair.address())
                .await
            {
                Ok(id) => {
                    info!(id, "received id");
                    self.state.lock().id = Some(id);
                    return;
                }
                Err(error) => {
                    warn!(%error, "registration failed; retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    // --- transactions -----------------------------------------------------

    /// Create, sign, validate, persist, and broadcast a transfer from the
    /// local wallet. The lock covers input selection through persistence;
    /// the fan-out runs afterwards on a roster snapshot.
    pub async fn create_transaction(
        &self,
        recipient_address: Address,
        amount: u64,
    ) -> Result<Transaction, NodeError> {
        let (transaction, peers) = {
            let mut state = self.state.lock();
            if !state.wallets.contains_key(&recipient_address) {
                return Err(NodeError::NotFound(format!(
                    "Unknown recipient '{}'",
                    short(&recipient_address)
                )));
            }
            if recipient_address == *self.keypair.address() {
                return Err(NodeError::Conflict(
                    "Recipient and sender addresses are identical".into(),
                ));
            }
            if amount == 0 {
                return Err(NodeError::Invalid(format!(
                    "Invalid transaction amount '{amount}'"
                )));
            }
            let node_id = state
                .id
                .ok_or_else(|| NodeError::Invalid("Node has not been assigned an id yet".into()))?;
            let own = self.keypair.address().clone();
            let wallet = state
                .wallets
                .get(&own)
                .ok_or_else(|| NodeError::Internal("own wallet missing".into()))?;

            let (inputs, consumed) = wallet.select_inputs(amount);
            let change = consumed
                .checked_sub(amount)
                .ok_or_else(|| NodeError::Invalid(format!("Invalid transaction amount '{amount}'")))?;
            let mut transaction =
                Transaction::create(&own, &recipient_address, amount, inputs, &self.keypair)?;
            transaction.attach_outputs(node_id, change);

            Self::validate_transaction(&state, &transaction)?;
            Self::apply_transaction(&mut state, &transaction);
            (transaction, Self::other_peers(&state))
        };
        info!(id = %transaction.id, "created transaction");
        self.miner_wake.notify_one();
        self.fan_out_transaction(&transaction, &peers).await;
        Ok(transaction)
    }

    /// Peer transaction ingress: validate against the local mirrors, apply
    /// the UTXO update rule, and queue for mining. No re-broadcast.
    pub fn receive_transaction(&self, transaction: Transaction) -> Result<(), NodeError> {
        info!(id = %transaction.id, "received transaction");
        {
            let mut state = self.state.lock();
            Self::validate_transaction(&state, &transaction)?;
            Self::apply_transaction(&mut state, &transaction);
        }
        self.miner_wake.notify_one();
        Ok(())
    }

    /// Recompute the id (the signature only pins the id text, so a relayed
    /// transaction with altered amount or inputs would otherwise slip
    /// through), check the signature, and apply the change rule: the
    /// consumed inputs, looked up in the sender's mirror, must cover the
    /// amount. Returns the change.
    fn validate_transaction(
        state: &NodeState,
        transaction: &Transaction,
    ) -> Result<u64, NodeError> {
        if transaction.compute_id()? != transaction.id {
            return Err(TransactionError::IdMismatch(transaction.id.clone()).into());
        }
        if !transaction.verify_signature() {
            return Err(TransactionError::InvalidSignature(transaction.id.clone()).into());
        }
        let wallet = state.wallets.get(&transaction.sender_address).ok_or_else(|| {
            NodeError::from(TransactionError::UnknownSender(
                short(&transaction.sender_address).to_string(),
            ))
        })?;
        let consumed: u64 = wallet
            .utxos
            .iter()
            .filter(|utxo| transaction.transaction_inputs.contains(&utxo.id))
            .map(|utxo| utxo.amount)
            .sum();
        consumed
            .checked_sub(transaction.amount)
            .ok_or_else(|| TransactionError::InvalidAmount(transaction.id.clone()).into())
    }

    /// The UTXO update rule, identical on the sender and every receiver:
    /// credit the recipient with the first output, then drop the consumed
    /// UTXOs from the sender and credit the change output.
    fn apply_transaction(state: &mut NodeState, transaction: &Transaction) {
        if let (Some(credit), Some(change)) = (
            transaction.recipient_output().cloned(),
            transaction.change_output().cloned(),
        ) {
            if let Some(wallet) = state.wallets.get_mut(&transaction.recipient_address) {
                wallet.apply_as_recipient(credit);
            }
            if let Some(wallet) = state.wallets.get_mut(&transaction.sender_address) {
                wallet.apply_as_sender(&transaction.transaction_inputs, change);
            }
        }
        state.pending_transactions.push(transaction.clone());
    }

    // --- blocks -----------------------------------------------------------

    /// Whether the mempool has reached sealing capacity (and there is a
    /// chain to extend).
    pub(crate) fn mempool_at_capacity(&self) -> bool {
        let state = self.state.lock();
        !state.blockchain.is_empty()
            && state.pending_transactions.len() >= self.config.capacity
    }

    /// Park until new mempool content is signalled or the poll interval
    /// elapses.
    pub(crate) async fn wait_for_work(&self) {
        tokio::select! {
            _ = self.miner_wake.notified() => {}
            _ = tokio::time::sleep(self.config.mining_poll) => {}
        }
    }

    /// Seal one block if the mempool is at capacity: snapshot the batch,
    /// grind proof-of-work off the runtime, then re-validate against the
    /// tail (a remote block may have won the race), append, and broadcast.
    /// Returns whether a block was appended.
    pub async fn mine_once(&self) -> Result<bool, NodeError> {
        let started = Instant::now();
        let candidate = {
            let state = self.state.lock();
            if state.pending_transactions.len() < self.config.capacity {
                return Ok(false);
            }
            let Some(tail) = state.blockchain.tail() else {
                return Ok(false);
            };
            let previous_hash = tail
                .current_hash
                .clone()
                .ok_or_else(|| NodeError::Internal("tail block is unsealed".into()))?;
            Block::candidate(
                state.blockchain.len() as u64,
                unix_now(),
                previous_hash,
                state.pending_transactions.clone(),
            )
        };
        info!(index = candidate.index, "mining block");

        let difficulty = self.config.difficulty;
        let mined = tokio::task::spawn_blocking(move || {
            let mut block = candidate;
            block.mine(difficulty).map(|()| block)
        })
        .await
        .map_err(|e| NodeError::Internal(e.to_string()))??;
        let mining_elapsed = started.elapsed().as_secs_f64();
        info!(index = mined.index, "finished mining block");

        let (accepted, peers) = {
            let mut state = self.state.lock();
            state.metrics.mining_time += mining_elapsed;
            let verdict = match state.blockchain.tail() {
                Some(tail) => mined.validate_against(tail, difficulty),
                None => Err(noobcash_core::error::BlockError::PreviousHashMismatch {
                    index: mined.index,
                }),
            };
            match verdict {
                Ok(()) => {
                    Self::persist_block(&mut state, mined.clone());
                    state.metrics.total_time += started.elapsed().as_secs_f64();
                    (true, Self::other_peers(&state))
                }
                Err(error) => {
                    warn!(%error, "discarding mined block");
                    (false, Vec::new())
                }
            }
        };
        if accepted {
            self.fan_out_block(&mined, &peers).await;
        }
        Ok(accepted)
    }

    /// Peer block ingress: append when it extends the tail, otherwise fall
    /// back to longest-chain resolution. Returns whether the block was
    /// appended as-is.
    pub async fn receive_block(&self, block: Block) -> Result<bool, NodeError> {
        info!(index = block.index, "received block");
        let accepted = {
            let mut state = self.state.lock();
            match state.blockchain.tail() {
                Some(tail) => match block.validate_against(tail, self.config.difficulty) {
                    Ok(()) => {
                        Self::persist_block(&mut state, block);
                        true
                    }
                    Err(error) => {
                        warn!(%error, "rejecting received block");
                        false
                    }
                },
                None => false,
            }
        };
        if !accepted {
            self.resolve_conflict().await;
        }
        Ok(accepted)
    }

    /// Append a block and drop exactly its transactions from the mempool, so
    /// arrivals beyond capacity carry over into the next batch.
    fn persist_block(state: &mut NodeState, block: Block) {
        let sealed: HashSet<String> = block
            .transactions
            .iter()
            .map(|transaction| transaction.id.clone())
            .collect();
        state
            .pending_transactions
            .retain(|transaction| !sealed.contains(&transaction.id));
        state.blockchain.blocks.push(block);
    }

    /// Longest-valid-chain resolution: fetch every peer's chain and adopt
    /// the longest valid one that is strictly longer than ours; ties keep
    /// the local chain. Wallet mirrors and the mempool are NOT rebuilt from
    /// the adopted chain — balances may diverge until the next block. Known
    /// limitation.
    pub async fn resolve_conflict(&self) {
        info!("resolving conflict");
        let (peers, local_len) = {
            let state = self.state.lock();
            (Self::other_peers(&state), state.blockchain.len())
        };
        let mut longest: Option<Blockchain> = None;
        let mut max_len = local_len;
        for peer in &peers {
            info!(peer = %peer.address, "retrieving blockchain");
            match self.peers.fetch_chain(&peer.address).await {
                Ok(chain) => {
                    if chain.len() > max_len && chain.validate(self.config.difficulty).is_ok() {
                        max_len = chain.len();
                        longest = Some(chain);
                    }
                }
                Err(error) => warn!(peer = %peer.address, %error, "chain fetch failed"),
            }
        }
        if let Some(chain) = longest {
            let mut state = self.state.lock();
            // A block may have landed while we were fetching; only a
            // strictly longer chain still wins.
            if chain.len() > state.blockchain.len() {
                info!(length = chain.len(), "adopting longer chain");
                state.blockchain = chain;
            }
        }
    }

    // --- metrics ----------------------------------------------------------

    /// Bootstrap only: pull `/metrics/` from every peer and fold the reports
    /// into network-wide totals and averages.
    pub async fn gather_metrics(&self) -> Result<AggregateReport, NodeError> {
        if !self.config.is_bootstrap() {
            return Err(NodeError::Invalid(format!(
                "Node {} is not the bootstrap node",
                self.id_label()
            )));
        }
        let peers = Self::other_peers(&self.state.lock());
        let mut totals = AggregateReport::default();
        for peer in &peers {
            info!(peer = %peer.address, "gathering metrics");
            match self.peers.fetch_metrics(&peer.address).await {
                Ok(report) => totals.absorb(&report, self.config.n_nodes),
                Err(error) => warn!(peer = %peer.address, %error, "metrics fetch failed"),
            }
        }
        Ok(totals)
    }

    // --- helpers ----------------------------------------------------------

    fn id_label(&self) -> String {
        self.state
            .lock()
            .id
            .map_or_else(|| "?".to_string(), |id| id.to_string())
    }

    /// Everyone in the roster except this node.
    fn other_peers(state: &NodeState) -> Vec<PeerInfo> {
        let Some(own) = state.id else {
            return Vec::new();
        };
        state
            .network
            .iter()
            .enumerate()
            .filter(|(index, _)| *index as u32 != own)
            .map(|(_, peer)| peer.clone())
            .collect()
    }

    async fn fan_out_transaction(&self, transaction: &Transaction, peers: &[PeerInfo]) {
        for peer in peers {
            info!(id = %transaction.id, peer = %peer.address, "transmitting transaction");
            if let Err(error) = self
                .peers
                .broadcast_transaction(&peer.address, transaction)
                .await
            {
                warn!(peer = %peer.address, %error, "transaction broadcast failed");
            }
        }
    }

    async fn fan_out_block(&self, block: &Block, peers: &[PeerInfo]) {
        for peer in peers {
            info!(index = block.index, peer = %peer.address, "transmitting block");
            if let Err(error) = self.peers.broadcast_block(&peer.address, block).await {
                warn!(peer = %peer.address, %error, "block broadcast failed");
            }
        }
    }
}
