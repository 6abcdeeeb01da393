//! Axum router and HTTP handlers for the peer protocol.
//!
//! Success responses are `{"success": true}` unless an endpoint returns
//! data; failures map through [`NodeError`] to 4xx/5xx with a
//! `{"message": …}` body.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use noobcash_core::{Block, Transaction};

use crate::error::NodeError;
use crate::node::{EnrollRequest, Node};

pub fn router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/nodes/register", post(register))
        .route("/nodes/enroll", post(enroll))
        .route("/transactions/create", post(create_transaction))
        .route("/transactions/broadcast", post(broadcast_transaction))
        .route("/transactions/", get(view_transactions))
        .route("/blocks/broadcast", post(broadcast_block))
        .route("/blockchain/", get(view_blockchain))
        .route("/wallet/balance", get(balance))
        .route("/metrics/", get(metrics))
        .route("/metrics/total", get(metrics_total))
        .with_state(node)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

#[derive(Deserialize)]
struct RegisterRequest {
    port: u16,
    public_key: String,
}

/// `POST /nodes/register` — bootstrap only. The joiner's URL is rebuilt from
/// the connection's source address and the advertised port.
async fn register(
    State(node): State<Arc<Node>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, NodeError> {
    let address = match remote.ip() {
        IpAddr::V4(ip) => format!("http://{ip}:{}", request.port),
        IpAddr::V6(ip) => format!("http://[{ip}]:{}", request.port),
    };
    let id = node.register_peer(address, request.public_key)?;
    Ok(Json(json!({ "id": id })))
}

/// `POST /nodes/enroll` — peer only: install roster, chain, and wallet
/// mirrors received from the bootstrap.
async fn enroll(
    State(node): State<Arc<Node>>,
    Json(request): Json<EnrollRequest>,
) -> Result<Json<Value>, NodeError> {
    node.install_enrollment(request)?;
    Ok(success())
}

#[derive(Deserialize)]
struct CreateTransactionRequest {
    recipient_address: String,
    amount: i64,
}

/// `POST /transactions/create` — user-initiated transfer from this node's
/// wallet.
async fn create_transaction(
    State(node): State<Arc<Node>>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<Json<Value>, NodeError> {
    if request.amount <= 0 {
        return Err(NodeError::Invalid(format!(
            "Invalid transaction amount '{}'",
            request.amount
        )));
    }
    node.create_transaction(request.recipient_address, request.amount as u64)
        .await?;
    Ok(success())
}

/// `POST /transactions/broadcast` — peer-to-peer transaction ingress.
async fn broadcast_transaction(
    State(node): State<Arc<Node>>,
    Json(transaction): Json<Transaction>,
) -> Result<Json<Value>, NodeError> {
    node.receive_transaction(transaction)?;
    Ok(success())
}

/// `GET /transactions/` — the last sealed batch (plus the mempool in debug
/// mode).
async fn view_transactions(State(node): State<Arc<Node>>) -> Json<Value> {
    Json(json!({ "transactions": node.view_transactions() }))
}

/// `POST /blocks/broadcast` — peer-to-peer block ingress. A block that does
/// not extend the tail triggers conflict resolution rather than an error to
/// the sender.
async fn broadcast_block(
    State(node): State<Arc<Node>>,
    Json(block): Json<Block>,
) -> Result<Json<Value>, NodeError> {
    if node.receive_block(block).await? {
        Ok(success())
    } else {
        Ok(Json(json!({ "success": true, "message": "Synced blockchain." })))
    }
}

/// `GET /blockchain/` — the full chain.
async fn view_blockchain(State(node): State<Arc<Node>>) -> Json<noobcash_core::Blockchain> {
    Json(node.chain())
}

/// `GET /wallet/balance` — this node's own balance.
async fn balance(State(node): State<Arc<Node>>) -> Json<Value> {
    Json(json!({ "balance": node.balance() }))
}

/// `GET /metrics/` — per-node counters.
async fn metrics(State(node): State<Arc<Node>>) -> Json<crate::metrics::MetricsReport> {
    Json(node.metrics_report())
}

/// `GET /metrics/total` — bootstrap only: network-wide aggregation.
async fn metrics_total(
    State(node): State<Arc<Node>>,
) -> Result<Json<crate::metrics::AggregateReport>, NodeError> {
    Ok(Json(node.gather_metrics().await?))
}
