//! Outbound JSON client for the peer protocol.
//!
//! Every call carries the configured timeout and returns a [`PeerError`]
//! for the caller to log; broadcast fan-out is best effort and never rolls
//! back local state.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use noobcash_core::{Block, Blockchain, Transaction};

use crate::metrics::MetricsReport;
use crate::node::EnrollRequest;

#[derive(Error, Debug)]
pub enum PeerError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered {status}: {message}")]
    Rejected {
        url: String,
        status: reqwest::StatusCode,
        message: String,
    },
}

/// Thin JSON wrapper over a pooled `reqwest` client.
#[derive(Clone)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// `POST /nodes/register` on the bootstrap; returns the assigned id.
    pub async fn register(
        &self,
        bootstrap_url: &str,
        port: u16,
        public_key: &str,
    ) -> Result<u32, PeerError> {
        #[derive(Deserialize)]
        struct RegisterResponse {
            id: u32,
        }

        let url = format!("{bootstrap_url}/nodes/register");
        let body = serde_json::json!({ "port": port, "public_key": public_key });
        let response: RegisterResponse = self.post_json(&url, &body).await?;
        Ok(response.id)
    }

    /// `POST /nodes/enroll` on a peer.
    pub async fn enroll(&self, peer_url: &str, request: &EnrollRequest) -> Result<(), PeerError> {
        let url = format!("{peer_url}/nodes/enroll");
        self.post_json::<serde_json::Value>(&url, request).await?;
        Ok(())
    }

    /// `POST /transactions/broadcast` on a peer.
    pub async fn broadcast_transaction(
        &self,
        peer_url: &str,
        transaction: &Transaction,
    ) -> Result<(), PeerError> {
        let url = format!("{peer_url}/transactions/broadcast");
        self.post_json::<serde_json::Value>(&url, transaction).await?;
        Ok(())
    }

    /// `POST /blocks/broadcast` on a peer.
    pub async fn broadcast_block(&self, peer_url: &str, block: &Block) -> Result<(), PeerError> {
        let url = format!("{peer_url}/blocks/broadcast");
        self.post_json::<serde_json::Value>(&url, block).await?;
        Ok(())
    }

    /// `GET /blockchain/` from a peer.
    pub async fn fetch_chain(&self, peer_url: &str) -> Result<Blockchain, PeerError> {
        self.get_json(&format!("{peer_url}/blockchain/")).await
    }

    /// `GET /metrics/` from a peer.
    pub async fn fetch_metrics(&self, peer_url: &str) -> Result<MetricsReport, PeerError> {
        self.get_json(&format!("{peer_url}/metrics/")).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, PeerError> {
        let response = self.http.post(url).json(body).send().await?;
        Self::decode(url, response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PeerError> {
        let response = self.http.get(url).send().await?;
        Self::decode(url, response).await
    }

    async fn decode<T: DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> Result<T, PeerError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PeerError::Rejected {
                url: url.to_string(),
                status,
                message,
            });
        }
        Ok(response.json().await?)
    }
}
