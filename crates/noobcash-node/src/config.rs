//! Node configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for a single node process.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the HTTP listener binds to; also advertised to peers.
    pub ip: IpAddr,
    pub port: u16,
    /// URL of the bootstrap node. `None` makes this node the bootstrap.
    pub bootstrap: Option<String>,
    /// Mempool size that triggers block sealing.
    pub capacity: usize,
    /// Leading `'0'` characters required of a mined block hash.
    pub difficulty: usize,
    /// Total number of nodes in the network, bootstrap included.
    pub n_nodes: usize,
    /// Optional transaction script to replay once the roster is complete.
    pub transactions_file: Option<PathBuf>,
    /// Expose pending transactions through the transactions view.
    pub debug: bool,
    /// Timeout applied to every outbound peer call.
    pub peer_timeout: Duration,
    /// Poll fallback for the mining worker when no wake-up arrives.
    pub mining_poll: Duration,
    /// Grace period between pushing enrollments and seeding the funding
    /// transactions, giving peers time to install their state.
    pub enroll_settle: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            bootstrap: None,
            capacity: 1,
            difficulty: 1,
            n_nodes: 2,
            transactions_file: None,
            debug: false,
            peer_timeout: Duration::from_secs(5),
            mining_poll: Duration::from_secs(5),
            enroll_settle: Duration::from_secs(5),
        }
    }
}

impl NodeConfig {
    /// Whether this process hosts the bootstrap node (id 0).
    pub fn is_bootstrap(&self) -> bool {
        self.bootstrap.is_none()
    }

    /// Socket address for the HTTP listener.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// The URL peers reach this node at.
    pub fn public_url(&self) -> String {
        match self.ip {
            IpAddr::V4(ip) => format!("http://{ip}:{}", self.port),
            IpAddr::V6(ip) => format!("http://[{ip}]:{}", self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn default_is_bootstrap() {
        assert!(NodeConfig::default().is_bootstrap());
    }

    #[test]
    fn bootstrap_url_makes_a_peer() {
        let config = NodeConfig {
            bootstrap: Some("http://127.0.0.1:5000".into()),
            ..NodeConfig::default()
        };
        assert!(!config.is_bootstrap());
    }

    #[test]
    fn public_url_v4() {
        let config = NodeConfig {
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5001,
            ..NodeConfig::default()
        };
        assert_eq!(config.public_url(), "http://127.0.0.1:5001");
    }

    #[test]
    fn public_url_v6_is_bracketed() {
        let config = NodeConfig {
            ip: IpAddr::V6(Ipv6Addr::LOCALHOST),
            port: 5001,
            ..NodeConfig::default()
        };
        assert_eq!(config.public_url(), "http://[::1]:5001");
    }

    #[test]
    fn bind_addr_combines_ip_and_port() {
        let config = NodeConfig {
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 7000,
            ..NodeConfig::default()
        };
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:7000");
    }
}
