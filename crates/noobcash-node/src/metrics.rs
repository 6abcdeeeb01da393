//! Per-node throughput and mining counters, plus the bootstrap-side
//! aggregation over the whole network.

use serde::{Deserialize, Serialize};

/// Driver counters: outcomes of scripted transaction creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMetrics {
    pub successful: u64,
    pub failed: u64,
    /// Transactions per second over the driver window.
    pub throughput: f64,
}

/// Raw counters held under the node lock. Mining and total times are
/// running sums in seconds; reports divide them by the chain length.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    pub transactions: TransactionMetrics,
    pub mining_time: f64,
    pub total_time: f64,
}

impl Metrics {
    /// Snapshot for `/metrics/`, with block timings averaged per block.
    pub fn report(&self, n_blocks: usize) -> MetricsReport {
        let divisor = n_blocks.max(1) as f64;
        MetricsReport {
            transactions: self.transactions,
            blocks: BlockMetrics {
                mining_time: self.mining_time / divisor,
                total_time: self.total_time / divisor,
            },
        }
    }
}

/// Per-block timing averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMetrics {
    pub mining_time: f64,
    pub total_time: f64,
}

/// The per-node report served at `/metrics/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub transactions: TransactionMetrics,
    pub blocks: BlockMetrics,
}

/// Network-wide totals assembled by the bootstrap at `/metrics/total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub transactions: AggregateTransactionMetrics,
    pub blocks: AggregateBlockMetrics,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTransactionMetrics {
    pub total_successful: u64,
    pub total_failed: u64,
    pub average_throughput: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateBlockMetrics {
    pub average_mining_time: f64,
    pub average_total_time: f64,
}

impl AggregateReport {
    /// Fold one peer report into the totals, averaging over `n_nodes`.
    pub fn absorb(&mut self, report: &MetricsReport, n_nodes: usize) {
        let n = n_nodes.max(1) as f64;
        self.transactions.total_successful += report.transactions.successful;
        self.transactions.total_failed += report.transactions.failed;
        self.transactions.average_throughput += report.transactions.throughput / n;
        self.blocks.average_mining_time += report.blocks.mining_time / n;
        self.blocks.average_total_time += report.blocks.total_time / n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_averages_over_blocks() {
        let metrics = Metrics {
            mining_time: 6.0,
            total_time: 9.0,
            ..Metrics::default()
        };
        let report = metrics.report(3);
        assert_eq!(report.blocks.mining_time, 2.0);
        assert_eq!(report.blocks.total_time, 3.0);
    }

    #[test]
    fn empty_chain_does_not_divide_by_zero() {
        let report = Metrics::default().report(0);
        assert_eq!(report.blocks.mining_time, 0.0);
    }

    #[test]
    fn aggregation_sums_and_averages() {
        let mut totals = AggregateReport::default();
        let report = MetricsReport {
            transactions: TransactionMetrics { successful: 8, failed: 2, throughput: 4.0 },
            blocks: BlockMetrics { mining_time: 1.0, total_time: 2.0 },
        };
        totals.absorb(&report, 2);
        totals.absorb(&report, 2);
        assert_eq!(totals.transactions.total_successful, 16);
        assert_eq!(totals.transactions.total_failed, 4);
        assert_eq!(totals.transactions.average_throughput, 4.0);
        assert_eq!(totals.blocks.average_mining_time, 1.0);
    }

    #[test]
    fn report_serializes_with_nested_sections() {
        let text = serde_json::to_string(&Metrics::default().report(1)).unwrap();
        assert!(text.contains("\"transactions\""));
        assert!(text.contains("\"blocks\""));
        assert!(text.contains("\"throughput\""));
    }
}
