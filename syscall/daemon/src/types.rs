//! Userspace type definitions
//!
//! Defines the data structures used by the daemon for metrics collection
//! and export.
//!
//! ## Organization
//!
//! - **Probe Types**: events and counters produced by `hijack_probe`
//! - **Report Types**: aggregates built by the collector and exported

use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    net::SocketAddrV4,
};

// ============================================================================
// Probe Types
// ============================================================================

pub mod probe {
    //! Types produced by the probe, re-exported for daemon users

    pub use hijack_common::{constants, TracingConfig};
    pub use hijack_probe::{EventDetail, ProbeEvent, StatsSnapshot};
}

pub use probe::{EventDetail, ProbeEvent, StatsSnapshot};

// ============================================================================
// Report Types
// ============================================================================

/// Aggregated metrics for export
#[derive(Serialize, Debug, Clone)]
pub struct IoMetrics {
    /// ISO 8601 timestamp when metrics were generated
    pub timestamp: String,
    /// Duration of the replay in seconds
    pub duration_seconds: u64,
    /// Total number of events received from the probe
    pub total_events: u64,
    /// Events per syscall label
    pub events_by_label: BTreeMap<String, u64>,
    /// Events per descriptor kind
    pub events_by_kind: BTreeMap<String, u64>,
    /// Per-connection latency metrics, IPv4 sockets only
    pub connections: HashMap<String, ConnectionMetrics>,
    /// Events per regular file name
    pub files: BTreeMap<String, u64>,
    /// Summary of trace id activity
    pub traces: TraceStats,
    /// Latency histogram across all events
    pub histogram: LatencyHistogram,
    /// Latency percentiles across all events
    pub percentiles: Percentiles,
    /// Probe health counters at report time
    pub probe_stats: StatsSnapshot,
}

/// Metrics for a single connection
#[derive(Serialize, Debug, Clone)]
pub struct ConnectionMetrics {
    /// Local address:port
    pub local: String,
    /// Remote address:port
    pub remote: String,
    /// Number of events for this connection
    pub events: u64,
    /// Minimum latency in microseconds
    pub min_latency_us: f64,
    /// Maximum latency in microseconds
    pub max_latency_us: f64,
    /// Average latency in microseconds
    pub avg_latency_us: f64,
    /// Standard deviation in microseconds
    pub std_dev_us: f64,
}

/// Trace id activity
#[derive(Serialize, Debug, Default, Clone)]
pub struct TraceStats {
    /// Events that carried a trace id
    pub traced_events: u64,
    /// Distinct trace ids seen
    pub distinct_ids: u64,
    /// Events per trace id, keyed by the id in hex
    pub events_per_id: BTreeMap<String, u64>,
}

/// Latency histogram buckets
#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct LatencyHistogram {
    /// 0-10us bucket
    #[serde(rename = "0-10us")]
    pub bucket_0_10us: u64,
    /// 10-100us bucket
    #[serde(rename = "10-100us")]
    pub bucket_10_100us: u64,
    /// 100us-1ms bucket
    #[serde(rename = "100us-1ms")]
    pub bucket_100us_1ms: u64,
    /// 1-10ms bucket
    #[serde(rename = "1-10ms")]
    pub bucket_1_10ms: u64,
    /// 10-100ms bucket
    #[serde(rename = "10-100ms")]
    pub bucket_10_100ms: u64,
    /// 100ms+ bucket
    #[serde(rename = "100ms+")]
    pub bucket_100ms_plus: u64,
}

impl LatencyHistogram {
    /// Add a sample to the appropriate bucket
    ///
    /// # Arguments
    ///
    /// * `latency_us` - Latency in microseconds
    pub fn add_sample(&mut self, latency_us: f64) {
        match latency_us {
            l if l < 10.0 => self.bucket_0_10us += 1,
            l if l < 100.0 => self.bucket_10_100us += 1,
            l if l < 1000.0 => self.bucket_100us_1ms += 1,
            l if l < 10000.0 => self.bucket_1_10ms += 1,
            l if l < 100000.0 => self.bucket_10_100ms += 1,
            _ => self.bucket_100ms_plus += 1,
        }
    }

    /// Get total count across all buckets
    pub fn total_count(&self) -> u64 {
        self.bucket_0_10us
            + self.bucket_10_100us
            + self.bucket_100us_1ms
            + self.bucket_1_10ms
            + self.bucket_10_100ms
            + self.bucket_100ms_plus
    }
}

/// Latency percentiles
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct Percentiles {
    /// 50th percentile (median)
    pub p50: f64,
    /// 75th percentile
    pub p75: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
    /// 99.9th percentile
    pub p999: f64,
}

/// Calculate percentiles from a vector of samples
///
/// # Arguments
///
/// * `samples` - Vector of latency values (sorted in place)
///
/// # Returns
///
/// Percentiles structure with p50, p75, p90, p95, p99, p999
pub fn calculate_percentiles(mut samples: Vec<f64>) -> Percentiles {
    if samples.is_empty() {
        return Percentiles::default();
    }

    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let len = samples.len();

    let percentile = |per_mille: usize| {
        let index = std::cmp::min((len * per_mille / 1000).saturating_sub(1), len - 1);
        samples[index]
    };

    Percentiles {
        p50: percentile(500),
        p75: percentile(750),
        p90: percentile(900),
        p95: percentile(950),
        p99: percentile(990),
        p999: percentile(999),
    }
}

/// Calculate standard deviation
///
/// # Arguments
///
/// * `samples` - Slice of values
/// * `mean` - Mean of the values
pub fn calculate_std_dev(samples: &[f64], mean: f64) -> f64 {
    if samples.len() <= 1 {
        return 0.0;
    }

    let variance: f64 = samples
        .iter()
        .map(|x| (x - mean).powi(2))
        .sum::<f64>()
        / samples.len() as f64;
    variance.sqrt()
}

/// Format a connection as "local -> remote"
pub fn connection_to_string(local: &SocketAddrV4, remote: &SocketAddrV4) -> String {
    format!("{} -> {}", local, remote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles() {
        let samples: Vec<f64> = (1..=1000).map(|v| v as f64).collect();
        let percentiles = calculate_percentiles(samples);
        assert_eq!(percentiles.p50, 500.0);
        assert_eq!(percentiles.p99, 990.0);
        assert_eq!(percentiles.p999, 999.0);

        assert_eq!(calculate_percentiles(vec![]), Percentiles::default());
        assert_eq!(calculate_percentiles(vec![7.0]).p50, 7.0);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(calculate_std_dev(&[5.0], 5.0), 0.0);
        assert_eq!(calculate_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 5.0), 2.0);
    }

    #[test]
    fn test_histogram_buckets() {
        let mut histogram = LatencyHistogram::default();
        for latency_us in [1.0, 50.0, 500.0, 5_000.0, 50_000.0, 500_000.0] {
            histogram.add_sample(latency_us);
        }
        assert_eq!(histogram.bucket_0_10us, 1);
        assert_eq!(histogram.bucket_100ms_plus, 1);
        assert_eq!(histogram.total_count(), 6);
    }

    #[test]
    fn test_connection_to_string() {
        let local = "10.0.0.1:8080".parse().unwrap();
        let remote = "10.0.0.2:51000".parse().unwrap();
        assert_eq!(connection_to_string(&local, &remote), "10.0.0.1:8080 -> 10.0.0.2:51000");
    }
}
